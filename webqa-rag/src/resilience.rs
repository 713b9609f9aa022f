//! Failure handling around generator calls.
//!
//! [`ResilientGenerator`] throttles every call through a shared
//! [`MinIntervalThrottle`] and turns [`GenerationError`]s into a
//! [`GenerationOutcome::Degraded`] value carrying a user-facing message.
//! It never retries; retries, if any, belong to the underlying client.

use std::sync::Arc;

use tracing::{error, warn};

use crate::generation::{GenerationError, GenerationErrorKind, Generator};
use crate::throttle::MinIntervalThrottle;

/// The result of a throttled, classified generator call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// The generator produced text.
    Completed(String),
    /// The generator failed; `message` is safe to show to the user.
    Degraded {
        /// Failure category reported by the client adapter.
        kind: GenerationErrorKind,
        /// Human-readable fallback message.
        message: String,
    },
}

/// User-facing message shown in place of an answer for a failure category.
pub fn degraded_message(kind: GenerationErrorKind) -> &'static str {
    match kind {
        GenerationErrorKind::RateLimited => {
            "The answer service is rate limited right now (request quota exceeded). \
             Please wait a minute and ask again."
        }
        GenerationErrorKind::InvalidRequest => {
            "The answer service rejected the request or the model is unavailable. \
             Check the configured model and try again."
        }
        GenerationErrorKind::Other => {
            "Something went wrong while generating the answer. Please try again later."
        }
    }
}

/// A [`Generator`] wrapper that throttles calls and absorbs failures.
pub struct ResilientGenerator {
    generator: Arc<dyn Generator>,
    throttle: Arc<MinIntervalThrottle>,
}

impl ResilientGenerator {
    /// Wrap `generator`, pacing calls with `throttle`.
    pub fn new(generator: Arc<dyn Generator>, throttle: Arc<MinIntervalThrottle>) -> Self {
        Self { generator, throttle }
    }

    /// The shared throttle.
    pub fn throttle(&self) -> &Arc<MinIntervalThrottle> {
        &self.throttle
    }

    /// Run one generation, waiting for the throttle first.
    pub async fn generate(&self, prompt: &str) -> GenerationOutcome {
        self.throttle.acquire().await;

        match self.generator.generate(prompt).await {
            Ok(text) => GenerationOutcome::Completed(text),
            Err(e) => {
                log_failure(self.generator.model(), &e);
                GenerationOutcome::Degraded {
                    kind: e.kind,
                    message: degraded_message(e.kind).to_string(),
                }
            }
        }
    }
}

fn log_failure(model: &str, e: &GenerationError) {
    match e.kind {
        GenerationErrorKind::RateLimited => {
            warn!(model, error = %e.message, "generator rate limited")
        }
        GenerationErrorKind::InvalidRequest => {
            warn!(model, error = %e.message, "generator rejected request")
        }
        GenerationErrorKind::Other => error!(model, error = %e.message, "generation failed"),
    }
}
