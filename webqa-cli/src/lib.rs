//! # webqa-cli
//!
//! The `webqa` command: ingest web pages into a persisted index, then ask
//! questions answered only from their content.
//!
//! ## Commands
//!
//! - `webqa ingest <URL>... [--file URL=PATH]`: fetch, chunk, embed and persist
//! - `webqa ask "<question>" [--json]`: answer with ranked sources
//! - `webqa reset`: clear the persisted index
//! - `webqa console`: interactive question loop with a session timeline

pub mod cli;
pub mod commands;
pub mod console;
pub mod fetch;
pub mod render;
pub mod telemetry;
