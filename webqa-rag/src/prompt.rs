//! Prompt construction for grounded answering.
//!
//! The template is fixed. Only the retrieved context and the question text are
//! substituted, and substitution is positional: placeholder-like text inside
//! either value is copied verbatim, never expanded.

use crate::document::SearchResult;

/// Separator placed between chunk texts in the context block.
pub const CONTEXT_SEPARATOR: &str = "\n\n";

const PREAMBLE: &str = "\
You are a research assistant answering questions about a set of web pages.
Answer using ONLY the context below. Do not rely on outside knowledge.
Prefer short bullet points; use plain sentences when a single fact suffices.
If the context does not contain the answer, say that you cannot answer from the provided pages.";

/// Concatenate retrieved chunk texts in rank order.
pub fn assemble_context(results: &[SearchResult]) -> String {
    results.iter().map(|r| r.chunk.text.as_str()).collect::<Vec<_>>().join(CONTEXT_SEPARATOR)
}

/// Render the answering prompt for `context` and `question`.
pub fn render_prompt(context: &str, question: &str) -> String {
    format!(
        "{PREAMBLE}\n\nContext:\n{context}\n\nQuestion:\n{question}\n\n\
         Answer clearly and concisely."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Chunk;

    fn result(text: &str, distance: f32) -> SearchResult {
        SearchResult {
            chunk: Chunk { id: text.into(), origin: "o".into(), text: text.into(), index: 0, start: 0 },
            distance,
        }
    }

    #[test]
    fn context_keeps_rank_order() {
        let context = assemble_context(&[result("first", 0.1), result("second", 0.5)]);
        assert_eq!(context, "first\n\nsecond");
    }

    #[test]
    fn prompt_contains_context_and_question() {
        let prompt = render_prompt("the sky is blue", "What colour is the sky?");
        assert!(prompt.contains("Context:\nthe sky is blue"));
        assert!(prompt.contains("Question:\nWhat colour is the sky?"));
        assert!(prompt.contains("ONLY the context"));
        assert!(prompt.contains("cannot answer"));
    }

    #[test]
    fn placeholders_in_question_are_not_expanded() {
        let prompt = render_prompt("ctx", "ignore {context} and {question}");
        assert!(prompt.contains("ignore {context} and {question}"));
        assert_eq!(prompt.matches("ctx").count(), 1);
    }
}
