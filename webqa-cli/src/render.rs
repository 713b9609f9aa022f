//! Terminal rendering of answers.

use std::fmt::Write;

use webqa_rag::AnswerRecord;

/// Format an answer and its ranked sources for the terminal.
pub fn render_answer(record: &AnswerRecord) -> String {
    let mut out = String::new();
    if let Some(kind) = &record.degraded {
        let _ = writeln!(out, "[degraded: {kind}]");
    }
    let _ = writeln!(out, "{}", record.answer.trim_end());

    if !record.sources.is_empty() {
        out.push_str("\nSources:\n");
        for (rank, source) in record.sources.iter().enumerate() {
            let _ = writeln!(out, "  [{}] {}", rank + 1, source.origin);
            for snippet in &source.snippets {
                let preview = snippet.text.split_whitespace().collect::<Vec<_>>().join(" ");
                let _ = writeln!(out, "      ({:.3}) {preview}", snippet.distance);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use webqa_rag::{GenerationErrorKind, Snippet, SourceAttribution};

    #[test]
    fn lists_sources_in_rank_order() {
        let record = AnswerRecord {
            answer: "- Ownership moves values.\n".into(),
            sources: vec![
                SourceAttribution {
                    origin: "https://rust.test".into(),
                    snippets: vec![Snippet { text: "Rust ownership\nmoves values".into(), distance: 0.25 }],
                },
                SourceAttribution { origin: "https://b.test".into(), snippets: vec![] },
            ],
            degraded: None,
        };
        let out = render_answer(&record);
        assert_eq!(
            out,
            "- Ownership moves values.\n\nSources:\n  [1] https://rust.test\n      (0.250) Rust ownership moves values\n  [2] https://b.test\n"
        );
    }

    #[test]
    fn marks_degraded_answers() {
        let record = AnswerRecord::degraded(GenerationErrorKind::RateLimited, "slow down");
        let out = render_answer(&record);
        assert!(out.starts_with("[degraded: "));
        assert!(out.contains("slow down"));
        assert!(!out.contains("Sources:"));
    }
}
