//! Source attribution for answers.

use crate::document::{SearchResult, Snippet, SourceAttribution};

/// Group ranked results by origin.
///
/// Sources appear once each, ordered by their best-ranked chunk. Each keeps at
/// most `snippets_per_source` snippets in rank order, truncated to
/// `snippet_chars` characters.
pub fn attribute_sources(
    results: &[SearchResult],
    snippets_per_source: usize,
    snippet_chars: usize,
) -> Vec<SourceAttribution> {
    let mut sources: Vec<SourceAttribution> = Vec::new();

    for result in results {
        let position = match sources.iter().position(|s| s.origin == result.chunk.origin) {
            Some(position) => position,
            None => {
                sources.push(SourceAttribution {
                    origin: result.chunk.origin.clone(),
                    snippets: Vec::new(),
                });
                sources.len() - 1
            }
        };

        let snippets = &mut sources[position].snippets;
        if snippets.len() < snippets_per_source {
            snippets.push(Snippet {
                text: preview(&result.chunk.text, snippet_chars),
                distance: result.distance,
            });
        }
    }

    sources
}

/// At most `max_chars` characters of `text`; a cut text ends with an ellipsis.
fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().nth(max_chars).is_none() {
        return text.to_string();
    }
    let Some(keep) = max_chars.checked_sub(1) else {
        return String::new();
    };
    let cut = text.char_indices().nth(keep).map_or(text.len(), |(i, _)| i);
    format!("{}…", text[..cut].trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Chunk;

    fn result(origin: &str, text: &str, distance: f32) -> SearchResult {
        SearchResult {
            chunk: Chunk {
                id: format!("{origin}#{text}"),
                origin: origin.into(),
                text: text.into(),
                index: 0,
                start: 0,
            },
            distance,
        }
    }

    #[test]
    fn deduplicates_and_orders_by_first_appearance() {
        let results = [
            result("https://b.test", "b1", 0.1),
            result("https://a.test", "a1", 0.2),
            result("https://b.test", "b2", 0.3),
        ];
        let sources = attribute_sources(&results, 2, 400);
        let origins: Vec<&str> = sources.iter().map(|s| s.origin.as_str()).collect();
        assert_eq!(origins, ["https://b.test", "https://a.test"]);
        assert_eq!(sources[0].snippets[0].text, "b1");
        assert_eq!(sources[0].snippets[1].text, "b2");
    }

    #[test]
    fn caps_snippets_per_source() {
        let results = [result("o", "1", 0.1), result("o", "2", 0.2), result("o", "3", 0.3)];
        let sources = attribute_sources(&results, 2, 400);
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].snippets.len(), 2);
        assert_eq!(sources[0].snippets[1].distance, 0.2);
    }

    #[test]
    fn truncates_long_snippets() {
        let sources = attribute_sources(&[result("o", &"x".repeat(500), 0.0)], 2, 400);
        let text = &sources[0].snippets[0].text;
        assert_eq!(text.chars().count(), 400);
        assert!(text.ends_with('…'));
    }

    #[test]
    fn preview_never_exceeds_the_limit() {
        assert_eq!(preview("exactly ten", 11), "exactly ten");
        assert_eq!(preview("héllo wörld", 6), "héllo…");
        assert_eq!(preview("abc", 1), "…");
        assert_eq!(preview("abc", 0), "");
    }

    #[test]
    fn empty_results_give_no_sources() {
        assert!(attribute_sources(&[], 2, 400).is_empty());
    }
}
