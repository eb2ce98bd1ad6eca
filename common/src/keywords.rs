use crate::api::{CreateOutlineJobRequest, KeywordInput};
use std::collections::HashSet;

pub const MAX_KEYWORDS_PER_BATCH: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeywordError {
    #[error("Enter at least one keyword")]
    Empty,
    #[error("Too many keywords: {count} given, at most {max} per batch")]
    TooMany { count: usize, max: usize },
}

/// Splits textarea-style input into keywords: one per line, trimmed,
/// blank lines dropped, duplicates removed keeping the first occurrence.
pub fn parse_keyword_lines(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| seen.insert(*line))
        .map(str::to_string)
        .collect()
}

/// Number of non-blank lines, duplicates included.
pub fn count_keyword_lines(text: &str) -> usize {
    text.lines().filter(|line| !line.trim().is_empty()).count()
}

/// Builds the outline job payload, rejecting batches that the server
/// would refuse before anything is sent.
///
/// The batch limit applies to the lines as entered; duplicates are only
/// dropped from the payload afterwards.
pub fn build_outline_request(
    text: &str,
    template_id: Option<String>,
) -> Result<CreateOutlineJobRequest, KeywordError> {
    let count = count_keyword_lines(text);
    if count == 0 {
        return Err(KeywordError::Empty);
    }
    if count > MAX_KEYWORDS_PER_BATCH {
        return Err(KeywordError::TooMany {
            count,
            max: MAX_KEYWORDS_PER_BATCH,
        });
    }
    let keywords = parse_keyword_lines(text);

    Ok(CreateOutlineJobRequest {
        keywords: keywords
            .into_iter()
            .map(|keyword| KeywordInput { keyword })
            .collect(),
        template_id: template_id.filter(|id| !id.trim().is_empty()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicates_removed_in_order() {
        assert_eq!(parse_keyword_lines("a\na\nb"), vec!["a", "b"]);
        assert_eq!(
            parse_keyword_lines("  seo audit \n\nbacklinks\r\nseo audit\n"),
            vec!["seo audit", "backlinks"]
        );
    }

    #[test]
    fn test_payload_from_duplicated_input() {
        let req = build_outline_request("a\na\nb", Some("tpl-1".into())).unwrap();
        let keywords: Vec<&str> = req.keywords.iter().map(|k| k.keyword.as_str()).collect();
        assert_eq!(keywords, vec!["a", "b"]);
        assert_eq!(req.template_id.as_deref(), Some("tpl-1"));
    }

    #[test]
    fn test_empty_batch_rejected() {
        assert_eq!(build_outline_request("", None), Err(KeywordError::Empty));
        assert_eq!(build_outline_request(" \n\t\n", None), Err(KeywordError::Empty));
    }

    #[test]
    fn test_batch_limit() {
        let fifty: String = (0..50).map(|i| format!("keyword {}\n", i)).collect();
        assert_eq!(build_outline_request(&fifty, None).unwrap().keywords.len(), 50);

        let fifty_one: String = (0..51).map(|i| format!("keyword {}\n", i)).collect();
        assert_eq!(
            build_outline_request(&fifty_one, None),
            Err(KeywordError::TooMany { count: 51, max: 50 })
        );
    }

    #[test]
    fn test_limit_counts_lines_before_dedupe() {
        let repeated: String = (0..50).map(|i| format!("keyword {}\n", i % 10)).collect();
        assert_eq!(build_outline_request(&repeated, None).unwrap().keywords.len(), 10);

        let repeated: String = (0..80).map(|i| format!("keyword {}\n", i % 10)).collect();
        assert_eq!(
            build_outline_request(&repeated, None),
            Err(KeywordError::TooMany { count: 80, max: 50 })
        );
    }

    #[test]
    fn test_fifty_one_lines_with_one_duplicate_rejected() {
        let mut text: String = (0..50).map(|i| format!("keyword {}\n", i)).collect();
        text.push_str("keyword 0\n\n  \n");
        assert_eq!(count_keyword_lines(&text), 51);
        assert_eq!(parse_keyword_lines(&text).len(), 50);
        assert_eq!(
            build_outline_request(&text, None),
            Err(KeywordError::TooMany { count: 51, max: 50 })
        );
    }

    #[test]
    fn test_blank_template_id_dropped() {
        let req = build_outline_request("a", Some("  ".into())).unwrap();
        assert!(req.template_id.is_none());
    }
}
