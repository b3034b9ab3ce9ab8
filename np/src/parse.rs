//! Tolerant JSON extraction from generated text
//!
//! Generation output is free text that usually, but not always, contains the
//! JSON array that was asked for. `parse_json_list` runs a fixed decision
//! table and reports `Malformed` instead of erroring, so callers treat an
//! unparseable response as an empty result and move to their next fallback.
//!
//! | step | input shape                                   |
//! |------|-----------------------------------------------|
//! | 1    | whole (trimmed) text is a JSON array          |
//! | 2    | array inside a markdown code fence            |
//! | 3    | object whose single array-valued field is it  |
//! | 4    | first balanced `[...]` substring that parses  |
//! | -    | otherwise `Malformed`                         |

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

/// Tagged result of a tolerant parse
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome<T> {
    Parsed(T),
    Malformed,
}

impl<T> ParseOutcome<T> {
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed)
    }

    pub fn parsed(self) -> Option<T> {
        match self {
            Self::Parsed(value) => Some(value),
            Self::Malformed => None,
        }
    }
}

impl<T> ParseOutcome<Vec<T>> {
    /// Malformed output counts as an empty list
    pub fn into_list(self) -> Vec<T> {
        self.parsed().unwrap_or_default()
    }
}

/// Which row of the decision table matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStrategy {
    Strict,
    Fenced,
    Wrapped,
    Bracketed,
}

/// Parse a list of `T` out of generated text
///
/// Items that do not deserialize as `T` are skipped individually.
pub fn parse_json_list<T: DeserializeOwned>(text: &str) -> ParseOutcome<Vec<T>> {
    debug!(text_len = text.len(), "parse_json_list: called");
    let Some((strategy, items)) = extract_array(text) else {
        warn!(text_len = text.len(), "parse_json_list: no JSON array found");
        return ParseOutcome::Malformed;
    };

    let total = items.len();
    let parsed: Vec<T> = items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<T>(item) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!(error = %e, "parse_json_list: skipping item");
                None
            }
        })
        .collect();
    debug!(?strategy, total, kept = parsed.len(), "parse_json_list: parsed");
    ParseOutcome::Parsed(parsed)
}

/// Run the decision table, returning the raw array and the row that matched
pub fn extract_array(text: &str) -> Option<(ParseStrategy, Vec<Value>)> {
    let trimmed = text.trim();

    if let Some(items) = strict_array(trimmed) {
        return Some((ParseStrategy::Strict, items));
    }

    if let Some(inner) = strip_code_fence(trimmed)
        && let Some(items) = strict_array(inner)
    {
        return Some((ParseStrategy::Fenced, items));
    }

    let object_source = strip_code_fence(trimmed).unwrap_or(trimmed);
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(object_source) {
        let mut arrays = map.into_iter().filter_map(|(_, v)| match v {
            Value::Array(items) => Some(items),
            _ => None,
        });
        if let (Some(items), None) = (arrays.next(), arrays.next()) {
            return Some((ParseStrategy::Wrapped, items));
        }
    }

    let mut from = 0;
    while let Some((start, end)) = balanced_brackets(trimmed, from) {
        if let Some(items) = strict_array(&trimmed[start..=end]) {
            return Some((ParseStrategy::Bracketed, items));
        }
        from = start + 1;
    }

    None
}

fn strict_array(text: &str) -> Option<Vec<Value>> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Array(items)) => Some(items),
        _ => None,
    }
}

/// Contents of the first ``` fenced block, without the info string
fn strip_code_fence(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after_open = &text[open + 3..];
    let body_start = after_open.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after_open[body_start..];
    let close = body.find("```").unwrap_or(body.len());
    Some(body[..close].trim())
}

/// Byte range of the first `[` at or after `from` and its matching `]`
///
/// Brackets inside JSON strings are ignored.
fn balanced_brackets(text: &str, from: usize) -> Option<(usize, usize)> {
    let bytes = text.as_bytes();
    let start = from + text.get(from..)?.find('[')?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, &b) in bytes[start..].iter().enumerate() {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    return Some((start, start + offset));
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Town {
        name: String,
        #[serde(default)]
        population: Option<u64>,
    }

    fn names(outcome: ParseOutcome<Vec<Town>>) -> Vec<String> {
        outcome.into_list().into_iter().map(|t| t.name).collect()
    }

    #[test]
    fn test_strict_array() {
        let text = r#"[{"name": "Bač", "population": 6000}, {"name": "Golubac"}]"#;
        assert_eq!(names(parse_json_list(text)), vec!["Bač", "Golubac"]);
        assert_eq!(extract_array(text).unwrap().0, ParseStrategy::Strict);
    }

    #[test]
    fn test_code_fence() {
        let text = "Here you go:\n```json\n[{\"name\": \"Piran\"}]\n```\nEnjoy!";
        assert_eq!(names(parse_json_list(text)), vec!["Piran"]);
        assert_eq!(extract_array(text).unwrap().0, ParseStrategy::Fenced);
    }

    #[test]
    fn test_object_wrapper() {
        let text = r#"{"cities": [{"name": "Ston"}, {"name": "Motovun"}]}"#;
        assert_eq!(names(parse_json_list(text)), vec!["Ston", "Motovun"]);
        assert_eq!(extract_array(text).unwrap().0, ParseStrategy::Wrapped);
    }

    #[test]
    fn test_wrapper_with_two_arrays_is_ambiguous() {
        let text = r#"{"a": [{"name": "X"}], "b": [{"name": "Y"}]}"#;
        // Falls through to the bracket scan, which finds the first array
        let (strategy, items) = extract_array(text).unwrap();
        assert_eq!(strategy, ParseStrategy::Bracketed);
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_bracketed_substring_with_prose() {
        let text = "Sure! Towns [see below]: [{\"name\": \"Tokaj [wine]\"}] hope this helps";
        assert_eq!(names(parse_json_list(text)), vec!["Tokaj [wine]"]);
    }

    #[test]
    fn test_malformed() {
        assert!(parse_json_list::<Town>("I cannot help with that.").is_malformed());
        assert!(parse_json_list::<Town>("[{\"name\": \"Unclosed\"").is_malformed());
        assert!(parse_json_list::<Town>("").into_list().is_empty());
    }

    #[test]
    fn test_bad_items_skipped() {
        let text = r#"[{"name": "Telč"}, {"population": 5}, 42, {"name": "Mikulov"}]"#;
        assert_eq!(names(parse_json_list(text)), vec!["Telč", "Mikulov"]);
    }
}
