//! Structured-output extraction and repair
//!
//! Models frequently wrap JSON output in commentary or a code fence, and the
//! brace escaping in the prompt occasionally leaks back as a doubled outer
//! brace. Exactly those two classes of noise are tolerated here: boundary
//! trimming and double-brace compensation. Anything else is a hard failure so
//! callers can decide whether to retry.

use serde_json::Value;

use crate::error::AgentError;

/// Isolate the JSON object substring from raw model text.
///
/// Finds the first `{` and last `}`; if the text opens with `{{` and closes
/// with `}}`, the span is narrowed by one on each side to undo an echoed
/// escape. Missing boundaries are an [`AgentError::Extraction`].
pub fn extract_object(raw: &str) -> Result<&str, AgentError> {
    let trimmed = raw.trim();

    let start = trimmed.find('{').ok_or_else(|| AgentError::Extraction {
        raw: raw.to_string(),
    })?;
    let end = trimmed.rfind('}').ok_or_else(|| AgentError::Extraction {
        raw: raw.to_string(),
    })?;
    if end <= start {
        return Err(AgentError::Extraction {
            raw: raw.to_string(),
        });
    }

    if start == 0 && end == trimmed.len() - 1 {
        log::debug!("model output was a clean JSON object");
    }

    let bytes = trimmed.as_bytes();
    let (start, end) = if bytes.get(start + 1) == Some(&b'{')
        && end >= 1
        && bytes.get(end - 1) == Some(&b'}')
        && end - 1 > start + 1
    {
        // Doubled outer braces: an artifact of the prompt-side escaping.
        // Both sides must be doubled before narrowing; a one-sided double
        // cannot be an escape echo, and narrowing it would strip a brace
        // from an already-broken object.
        (start + 1, end - 1)
    } else {
        (start, end)
    };

    Ok(&trimmed[start..=end])
}

/// Extract and parse a JSON object from raw model text.
///
/// Parse failures carry the offending slice; they are not retried here.
pub fn structured_value(raw: &str) -> Result<Value, AgentError> {
    let slice = extract_object(raw)?;
    serde_json::from_str(slice).map_err(|source| AgentError::Parse {
        slice: slice.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_clean_object_passes_through() {
        let value = structured_value(r#"{"k": "v"}"#).unwrap();
        assert_eq!(value, json!({"k": "v"}));
    }

    #[test]
    fn test_surrounding_prose_is_trimmed() {
        let raw = "Sure! Here is the JSON you asked for:\n{\"k\": \"v\"}\nHope that helps.";
        assert_eq!(structured_value(raw).unwrap(), json!({"k": "v"}));
    }

    #[test]
    fn test_code_fence_is_trimmed() {
        let raw = "```json\n{\"k\": \"v\"}\n```";
        assert_eq!(structured_value(raw).unwrap(), json!({"k": "v"}));
    }

    #[test]
    fn test_double_brace_compensation() {
        let doubled = structured_value("{{\"a\":1}}").unwrap();
        let clean = structured_value("{\"a\":1}").unwrap();
        assert_eq!(doubled, clean);
    }

    #[test]
    fn test_one_sided_doubling_is_not_narrowed() {
        // Only the opening brace is doubled; the span must be left alone,
        // so the parse failure reports the full broken slice.
        let err = structured_value("{{\"a\":1}").unwrap_err();
        match err {
            AgentError::Parse { slice, .. } => assert_eq!(slice, "{{\"a\":1}"),
            other => panic!("expected Parse, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_objects_are_not_mistaken_for_doubling() {
        let raw = r#"{"outer": {"inner": 1}}"#;
        assert_eq!(
            structured_value(raw).unwrap(),
            json!({"outer": {"inner": 1}})
        );
    }

    #[test]
    fn test_extraction_is_idempotent_on_clean_input() {
        let clean = r#"{"k": "v"}"#;
        let wrapped = format!("prose before {} prose after", clean);
        assert_eq!(extract_object(clean).unwrap(), extract_object(&wrapped).unwrap());
    }

    #[test]
    fn test_missing_open_brace_is_extraction_error() {
        let err = structured_value("no braces here}").unwrap_err();
        match err {
            AgentError::Extraction { raw } => assert!(raw.contains("no braces")),
            other => panic!("expected Extraction, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_close_brace_is_extraction_error() {
        assert!(matches!(
            structured_value("{ still going"),
            Err(AgentError::Extraction { .. })
        ));
    }

    #[test]
    fn test_malformed_content_is_parse_error() {
        let err = structured_value("{not json}").unwrap_err();
        match err {
            AgentError::Parse { slice, .. } => assert_eq!(slice, "{not json}"),
            other => panic!("expected Parse, got {:?}", other),
        }
    }
}
