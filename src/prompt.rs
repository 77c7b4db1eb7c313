//! Prompt assembly
//!
//! Pure string composition: an agent spec's declarative fields become a single
//! system-level instruction block in a fixed order. The surrounding template
//! uses single braces as placeholder delimiters, so any literal braces in
//! embedded text (output schemas in particular) are escaped to a doubled form
//! and collapsed back at render time.

use crate::output::OutputContract;

/// Escape literal braces so they survive template rendering.
pub(crate) fn escape_braces(text: &str) -> String {
    text.replace('{', "{{").replace('}', "}}")
}

/// Assemble the system prompt for an agent.
///
/// Fixed order: purpose, "Do" block, "Do Not" block, "Additional Notes" block,
/// runtime-instructions placeholder, output-contract instructions. Empty
/// lists/text omit their block entirely.
pub fn assemble_system_prompt(
    purpose: &str,
    do_list: &[String],
    do_not_list: &[String],
    additional_notes: Option<&str>,
    contract: &OutputContract,
) -> String {
    let mut prompt = String::new();
    prompt.push_str(purpose);
    prompt.push_str("\n\n");

    if !do_list.is_empty() {
        prompt.push_str("Do:\n");
        for item in do_list {
            prompt.push_str("* ");
            prompt.push_str(item);
            prompt.push('\n');
        }
        prompt.push('\n');
    }

    if !do_not_list.is_empty() {
        prompt.push_str("Do Not:\n");
        for item in do_not_list {
            prompt.push_str("* ");
            prompt.push_str(item);
            prompt.push('\n');
        }
        prompt.push('\n');
    }

    if let Some(notes) = additional_notes {
        if !notes.is_empty() {
            prompt.push_str("Additional Notes:\n");
            prompt.push_str(notes);
            prompt.push_str("\n\n");
        }
    }

    prompt.push_str(
        "You may have additional instructions supplied at query time. If so, they will appear \
         here - but it's okay if none are provided.\n{additional_instructions}\n\n",
    );

    prompt.push_str(&contract.prompt_instructions());
    prompt
}

/// Render a template: substitute known `{name}` placeholders, then collapse
/// `{{` / `}}` back to literal braces.
///
/// Substituted values are inserted verbatim -- braces inside a runtime input
/// are never reinterpreted. Unknown placeholders are kept as-is so a typo
/// shows up in the transcript rather than vanishing silently.
pub(crate) fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let bytes = template.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'{' if bytes.get(i + 1) == Some(&b'{') => {
                out.push('{');
                i += 2;
            }
            b'}' if bytes.get(i + 1) == Some(&b'}') => {
                out.push('}');
                i += 2;
            }
            b'{' => {
                // Placeholder: read up to the matching single '}'.
                match template[i + 1..].find('}') {
                    Some(rel_end) => {
                        let name = &template[i + 1..i + 1 + rel_end];
                        match vars.iter().find(|(k, _)| *k == name) {
                            Some((_, value)) => out.push_str(value),
                            None => {
                                log::warn!("unknown placeholder '{{{}}}' left unfilled", name);
                                out.push('{');
                                out.push_str(name);
                                out.push('}');
                            }
                        }
                        i += rel_end + 2;
                    }
                    None => {
                        out.push('{');
                        i += 1;
                    }
                }
            }
            _ => {
                // Advance one full UTF-8 character.
                let ch_len = template[i..].chars().next().map(char::len_utf8).unwrap_or(1);
                out.push_str(&template[i..i + ch_len]);
                i += ch_len;
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn free_text() -> OutputContract {
        OutputContract::FreeText
    }

    #[test]
    fn test_purpose_appears_verbatim_once() {
        let prompt = assemble_system_prompt("Fix typos in prose.", &[], &[], None, &free_text());
        assert_eq!(prompt.matches("Fix typos in prose.").count(), 1);
        assert!(prompt.starts_with("Fix typos in prose."));
    }

    #[test]
    fn test_empty_blocks_are_omitted() {
        let prompt = assemble_system_prompt("P", &[], &[], None, &free_text());
        assert!(!prompt.contains("Do:"));
        assert!(!prompt.contains("Do Not:"));
        assert!(!prompt.contains("Additional Notes:"));
    }

    #[test]
    fn test_do_block_is_bulleted() {
        let prompt = assemble_system_prompt(
            "P",
            &["a".to_string()],
            &[],
            None,
            &free_text(),
        );
        assert!(prompt.contains("Do:\n* a"));
        assert!(!prompt.contains("Do Not:"));
    }

    #[test]
    fn test_notes_block() {
        let prompt =
            assemble_system_prompt("P", &[], &[], Some("Be gentle."), &free_text());
        assert!(prompt.contains("Additional Notes:\nBe gentle."));

        let prompt = assemble_system_prompt("P", &[], &[], Some(""), &free_text());
        assert!(!prompt.contains("Additional Notes:"));
    }

    #[test]
    fn test_structured_schema_braces_are_escaped() {
        let contract = OutputContract::structured(r#"{"k": string}"#);
        let prompt = assemble_system_prompt("P", &[], &[], None, &contract);
        assert!(prompt.contains(r#"{{"k": string}}"#));
    }

    #[test]
    fn test_render_substitutes_and_collapses() {
        let out = render("before {input} after {{literal}}", &[("input", "X")]);
        assert_eq!(out, "before X after {literal}");
    }

    #[test]
    fn test_render_keeps_unknown_placeholders() {
        let out = render("{nope}", &[]);
        assert_eq!(out, "{nope}");
    }

    #[test]
    fn test_render_does_not_reinterpret_substituted_braces() {
        let out = render("{input}", &[("input", r#"{"a": 1}"#)]);
        assert_eq!(out, r#"{"a": 1}"#);
    }

    #[test]
    fn test_escape_round_trip_through_render() {
        let schema = r#"{"k": "v"}"#;
        let rendered = render(&escape_braces(schema), &[]);
        assert_eq!(rendered, schema);
    }
}
