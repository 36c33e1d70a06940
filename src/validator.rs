//! Citation coverage validator.
//!
//! Enforces the claim-to-source rule over generated markdown: every
//! substantive paragraph must carry at least one citation marker, and every
//! marker must resolve to a known identifier.
//!
//! Markers:
//!   `[SRC:chunk_id]` internal source reference
//!   `[REF:ref_id]`   external literature reference

use std::collections::HashSet;

use regex::Regex;
use tracing::warn;

use crate::error::{Error, Result};

/// Appended to uncited substantive paragraphs by [`annotate_uncited`].
pub const INFERENCE_DISCLAIMER: &str = "*[Inference: no supporting source]*";

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub ok: bool,
    /// Previews (truncated to 80 chars) of paragraphs with no marker.
    pub uncited_paragraphs: Vec<String>,
    pub unknown_chunk_ids: Vec<String>,
    pub unknown_ref_ids: Vec<String>,
    pub messages: Vec<String>,
}

struct MarkerPatterns {
    source: Regex,
    reference: Regex,
    paragraph_break: Regex,
}

impl MarkerPatterns {
    fn new() -> Self {
        Self {
            source: Regex::new(r"\[SRC:([^\]]+)\]").expect("valid source marker regex"),
            reference: Regex::new(r"\[REF:([^\]]+)\]").expect("valid reference marker regex"),
            paragraph_break: Regex::new(r"\n{2,}").expect("valid paragraph break regex"),
        }
    }

    fn has_citation(&self, text: &str) -> bool {
        self.source.is_match(text) || self.reference.is_match(text)
    }

    fn captured_ids(regex: &Regex, text: &str) -> Vec<String> {
        regex
            .captures_iter(text)
            .map(|capture| capture[1].to_string())
            .collect()
    }
}

/// Append the inference disclaimer to every substantive paragraph that
/// carries no citation marker. Structural paragraphs and paragraphs with at
/// least one marker come back untouched.
pub fn annotate_uncited(text: &str) -> String {
    let patterns = MarkerPatterns::new();

    let mut annotated = Vec::<String>::new();
    for paragraph in patterns.paragraph_break.split(text) {
        if paragraph.trim().is_empty() {
            continue;
        }
        if is_structural(paragraph) || patterns.has_citation(paragraph) {
            annotated.push(paragraph.to_string());
        } else {
            annotated.push(format!(
                "{}\n{INFERENCE_DISCLAIMER}",
                paragraph.trim_end()
            ));
        }
    }
    annotated.join("\n\n")
}

/// Validate citation coverage in `report_text`.
///
/// With `scientific_mode` off the check is skipped entirely. A paragraph
/// citing only unknown identifiers still counts as cited; the unknown ids
/// are tracked separately. With `strict` set, any violation becomes
/// [`Error::Validation`] carrying all aggregated messages.
pub fn validate(
    report_text: &str,
    known_chunk_ids: &HashSet<String>,
    known_ref_ids: &HashSet<String>,
    scientific_mode: bool,
    strict: bool,
) -> Result<ValidationReport> {
    if !scientific_mode {
        return Ok(ValidationReport {
            ok: true,
            messages: vec!["scientific mode off; validation skipped".to_string()],
            ..ValidationReport::default()
        });
    }

    let patterns = MarkerPatterns::new();
    let mut uncited = Vec::<String>::new();
    let mut unknown_chunks = Vec::<String>::new();
    let mut unknown_refs = Vec::<String>::new();

    for paragraph in patterns.paragraph_break.split(report_text) {
        if paragraph.trim().is_empty() || is_structural(paragraph) {
            continue;
        }

        let chunk_ids = MarkerPatterns::captured_ids(&patterns.source, paragraph);
        let ref_ids = MarkerPatterns::captured_ids(&patterns.reference, paragraph);

        for id in &chunk_ids {
            if !known_chunk_ids.contains(id) {
                unknown_chunks.push(id.clone());
            }
        }
        for id in &ref_ids {
            if !known_ref_ids.contains(id) {
                unknown_refs.push(id.clone());
            }
        }

        if chunk_ids.is_empty() && ref_ids.is_empty() {
            uncited.push(preview(paragraph.trim()));
        }
    }

    let mut messages = Vec::<String>::new();
    let mut ok = true;

    if !uncited.is_empty() {
        ok = false;
        messages.push(format!("{} paragraph(s) without citation", uncited.len()));
        warn!(count = uncited.len(), "uncited paragraphs");
    }
    if !unknown_chunks.is_empty() {
        ok = false;
        messages.push(format!(
            "{} unknown internal source id(s): {:?}",
            unknown_chunks.len(),
            &unknown_chunks[..unknown_chunks.len().min(5)]
        ));
    }
    if !unknown_refs.is_empty() {
        ok = false;
        messages.push(format!(
            "{} unknown external reference id(s): {:?}",
            unknown_refs.len(),
            &unknown_refs[..unknown_refs.len().min(5)]
        ));
    }

    if !ok && strict {
        return Err(Error::Validation { messages });
    }

    Ok(ValidationReport {
        ok,
        uncited_paragraphs: uncited,
        unknown_chunk_ids: unknown_chunks,
        unknown_ref_ids: unknown_refs,
        messages,
    })
}

fn preview(paragraph: &str) -> String {
    if paragraph.chars().count() <= 80 {
        return paragraph.to_string();
    }
    let truncated = paragraph.chars().take(80).collect::<String>();
    format!("{truncated}…")
}

/// Headings, code blocks, tables, rules, list items, and already-annotated
/// paragraphs carry no claims of their own.
fn is_structural(paragraph: &str) -> bool {
    if paragraph.starts_with("    ") || paragraph.starts_with('\t') {
        return true;
    }

    let stripped = paragraph.trim_start();
    stripped.starts_with('#')
        || stripped.starts_with("```")
        || stripped.starts_with('|')
        || stripped.starts_with("---")
        || stripped.starts_with("===")
        || stripped.starts_with("- [")
        || stripped.starts_with("[Inference")
        || stripped.starts_with("*[Inference")
        || is_numbered_item(stripped)
        || is_bullet_item(stripped)
}

fn is_numbered_item(text: &str) -> bool {
    let rest = text.trim_start_matches(|character: char| character.is_ascii_digit());
    rest.len() < text.len() && rest.starts_with('.')
}

fn is_bullet_item(text: &str) -> bool {
    let mut characters = text.chars();
    matches!(characters.next(), Some('-' | '*'))
        && matches!(characters.next(), Some(character) if character.is_whitespace())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CITED: &str =
        "The API gateway authenticates every incoming request. [SRC:abc123def456]";
    const UNCITED: &str =
        "Microservices bring many advantages. Teams deploy independently and stay autonomous.";
    const HEADING: &str = "## 4. Results";
    const CODE_BLOCK: &str = "```rust\nprintln!(\"hello\");\n```";
    const BULLET: &str = "- point one\n- point two";

    fn ids(values: &[&str]) -> HashSet<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn annotate_marks_uncited_paragraphs() {
        let annotated = annotate_uncited(UNCITED);
        assert!(annotated.contains(INFERENCE_DISCLAIMER));
    }

    #[test]
    fn annotate_leaves_cited_paragraphs_unchanged() {
        assert_eq!(annotate_uncited(CITED), CITED);
    }

    #[test]
    fn annotate_skips_structural_paragraphs() {
        for structural in [HEADING, CODE_BLOCK, BULLET, "| a | b |", "---", "1. first"] {
            let annotated = annotate_uncited(structural);
            assert!(
                !annotated.contains(INFERENCE_DISCLAIMER),
                "{structural:?} must stay untouched"
            );
        }
    }

    #[test]
    fn annotate_appends_exactly_one_disclaimer_per_paragraph() {
        let annotated = annotate_uncited(UNCITED);
        assert_eq!(annotated.matches(INFERENCE_DISCLAIMER).count(), 1);
        assert!(annotated.starts_with(UNCITED));
    }

    #[test]
    fn annotate_handles_mixed_documents() {
        let text = format!("{HEADING}\n\n{CITED}\n\n{UNCITED}");
        let annotated = annotate_uncited(&text);

        assert_eq!(annotated.matches(INFERENCE_DISCLAIMER).count(), 1);
        assert!(annotated.contains(HEADING));
        assert!(annotated.contains(CITED));
    }

    #[test]
    fn fully_cited_report_passes() {
        let text = format!("{HEADING}\n\n{CITED}");
        let report = validate(&text, &ids(&["abc123def456"]), &ids(&[]), true, false).unwrap();
        assert!(report.ok);
        assert!(report.uncited_paragraphs.is_empty());
    }

    #[test]
    fn uncited_paragraph_fails() {
        let text = format!("{HEADING}\n\n{UNCITED}");
        let report = validate(&text, &ids(&[]), &ids(&[]), true, false).unwrap();
        assert!(!report.ok);
        assert_eq!(report.uncited_paragraphs.len(), 1);
    }

    #[test]
    fn scientific_mode_off_skips_validation() {
        let report = validate(UNCITED, &ids(&[]), &ids(&[]), false, false).unwrap();
        assert!(report.ok);
        assert!(report.uncited_paragraphs.is_empty());
    }

    #[test]
    fn unknown_chunk_id_is_tracked_but_not_uncited() {
        let text = format!("{HEADING}\n\n{CITED}");
        let report = validate(&text, &ids(&[]), &ids(&[]), true, false).unwrap();

        assert!(!report.ok);
        assert_eq!(report.unknown_chunk_ids, vec!["abc123def456"]);
        // The paragraph cites something, so it is not uncited.
        assert!(report.uncited_paragraphs.is_empty());
    }

    #[test]
    fn known_external_reference_passes() {
        let text = "Microservices are widely adopted. [REF:10.1234/test]";
        let report = validate(text, &ids(&[]), &ids(&["10.1234/test"]), true, false).unwrap();
        assert!(report.ok);
    }

    #[test]
    fn unknown_external_reference_is_tracked() {
        let text = "Widely reported in the literature. [REF:10.9999/missing]";
        let report = validate(text, &ids(&[]), &ids(&[]), true, false).unwrap();
        assert!(!report.ok);
        assert_eq!(report.unknown_ref_ids, vec!["10.9999/missing"]);
    }

    #[test]
    fn strict_mode_turns_violations_into_errors() {
        let text = format!("{HEADING}\n\n{UNCITED}");
        let err = validate(&text, &ids(&[]), &ids(&[]), true, true).unwrap_err();
        let Error::Validation { messages } = err else {
            panic!("expected a validation error");
        };
        assert!(!messages.is_empty());

        // The identical call without strict returns the report instead.
        let report = validate(&text, &ids(&[]), &ids(&[]), true, false).unwrap();
        assert!(!report.ok);
    }

    #[test]
    fn multiple_uncited_paragraphs_are_all_reported() {
        let text = [HEADING, CITED, UNCITED, "Another unsupported claim."].join("\n\n");
        let report = validate(&text, &ids(&["abc123def456"]), &ids(&[]), true, false).unwrap();
        assert!(!report.ok);
        assert_eq!(report.uncited_paragraphs.len(), 2);
    }

    #[test]
    fn long_paragraph_previews_are_truncated() {
        let long_paragraph = "word ".repeat(40);
        let report = validate(&long_paragraph, &ids(&[]), &ids(&[]), true, false).unwrap();
        let preview = &report.uncited_paragraphs[0];
        assert_eq!(preview.chars().count(), 81);
        assert!(preview.ends_with('…'));
    }
}
