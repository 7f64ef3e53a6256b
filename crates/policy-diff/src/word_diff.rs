/// Word-level diff between two section texts.
///
/// Adjacent tokens of the same kind are merged, so the spans alternate. Concatenating the
/// equal and deleted spans gives the A text back; equal and inserted spans give B.
use similar::{ChangeTag, TextDiff};

use crate::model::{DiffKind, DiffSpan, SectionMatch};

pub fn word_diff(old: &str, new: &str) -> Vec<DiffSpan> {
    let diff = TextDiff::from_words(old, new);
    let mut spans: Vec<DiffSpan> = Vec::new();
    for change in diff.iter_all_changes() {
        let kind = match change.tag() {
            ChangeTag::Equal => DiffKind::Equal,
            ChangeTag::Insert => DiffKind::Insert,
            ChangeTag::Delete => DiffKind::Delete,
        };
        match spans.last_mut() {
            Some(last) if last.kind == kind => last.text.push_str(change.value()),
            _ => spans.push(DiffSpan {
                kind,
                text: change.value().to_string(),
            }),
        }
    }
    spans
}

/// Diff of a match; a missing side counts as empty text.
pub fn match_diff(section_match: &SectionMatch) -> Vec<DiffSpan> {
    word_diff(
        section_match.text_a().unwrap_or(""),
        section_match.text_b().unwrap_or(""),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Section;

    fn side(spans: &[DiffSpan], skip: DiffKind) -> String {
        spans
            .iter()
            .filter(|s| s.kind != skip)
            .map(|s| s.text.as_str())
            .collect()
    }

    #[test]
    fn widened_definition_shows_deleted_and_inserted_words() {
        let old = "Agency means any department of the state government.";
        let new = "Agency means any department of the state government and includes contractors.";
        let spans = word_diff(old, new);

        assert_eq!(spans[0].kind, DiffKind::Equal);
        assert!(spans[0].text.starts_with("Agency means any department"));
        let deleted: Vec<_> = spans.iter().filter(|s| s.kind == DiffKind::Delete).collect();
        let inserted: Vec<_> = spans.iter().filter(|s| s.kind == DiffKind::Insert).collect();
        assert_eq!(deleted.len(), 1);
        assert_eq!(deleted[0].text, "government.");
        assert_eq!(inserted.len(), 1);
        assert!(inserted[0].text.contains("includes contractors."));

        assert_eq!(side(&spans, DiffKind::Insert), old);
        assert_eq!(side(&spans, DiffKind::Delete), new);
    }

    #[test]
    fn adjacent_spans_never_share_a_kind() {
        let spans = word_diff("records kept seven years", "records kept ten years online");
        assert!(spans.windows(2).all(|w| w[0].kind != w[1].kind));
    }

    #[test]
    fn identical_text_is_one_equal_span() {
        let spans = word_diff("Applies to everyone.", "Applies to everyone.");
        assert_eq!(
            spans,
            vec![DiffSpan {
                kind: DiffKind::Equal,
                text: "Applies to everyone.".to_string()
            }]
        );
    }

    #[test]
    fn one_sided_matches_are_all_inserted_or_deleted() {
        let section = Section::new(0, Some("Scope"), "Applies to everyone.");
        let added = match_diff(&SectionMatch::added(section.clone()));
        assert!(added.iter().all(|s| s.kind == DiffKind::Insert));
        assert_eq!(side(&added, DiffKind::Delete), "Applies to everyone.");

        let removed = match_diff(&SectionMatch::removed(section));
        assert!(removed.iter().all(|s| s.kind == DiffKind::Delete));
        assert_eq!(side(&removed, DiffKind::Insert), "Applies to everyone.");
    }
}
