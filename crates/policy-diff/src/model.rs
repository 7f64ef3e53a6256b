use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One titled unit of a policy document, in source order.
///
/// Produced by ingestion (or [`crate::segment::segment_text`]) and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Section {
    /// Position of the section in its source document.
    pub index: usize,
    /// Heading text, when the source had one.
    pub title: Option<String>,
    /// Body text of the section.
    pub raw_text: String,
}

impl Section {
    pub fn new(index: usize, title: Option<&str>, raw_text: impl Into<String>) -> Self {
        Self {
            index,
            title: title.map(str::to_string),
            raw_text: raw_text.into(),
        }
    }

    /// Title for display, falling back to the section position.
    pub fn display_title(&self) -> String {
        match self.title.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => format!("Section {}", self.index + 1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Unchanged,
    Modified,
    Added,
    Removed,
}

impl ChangeType {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeType::Unchanged => "unchanged",
            ChangeType::Modified => "modified",
            ChangeType::Added => "added",
            ChangeType::Removed => "removed",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum ImpactLevel {
    Low,
    Medium,
    High,
}

impl ImpactLevel {
    /// Parse a model-produced label. Unknown labels are rejected rather than guessed.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "low" => Some(ImpactLevel::Low),
            "medium" | "moderate" => Some(ImpactLevel::Medium),
            "high" => Some(ImpactLevel::High),
            _ => None,
        }
    }

    pub fn raised(self) -> Self {
        match self {
            ImpactLevel::Low => ImpactLevel::Medium,
            ImpactLevel::Medium | ImpactLevel::High => ImpactLevel::High,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ImpactLevel::Low => "low",
            ImpactLevel::Medium => "medium",
            ImpactLevel::High => "high",
        }
    }
}

impl fmt::Display for ImpactLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Definition {
    pub term: String,
    pub definition: String,
}

impl Definition {
    /// Case-insensitive, whitespace-collapsed key used to pair definitions across versions.
    pub fn key(&self) -> String {
        crate::similarity::normalize(&self.term)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Requirement {
    pub requirement: String,
    pub priority: Priority,
    pub applies_to: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Action {
    pub action: String,
    pub responsible_party: String,
    pub timeline: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Deadline {
    pub deadline: String,
    pub description: String,
    pub consequence: String,
}

/// Placeholder for entity fields the text did not state.
pub const NOT_SPECIFIED: &str = "Not specified";

/// A typed fact pulled out of a section's text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ExtractedEntity {
    Definition(Definition),
    Requirement(Requirement),
    Action(Action),
    Deadline(Deadline),
}

/// Entities of one section, grouped by type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SectionEntities {
    pub definitions: Vec<Definition>,
    pub requirements: Vec<Requirement>,
    pub actions: Vec<Action>,
    pub deadlines: Vec<Deadline>,
}

impl SectionEntities {
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
            && self.requirements.is_empty()
            && self.actions.is_empty()
            && self.deadlines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.definitions.len() + self.requirements.len() + self.actions.len() + self.deadlines.len()
    }

    pub fn high_priority_requirements(&self) -> usize {
        self.requirements
            .iter()
            .filter(|r| r.priority == Priority::High)
            .count()
    }

    pub fn into_entities(self) -> Vec<ExtractedEntity> {
        let mut out = Vec::with_capacity(self.len());
        out.extend(self.definitions.into_iter().map(ExtractedEntity::Definition));
        out.extend(self.requirements.into_iter().map(ExtractedEntity::Requirement));
        out.extend(self.actions.into_iter().map(ExtractedEntity::Action));
        out.extend(self.deadlines.into_iter().map(ExtractedEntity::Deadline));
        out
    }
}

/// Alignment of at most one section from each version.
///
/// Both sides are present for `unchanged`/`modified`; exactly one is present for
/// `added`/`removed`, whose similarity is always `0.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SectionMatch {
    pub section_a: Option<Section>,
    pub section_b: Option<Section>,
    pub change_type: ChangeType,
    pub similarity: f64,
}

impl SectionMatch {
    pub fn paired(a: Section, b: Section, change_type: ChangeType, similarity: f64) -> Self {
        Self {
            section_a: Some(a),
            section_b: Some(b),
            change_type,
            similarity,
        }
    }

    pub fn removed(a: Section) -> Self {
        Self {
            section_a: Some(a),
            section_b: None,
            change_type: ChangeType::Removed,
            similarity: 0.0,
        }
    }

    pub fn added(b: Section) -> Self {
        Self {
            section_a: None,
            section_b: Some(b),
            change_type: ChangeType::Added,
            similarity: 0.0,
        }
    }

    /// Title of the newest version of the section.
    pub fn title(&self) -> String {
        self.section_b
            .as_ref()
            .or(self.section_a.as_ref())
            .map(Section::display_title)
            .unwrap_or_else(|| "Unnamed section".to_string())
    }

    pub fn text_a(&self) -> Option<&str> {
        self.section_a.as_ref().map(|s| s.raw_text.as_str())
    }

    pub fn text_b(&self) -> Option<&str> {
        self.section_b.as_ref().map(|s| s.raw_text.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisSource {
    Primary,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SectionAnalysis {
    pub summary: String,
    pub impact_level: Option<ImpactLevel>,
    pub stakeholder_impact: Option<String>,
    pub source: AnalysisSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DiffKind {
    Equal,
    Insert,
    Delete,
}

/// A run of text that is shared, inserted or deleted between the two versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DiffSpan {
    pub kind: DiffKind,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnnotatedSection {
    #[serde(flatten)]
    pub section_match: SectionMatch,
    pub analysis: Option<SectionAnalysis>,
    /// Word-level diff of the section text, A to B.
    pub diff: Vec<DiffSpan>,
}

impl AnnotatedSection {
    pub fn change_type(&self) -> ChangeType {
        self.section_match.change_type
    }

    pub fn impact_level(&self) -> Option<ImpactLevel> {
        self.analysis.as_ref().and_then(|a| a.impact_level)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DefinitionChange {
    pub term: String,
    pub old_definition: String,
    pub new_definition: String,
    pub changed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DefinitionComparison {
    pub matched: Vec<DefinitionChange>,
    pub added: Vec<Definition>,
    pub removed: Vec<Definition>,
    pub change_summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EntityChange<T> {
    pub before: T,
    pub after: T,
    pub similarity: f64,
    pub changed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EntityComparison<T> {
    pub matched: Vec<EntityChange<T>>,
    pub added: Vec<T>,
    pub removed: Vec<T>,
    pub change_summary: String,
}

impl<T> Default for EntityComparison<T> {
    fn default() -> Self {
        Self {
            matched: Vec::new(),
            added: Vec::new(),
            removed: Vec::new(),
            change_summary: String::new(),
        }
    }
}

impl<T> EntityComparison<T> {
    pub fn changed_count(&self) -> usize {
        self.matched.iter().filter(|m| m.changed).count()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StructuredComparison {
    pub definitions: DefinitionComparison,
    pub requirements: EntityComparison<Requirement>,
    pub actions: EntityComparison<Action>,
    pub deadlines: EntityComparison<Deadline>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ChangeStatistics {
    pub unchanged: usize,
    pub modified: usize,
    pub added: usize,
    pub removed: usize,
    pub total_sections: usize,
    pub high_impact: usize,
    pub medium_impact: usize,
    pub low_impact: usize,
    /// Share of report entries that are not `unchanged`, rounded to one decimal.
    pub percent_changed: f64,
}

impl ChangeStatistics {
    pub fn from_sections(sections: &[AnnotatedSection]) -> Self {
        let mut stats = Self {
            total_sections: sections.len(),
            ..Self::default()
        };
        for section in sections {
            match section.change_type() {
                ChangeType::Unchanged => stats.unchanged += 1,
                ChangeType::Modified => stats.modified += 1,
                ChangeType::Added => stats.added += 1,
                ChangeType::Removed => stats.removed += 1,
            }
            match section.impact_level() {
                Some(ImpactLevel::High) => stats.high_impact += 1,
                Some(ImpactLevel::Medium) => stats.medium_impact += 1,
                Some(ImpactLevel::Low) => stats.low_impact += 1,
                None => {}
            }
        }
        if stats.total_sections > 0 {
            let changed = (stats.total_sections - stats.unchanged) as f64;
            stats.percent_changed =
                (changed / stats.total_sections as f64 * 1000.0).round() / 10.0;
        }
        stats
    }

    pub fn changed(&self) -> usize {
        self.modified + self.added + self.removed
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MajorChange {
    pub title: String,
    pub change_type: ChangeType,
    pub impact_level: Option<ImpactLevel>,
    pub summary: String,
}

/// Complete result of one comparison. Built once and handed to the caller by value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ComparisonReport {
    pub sections: Vec<AnnotatedSection>,
    pub structured: StructuredComparison,
    pub statistics: ChangeStatistics,
    pub major_changes: Vec<MajorChange>,
    pub executive_summary: String,
    pub executive_summary_source: AnalysisSource,
    /// Number of section analyses produced by the fallback path.
    pub degraded_sections: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotated(change_type: ChangeType, impact: Option<ImpactLevel>) -> AnnotatedSection {
        let s = Section::new(0, Some("T"), "text");
        let section_match = match change_type {
            ChangeType::Added => SectionMatch::added(s),
            ChangeType::Removed => SectionMatch::removed(s),
            other => SectionMatch::paired(s.clone(), s, other, 1.0),
        };
        AnnotatedSection {
            section_match,
            analysis: impact.map(|level| SectionAnalysis {
                summary: String::new(),
                impact_level: Some(level),
                stakeholder_impact: None,
                source: AnalysisSource::Fallback,
            }),
            diff: Vec::new(),
        }
    }

    #[test]
    fn statistics_partition_by_change_type() {
        let sections = vec![
            annotated(ChangeType::Unchanged, None),
            annotated(ChangeType::Modified, Some(ImpactLevel::Low)),
            annotated(ChangeType::Added, Some(ImpactLevel::Medium)),
            annotated(ChangeType::Removed, Some(ImpactLevel::High)),
        ];
        let stats = ChangeStatistics::from_sections(&sections);
        assert_eq!(stats.unchanged, 1);
        assert_eq!(stats.modified, 1);
        assert_eq!(stats.added, 1);
        assert_eq!(stats.removed, 1);
        assert_eq!(stats.total_sections, 4);
        assert_eq!(stats.changed(), 3);
        assert_eq!((stats.high_impact, stats.medium_impact, stats.low_impact), (1, 1, 1));
        assert_eq!(stats.percent_changed, 75.0);
    }

    #[test]
    fn empty_statistics_are_zero() {
        let stats = ChangeStatistics::from_sections(&[]);
        assert_eq!(stats, ChangeStatistics::default());
    }

    #[test]
    fn impact_labels_parse_case_insensitively() {
        assert_eq!(ImpactLevel::parse(" HIGH "), Some(ImpactLevel::High));
        assert_eq!(ImpactLevel::parse("moderate"), Some(ImpactLevel::Medium));
        assert_eq!(ImpactLevel::parse("unknown"), None);
        assert_eq!(ImpactLevel::Low.raised(), ImpactLevel::Medium);
        assert_eq!(ImpactLevel::High.raised(), ImpactLevel::High);
    }

    #[test]
    fn entity_serializes_with_kind_tag() {
        let entity = ExtractedEntity::Definition(Definition {
            term: "Agency".to_string(),
            definition: "any department".to_string(),
        });
        let json = serde_json::to_value(&entity).unwrap();
        assert_eq!(json["kind"], "definition");
        assert_eq!(json["term"], "Agency");
    }

    #[test]
    fn display_title_falls_back_to_position() {
        assert_eq!(Section::new(2, None, "x").display_title(), "Section 3");
        assert_eq!(Section::new(0, Some("  "), "x").display_title(), "Section 1");
        assert_eq!(Section::new(0, Some("Scope"), "x").display_title(), "Scope");
    }
}
