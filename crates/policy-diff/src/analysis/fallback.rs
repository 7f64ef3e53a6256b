/// Deterministic rule-based analysis. Needs no network and never fails, so it is the
/// last entry of every analysis chain.
///
/// Summaries come from a sentence-level diff and word counts; impact comes from the size
/// of the change, raised when high-priority requirements appear, disappear or change.
use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;

use super::{AnalysisError, ChangeAnalyzer, ChangeRequest};
use crate::extractor::{split_sentences, StructuredExtractor};
use crate::model::{
    AnalysisSource, AnnotatedSection, ChangeStatistics, ChangeType, ImpactLevel, SectionAnalysis,
    SectionEntities,
};

const PREVIEW_CHARS: usize = 100;
const HIGH_WORD_DELTA: usize = 100;
const MEDIUM_WORD_DELTA: usize = 20;
const SUMMARY_HIGHLIGHTS: usize = 3;

pub const UNCHANGED_SUMMARY: &str = "No changes detected in this section.";

/// What a modification mostly touched, in the order of precedence used to describe it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChangeCategory {
    Requirements,
    Definitions,
    Procedural,
    Other,
}

pub struct RuleBasedAnalyzer {
    extractor: Arc<StructuredExtractor>,
}

impl RuleBasedAnalyzer {
    pub fn new(extractor: Arc<StructuredExtractor>) -> Self {
        Self { extractor }
    }

    pub fn analyze(&self, request: &ChangeRequest) -> SectionAnalysis {
        let before = request.text_a.as_deref().unwrap_or("");
        let after = request.text_b.as_deref().unwrap_or("");
        let (summary, impact_level, stakeholder_impact) = match request.change_type {
            ChangeType::Unchanged => (
                UNCHANGED_SUMMARY.to_string(),
                ImpactLevel::Low,
                "None".to_string(),
            ),
            ChangeType::Added => self.describe_added(after),
            ChangeType::Removed => self.describe_removed(before),
            ChangeType::Modified => self.describe_modified(before, after),
        };
        SectionAnalysis {
            summary,
            impact_level: Some(impact_level),
            stakeholder_impact: Some(stakeholder_impact),
            source: AnalysisSource::Fallback,
        }
    }

    fn describe_added(&self, text: &str) -> (String, ImpactLevel, String) {
        let entities = self.extractor.extract_text(text);
        let mut impact = ImpactLevel::Medium;
        if entities.high_priority_requirements() > 0 {
            impact = impact.raised();
        }
        let summary = format!(
            "New section added with {} words. Starts with: {}",
            word_count(text),
            preview(text)
        );
        let stakeholders = if entities.requirements.is_empty() {
            "New content; affected parties should review it.".to_string()
        } else {
            format!(
                "Introduces {} requirement(s) affecting {}.",
                entities.requirements.len(),
                parties(&entities)
            )
        };
        (summary, impact, stakeholders)
    }

    fn describe_removed(&self, text: &str) -> (String, ImpactLevel, String) {
        let entities = self.extractor.extract_text(text);
        let summary = format!(
            "Section removed ({} words). Previously started with: {}",
            word_count(text),
            preview(text)
        );
        let stakeholders = if entities.requirements.is_empty() {
            "Guidance in this section no longer applies.".to_string()
        } else {
            format!(
                "{} requirement(s) no longer apply to {}.",
                entities.requirements.len(),
                parties(&entities)
            )
        };
        (summary, ImpactLevel::High, stakeholders)
    }

    fn describe_modified(&self, before: &str, after: &str) -> (String, ImpactLevel, String) {
        let old: Vec<String> = split_sentences(before);
        let new: Vec<String> = split_sentences(after);
        let old_set: HashSet<&str> = old.iter().map(String::as_str).collect();
        let new_set: HashSet<&str> = new.iter().map(String::as_str).collect();
        let added = new.iter().filter(|s| !old_set.contains(s.as_str())).count();
        let removed = old.iter().filter(|s| !new_set.contains(s.as_str())).count();

        let kind = match (added, removed) {
            (a, 0) if a > 0 => "Content added",
            (0, r) if r > 0 => "Content removed",
            _ => "Content modified",
        };
        let summary = format!(
            "{kind}. Approximately {added} sentence(s) added, {removed} removed."
        );

        let delta = word_count(before).abs_diff(word_count(after));
        let mut impact = if delta > HIGH_WORD_DELTA {
            ImpactLevel::High
        } else if delta > MEDIUM_WORD_DELTA {
            ImpactLevel::Medium
        } else {
            ImpactLevel::Low
        };

        let entities_a = self.extractor.extract_text(before);
        let entities_b = self.extractor.extract_text(after);
        if entities_a.high_priority_requirements() != entities_b.high_priority_requirements() {
            impact = impact.raised();
        }

        let stakeholders = match categorize(&entities_a, &entities_b) {
            ChangeCategory::Requirements => {
                let current = if entities_b.requirements.is_empty() {
                    &entities_a
                } else {
                    &entities_b
                };
                format!("Obligations changed for {}.", parties(current))
            }
            ChangeCategory::Definitions => {
                "Changed definitions can alter who and what this policy covers.".to_string()
            }
            ChangeCategory::Procedural => {
                "Responsible parties may need to adjust procedures or timelines.".to_string()
            }
            ChangeCategory::Other => "Readers of this section should review the revised wording.".to_string(),
        };
        (summary, impact, stakeholders)
    }

    pub fn summary(&self, sections: &[AnnotatedSection], statistics: &ChangeStatistics) -> String {
        let mut lines = Vec::new();
        if statistics.changed() == 0 {
            lines.push(format!(
                "No substantive changes between the two versions across {} section(s).",
                statistics.total_sections
            ));
            return lines.join("\n");
        }

        lines.push(format!(
            "Compared {} section(s): {} modified, {} added, {} removed, {} unchanged.",
            statistics.total_sections,
            statistics.modified,
            statistics.added,
            statistics.removed,
            statistics.unchanged
        ));
        lines.push(format!(
            "Impact: {} high, {} medium, {} low.",
            statistics.high_impact, statistics.medium_impact, statistics.low_impact
        ));
        lines.push(format!("Change rate: {:.1}%.", statistics.percent_changed));

        let highlights: Vec<String> = sections
            .iter()
            .filter(|s| s.impact_level() == Some(ImpactLevel::High))
            .take(SUMMARY_HIGHLIGHTS)
            .map(|s| format!("{} ({})", s.section_match.title(), s.change_type()))
            .collect();
        if !highlights.is_empty() {
            lines.push(format!("Most significant: {}.", highlights.join(", ")));
        }
        lines.join("\n")
    }
}

#[async_trait]
impl ChangeAnalyzer for RuleBasedAnalyzer {
    fn name(&self) -> &'static str {
        "rule-based"
    }

    fn source(&self) -> AnalysisSource {
        AnalysisSource::Fallback
    }

    fn infallible(&self) -> bool {
        true
    }

    async fn analyze_change(&self, request: &ChangeRequest) -> Result<SectionAnalysis, AnalysisError> {
        Ok(self.analyze(request))
    }

    async fn summarize(
        &self,
        sections: &[AnnotatedSection],
        statistics: &ChangeStatistics,
    ) -> Result<String, AnalysisError> {
        Ok(self.summary(sections, statistics))
    }
}

fn categorize(a: &SectionEntities, b: &SectionEntities) -> ChangeCategory {
    if a.requirements != b.requirements {
        ChangeCategory::Requirements
    } else if a.definitions != b.definitions {
        ChangeCategory::Definitions
    } else if a.actions != b.actions || a.deadlines != b.deadlines {
        ChangeCategory::Procedural
    } else {
        ChangeCategory::Other
    }
}

/// Distinct `applies_to` values of the requirements, in order of first appearance.
fn parties(entities: &SectionEntities) -> String {
    let mut seen = Vec::new();
    for requirement in &entities.requirements {
        if !seen.contains(&requirement.applies_to.as_str()) {
            seen.push(requirement.applies_to.as_str());
        }
    }
    if seen.is_empty() {
        "All parties".to_string()
    } else {
        seen.join(", ")
    }
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

fn preview(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match collapsed.char_indices().nth(PREVIEW_CHARS) {
        Some((idx, _)) => format!("{}...", &collapsed[..idx]),
        None => collapsed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyzer() -> RuleBasedAnalyzer {
        RuleBasedAnalyzer::new(Arc::new(StructuredExtractor::new()))
    }

    fn request(change_type: ChangeType, a: Option<&str>, b: Option<&str>) -> ChangeRequest {
        ChangeRequest {
            change_type,
            title: "Reporting".to_string(),
            text_a: a.map(str::to_string),
            text_b: b.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn never_fails_for_any_change_type() {
        let analyzer = analyzer();
        for change_type in [
            ChangeType::Unchanged,
            ChangeType::Modified,
            ChangeType::Added,
            ChangeType::Removed,
        ] {
            for (a, b) in [(None, None), (Some(""), Some("")), (Some("x y"), Some("x z"))] {
                let analysis = analyzer.analyze_change(&request(change_type, a, b)).await.unwrap();
                assert_eq!(analysis.source, AnalysisSource::Fallback);
                assert!(!analysis.summary.is_empty());
                assert!(analysis.impact_level.is_some());
            }
        }
    }

    #[test]
    fn removed_sections_are_high_impact() {
        let analysis = analyzer().analyze(&request(
            ChangeType::Removed,
            Some("Contractors must file quarterly reports."),
            None,
        ));
        assert_eq!(analysis.impact_level, Some(ImpactLevel::High));
        assert!(analysis.summary.starts_with("Section removed (5 words)"));
        assert_eq!(
            analysis.stakeholder_impact.as_deref(),
            Some("1 requirement(s) no longer apply to Contractors.")
        );
    }

    #[test]
    fn added_sections_start_at_medium() {
        let analysis = analyzer().analyze(&request(
            ChangeType::Added,
            None,
            Some("Staff complete annual privacy training online."),
        ));
        assert_eq!(analysis.impact_level, Some(ImpactLevel::Medium));
        assert!(analysis
            .summary
            .ends_with("Starts with: Staff complete annual privacy training online."));
    }

    #[test]
    fn added_prohibition_is_raised_to_high() {
        let analysis = analyzer().analyze(&request(
            ChangeType::Added,
            None,
            Some("Contractors must not disclose personal records."),
        ));
        assert_eq!(analysis.impact_level, Some(ImpactLevel::High));
    }

    #[test]
    fn small_definition_edit_is_low_impact() {
        let analysis = analyzer().analyze(&request(
            ChangeType::Modified,
            Some("Agency means any department of the state government."),
            Some("Agency means any department of the state government and includes contractors."),
        ));
        assert_eq!(analysis.impact_level, Some(ImpactLevel::Low));
        assert_eq!(
            analysis.summary,
            "Content modified. Approximately 1 sentence(s) added, 1 removed."
        );
        assert_eq!(
            analysis.stakeholder_impact.as_deref(),
            Some("Changed definitions can alter who and what this policy covers.")
        );
    }

    #[test]
    fn appended_sentence_is_content_added() {
        let analysis = analyzer().analyze(&request(
            ChangeType::Modified,
            Some("Records are kept on site."),
            Some("Records are kept on site. Copies are stored offsite."),
        ));
        assert!(analysis.summary.starts_with("Content added. Approximately 1 sentence(s) added, 0 removed."));
    }

    #[test]
    fn large_rewrite_is_high_impact() {
        let long = "word ".repeat(150);
        let analysis = analyzer().analyze(&request(ChangeType::Modified, Some("short text"), Some(&long)));
        assert_eq!(analysis.impact_level, Some(ImpactLevel::High));
    }

    #[test]
    fn unchanged_summary_is_fixed() {
        let analysis = analyzer().analyze(&request(ChangeType::Unchanged, Some("x"), Some("x")));
        assert_eq!(analysis.summary, UNCHANGED_SUMMARY);
        assert_eq!(analysis.impact_level, Some(ImpactLevel::Low));
    }

    #[test]
    fn summary_reports_counts_and_rate() {
        let stats = ChangeStatistics {
            unchanged: 1,
            modified: 1,
            added: 0,
            removed: 0,
            total_sections: 2,
            high_impact: 0,
            medium_impact: 0,
            low_impact: 1,
            percent_changed: 50.0,
        };
        let text = analyzer().summary(&[], &stats);
        assert!(text.contains("Compared 2 section(s): 1 modified, 0 added, 0 removed, 1 unchanged."));
        assert!(text.contains("Change rate: 50.0%."));

        let none = analyzer().summary(&[], &ChangeStatistics::default());
        assert!(none.starts_with("No substantive changes"));
    }
}
