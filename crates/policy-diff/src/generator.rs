/// End-to-end comparison of two document versions.
///
/// Steps: validate both inputs, score and align sections, annotate every changed section
/// through the analysis chain (bounded concurrency, input order preserved), compare the
/// extracted entities along the same alignment, then compute statistics, major changes
/// and the executive summary. The chain always ends with the rule-based analyzer, so a
/// failing backend only degrades the affected section. The report is assembled only once
/// everything succeeded; cancellation yields an error, never a partial report.
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use futures::{stream, StreamExt, TryStreamExt};
use tracing::{debug, info, warn};

use crate::analysis::{AnalysisChain, ChangeRequest, RuleBasedAnalyzer};
use crate::config::DiffConfig;
use crate::error::DiffError;
use crate::extractor::StructuredExtractor;
use crate::matcher::{greedy_assign, position_distance, SemanticMatcher};
use crate::model::{
    Action, AnalysisSource, AnnotatedSection, ChangeStatistics, ChangeType, ComparisonReport,
    Deadline, Definition, DefinitionChange, DefinitionComparison, EntityChange, EntityComparison,
    ExtractedEntity, ImpactLevel, MajorChange, Requirement, Section, SectionMatch,
    StructuredComparison,
};
use crate::similarity::{lexical_matrix, normalize, LexicalScorer, ScoreMatrix, SectionScorer, TextProfile};
use crate::word_diff::match_diff;

const MAX_MAJOR_CHANGES: usize = 10;

pub struct DiffGenerator {
    extractor: Arc<StructuredExtractor>,
    matcher: SemanticMatcher,
    scorer: Arc<dyn SectionScorer>,
    chain: AnalysisChain,
    entity_match_threshold: f64,
    max_concurrency: usize,
    annotate_unchanged: bool,
}

impl DiffGenerator {
    /// A rule-based analyzer sharing `extractor` is appended unless the chain already ends
    /// with an infallible backend.
    pub fn new(
        config: &DiffConfig,
        extractor: Arc<StructuredExtractor>,
        chain: AnalysisChain,
    ) -> Result<Self, DiffError> {
        config.validate()?;
        let chain = if chain.ends_infallible() {
            chain
        } else {
            debug!(backends = ?chain.backends(), "appending rule-based analyzer to the chain");
            chain.with(Arc::new(RuleBasedAnalyzer::new(Arc::clone(&extractor))))
        };
        Ok(Self {
            matcher: SemanticMatcher::new(config.matcher, Arc::clone(&extractor)),
            scorer: Arc::new(LexicalScorer::new(config.matcher.title_weight)),
            extractor,
            chain,
            entity_match_threshold: config.entity_match_threshold,
            max_concurrency: config.max_concurrency,
            annotate_unchanged: config.annotate_unchanged,
        })
    }

    /// Replace the default lexical section scorer.
    pub fn with_scorer(mut self, scorer: Arc<dyn SectionScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn extract(&self, section: &Section) -> Vec<ExtractedEntity> {
        self.extractor.extract(section)
    }

    pub async fn compare(&self, a: &[Section], b: &[Section]) -> Result<ComparisonReport, DiffError> {
        self.compare_until(a, b, std::future::pending::<()>()).await
    }

    /// Like [`compare`](Self::compare), abandoning the work as soon as `cancel` completes.
    /// In-flight analysis calls are dropped.
    pub async fn compare_until<F>(
        &self,
        a: &[Section],
        b: &[Section],
        cancel: F,
    ) -> Result<ComparisonReport, DiffError>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            biased;
            _ = cancel => {
                info!("comparison cancelled");
                Err(DiffError::Cancelled)
            }
            report = self.run(a, b) => report,
        }
    }

    async fn run(&self, a: &[Section], b: &[Section]) -> Result<ComparisonReport, DiffError> {
        ensure_unique_indices("A", a)?;
        ensure_unique_indices("B", b)?;
        info!(
            sections_a = a.len(),
            sections_b = b.len(),
            backends = ?self.chain.backends(),
            "comparing documents"
        );

        let matches = self.align(a, b).await;
        let sections = self.annotate(matches).await?;
        let statistics = ChangeStatistics::from_sections(&sections);
        let structured = self.compare_structured(&sections);
        let major_changes = major_changes(&sections);

        let (executive_summary, executive_summary_source) = self
            .chain
            .summarize(&sections, &statistics)
            .await
            .map_err(|source| DiffError::AnalysisExhausted {
                context: "executive summary".to_string(),
                source,
            })?;

        let degraded_sections = sections
            .iter()
            .filter(|s| {
                s.analysis
                    .as_ref()
                    .is_some_and(|a| a.source == AnalysisSource::Fallback)
            })
            .count();
        if degraded_sections > 0 {
            warn!(degraded_sections, "sections analyzed by the fallback backend");
        }
        info!(
            unchanged = statistics.unchanged,
            modified = statistics.modified,
            added = statistics.added,
            removed = statistics.removed,
            "comparison complete"
        );

        Ok(ComparisonReport {
            sections,
            structured,
            statistics,
            major_changes,
            executive_summary,
            executive_summary_source,
            degraded_sections,
        })
    }

    async fn align(&self, a: &[Section], b: &[Section]) -> Vec<SectionMatch> {
        let scored = self
            .scorer
            .score(a, b)
            .await
            .and_then(|m| m.ensure_dims(a.len(), b.len()).map(|_| m));
        let scores = match scored {
            Ok(scores) => scores,
            Err(e) => {
                warn!(scorer = self.scorer.name(), error = %e, "section scoring failed, using lexical scores");
                lexical_matrix(a, b, self.matcher.config().title_weight)
            }
        };
        self.matcher
            .align_with_scores(a, b, &scores)
            .unwrap_or_else(|_| self.matcher.align(a, b))
    }

    async fn annotate(&self, matches: Vec<SectionMatch>) -> Result<Vec<AnnotatedSection>, DiffError> {
        let chain = &self.chain;
        let annotate_unchanged = self.annotate_unchanged;
        stream::iter(matches.into_iter().map(move |section_match| async move {
            let diff = match_diff(&section_match);
            if section_match.change_type == ChangeType::Unchanged && !annotate_unchanged {
                return Ok(AnnotatedSection {
                    section_match,
                    analysis: None,
                    diff,
                });
            }
            let request = ChangeRequest::from_match(&section_match);
            chain
                .analyze_change(&request)
                .await
                .map(|analysis| AnnotatedSection {
                    section_match,
                    analysis: Some(analysis),
                    diff,
                })
                .map_err(|source| DiffError::AnalysisExhausted {
                    context: request.title.clone(),
                    source,
                })
        }))
        .buffered(self.max_concurrency)
        .try_collect()
        .await
    }

    /// Entity-level comparison along the section alignment. Definitions are paired by
    /// term across the whole document; other entities are paired within each section pair.
    pub fn compare_structured(&self, sections: &[AnnotatedSection]) -> StructuredComparison {
        let mut structured = StructuredComparison::default();
        let mut definitions_a = Vec::new();
        let mut definitions_b = Vec::new();

        for section in sections {
            let before = section
                .section_match
                .section_a
                .as_ref()
                .map(|s| self.extractor.extract_grouped(s))
                .unwrap_or_default();
            let after = section
                .section_match
                .section_b
                .as_ref()
                .map(|s| self.extractor.extract_grouped(s))
                .unwrap_or_default();

            definitions_a.extend(before.definitions);
            definitions_b.extend(after.definitions);
            let threshold = self.entity_match_threshold;
            compare_entities(&before.requirements, &after.requirements, threshold, &mut structured.requirements);
            compare_entities(&before.actions, &after.actions, threshold, &mut structured.actions);
            compare_entities(&before.deadlines, &after.deadlines, threshold, &mut structured.deadlines);
        }

        structured.definitions = compare_definitions(definitions_a, definitions_b);
        structured.requirements.change_summary = entity_summary(&structured.requirements, "requirement");
        structured.actions.change_summary = entity_summary(&structured.actions, "action");
        structured.deadlines.change_summary = entity_summary(&structured.deadlines, "deadline");
        structured
    }
}

fn ensure_unique_indices(label: &str, sections: &[Section]) -> Result<(), DiffError> {
    let mut seen = HashSet::with_capacity(sections.len());
    for section in sections {
        if !seen.insert(section.index) {
            return Err(DiffError::MalformedInput(format!(
                "document {label} has more than one section with index {}",
                section.index
            )));
        }
    }
    Ok(())
}

/// Text an entity is aligned on.
trait AlignmentText {
    fn alignment_text(&self) -> String;
}

impl AlignmentText for Requirement {
    fn alignment_text(&self) -> String {
        self.requirement.clone()
    }
}

impl AlignmentText for Action {
    fn alignment_text(&self) -> String {
        format!("{} {}", self.responsible_party, self.action)
    }
}

impl AlignmentText for Deadline {
    fn alignment_text(&self) -> String {
        format!("{} {}", self.deadline, self.description)
    }
}

fn compare_entities<T>(before: &[T], after: &[T], threshold: f64, out: &mut EntityComparison<T>)
where
    T: AlignmentText + Clone + PartialEq,
{
    let profiles_a: Vec<TextProfile> = before.iter().map(|e| TextProfile::new(&e.alignment_text())).collect();
    let profiles_b: Vec<TextProfile> = after.iter().map(|e| TextProfile::new(&e.alignment_text())).collect();
    let scores = ScoreMatrix::from_fn(before.len(), after.len(), |i, j| profiles_a[i].similarity(&profiles_b[j]));

    let mut pairs = greedy_assign(&scores, threshold, |r1, c1, r2, c2| {
        position_distance(r1, c1).cmp(&position_distance(r2, c2))
    });
    pairs.sort_by_key(|p| p.row);

    let mut matched_a = vec![false; before.len()];
    let mut matched_b = vec![false; after.len()];
    for pair in pairs {
        matched_a[pair.row] = true;
        matched_b[pair.col] = true;
        let (old, new) = (&before[pair.row], &after[pair.col]);
        out.matched.push(EntityChange {
            before: old.clone(),
            after: new.clone(),
            similarity: pair.score,
            changed: old != new,
        });
    }
    out.removed.extend(
        before
            .iter()
            .zip(&matched_a)
            .filter(|(_, taken)| !**taken)
            .map(|(e, _)| e.clone()),
    );
    out.added.extend(
        after
            .iter()
            .zip(&matched_b)
            .filter(|(_, taken)| !**taken)
            .map(|(e, _)| e.clone()),
    );
}

fn entity_summary<T>(comparison: &EntityComparison<T>, noun: &str) -> String {
    format!(
        "{} {noun}(s) changed, {} added, {} removed, {} unchanged.",
        comparison.changed_count(),
        comparison.added.len(),
        comparison.removed.len(),
        comparison.matched.len() - comparison.changed_count()
    )
}

/// First definition per normalized term, in document order.
fn dedup_by_term(definitions: Vec<Definition>) -> Vec<Definition> {
    let mut seen = HashSet::new();
    definitions
        .into_iter()
        .filter(|d| seen.insert(d.key()))
        .collect()
}

fn compare_definitions(a: Vec<Definition>, b: Vec<Definition>) -> DefinitionComparison {
    let a = dedup_by_term(a);
    let b = dedup_by_term(b);
    let mut comparison = DefinitionComparison::default();

    for old in &a {
        match b.iter().find(|d| d.key() == old.key()) {
            Some(new) => comparison.matched.push(DefinitionChange {
                term: new.term.clone(),
                old_definition: old.definition.clone(),
                new_definition: new.definition.clone(),
                changed: normalize(&old.definition) != normalize(&new.definition),
            }),
            None => comparison.removed.push(old.clone()),
        }
    }
    let keys_a: HashSet<String> = a.iter().map(Definition::key).collect();
    comparison
        .added
        .extend(b.into_iter().filter(|d| !keys_a.contains(&d.key())));

    let changed = comparison.matched.iter().filter(|m| m.changed).count();
    comparison.change_summary = format!(
        "{changed} definition(s) changed, {} added, {} removed, {} unchanged.",
        comparison.added.len(),
        comparison.removed.len(),
        comparison.matched.len() - changed
    );
    comparison
}

/// High-impact changes, every added or removed section, and medium-impact
/// modifications; highest impact first, capped.
fn major_changes(sections: &[AnnotatedSection]) -> Vec<MajorChange> {
    let mut major: Vec<MajorChange> = sections
        .iter()
        .filter(|s| {
            let impact = s.impact_level();
            match s.change_type() {
                ChangeType::Added | ChangeType::Removed => true,
                ChangeType::Modified => impact >= Some(ImpactLevel::Medium),
                ChangeType::Unchanged => impact == Some(ImpactLevel::High),
            }
        })
        .map(|s| MajorChange {
            title: s.section_match.title(),
            change_type: s.change_type(),
            impact_level: s.impact_level(),
            summary: s
                .analysis
                .as_ref()
                .map(|a| a.summary.clone())
                .unwrap_or_default(),
        })
        .collect();
    major.sort_by(|x, y| y.impact_level.cmp(&x.impact_level));
    major.truncate(MAX_MAJOR_CHANGES);
    major
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::analysis::testing::FakeAnalyzer;
    use crate::analysis::RuleBasedAnalyzer;
    use crate::error::ScoringError;
    use crate::model::DiffKind;

    fn config() -> DiffConfig {
        DiffConfig {
            primary_timeout: Duration::from_secs(10),
            ..DiffConfig::default()
        }
    }

    fn generator_with(config: &DiffConfig, primary: Arc<FakeAnalyzer>) -> DiffGenerator {
        let extractor = Arc::new(StructuredExtractor::new());
        let chain = AnalysisChain::new(config.primary_timeout)
            .with(primary)
            .with(Arc::new(RuleBasedAnalyzer::new(Arc::clone(&extractor))));
        DiffGenerator::new(config, extractor, chain).unwrap()
    }

    fn degraded_generator() -> DiffGenerator {
        generator_with(&config(), Arc::new(FakeAnalyzer::failing(AnalysisSource::Primary)))
    }

    fn section(index: usize, title: &str, text: &str) -> Section {
        Section::new(index, Some(title), text)
    }

    #[tokio::test]
    async fn widened_definition_is_modified() {
        let a = vec![section(0, "Definitions", "Agency means any department of the state government.")];
        let b = vec![section(
            0,
            "Definitions",
            "Agency means any department of the state government and includes contractors.",
        )];
        let report = degraded_generator().compare(&a, &b).await.unwrap();

        assert_eq!(report.sections.len(), 1);
        assert_eq!(report.sections[0].change_type(), ChangeType::Modified);
        let similarity = report.sections[0].section_match.similarity;
        assert!(similarity > 0.5 && similarity < 0.95);

        let definitions = &report.structured.definitions;
        assert_eq!(definitions.matched.len(), 1);
        assert_eq!(definitions.matched[0].term, "Agency");
        assert!(definitions.matched[0].changed);
        assert!(definitions.added.is_empty() && definitions.removed.is_empty());

        assert_eq!(report.statistics.modified, 1);
        assert_eq!(report.degraded_sections, 1);
        assert!(!report.executive_summary.is_empty());
        assert_eq!(report.executive_summary_source, AnalysisSource::Fallback);

        let diff = &report.sections[0].diff;
        assert!(diff
            .iter()
            .any(|s| s.kind == DiffKind::Delete && s.text == "government."));
        assert!(diff
            .iter()
            .any(|s| s.kind == DiffKind::Insert && s.text.contains("includes contractors")));
    }

    #[tokio::test]
    async fn empty_a_reports_everything_added() {
        let b = vec![section(0, "Training", "Staff complete annual privacy training online.")];
        let report = degraded_generator().compare(&[], &b).await.unwrap();
        assert_eq!(report.sections.len(), 1);
        assert_eq!(report.sections[0].change_type(), ChangeType::Added);
        assert_eq!(report.statistics.added, 1);
        assert_eq!(report.statistics.total_sections, 1);
        assert_eq!(report.major_changes.len(), 1);
    }

    #[tokio::test]
    async fn both_empty_is_an_empty_report() {
        let report = degraded_generator().compare(&[], &[]).await.unwrap();
        assert!(report.sections.is_empty());
        assert_eq!(report.statistics, ChangeStatistics::default());
        assert!(report.major_changes.is_empty());
        assert_eq!(report.degraded_sections, 0);
    }

    #[tokio::test]
    async fn primary_outage_still_produces_a_complete_report() {
        let a = vec![
            section(0, "Scope", "This policy applies to all state agencies and contractors."),
            section(1, "Retention", "Records must be retained for seven years."),
            section(2, "Legacy", "Paper forms are accepted at the front desk."),
        ];
        let b = vec![
            section(0, "Scope", "This policy applies to all state agencies and grantees."),
            section(1, "Retention", "Records must be retained for ten years."),
            section(2, "Training", "Staff complete annual privacy training online."),
        ];
        let report = degraded_generator().compare(&a, &b).await.unwrap();

        let analyzed: Vec<_> = report.sections.iter().filter_map(|s| s.analysis.as_ref()).collect();
        assert_eq!(analyzed.len(), report.sections.len());
        assert!(analyzed.iter().all(|a| a.source == AnalysisSource::Fallback));
        assert_eq!(report.degraded_sections, report.sections.len());
        assert_eq!(
            report.statistics.total_sections,
            report.statistics.unchanged
                + report.statistics.modified
                + report.statistics.added
                + report.statistics.removed
        );
    }

    #[tokio::test]
    async fn unchanged_sections_are_not_analyzed_by_default() {
        let doc = vec![section(0, "Scope", "This policy applies to all state agencies.")];
        let primary = Arc::new(FakeAnalyzer::succeeding(AnalysisSource::Primary));
        let report = generator_with(&config(), primary.clone())
            .compare(&doc, &doc)
            .await
            .unwrap();
        assert_eq!(report.sections[0].change_type(), ChangeType::Unchanged);
        assert!(report.sections[0].analysis.is_none());
        assert_eq!(primary.calls(), 0);
        assert_eq!(report.statistics.percent_changed, 0.0);

        let annotating = DiffConfig {
            annotate_unchanged: true,
            ..config()
        };
        let report = generator_with(&annotating, primary.clone())
            .compare(&doc, &doc)
            .await
            .unwrap();
        assert!(report.sections[0].analysis.is_some());
        assert_eq!(primary.calls(), 1);
    }

    #[tokio::test]
    async fn slow_analyses_keep_input_order() {
        let a = vec![
            section(0, "Alpha", "First section about alpha topics."),
            section(1, "Beta", "Second section about beta topics."),
            section(2, "Gamma", "Third section about gamma topics."),
        ];
        let primary = Arc::new(FakeAnalyzer {
            delays: vec![("Alpha".to_string(), Duration::from_millis(100))],
            ..FakeAnalyzer::succeeding(AnalysisSource::Primary)
        });
        let report = generator_with(&config(), primary)
            .compare(&a, &[])
            .await
            .unwrap();
        let titles: Vec<String> = report.sections.iter().map(|s| s.section_match.title()).collect();
        assert_eq!(titles, vec!["Alpha", "Beta", "Gamma"]);
        assert!(report
            .sections
            .iter()
            .all(|s| s.analysis.as_ref().map(|a| a.source) == Some(AnalysisSource::Primary)));
        assert_eq!(report.degraded_sections, 0);
    }

    #[tokio::test]
    async fn cancellation_returns_cancelled() {
        let a = vec![section(0, "Scope", "Applies to everyone.")];
        let primary = Arc::new(FakeAnalyzer::slow(AnalysisSource::Primary, Duration::from_secs(5)));
        let generator = generator_with(&config(), primary);
        let err = generator
            .compare_until(&a, &[], tokio::time::sleep(Duration::from_millis(50)))
            .await
            .unwrap_err();
        assert!(matches!(err, DiffError::Cancelled));
    }

    #[tokio::test]
    async fn duplicate_indices_are_malformed() {
        let a = vec![section(0, "One", "x"), section(0, "Two", "y")];
        let err = degraded_generator().compare(&a, &[]).await.unwrap_err();
        assert!(matches!(err, DiffError::MalformedInput(_)));
    }

    #[tokio::test]
    async fn requirements_pair_within_sections() {
        let a = vec![section(0, "Filing", "Contractors must file quarterly reports.")];
        let b = vec![section(0, "Filing", "Contractors must file monthly reports.")];
        let report = degraded_generator().compare(&a, &b).await.unwrap();

        let requirements = &report.structured.requirements;
        assert_eq!(requirements.matched.len(), 1);
        assert!(requirements.matched[0].changed);
        assert!(requirements.matched[0].similarity >= 0.6);
        assert!(requirements.added.is_empty() && requirements.removed.is_empty());
        assert!(requirements.change_summary.starts_with("1 requirement(s) changed"));
    }

    #[tokio::test]
    async fn removed_section_entities_are_removed() {
        let a = vec![section(0, "Deadlines", "Each agency shall submit a report by March 1, 2025.")];
        let report = degraded_generator().compare(&a, &[]).await.unwrap();
        assert_eq!(report.structured.deadlines.removed.len(), 1);
        assert_eq!(report.structured.actions.removed.len(), 1);
        assert_eq!(report.major_changes[0].change_type, ChangeType::Removed);
        assert_eq!(report.major_changes[0].impact_level, Some(ImpactLevel::High));
    }

    struct BrokenScorer;

    #[async_trait]
    impl SectionScorer for BrokenScorer {
        fn name(&self) -> &'static str {
            "broken"
        }

        async fn score(&self, a: &[Section], _b: &[Section]) -> Result<ScoreMatrix, ScoringError> {
            Ok(ScoreMatrix::from_fn(a.len(), 0, |_, _| 1.0))
        }
    }

    #[tokio::test]
    async fn scorer_failure_falls_back_to_lexical() {
        let doc = vec![section(0, "Scope", "This policy applies to all state agencies.")];
        let generator = degraded_generator().with_scorer(Arc::new(BrokenScorer));
        let report = generator.compare(&doc, &doc).await.unwrap();
        assert_eq!(report.sections.len(), 1);
        assert_eq!(report.sections[0].change_type(), ChangeType::Unchanged);
    }

    #[tokio::test]
    async fn primary_only_chain_still_falls_back() {
        let a = vec![section(0, "Scope", "This policy applies to all state agencies.")];
        let chain = AnalysisChain::new(Duration::from_secs(1))
            .with(Arc::new(FakeAnalyzer::failing(AnalysisSource::Primary)));
        let generator = DiffGenerator::new(&config(), Arc::new(StructuredExtractor::new()), chain).unwrap();

        let report = generator.compare(&a, &[]).await.unwrap();
        assert_eq!(report.sections[0].change_type(), ChangeType::Removed);
        assert_eq!(
            report.sections[0].analysis.as_ref().map(|a| a.source),
            Some(AnalysisSource::Fallback)
        );
        assert_eq!(report.degraded_sections, 1);
        assert_eq!(report.executive_summary_source, AnalysisSource::Fallback);
    }

    #[tokio::test]
    async fn empty_chain_uses_rule_based_analysis() {
        let generator = DiffGenerator::new(
            &config(),
            Arc::new(StructuredExtractor::new()),
            AnalysisChain::new(Duration::from_secs(1)),
        )
        .unwrap();
        let b = vec![section(0, "Training", "Staff complete annual privacy training online.")];
        let report = generator.compare(&[], &b).await.unwrap();
        assert_eq!(report.degraded_sections, 1);
        assert!(report.sections[0].diff.iter().all(|s| s.kind == DiffKind::Insert));
    }

    #[tokio::test]
    async fn one_slow_section_degrades_alone() {
        let a = vec![
            section(0, "Alpha", "First section about alpha topics."),
            section(1, "Beta", "Second section about beta topics."),
            section(2, "Gamma", "Third section about gamma topics."),
        ];
        let config = DiffConfig {
            primary_timeout: Duration::from_millis(50),
            ..config()
        };
        let primary = Arc::new(FakeAnalyzer {
            delays: vec![("Beta".to_string(), Duration::from_secs(5))],
            ..FakeAnalyzer::succeeding(AnalysisSource::Primary)
        });
        let started = std::time::Instant::now();
        let report = generator_with(&config, primary).compare(&a, &[]).await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(2));

        let titles: Vec<String> = report.sections.iter().map(|s| s.section_match.title()).collect();
        assert_eq!(titles, vec!["Alpha", "Beta", "Gamma"]);
        let sources: Vec<_> = report
            .sections
            .iter()
            .map(|s| s.analysis.as_ref().map(|a| a.source))
            .collect();
        assert_eq!(
            sources,
            vec![
                Some(AnalysisSource::Primary),
                Some(AnalysisSource::Fallback),
                Some(AnalysisSource::Primary),
            ]
        );
        assert_eq!(report.degraded_sections, 1);
    }
}
