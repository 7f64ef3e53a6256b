/// Section alignment between two document versions.
///
/// Pairs are chosen greedily: every candidate pair scoring at least `match_threshold` is
/// ranked by score and claimed highest first, each section at most once. This is not a
/// globally optimal assignment. Sections left unclaimed on the A side are `removed`, on the
/// B side `added`. Output lists A's sections in document order, then the added B sections
/// in B order.
use std::cmp::Ordering;
use std::sync::Arc;

use tracing::debug;

use crate::error::ScoringError;
use crate::extractor::StructuredExtractor;
use crate::model::{ChangeType, Section, SectionMatch};
use crate::similarity::{lexical_matrix, ScoreMatrix};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatcherConfig {
    /// Minimum score for two sections to be paired at all.
    pub match_threshold: f64,
    /// Minimum score for a pair to be reported `unchanged` (entities must also agree).
    pub unchanged_threshold: f64,
    /// Weight of title overlap in the blended lexical score.
    pub title_weight: f64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            match_threshold: 0.5,
            unchanged_threshold: 0.95,
            title_weight: 0.2,
        }
    }
}

/// One claimed pair from [`greedy_assign`]: row, column and score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Assignment {
    pub row: usize,
    pub col: usize,
    pub score: f64,
}

/// Greedy one-to-one assignment over a score matrix.
///
/// Candidates at or above `threshold` are taken highest score first. Equal scores are
/// ordered by `tie_break`, then by row and column so the result never depends on sort
/// stability.
pub(crate) fn greedy_assign(
    scores: &ScoreMatrix,
    threshold: f64,
    mut tie_break: impl FnMut(usize, usize, usize, usize) -> Ordering,
) -> Vec<Assignment> {
    let (rows, cols) = scores.dims();
    let mut candidates = Vec::new();
    for row in 0..rows {
        for col in 0..cols {
            let score = scores.get(row, col);
            if score >= threshold {
                candidates.push(Assignment { row, col, score });
            }
        }
    }

    candidates.sort_by(|x, y| {
        y.score
            .total_cmp(&x.score)
            .then_with(|| tie_break(x.row, x.col, y.row, y.col))
            .then_with(|| x.row.cmp(&y.row))
            .then_with(|| x.col.cmp(&y.col))
    });

    let mut row_taken = vec![false; rows];
    let mut col_taken = vec![false; cols];
    let mut out = Vec::new();
    for candidate in candidates {
        if row_taken[candidate.row] || col_taken[candidate.col] {
            continue;
        }
        row_taken[candidate.row] = true;
        col_taken[candidate.col] = true;
        out.push(candidate);
    }
    out
}

/// Ties on score prefer pairs whose list positions are closer.
pub(crate) fn position_distance(row: usize, col: usize) -> usize {
    row.abs_diff(col)
}

pub struct SemanticMatcher {
    config: MatcherConfig,
    extractor: Arc<StructuredExtractor>,
}

impl SemanticMatcher {
    pub fn new(config: MatcherConfig, extractor: Arc<StructuredExtractor>) -> Self {
        Self { config, extractor }
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Align using the built-in lexical scores.
    pub fn align(&self, a: &[Section], b: &[Section]) -> Vec<SectionMatch> {
        let scores = lexical_matrix(a, b, self.config.title_weight);
        self.assign(a, b, &scores)
    }

    /// Align using scores produced elsewhere. The matrix must be `a.len()` by `b.len()`.
    pub fn align_with_scores(
        &self,
        a: &[Section],
        b: &[Section],
        scores: &ScoreMatrix,
    ) -> Result<Vec<SectionMatch>, ScoringError> {
        scores.ensure_dims(a.len(), b.len())?;
        Ok(self.assign(a, b, scores))
    }

    /// `unchanged` needs both a near-identical score and identical extracted facts.
    pub fn classify(&self, a: &Section, b: &Section, score: f64) -> ChangeType {
        if score >= self.config.unchanged_threshold
            && self.extractor.extract_grouped(a) == self.extractor.extract_grouped(b)
        {
            ChangeType::Unchanged
        } else {
            ChangeType::Modified
        }
    }

    fn assign(&self, a: &[Section], b: &[Section], scores: &ScoreMatrix) -> Vec<SectionMatch> {
        let pairs = greedy_assign(scores, self.config.match_threshold, |r1, c1, r2, c2| {
            index_distance(&a[r1], &b[c1])
                .cmp(&index_distance(&a[r2], &b[c2]))
                .then_with(|| title_key(&a[r1]).cmp(title_key(&a[r2])))
                .then_with(|| title_key(&b[c1]).cmp(title_key(&b[c2])))
        });

        let mut partner: Vec<Option<(usize, f64)>> = vec![None; a.len()];
        let mut claimed_b = vec![false; b.len()];
        for pair in &pairs {
            partner[pair.row] = Some((pair.col, pair.score));
            claimed_b[pair.col] = true;
        }

        let mut matches = Vec::with_capacity(a.len() + b.len() - pairs.len());
        for (i, section_a) in a.iter().enumerate() {
            match partner[i] {
                Some((j, score)) => {
                    let change_type = self.classify(section_a, &b[j], score);
                    matches.push(SectionMatch::paired(
                        section_a.clone(),
                        b[j].clone(),
                        change_type,
                        score,
                    ));
                }
                None => matches.push(SectionMatch::removed(section_a.clone())),
            }
        }
        for (j, section_b) in b.iter().enumerate() {
            if !claimed_b[j] {
                matches.push(SectionMatch::added(section_b.clone()));
            }
        }

        debug!(
            sections_a = a.len(),
            sections_b = b.len(),
            pairs = pairs.len(),
            "sections aligned"
        );
        matches
    }
}

fn index_distance(a: &Section, b: &Section) -> usize {
    a.index.abs_diff(b.index)
}

fn title_key(section: &Section) -> &str {
    section.title.as_deref().unwrap_or("")
}
