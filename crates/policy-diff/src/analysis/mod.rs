/// Narrative and impact analysis of section changes.
///
/// Every backend implements [`ChangeAnalyzer`]. [`AnalysisChain`] tries them in priority
/// order under a per-call timeout and returns the first success; the result records
/// which kind of backend produced it. A failure only affects the section being analyzed.
pub mod fallback;
pub mod primary;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use crate::model::{AnnotatedSection, AnalysisSource, ChangeStatistics, ChangeType, SectionAnalysis, SectionMatch};

pub use fallback::RuleBasedAnalyzer;
pub use primary::LlmAnalyzer;

/// Everything a backend needs to describe one section change. Owns its strings so
/// analysis futures never borrow from the report under construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeRequest {
    pub change_type: ChangeType,
    pub title: String,
    pub text_a: Option<String>,
    pub text_b: Option<String>,
}

impl ChangeRequest {
    pub fn from_match(section_match: &SectionMatch) -> Self {
        Self {
            change_type: section_match.change_type,
            title: section_match.title(),
            text_a: section_match.text_a().map(str::to_string),
            text_b: section_match.text_b().map(str::to_string),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("analysis timed out after {0:?}")]
    Timeout(Duration),

    #[error("analysis backend unreachable: {0}")]
    Transport(String),

    #[error("malformed analysis output: {0}")]
    Malformed(String),

    #[error("all {attempts} analysis backends failed, last error: {last}")]
    Exhausted { attempts: usize, last: String },
}

#[async_trait]
pub trait ChangeAnalyzer: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    fn source(&self) -> AnalysisSource;

    /// True when `analyze_change` and `summarize` never return an error.
    fn infallible(&self) -> bool {
        false
    }

    async fn analyze_change(&self, request: &ChangeRequest) -> Result<SectionAnalysis, AnalysisError>;

    async fn summarize(
        &self,
        sections: &[AnnotatedSection],
        statistics: &ChangeStatistics,
    ) -> Result<String, AnalysisError>;
}

/// Prioritized list of analyzers. Cheap to clone.
#[derive(Clone)]
pub struct AnalysisChain {
    analyzers: Vec<Arc<dyn ChangeAnalyzer>>,
    timeout: Duration,
}

impl AnalysisChain {
    pub fn new(timeout: Duration) -> Self {
        Self {
            analyzers: Vec::new(),
            timeout,
        }
    }

    /// Append a backend. Earlier backends are tried first.
    pub fn with(mut self, analyzer: Arc<dyn ChangeAnalyzer>) -> Self {
        self.analyzers.push(analyzer);
        self
    }

    pub fn len(&self) -> usize {
        self.analyzers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.analyzers.is_empty()
    }

    pub fn backends(&self) -> Vec<&'static str> {
        self.analyzers.iter().map(|a| a.name()).collect()
    }

    /// Whether the last backend can never fail, so the chain as a whole cannot be exhausted.
    pub fn ends_infallible(&self) -> bool {
        self.analyzers.last().is_some_and(|a| a.infallible())
    }

    pub async fn analyze_change(&self, request: &ChangeRequest) -> Result<SectionAnalysis, AnalysisError> {
        let mut last = None;
        for analyzer in &self.analyzers {
            let outcome = tokio::time::timeout(self.timeout, analyzer.analyze_change(request))
                .await
                .unwrap_or(Err(AnalysisError::Timeout(self.timeout)));
            match outcome {
                Ok(mut analysis) => {
                    analysis.source = analyzer.source();
                    debug!(backend = analyzer.name(), title = %request.title, "section analyzed");
                    return Ok(analysis);
                }
                Err(e) => {
                    warn!(
                        backend = analyzer.name(),
                        title = %request.title,
                        change_type = %request.change_type,
                        error = %e,
                        "section analysis failed, trying next backend"
                    );
                    last = Some(e);
                }
            }
        }
        Err(self.exhausted(last))
    }

    /// Executive summary from the first backend that succeeds, with that backend's source.
    pub async fn summarize(
        &self,
        sections: &[AnnotatedSection],
        statistics: &ChangeStatistics,
    ) -> Result<(String, AnalysisSource), AnalysisError> {
        let mut last = None;
        for analyzer in &self.analyzers {
            let outcome = tokio::time::timeout(self.timeout, analyzer.summarize(sections, statistics))
                .await
                .unwrap_or(Err(AnalysisError::Timeout(self.timeout)));
            match outcome {
                Ok(summary) => return Ok((summary, analyzer.source())),
                Err(e) => {
                    warn!(backend = analyzer.name(), error = %e, "executive summary failed, trying next backend");
                    last = Some(e);
                }
            }
        }
        Err(self.exhausted(last))
    }

    fn exhausted(&self, last: Option<AnalysisError>) -> AnalysisError {
        AnalysisError::Exhausted {
            attempts: self.analyzers.len(),
            last: last
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no analysis backends configured".to_string()),
        }
    }
}
