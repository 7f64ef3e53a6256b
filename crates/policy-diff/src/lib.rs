pub mod analysis;
pub mod cache;
pub mod config;
pub mod error;
pub mod extractor;
pub mod generator;
pub mod matcher;
pub mod model;
pub mod segment;
pub mod similarity;
pub mod word_diff;

pub use analysis::{AnalysisChain, AnalysisError, ChangeAnalyzer, ChangeRequest, LlmAnalyzer, RuleBasedAnalyzer};
pub use cache::AnalysisCache;
pub use config::DiffConfig;
pub use error::{DiffError, ScoringError};
pub use extractor::StructuredExtractor;
pub use generator::DiffGenerator;
pub use matcher::{MatcherConfig, SemanticMatcher};
pub use model::*;
pub use segment::{segment_text, Segmenter};
pub use word_diff::word_diff;
