use std::time::Duration;

use crate::cache::DEFAULT_TTL_SECS;
use crate::error::DiffError;
use crate::matcher::MatcherConfig;

/// Comparison engine configuration loaded explicitly from environment variables.
///
/// Every variable is optional. A value that is present but unparseable or out of range
/// is a configuration error, never silently replaced by the default.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffConfig {
    /// Model name sent to the chat completions endpoint.
    pub model: String,
    pub matcher: MatcherConfig,
    /// Minimum similarity for two requirements, actions or deadlines to be paired.
    pub entity_match_threshold: f64,
    /// Upper bound on in-flight section analyses.
    pub max_concurrency: usize,
    /// Wall-clock limit for each analysis call.
    pub primary_timeout: Duration,
    /// Also run analysis for `unchanged` sections.
    pub annotate_unchanged: bool,
    /// Skip the generative backend entirely.
    pub disable_primary: bool,
    pub cache_ttl_secs: u64,
    /// Redis connection URL. `None` disables the analysis cache.
    pub redis_url: Option<String>,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            model: "llama3.2".to_string(),
            matcher: MatcherConfig::default(),
            entity_match_threshold: 0.6,
            max_concurrency: 4,
            primary_timeout: Duration::from_secs(30),
            annotate_unchanged: false,
            disable_primary: false,
            cache_ttl_secs: DEFAULT_TTL_SECS,
            redis_url: None,
        }
    }
}

impl DiffConfig {
    /// Load configuration from environment variables.
    ///
    /// Optional:
    /// - `POLICY_DIFF_MODEL`: model name (default `llama3.2`)
    /// - `POLICY_DIFF_MATCH_THRESHOLD`: pairing threshold (default 0.5)
    /// - `POLICY_DIFF_UNCHANGED_THRESHOLD`: unchanged threshold (default 0.95)
    /// - `POLICY_DIFF_ENTITY_THRESHOLD`: entity pairing threshold (default 0.6)
    /// - `POLICY_DIFF_TITLE_WEIGHT`: title weight in section scores (default 0.2)
    /// - `POLICY_DIFF_MAX_CONCURRENCY`: concurrent analyses (default 4)
    /// - `POLICY_DIFF_PRIMARY_TIMEOUT_SECS`: per-call analysis timeout (default 30)
    /// - `POLICY_DIFF_ANNOTATE_UNCHANGED`: `true`/`false` (default false)
    /// - `POLICY_DIFF_DISABLE_PRIMARY`: `true`/`false` (default false)
    /// - `POLICY_DIFF_CACHE_TTL_SECS`: analysis cache TTL (default 86400)
    /// - `REDIS_URL`: Redis connection string (omit to disable caching)
    pub fn from_env() -> Result<Self, DiffError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key/value source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, DiffError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let config = Self {
            model: get("POLICY_DIFF_MODEL").unwrap_or(defaults.model),
            matcher: MatcherConfig {
                match_threshold: parse_or(&get, "POLICY_DIFF_MATCH_THRESHOLD", defaults.matcher.match_threshold)?,
                unchanged_threshold: parse_or(
                    &get,
                    "POLICY_DIFF_UNCHANGED_THRESHOLD",
                    defaults.matcher.unchanged_threshold,
                )?,
                title_weight: parse_or(&get, "POLICY_DIFF_TITLE_WEIGHT", defaults.matcher.title_weight)?,
            },
            entity_match_threshold: parse_or(
                &get,
                "POLICY_DIFF_ENTITY_THRESHOLD",
                defaults.entity_match_threshold,
            )?,
            max_concurrency: parse_or(&get, "POLICY_DIFF_MAX_CONCURRENCY", defaults.max_concurrency)?,
            primary_timeout: Duration::from_secs(parse_or(
                &get,
                "POLICY_DIFF_PRIMARY_TIMEOUT_SECS",
                defaults.primary_timeout.as_secs(),
            )?),
            annotate_unchanged: parse_or(&get, "POLICY_DIFF_ANNOTATE_UNCHANGED", defaults.annotate_unchanged)?,
            disable_primary: parse_or(&get, "POLICY_DIFF_DISABLE_PRIMARY", defaults.disable_primary)?,
            cache_ttl_secs: parse_or(&get, "POLICY_DIFF_CACHE_TTL_SECS", defaults.cache_ttl_secs)?,
            redis_url: get("REDIS_URL"),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), DiffError> {
        let unit = [
            ("match threshold", self.matcher.match_threshold),
            ("unchanged threshold", self.matcher.unchanged_threshold),
            ("title weight", self.matcher.title_weight),
            ("entity match threshold", self.entity_match_threshold),
        ];
        for (name, value) in unit {
            if !(0.0..=1.0).contains(&value) {
                return Err(DiffError::Config(format!("{name} must be within [0, 1], got {value}")));
            }
        }
        if self.matcher.match_threshold > self.matcher.unchanged_threshold {
            return Err(DiffError::Config(format!(
                "match threshold {} exceeds unchanged threshold {}",
                self.matcher.match_threshold, self.matcher.unchanged_threshold
            )));
        }
        if self.max_concurrency == 0 {
            return Err(DiffError::Config("max concurrency must be at least 1".to_string()));
        }
        if self.primary_timeout.is_zero() {
            return Err(DiffError::Config("primary timeout must be positive".to_string()));
        }
        Ok(())
    }
}

fn parse_or<T: std::str::FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, DiffError>
where
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| DiffError::Config(format!("{key}={raw:?} is invalid: {e}"))),
        None => Ok(default),
    }
}
