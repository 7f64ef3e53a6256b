/// Generative analysis through an OpenAI-compatible chat completions endpoint.
///
/// One request per section change, asking for a JSON object with `summary`,
/// `impact_level` and `stakeholder_impact`. Anything short of a complete, well-formed
/// answer is an error so the chain can move on to the next backend.
use std::fmt::Write as _;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use policy_common::openai::{ChatCompletionRequest, Message, OpenAiClient, OpenAiClientError, ResponseFormat};

use super::{AnalysisError, ChangeAnalyzer, ChangeRequest};
use crate::cache::AnalysisCache;
use crate::model::{
    AnalysisSource, AnnotatedSection, ChangeStatistics, ChangeType, ImpactLevel, SectionAnalysis,
};

const SECTION_TEXT_LIMIT: usize = 2000;
const SUMMARY_SECTION_LIMIT: usize = 10;

const CHANGE_SYSTEM_PROMPT: &str = "You are a policy analyst who explains changes between versions of \
government policy documents in clear, accessible language. Respond only with valid JSON.";

const SUMMARY_SYSTEM_PROMPT: &str = "You are a senior policy analyst who writes executive summaries \
of policy document changes for decision-makers.";

pub struct LlmAnalyzer {
    client: OpenAiClient,
    model: String,
    cache: Option<AnalysisCache>,
}

impl LlmAnalyzer {
    pub fn new(client: OpenAiClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: AnalysisCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &ChatCompletionRequest) -> Result<String, AnalysisError> {
        let response = self
            .client
            .chat_completions(request, None)
            .await
            .map_err(|e| self.map_client_error(e))?;
        response
            .first_content()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .ok_or_else(|| AnalysisError::Malformed("completion had no content".to_string()))
    }

    fn map_client_error(&self, error: OpenAiClientError) -> AnalysisError {
        match error {
            e if e.is_timeout() => AnalysisError::Timeout(self.client.config().default_timeout),
            OpenAiClientError::InvalidJson(e) => AnalysisError::Malformed(e.to_string()),
            e => AnalysisError::Transport(e.to_string()),
        }
    }
}

#[async_trait]
impl ChangeAnalyzer for LlmAnalyzer {
    fn name(&self) -> &'static str {
        "llm"
    }

    fn source(&self) -> AnalysisSource {
        AnalysisSource::Primary
    }

    async fn analyze_change(&self, request: &ChangeRequest) -> Result<SectionAnalysis, AnalysisError> {
        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get_analysis(&self.model, request).await {
                debug!(title = %request.title, "analysis cache hit");
                return Ok(hit);
            }
        }

        let chat = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                Message::system(CHANGE_SYSTEM_PROMPT),
                Message::user(change_prompt(request)),
            ],
            temperature: Some(0.1),
            max_tokens: Some(600),
            response_format: Some(ResponseFormat::json_object()),
        };
        let content = self.complete(&chat).await?;
        let analysis = parse_analysis(&content)?;

        if let Some(cache) = &self.cache {
            cache.set_analysis(&self.model, request, &analysis).await;
        }
        Ok(analysis)
    }

    async fn summarize(
        &self,
        sections: &[AnnotatedSection],
        statistics: &ChangeStatistics,
    ) -> Result<String, AnalysisError> {
        let chat = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                Message::system(SUMMARY_SYSTEM_PROMPT),
                Message::user(summary_prompt(sections, statistics)),
            ],
            temperature: Some(0.2),
            max_tokens: Some(800),
            response_format: None,
        };
        self.complete(&chat).await
    }
}

fn change_prompt(request: &ChangeRequest) -> String {
    let missing = "(section not present in this version)";
    let before = request.text_a.as_deref().map_or(missing.to_string(), |t| truncate_chars(t, SECTION_TEXT_LIMIT));
    let after = request.text_b.as_deref().map_or(missing.to_string(), |t| truncate_chars(t, SECTION_TEXT_LIMIT));
    let task = match request.change_type {
        ChangeType::Added => "This section is new in the updated policy.",
        ChangeType::Removed => "This section was removed from the updated policy.",
        ChangeType::Modified => "This section was revised in the updated policy.",
        ChangeType::Unchanged => "This section is substantively unchanged.",
    };
    format!(
        "Section: {title}\n{task}\n\n\
         ORIGINAL VERSION:\n{before}\n\n\
         NEW VERSION:\n{after}\n\n\
         Respond with a JSON object with exactly these keys:\n\
         - \"summary\": one or two sentences on what changed and why it matters\n\
         - \"impact_level\": \"low\", \"medium\" or \"high\"\n\
         - \"stakeholder_impact\": who is most affected and how",
        title = request.title,
    )
}

fn summary_prompt(sections: &[AnnotatedSection], statistics: &ChangeStatistics) -> String {
    let mut prompt = format!(
        "Provide an executive summary comparing two versions of a policy document.\n\n\
         Statistics:\n\
         - Total sections: {}\n\
         - New sections: {}\n\
         - Removed sections: {}\n\
         - Modified sections: {}\n\
         - Unchanged sections: {}\n\n\
         Major changes:\n",
        statistics.total_sections,
        statistics.added,
        statistics.removed,
        statistics.modified,
        statistics.unchanged,
    );
    for section in sections
        .iter()
        .filter(|s| s.change_type() != ChangeType::Unchanged)
        .take(SUMMARY_SECTION_LIMIT)
    {
        let summary = section.analysis.as_ref().map_or("", |a| a.summary.as_str());
        let _ = writeln!(
            prompt,
            "- {} ({}): {}",
            section.section_match.title(),
            section.change_type(),
            summary
        );
    }
    prompt.push_str(
        "\nCover the overall assessment, key areas of impact and significance for stakeholders. \
         Keep it under 300 words.",
    );
    prompt
}

#[derive(Debug, Deserialize)]
struct RawAnalysis {
    summary: Option<String>,
    impact_level: Option<String>,
    stakeholder_impact: Option<serde_json::Value>,
}

/// Parse a model answer into an analysis. Tolerates prose or code fences around the JSON
/// object; rejects missing, empty or unrecognized fields.
pub fn parse_analysis(content: &str) -> Result<SectionAnalysis, AnalysisError> {
    let start = content.find('{');
    let end = content.rfind('}');
    let json = match (start, end) {
        (Some(s), Some(e)) if s < e => &content[s..=e],
        _ => return Err(AnalysisError::Malformed("no JSON object in completion".to_string())),
    };
    let raw: RawAnalysis =
        serde_json::from_str(json).map_err(|e| AnalysisError::Malformed(e.to_string()))?;

    let summary = raw
        .summary
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AnalysisError::Malformed("missing summary".to_string()))?;
    let label = raw
        .impact_level
        .ok_or_else(|| AnalysisError::Malformed("missing impact_level".to_string()))?;
    let impact_level = ImpactLevel::parse(&label)
        .ok_or_else(|| AnalysisError::Malformed(format!("unknown impact_level {label:?}")))?;
    let stakeholder_impact = raw
        .stakeholder_impact
        .and_then(stakeholder_text)
        .ok_or_else(|| AnalysisError::Malformed("missing stakeholder_impact".to_string()))?;

    Ok(SectionAnalysis {
        summary,
        impact_level: Some(impact_level),
        stakeholder_impact: Some(stakeholder_impact),
        source: AnalysisSource::Primary,
    })
}

/// Models sometimes answer with a list of groups instead of a sentence.
fn stakeholder_text(value: serde_json::Value) -> Option<String> {
    let text = match value {
        serde_json::Value::String(s) => s.trim().to_string(),
        serde_json::Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("; "),
        _ => String::new(),
    };
    (!text.is_empty()).then_some(text)
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
