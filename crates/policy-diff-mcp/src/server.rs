use std::sync::Arc;

use rmcp::{
    Json, ServerHandler,
    handler::server::router::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::*,
    tool, tool_handler, tool_router,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::info;

use policy_diff::{ComparisonReport, DiffGenerator, ExtractedEntity, Section, Segmenter};

#[derive(Clone)]
pub struct PolicyDiffServer {
    generator: Arc<DiffGenerator>,
    segmenter: Arc<Segmenter>,
    tool_router: ToolRouter<PolicyDiffServer>,
}

impl PolicyDiffServer {
    pub fn new(generator: Arc<DiffGenerator>) -> Self {
        Self {
            generator,
            segmenter: Arc::new(Segmenter::new()),
            tool_router: Self::tool_router(),
        }
    }
}

/// One document version: either pre-split sections or raw text to split.
#[derive(Debug, Deserialize, JsonSchema)]
struct DocumentInput {
    /// Sections in document order. Indices must be unique.
    sections: Option<Vec<Section>>,
    /// Plain text, split into sections on headings or paragraphs.
    text: Option<String>,
}

impl DocumentInput {
    fn into_sections(self, segmenter: &Segmenter, label: &str) -> Result<Vec<Section>, String> {
        match (self.sections, self.text) {
            (Some(sections), None) => Ok(sections),
            (None, Some(text)) => Ok(segmenter.segment(&text)),
            (Some(_), Some(_)) => Err(format!("{label}: provide either sections or text, not both")),
            (None, None) => Err(format!("{label}: one of sections or text is required")),
        }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct CompareDocumentsParams {
    /// The earlier version.
    document_a: DocumentInput,
    /// The later version.
    document_b: DocumentInput,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ExtractEntitiesParams {
    text: String,
    title: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct SegmentDocumentParams {
    text: String,
}

#[derive(Debug, Serialize, JsonSchema)]
struct EntitiesResponse {
    entities: Vec<ExtractedEntity>,
}

#[derive(Debug, Serialize, JsonSchema)]
struct SectionsResponse {
    sections: Vec<Section>,
}

#[tool_router]
impl PolicyDiffServer {
    #[tool(description = "Compare two versions of a policy document. Each side is given as sections or as raw text. Returns aligned sections (unchanged/modified/added/removed) with change analysis, definition/requirement/action/deadline changes, statistics, major changes and an executive summary.")]
    async fn compare_documents(
        &self,
        Parameters(params): Parameters<CompareDocumentsParams>,
    ) -> Result<Json<ComparisonReport>, String> {
        let a = params.document_a.into_sections(&self.segmenter, "document_a")?;
        let b = params.document_b.into_sections(&self.segmenter, "document_b")?;
        info!(sections_a = a.len(), sections_b = b.len(), "compare_documents");
        let report = self
            .generator
            .compare(&a, &b)
            .await
            .map_err(|e| format!("comparison failed: {e}"))?;
        Ok(Json(report))
    }

    #[tool(description = "Extract definitions, requirements, actions and deadlines from a piece of policy text. Extraction is heuristic and may miss unusual phrasing.")]
    async fn extract_entities(
        &self,
        Parameters(params): Parameters<ExtractEntitiesParams>,
    ) -> Result<Json<EntitiesResponse>, String> {
        if params.text.trim().is_empty() {
            return Err("text must not be empty".to_string());
        }
        let section = Section::new(0, params.title.as_deref(), params.text);
        Ok(Json(EntitiesResponse {
            entities: self.generator.extract(&section),
        }))
    }

    #[tool(description = "Split plain policy text into titled sections using heading conventions (numbered, ALL-CAPS, SECTION n, Title:), falling back to paragraphs.")]
    async fn segment_document(
        &self,
        Parameters(params): Parameters<SegmentDocumentParams>,
    ) -> Result<Json<SectionsResponse>, String> {
        if params.text.trim().is_empty() {
            return Err("text must not be empty".to_string());
        }
        Ok(Json(SectionsResponse {
            sections: self.segmenter.segment(&params.text),
        }))
    }
}

#[tool_handler]
impl ServerHandler for PolicyDiffServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_06_18,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "policy-diff".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Policy document comparison server. Use compare_documents with two versions of a \
document (sections or raw text) to get a change report. Use segment_document to preview how raw \
text is split, and extract_entities to inspect the facts found in a passage."
                    .to_string(),
            ),
        }
    }
}
