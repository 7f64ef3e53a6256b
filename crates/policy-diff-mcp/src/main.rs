mod server;

use std::sync::Arc;

use rmcp::{ServiceExt, transport::stdio};
use tracing::info;
use tracing_subscriber::EnvFilter;

use policy_common::openai::{OpenAiClient, OpenAiClientConfig};
use policy_common::redis::RedisCache;
use policy_diff::{
    AnalysisCache, AnalysisChain, DiffConfig, DiffGenerator, LlmAnalyzer, RuleBasedAnalyzer,
    StructuredExtractor,
};

use server::PolicyDiffServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout is reserved for MCP JSON-RPC
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    info!("starting policy-diff MCP server");

    let config = DiffConfig::from_env()?;
    info!(
        model = %config.model,
        match_threshold = config.matcher.match_threshold,
        unchanged_threshold = config.matcher.unchanged_threshold,
        max_concurrency = config.max_concurrency,
        primary_timeout_ms = config.primary_timeout.as_millis(),
        disable_primary = config.disable_primary,
        redis = config.redis_url.is_some(),
        "configuration loaded"
    );

    let extractor = Arc::new(StructuredExtractor::new());
    let mut chain = AnalysisChain::new(config.primary_timeout);

    if config.disable_primary {
        info!("primary analysis disabled, using rule-based analysis only");
    } else {
        let openai_config = OpenAiClientConfig::from_env();
        info!(
            base_url = %openai_config.base_url,
            timeout_ms = openai_config.default_timeout.as_millis(),
            "openai client configured"
        );
        let mut primary = LlmAnalyzer::new(OpenAiClient::new(openai_config)?, config.model.clone());

        let redis_cache = RedisCache::new(config.redis_url.as_deref());
        if redis_cache.is_configured() {
            if redis_cache.is_available().await {
                info!("redis connected");
            } else {
                info!("redis unavailable, analysis cache will miss until it returns");
            }
            primary = primary.with_cache(AnalysisCache::new(redis_cache, config.cache_ttl_secs));
        }
        chain = chain.with(Arc::new(primary));
    }
    chain = chain.with(Arc::new(RuleBasedAnalyzer::new(Arc::clone(&extractor))));

    let generator = DiffGenerator::new(&config, extractor, chain)?;

    #[cfg(feature = "embeddings")]
    let generator = {
        info!("initializing embedding model (may download on first run)");
        let embedder = Arc::new(policy_common::embedding::Embedder::new().await?);
        info!("embedding model ready");
        generator.with_scorer(Arc::new(policy_diff::similarity::EmbeddingScorer::new(
            embedder,
            config.matcher.title_weight,
        )))
    };

    let server = PolicyDiffServer::new(Arc::new(generator));

    info!("MCP server ready, serving on stdio");
    let service = server.serve(stdio()).await.inspect_err(|e| {
        tracing::error!(error = %e, "MCP server error");
    })?;

    service.waiting().await?;
    info!("MCP server shut down");
    Ok(())
}
