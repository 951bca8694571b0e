//! The fallback generation endpoint.
//!
//! Clients that cannot fetch a URL themselves (cross-origin limits) or should not hold a model
//! credential post here instead. The server fetches, counts and generates on their behalf.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};
use wordbloom_core::{parse_target_char, ContentFetcher, CreativePayload, FallbackRequest};
use wordbloom_local::model::{self, ModelClient};
use wordbloom_local::{creative, textstats, AnalyzerConfig, HttpFetcher};

pub struct ServeState {
    fetcher: HttpFetcher,
    model: Option<ModelClient>,
}

impl ServeState {
    /// The model is used whenever a key is configured: server-side, the key never leaves the host.
    pub fn from_config(cfg: &AnalyzerConfig) -> wordbloom_core::Result<Self> {
        let client = cfg.http_client()?;
        let model = match &cfg.model_api_key {
            Some(_) => Some(ModelClient::new(
                client.clone(),
                &cfg.model_base_url,
                &cfg.model,
                cfg.model_api_key.clone(),
            )?),
            None => None,
        };
        Ok(Self {
            fetcher: HttpFetcher::from_config(client, cfg),
            model,
        })
    }
}

pub fn router(state: Arc<ServeState>) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/api/generate", post(generate))
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: Arc<ServeState>) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        addr = %listener.local_addr()?,
        model = state.model.is_some(),
        "fallback endpoint listening"
    );
    axum::serve(listener, router(state)).await?;
    Ok(())
}

fn error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

async fn generate(
    State(st): State<Arc<ServeState>>,
    Json(req): Json<FallbackRequest>,
) -> Response {
    let target = match parse_target_char(&req.target_char) {
        Ok(c) => c,
        Err(e) => return error(StatusCode::BAD_REQUEST, e.to_string()),
    };

    let text = match (req.text.as_deref().map(str::trim), req.url.as_deref()) {
        (Some(t), _) if !t.is_empty() => t.to_string(),
        (_, Some(url)) => match st.fetcher.fetch_text(url.trim()).await {
            Ok(t) => t,
            Err(e) => {
                warn!(url, error = %e, "server-side fetch failed");
                return error(StatusCode::BAD_GATEWAY, e.to_string());
            }
        },
        _ => return error(StatusCode::BAD_REQUEST, "one of `url` or `text` is required"),
    };

    let stats = textstats::text_stats(&text, &target.to_string());

    let mut creative_text = None;
    if let Some(m) = &st.model {
        let prompt = model::compose_prompt(
            Some(&text),
            req.url.as_deref(),
            target,
            req.generation_type,
        );
        match m.complete(&prompt).await {
            Ok(raw) => creative_text = model::payload_from_reply(&raw).0.creative,
            Err(e) => warn!(error = %e, "model call failed; using local templates"),
        }
    }
    let creative_text = creative_text
        .unwrap_or_else(|| creative::generate_random(target, req.generation_type));

    Json(CreativePayload {
        total_words: Some(stats.total_words as u64),
        starts_with_count: Some(stats.starts_with_count as u64),
        creative: Some(creative_text),
    })
    .into_response()
}
