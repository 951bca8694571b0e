//! Analysis orchestration: validate, route (text or URL), count, then walk the generation tiers.
//!
//! Stats policy: locally computed counts stand unless a remote source (fallback endpoint or
//! model) reports a field. A reported positive value always wins; a reported zero only fills
//! a gap. Remote counts may come from different text than the local ones (a server-side fetch
//! of the URL, or a model's own count); when a remote value replaces a local one the result
//! carries a `stats_from_remote` note.

use crate::config::AnalyzerConfig;
use crate::creative;
use crate::fetch::HttpFetcher;
use crate::model::ModelClient;
use crate::server::ServerClient;
use crate::textstats;
use crate::tiers::{LocalTier, ModelTier, ServerTier};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use wordbloom_core::{
    AnalysisRequest, AnalysisResult, ContentFetcher, CreativePayload, Error, FallbackRequest,
    GenerationTier, InputPath, Result, TextStats, TierInput, TierKind, TierOutcome,
};

/// Starts with `scheme://` followed by a non-whitespace character, scheme http or https
/// (case-insensitive). Anything after the first whitespace is not inspected.
pub fn is_url_shaped(line: &str) -> bool {
    let line = line.trim_start();
    let Some((scheme, rest)) = line.split_once("://") else {
        return false;
    };
    (scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https"))
        && rest.chars().next().is_some_and(|c| !c.is_whitespace())
}

/// Where the input goes: the first line decides. For URLs only the leading token of the first
/// line is used; the rest of the input is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route<'a> {
    Text(&'a str),
    Url(&'a str),
}

pub fn route(input: &str) -> Route<'_> {
    let first = input.lines().next().unwrap_or("").trim();
    if is_url_shaped(first) {
        let url = first.split_whitespace().next().unwrap_or(first);
        Route::Url(url)
    } else {
        Route::Text(input)
    }
}

#[derive(Debug, Default)]
struct StatsLedger {
    total_words: Option<usize>,
    starts_with_count: Option<usize>,
    notes: Vec<String>,
}

impl StatsLedger {
    fn local(&mut self, s: TextStats) {
        self.total_words = Some(s.total_words);
        self.starts_with_count = Some(s.starts_with_count);
    }

    fn remote(&mut self, total: Option<usize>, starts: Option<usize>) {
        let mut replaced = false;
        for (slot, reported) in [
            (&mut self.total_words, total),
            (&mut self.starts_with_count, starts),
        ] {
            let Some(v) = reported else { continue };
            let current = *slot;
            match current {
                None => *slot = Some(v),
                Some(cur) if v > 0 && v != cur => {
                    *slot = Some(v);
                    replaced = true;
                }
                Some(_) => {}
            }
        }
        if replaced && !self.notes.iter().any(|n| n == "stats_from_remote") {
            self.notes.push("stats_from_remote".to_string());
        }
    }

    fn finish(mut self, notes: &mut Vec<String>) -> TextStats {
        let total_words = self.total_words.unwrap_or(0);
        let mut starts_with_count = self.starts_with_count.unwrap_or(0);
        if starts_with_count > total_words {
            starts_with_count = total_words;
            self.notes.push("stats_clamped".to_string());
        }
        notes.append(&mut self.notes);
        TextStats {
            total_words,
            starts_with_count,
        }
    }
}

pub struct Analyzer {
    fetcher: Arc<dyn ContentFetcher>,
    server: Option<ServerClient>,
    /// Why a configured endpoint could not be used, if it could not.
    server_invalid: Option<String>,
    tiers: Vec<Box<dyn GenerationTier>>,
    run_lock: Mutex<()>,
}

impl Analyzer {
    /// Wire the default tiers (server, direct model, local) from `cfg`.
    pub fn new(cfg: &AnalyzerConfig) -> Result<Self> {
        let client = cfg.http_client()?;
        // An unusable endpoint is not fatal either: the server tier reports `invalid_url`.
        let (server, server_invalid) = match cfg.server_endpoint.as_deref() {
            None => (None, None),
            Some(ep) => match ServerClient::new(client.clone(), ep) {
                Ok(c) => (Some(c), None),
                Err(e) => {
                    warn!(endpoint = ep, error = %e, "fallback endpoint unusable");
                    (None, Some(e.to_string()))
                }
            },
        };
        let server_tier = match &server_invalid {
            Some(reason) => ServerTier::invalid(reason.clone()),
            None => ServerTier::new(server.clone()),
        };
        // A missing key is not fatal: the model tier reports it and the chain moves on.
        let model = if cfg.model_direct_enabled {
            ModelClient::new(
                client.clone(),
                &cfg.model_base_url,
                &cfg.model,
                cfg.model_api_key.clone(),
            )
            .map_err(|e| warn!(error = %e, "direct model calls enabled but unusable"))
            .ok()
        } else {
            None
        };
        let tiers: Vec<Box<dyn GenerationTier>> = vec![
            Box::new(server_tier),
            Box::new(ModelTier::new(cfg.model_direct_enabled, model)),
            Box::new(LocalTier),
        ];
        let mut analyzer =
            Self::with_parts(Arc::new(HttpFetcher::from_config(client, cfg)), server, tiers);
        analyzer.server_invalid = server_invalid;
        Ok(analyzer)
    }

    /// Custom wiring. `server` is what a blocked URL fetch falls back to; `tiers` are tried in
    /// order. The local generator backs everything even if `tiers` leaves it out.
    pub fn with_parts(
        fetcher: Arc<dyn ContentFetcher>,
        server: Option<ServerClient>,
        tiers: Vec<Box<dyn GenerationTier>>,
    ) -> Self {
        Self {
            fetcher,
            server,
            server_invalid: None,
            tiers,
            run_lock: Mutex::new(()),
        }
    }

    /// Run one request to completion. Only validation failures are returned as errors.
    ///
    /// Calls on the same analyzer are serialized.
    pub async fn analyze(&self, req: &AnalysisRequest) -> Result<AnalysisResult> {
        let v = req.validate()?;
        let _guard = self.run_lock.lock().await;

        let mut notes: Vec<String> = Vec::new();
        let mut ledger = StatsLedger::default();
        let mut server_done = false;
        let mut creative: Option<(TierKind, String)> = None;

        let (path, text, url) = match route(v.input) {
            Route::Text(text) => (InputPath::Text, Some(text.to_string()), None),
            Route::Url(url) => match self.fetcher.fetch_text(url).await {
                Ok(text) => (InputPath::Url, Some(text), Some(url.to_string())),
                Err(e) => {
                    warn!(url, error = %e, "direct fetch failed; asking fallback endpoint");
                    notes.push("fetch_blocked".to_string());
                    server_done = true;
                    let fallback_req = FallbackRequest::for_url(url, v.target, v.generation_type);
                    let payload = self.fetch_fallback(&fallback_req, &mut notes).await;
                    let outcome = TierOutcome::from(payload);
                    ledger.remote(outcome.total_words, outcome.starts_with_count);
                    if outcome.has_creative() {
                        creative = outcome.creative.map(|c| (TierKind::Server, c));
                    }
                    (InputPath::Url, None, Some(url.to_string()))
                }
            },
        };

        let target = v.target.to_string();
        let local_stats = text
            .as_deref()
            .map(|t| textstats::text_stats(t, &target))
            .unwrap_or_default();
        if text.is_some() {
            ledger.local(local_stats);
        }

        let input = TierInput {
            text,
            url,
            target: v.target,
            generation_type: v.generation_type,
            local_stats,
        };

        if creative.is_none() {
            for tier in &self.tiers {
                let kind = tier.kind();
                if kind == TierKind::Server && server_done {
                    continue;
                }
                debug!(tier = kind.as_str(), "attempting generation tier");
                match tier.attempt(&input).await {
                    Ok(outcome) => {
                        if kind.is_remote() {
                            ledger.remote(outcome.total_words, outcome.starts_with_count);
                        }
                        notes.extend(outcome.notes.iter().map(|n| n.to_string()));
                        if outcome.has_creative() {
                            creative = outcome.creative.map(|c| (kind, c));
                            break;
                        }
                        debug!(tier = kind.as_str(), "tier returned no creative text");
                    }
                    Err(Error::ModelCallDisabled) => {
                        debug!("direct model calls disabled; skipping");
                    }
                    Err(e) => {
                        warn!(tier = kind.as_str(), error = %e, "generation tier failed");
                        notes.push(e.code().to_string());
                    }
                }
            }
        }

        let (source, creative_text) = creative.unwrap_or_else(|| {
            notes.push("local_generator_backstop".to_string());
            (
                TierKind::Local,
                creative::generate_random(v.target, v.generation_type),
            )
        });
        let stats = ledger.finish(&mut notes);

        Ok(AnalysisResult {
            total_words: stats.total_words,
            starts_with_count: stats.starts_with_count,
            creative_text: Some(creative_text),
            creative_source: Some(source),
            path,
            notes,
        })
    }

    /// Terminal: a failed fallback call yields an empty payload.
    async fn fetch_fallback(
        &self,
        req: &FallbackRequest,
        notes: &mut Vec<String>,
    ) -> CreativePayload {
        let Some(server) = &self.server else {
            if let Some(reason) = &self.server_invalid {
                warn!(reason = reason.as_str(), "no usable fallback endpoint");
                notes.push("invalid_url".to_string());
                return CreativePayload::default();
            }
            notes.push("server_not_configured".to_string());
            return CreativePayload::default();
        };
        match server.generate(req).await {
            Ok(p) => p,
            Err(e) => {
                warn!(endpoint = server.endpoint(), error = %e, "fallback endpoint failed");
                notes.push(e.code().to_string());
                CreativePayload::default()
            }
        }
    }
}
