use crate::sanitize::DEFAULT_MAX_TEXT_CHARS;
use std::time::Duration;
use wordbloom_core::{Error, Result};

pub const DEFAULT_MODEL_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
/// Default response-body allowance per character of `max_text_chars`.
pub const BODY_BYTES_PER_CHAR: usize = 64;

fn env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn env_bool(key: &str) -> Option<bool> {
    env(key).map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

/// Everything the analyzer needs to know about the outside world. Built once, never mutated.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Fallback generation endpoint (`POST {url|text, targetChar, generationType}`).
    pub server_endpoint: Option<String>,
    /// Direct model calls from the client. Off unless explicitly enabled: it requires the
    /// model credential to live next to the client.
    pub model_direct_enabled: bool,
    pub model_base_url: String,
    pub model: String,
    pub model_api_key: Option<String>,
    /// Bound on fetched/sanitized text, in characters.
    pub max_text_chars: usize,
    /// Bound on a fetched response body, in bytes. `None` scales with `max_text_chars`.
    pub max_body_bytes: Option<usize>,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            server_endpoint: None,
            model_direct_enabled: false,
            model_base_url: DEFAULT_MODEL_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            model_api_key: None,
            max_text_chars: DEFAULT_MAX_TEXT_CHARS,
            max_body_bytes: None,
            connect_timeout_ms: 10_000,
            request_timeout_ms: 30_000,
        }
    }
}

impl AnalyzerConfig {
    /// Defaults, overlaid with `WORDBLOOM_*` environment variables. Empty values count as unset.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(v) = env("WORDBLOOM_SERVER_ENDPOINT") {
            cfg.server_endpoint = Some(v);
        }
        if let Some(v) = env_bool("WORDBLOOM_MODEL_DIRECT") {
            cfg.model_direct_enabled = v;
        }
        if let Some(v) = env("WORDBLOOM_MODEL_BASE_URL") {
            cfg.model_base_url = v;
        }
        if let Some(v) = env("WORDBLOOM_MODEL") {
            cfg.model = v;
        }
        cfg.model_api_key = env("WORDBLOOM_GEMINI_API_KEY").or_else(|| env("GEMINI_API_KEY"));
        if let Some(n) = env("WORDBLOOM_MAX_CHARS").and_then(|s| s.parse::<usize>().ok()) {
            cfg.max_text_chars = n.clamp(1, 1_000_000);
        }
        if let Some(n) = env("WORDBLOOM_MAX_BODY_BYTES").and_then(|s| s.parse::<usize>().ok()) {
            cfg.max_body_bytes = Some(n.max(1));
        }
        cfg
    }

    /// Bytes read from a fetched page; the rest of the body is never read.
    pub fn body_byte_cap(&self) -> usize {
        self.max_body_bytes
            .unwrap_or_else(|| self.max_text_chars.saturating_mul(BODY_BYTES_PER_CHAR))
    }

    /// Shared HTTP client for every outbound call the analyzer makes.
    pub fn http_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .user_agent(concat!("wordbloom/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::limited(10))
            .connect_timeout(Duration::from_millis(self.connect_timeout_ms))
            .timeout(Duration::from_millis(self.request_timeout_ms))
            .build()
            .map_err(|e| Error::NotConfigured(format!("http client: {e}")))
    }
}
