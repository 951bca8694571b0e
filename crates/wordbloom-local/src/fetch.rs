use crate::config::{AnalyzerConfig, BODY_BYTES_PER_CHAR};
use crate::sanitize;
use futures_util::StreamExt;
use tracing::debug;
use wordbloom_core::{ContentFetcher, Error, Result};

/// Direct GET of a URL, sanitized and bounded.
///
/// Every failure (bad URL, transport error, non-2xx) is reported as `FetchBlocked`: from the
/// caller's side a cross-origin refusal looks like any other network failure.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    max_chars: usize,
    max_body_bytes: usize,
}

impl HttpFetcher {
    pub fn new(client: reqwest::Client, max_chars: usize) -> Self {
        Self {
            client,
            max_chars,
            max_body_bytes: max_chars.saturating_mul(BODY_BYTES_PER_CHAR),
        }
    }

    pub fn from_config(client: reqwest::Client, cfg: &AnalyzerConfig) -> Self {
        Self::new(client, cfg.max_text_chars).with_max_body_bytes(cfg.body_byte_cap())
    }

    pub fn with_max_body_bytes(mut self, n: usize) -> Self {
        self.max_body_bytes = n;
        self
    }
}

#[async_trait::async_trait]
impl ContentFetcher for HttpFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        let parsed =
            url::Url::parse(url).map_err(|e| Error::FetchBlocked(format!("invalid url: {e}")))?;
        let t0 = std::time::Instant::now();
        let resp = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| Error::FetchBlocked(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::FetchBlocked(format!("HTTP {status}")));
        }

        let max_bytes = self.max_body_bytes;
        let mut truncated = false;
        let mut bytes = Vec::new();
        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| Error::FetchBlocked(e.to_string()))?;
            if bytes.len().saturating_add(chunk.len()) > max_bytes {
                let can_take = max_bytes.saturating_sub(bytes.len());
                bytes.extend_from_slice(&chunk[..can_take]);
                truncated = true;
                break;
            }
            bytes.extend_from_slice(&chunk);
        }

        // A cut can land inside a multi-byte sequence; lossy decoding turns it into U+FFFD.
        let body = String::from_utf8_lossy(&bytes);
        let text = sanitize::truncate_chars(&sanitize::html_to_plain(&body), self.max_chars);
        debug!(
            url,
            body_bytes = bytes.len(),
            truncated,
            text_chars = text.chars().count(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "fetched"
        );
        Ok(text)
    }
}
