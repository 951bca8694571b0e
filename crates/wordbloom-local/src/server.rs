use tracing::debug;
use wordbloom_core::{CreativePayload, Error, FallbackRequest, Result};

/// Client for the fallback generation endpoint.
///
/// This is the route around cross-origin limits: the endpoint fetches URLs itself and may
/// generate the creative text server-side.
#[derive(Debug, Clone)]
pub struct ServerClient {
    client: reqwest::Client,
    endpoint: url::Url,
}

impl ServerClient {
    pub fn new(client: reqwest::Client, endpoint: &str) -> Result<Self> {
        let endpoint = url::Url::parse(endpoint).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(Error::InvalidUrl(format!(
                "unsupported scheme for fallback endpoint: {}",
                endpoint.scheme()
            )));
        }
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    /// POST `req`. Non-2xx, transport errors and non-object JSON are all `ServerUnavailable`.
    pub async fn generate(&self, req: &FallbackRequest) -> Result<CreativePayload> {
        let resp = self
            .client
            .post(self.endpoint.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .json(req)
            .send()
            .await
            .map_err(|e| Error::ServerUnavailable(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::ServerUnavailable(format!("fallback HTTP {status}")));
        }
        let v: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| Error::ServerUnavailable(format!("bad json: {e}")))?;
        let payload = CreativePayload::from_value(&v).ok_or_else(|| {
            Error::ServerUnavailable("fallback response is not a JSON object".to_string())
        })?;
        debug!(
            total_words = ?payload.total_words,
            starts_with_count = ?payload.starts_with_count,
            has_creative = payload.creative.is_some(),
            "fallback responded"
        );
        Ok(payload)
    }
}
