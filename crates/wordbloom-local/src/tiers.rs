//! The generation tiers, in preference order: fallback server, direct model, local templates.

use crate::creative;
use crate::model::{self, ModelClient};
use crate::server::ServerClient;
use tracing::debug;
use wordbloom_core::{
    Error, FallbackRequest, GenerationTier, Result, TierInput, TierKind, TierOutcome,
};

/// Asks the fallback endpoint, sending the cleaned text when we have it and the URL otherwise.
#[derive(Debug, Clone)]
pub struct ServerTier {
    client: Option<ServerClient>,
    invalid_endpoint: Option<String>,
}

impl ServerTier {
    pub fn new(client: Option<ServerClient>) -> Self {
        Self {
            client,
            invalid_endpoint: None,
        }
    }

    /// A configured endpoint that could not be used; every attempt reports `InvalidUrl`.
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            client: None,
            invalid_endpoint: Some(reason.into()),
        }
    }
}

#[async_trait::async_trait]
impl GenerationTier for ServerTier {
    fn kind(&self) -> TierKind {
        TierKind::Server
    }

    async fn attempt(&self, input: &TierInput) -> Result<TierOutcome> {
        if let Some(reason) = &self.invalid_endpoint {
            return Err(Error::InvalidUrl(reason.clone()));
        }
        let Some(client) = &self.client else {
            return Err(Error::NotConfigured("no fallback endpoint".to_string()));
        };
        let req = match (&input.text, &input.url) {
            (Some(text), _) => FallbackRequest::for_text(text, input.target, input.generation_type),
            (None, Some(url)) => FallbackRequest::for_url(url, input.target, input.generation_type),
            (None, None) => {
                return Err(Error::NotConfigured("nothing to send".to_string()));
            }
        };
        Ok(client.generate(&req).await?.into())
    }
}

/// Calls the model directly. Refuses with `ModelCallDisabled` unless enabled.
#[derive(Debug, Clone)]
pub struct ModelTier {
    enabled: bool,
    client: Option<ModelClient>,
}

impl ModelTier {
    pub fn new(enabled: bool, client: Option<ModelClient>) -> Self {
        Self { enabled, client }
    }
}

#[async_trait::async_trait]
impl GenerationTier for ModelTier {
    fn kind(&self) -> TierKind {
        TierKind::ModelDirect
    }

    async fn attempt(&self, input: &TierInput) -> Result<TierOutcome> {
        if !self.enabled {
            return Err(Error::ModelCallDisabled);
        }
        let Some(client) = &self.client else {
            return Err(Error::NotConfigured("model client".to_string()));
        };
        let prompt = model::compose_prompt(
            input.text.as_deref(),
            input.url.as_deref(),
            input.target,
            input.generation_type,
        );
        let raw = client.complete(&prompt).await?;
        let (payload, parsed) = model::payload_from_reply(&raw);
        let mut outcome = TierOutcome::from(payload);
        if !parsed {
            debug!(reply_chars = raw.chars().count(), "model reply had no JSON object");
            outcome.notes.push("model_response_unparseable");
        }
        Ok(outcome)
    }
}

/// Template generator. Always produces text.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalTier;

#[async_trait::async_trait]
impl GenerationTier for LocalTier {
    fn kind(&self) -> TierKind {
        TierKind::Local
    }

    async fn attempt(&self, input: &TierInput) -> Result<TierOutcome> {
        Ok(TierOutcome {
            creative: Some(creative::generate_random(
                input.target,
                input.generation_type,
            )),
            ..TierOutcome::default()
        })
    }
}
