use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("fetch blocked: {0}")]
    FetchBlocked(String),
    #[error("server unavailable: {0}")]
    ServerUnavailable(String),
    #[error("direct model calls are disabled")]
    ModelCallDisabled,
    #[error("model response unparseable: {0}")]
    ModelResponseUnparseable(String),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("not configured: {0}")]
    NotConfigured(String),
}

impl Error {
    /// Stable snake_case code, suitable for `notes` and JSON error payloads.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation",
            Error::FetchBlocked(_) => "fetch_blocked",
            Error::ServerUnavailable(_) => "server_unavailable",
            Error::ModelCallDisabled => "model_call_disabled",
            Error::ModelResponseUnparseable(_) => "model_response_unparseable",
            Error::InvalidUrl(_) => "invalid_url",
            Error::NotConfigured(_) => "not_configured",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum GenerationType {
    Haiku,
    Riddle,
    Poem,
}

impl GenerationType {
    pub const ALL: [GenerationType; 3] = [
        GenerationType::Haiku,
        GenerationType::Riddle,
        GenerationType::Poem,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationType::Haiku => "haiku",
            GenerationType::Riddle => "riddle",
            GenerationType::Poem => "poem",
        }
    }
}

impl fmt::Display for GenerationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GenerationType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "haiku" => Ok(GenerationType::Haiku),
            "riddle" => Ok(GenerationType::Riddle),
            "poem" => Ok(GenerationType::Poem),
            other => Err(Error::Validation(format!(
                "unknown generation type {other:?} (expected haiku, riddle or poem)"
            ))),
        }
    }
}

/// One user action: the pasted text (or URL), the character to count, and what to generate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub raw_input: String,
    pub target_char: String,
    pub generation_type: GenerationType,
}

/// An `AnalysisRequest` that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest<'a> {
    /// Trimmed input; never empty.
    pub input: &'a str,
    pub target: char,
    pub generation_type: GenerationType,
}

impl AnalysisRequest {
    pub fn new(
        raw_input: impl Into<String>,
        target_char: impl Into<String>,
        generation_type: GenerationType,
    ) -> Self {
        Self {
            raw_input: raw_input.into(),
            target_char: target_char.into(),
            generation_type,
        }
    }

    /// Input and target are trimmed first; the target must then be exactly one character.
    pub fn validate(&self) -> Result<ValidatedRequest<'_>> {
        let input = self.raw_input.trim();
        if input.is_empty() {
            return Err(Error::Validation(
                "please paste or fetch some text first".to_string(),
            ));
        }
        let target = parse_target_char(&self.target_char)?;
        Ok(ValidatedRequest {
            input,
            target,
            generation_type: self.generation_type,
        })
    }
}

pub fn parse_target_char(s: &str) -> Result<char> {
    let mut chars = s.trim().chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        (None, _) => Err(Error::Validation(
            "please enter a letter or number to analyze".to_string(),
        )),
        (Some(_), Some(_)) => Err(Error::Validation(
            "target must be exactly one character".to_string(),
        )),
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TextStats {
    pub total_words: usize,
    pub starts_with_count: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InputPath {
    Text,
    Url,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TierKind {
    Server,
    ModelDirect,
    Local,
}

impl TierKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TierKind::Server => "server",
            TierKind::ModelDirect => "model_direct",
            TierKind::Local => "local",
        }
    }

    pub fn is_remote(&self) -> bool {
        !matches!(self, TierKind::Local)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub total_words: usize,
    /// Always `<= total_words`.
    pub starts_with_count: usize,
    pub creative_text: Option<String>,
    pub creative_source: Option<TierKind>,
    pub path: InputPath,
    /// Recovered failures and merge decisions, as stable codes.
    pub notes: Vec<String>,
}

/// What a generation tier gets to work with.
#[derive(Debug, Clone)]
pub struct TierInput {
    /// Cleaned text, when we have it (text path, or a URL we could fetch).
    pub text: Option<String>,
    pub url: Option<String>,
    pub target: char,
    pub generation_type: GenerationType,
    /// Stats computed locally from `text` (all-zero when there is no text).
    pub local_stats: TextStats,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TierOutcome {
    pub total_words: Option<usize>,
    pub starts_with_count: Option<usize>,
    pub creative: Option<String>,
    pub notes: Vec<&'static str>,
}

impl TierOutcome {
    pub fn has_creative(&self) -> bool {
        self.creative
            .as_deref()
            .is_some_and(|s| s.chars().any(|c| !c.is_whitespace()))
    }
}

impl From<CreativePayload> for TierOutcome {
    fn from(p: CreativePayload) -> Self {
        Self {
            total_words: p.total_words.map(|n| n as usize),
            starts_with_count: p.starts_with_count.map(|n| n as usize),
            creative: p.creative,
            notes: Vec::new(),
        }
    }
}

/// Retrieves a URL and returns sanitized, bounded plain text.
#[async_trait::async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch_text(&self, url: &str) -> Result<String>;
}

/// One strategy for producing creative text.
#[async_trait::async_trait]
pub trait GenerationTier: Send + Sync {
    fn kind(&self) -> TierKind;
    async fn attempt(&self, input: &TierInput) -> Result<TierOutcome>;
}

/// Body for the fallback generation endpoint. Exactly one of `url`/`text` is set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FallbackRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub target_char: String,
    pub generation_type: GenerationType,
}

impl FallbackRequest {
    pub fn for_url(url: &str, target: char, generation_type: GenerationType) -> Self {
        Self {
            url: Some(url.to_string()),
            text: None,
            target_char: target.to_string(),
            generation_type,
        }
    }

    pub fn for_text(text: &str, target: char, generation_type: GenerationType) -> Self {
        Self {
            url: None,
            text: Some(text.to_string()),
            target_char: target.to_string(),
            generation_type,
        }
    }
}

/// `{totalWords?, startsWithCount?, creative?}`: the shape both the fallback endpoint and the
/// model are asked to return. Any field may be absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreativePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_words: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starts_with_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creative: Option<String>,
}

impl CreativePayload {
    /// Lenient decode: numbers may arrive as JSON numbers or numeric strings, and fields of the
    /// wrong type are treated as absent. Returns `None` when `v` is not an object.
    pub fn from_value(v: &serde_json::Value) -> Option<Self> {
        let obj = v.as_object()?;
        let count = |key: &str| -> Option<u64> {
            match obj.get(key)? {
                serde_json::Value::Number(n) => n
                    .as_u64()
                    .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
                serde_json::Value::String(s) => s.trim().parse::<u64>().ok(),
                _ => None,
            }
        };
        let creative = obj
            .get("creative")
            .and_then(|x| x.as_str())
            .map(|s| s.to_string())
            .filter(|s| !s.trim().is_empty());
        Some(Self {
            total_words: count("totalWords"),
            starts_with_count: count("startsWithCount"),
            creative,
        })
    }
}
