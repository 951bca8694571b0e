//! Direct calls to a generative text model (Gemini `generateContent`).
//!
//! Off by default: calling a hosted model straight from the client means shipping the API key
//! with it. Prefer the fallback endpoint, which keeps the key server-side.

use serde::Serialize;
use wordbloom_core::{CreativePayload, Error, GenerationType, Result};

/// Longest model reply we scan for a JSON object, in bytes.
const MAX_SCAN_BYTES: usize = 256 * 1024;

#[derive(Debug, Clone)]
pub struct ModelClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct ReqPart {
    text: String,
}

#[derive(Debug, Serialize)]
struct ReqContent {
    parts: Vec<ReqPart>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenCfg {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateReq {
    contents: Vec<ReqContent>,
    generation_config: GenCfg,
}

impl ModelClient {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        model: &str,
        api_key: Option<String>,
    ) -> Result<Self> {
        let api_key = api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                Error::NotConfigured(
                    "missing WORDBLOOM_GEMINI_API_KEY (or GEMINI_API_KEY)".to_string(),
                )
            })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
        })
    }

    fn endpoint_generate(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    /// Send `prompt` and return the model's raw reply text.
    pub async fn complete(&self, prompt: &str) -> Result<String> {
        let req = GenerateReq {
            contents: vec![ReqContent {
                parts: vec![ReqPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenCfg {
                temperature: 0.9,
                max_output_tokens: 1024,
            },
        };
        let resp = self
            .client
            .post(self.endpoint_generate())
            .header("x-goog-api-key", &self.api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| Error::ServerUnavailable(format!("model request failed: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::ServerUnavailable(format!("model HTTP {status}")));
        }
        let v: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| Error::ModelResponseUnparseable(format!("bad json: {e}")))?;
        Ok(response_text(&v))
    }
}

/// The prompt asks for strict JSON so the reply can carry counts and the creative text together.
pub fn compose_prompt(
    text: Option<&str>,
    url: Option<&str>,
    target: char,
    kind: GenerationType,
) -> String {
    let source = match (text, url) {
        (Some(t), _) => format!("TEXT:\n{t}"),
        (None, Some(u)) => format!("The text could not be fetched. Its source URL was: {u}"),
        (None, None) => "No text was provided.".to_string(),
    };
    format!(
        "Count the total number of words in the text below, and how many of them start with the \
         character '{target}' (case-insensitive). Then write a short {kind} inspired by the \
         character '{target}'.\n\
         Respond with strictly one JSON object and nothing else, shaped like \
         {{\"totalWords\": <number>, \"startsWithCount\": <number>, \"creative\": \"<text>\"}}.\n\n\
         {source}"
    )
}

/// Pull the reply text out of a provider response: Gemini `candidates[0].content.parts[*].text`,
/// then OpenAI-style `choices[0].message.content` / `choices[0].text`, then a top-level `text`.
/// Anything else is returned serialized whole.
pub fn response_text(v: &serde_json::Value) -> String {
    if let Some(parts) = v
        .pointer("/candidates/0/content/parts")
        .and_then(|x| x.as_array())
    {
        let texts: Vec<&str> = parts
            .iter()
            .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
            .collect();
        if !texts.is_empty() {
            return texts.join("\n");
        }
    }
    for ptr in ["/choices/0/message/content", "/choices/0/text", "/text"] {
        if let Some(s) = v.pointer(ptr).and_then(|x| x.as_str()) {
            return s.to_string();
        }
    }
    v.to_string()
}

/// Find the first balanced `{...}` group in `raw` that decodes as a JSON object.
///
/// Prose before and after is ignored, as are braces inside JSON strings. Only the first
/// `MAX_SCAN_BYTES` of `raw` are considered.
pub fn extract_first_json_object(raw: &str) -> Result<serde_json::Value> {
    let mut end = raw.len().min(MAX_SCAN_BYTES);
    while !raw.is_char_boundary(end) {
        end -= 1;
    }
    let hay = &raw[..end];

    let mut search_from = 0usize;
    while let Some(rel) = hay[search_from..].find('{') {
        let start = search_from + rel;
        if let Some(close) = balanced_end(&hay[start..]) {
            let candidate = &hay[start..start + close];
            if let Ok(v @ serde_json::Value::Object(_)) =
                serde_json::from_str::<serde_json::Value>(candidate)
            {
                return Ok(v);
            }
        }
        search_from = start + 1;
    }
    Err(Error::ModelResponseUnparseable(
        "no JSON object found in model reply".to_string(),
    ))
}

/// Byte length of the brace group starting at `s[0] == '{'`, if it closes.
fn balanced_end(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_str = false;
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        if in_str {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_str = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_str = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Model reply as a payload. Unparseable replies keep their raw text as the creative text.
pub fn payload_from_reply(raw: &str) -> (CreativePayload, bool) {
    match extract_first_json_object(raw)
        .ok()
        .and_then(|v| CreativePayload::from_value(&v))
    {
        Some(p) => (p, true),
        None => {
            let creative = Some(raw.trim().to_string()).filter(|s| !s.is_empty());
            (
                CreativePayload {
                    creative,
                    ..CreativePayload::default()
                },
                false,
            )
        }
    }
}
