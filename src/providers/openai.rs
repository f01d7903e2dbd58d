//! OpenAI-backed providers (Chat Completions API, text + vision).
//!
//! Both ask the model for a JSON object `{score, verdict, flags, reasoning}`.
//! Replies wrapped in Markdown code fences are unwrapped before parsing;
//! missing fields fall back to neutral values and scores are clamped.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

use super::{ImageInput, ImageSignalProvider, ProviderError, TextInput, TextSignalProvider};
use crate::signal::{SignalResult, UNAVAILABLE_SCORE, UNAVAILABLE_VERDICT};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

const MAX_TEXT_FLAGS: usize = 4;
const MAX_IMAGE_FLAGS: usize = 3;
const MAX_IMAGES: usize = 3;

const TEXT_SYSTEM_PROMPT: &str = "You review rental listings for fraud. You receive the listing text \
together with an observation from a price check against local market data. Reason across both: a \
price already flagged as far below market combined with urgency or advance-payment pressure is a much \
stronger scam indicator than either alone. Typical red flags: urgency (urgent, today only, hurry, \
jaldi karo, sirf aaj), advance or token payment requests, WhatsApp-only contact, vague descriptions, \
an owner-abroad story, claims that many others are interested. Reply with ONLY a JSON object: \
{\"score\": <0-100, 100 = certain scam>, \"verdict\": \"Likely Genuine\" | \"Suspicious\" | \"High Scam Risk\", \
\"flags\": [<up to 4 red flags quoting the evidence>], \"reasoning\": <two sentences linking the price and text signals>}";

const IMAGE_SYSTEM_PROMPT: &str = "You check photos attached to a rental listing for signs that they \
are not genuine: stock or hotel-style photography, interiors that do not match the listed region or \
property type, watermarks from other sites, signs of editing, or generic lifestyle pictures that do \
not show the property. Reply with ONLY a JSON object: {\"score\": <0-100, 100 = certainly not the \
real property>, \"verdict\": \"Looks Genuine\" | \"Suspicious\" | \"Likely Stolen\", \"flags\": [<up to 3 \
issues>], \"reasoning\": <one sentence>}";

/// Connection settings shared by both providers.
#[derive(Debug, Clone)]
pub struct OpenAiSettings {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

struct ChatClient {
    http: reqwest::Client,
    settings: OpenAiSettings,
}

impl ChatClient {
    fn new(settings: OpenAiSettings) -> Result<Self, ProviderError> {
        if settings.api_key.trim().is_empty() {
            return Err(ProviderError::Config("missing OpenAI API key".into()));
        }
        let http = reqwest::Client::builder()
            .user_agent(concat!("listing-risk-analyzer/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(4))
            .timeout(settings.timeout)
            .build()
            .map_err(|e| ProviderError::Config(e.to_string()))?;
        Ok(Self { http, settings })
    }

    async fn complete(&self, system: &str, user: Value) -> Result<String, ProviderError> {
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Value>,
            temperature: f32,
            max_tokens: u32,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: Option<String>,
        }

        let req = Req {
            model: &self.settings.model,
            messages: vec![
                json!({ "role": "system", "content": system }),
                json!({ "role": "user", "content": user }),
            ],
            temperature: 0.1,
            max_tokens: 600,
        };

        let url = format!("{}/chat/completions", self.settings.base_url.trim_end_matches('/'));
        let resp = self
            .http
            .post(url)
            .bearer_auth(&self.settings.api_key)
            .json(&req)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                body: truncate(&body, 300),
            });
        }

        let body: Resp = resp.json().await?;
        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ProviderError::Parse("empty completion".into()))
    }
}

/// LLM text analysis.
pub struct OpenAiTextProvider {
    client: ChatClient,
}

impl OpenAiTextProvider {
    pub fn new(settings: OpenAiSettings) -> Result<Self, ProviderError> {
        Ok(Self {
            client: ChatClient::new(settings)?,
        })
    }
}

#[async_trait]
impl TextSignalProvider for OpenAiTextProvider {
    async fn evaluate(&self, input: &TextInput) -> Result<SignalResult, ProviderError> {
        let reply = self
            .client
            .complete(TEXT_SYSTEM_PROMPT, Value::String(input.render()))
            .await?;
        parse_signal_reply(&reply, MAX_TEXT_FLAGS)
    }
    fn name(&self) -> &'static str {
        "openai"
    }
}

/// LLM vision analysis of up to three listing photos.
pub struct OpenAiImageProvider {
    client: ChatClient,
}

impl OpenAiImageProvider {
    pub fn new(settings: OpenAiSettings) -> Result<Self, ProviderError> {
        Ok(Self {
            client: ChatClient::new(settings)?,
        })
    }
}

#[async_trait]
impl ImageSignalProvider for OpenAiImageProvider {
    async fn evaluate(&self, images: &[ImageInput]) -> Result<SignalResult, ProviderError> {
        let mut content = vec![json!({
            "type": "text",
            "text": "Analyze these rental property photos for scam indicators."
        })];
        for img in images.iter().take(MAX_IMAGES) {
            if img.bytes.is_empty() {
                return Err(ProviderError::InvalidInput("empty image".into()));
            }
            if !img.media_type.starts_with("image/") {
                return Err(ProviderError::InvalidInput(format!(
                    "unsupported media type '{}'",
                    img.media_type
                )));
            }
            content.push(json!({
                "type": "image_url",
                "image_url": {
                    "url": format!("data:{};base64,{}", img.media_type, STANDARD.encode(&img.bytes))
                }
            }));
        }

        let reply = self
            .client
            .complete(IMAGE_SYSTEM_PROMPT, Value::Array(content))
            .await?;
        parse_signal_reply(&reply, MAX_IMAGE_FLAGS)
    }
    fn name(&self) -> &'static str {
        "openai"
    }
}

#[derive(Debug, Deserialize)]
struct RawSignal {
    score: Option<f64>,
    verdict: Option<String>,
    #[serde(default)]
    flags: Vec<String>,
    reasoning: Option<String>,
}

/// Parse a model reply into a signal. Public for tests/tools.
pub fn parse_signal_reply(reply: &str, max_flags: usize) -> Result<SignalResult, ProviderError> {
    let payload = strip_code_fence(reply);
    let raw: RawSignal = serde_json::from_str(payload)
        .map_err(|e| ProviderError::Parse(format!("{e}: {}", truncate(payload, 120))))?;

    let score = raw
        .score
        .filter(|s| s.is_finite())
        .map(|s| s.round() as i64)
        .unwrap_or_else(|| i64::from(UNAVAILABLE_SCORE));
    let flags = raw
        .flags
        .into_iter()
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty())
        .take(max_flags)
        .collect();

    Ok(SignalResult::new(
        score,
        raw.verdict.unwrap_or_else(|| UNAVAILABLE_VERDICT.to_string()),
        flags,
        raw.reasoning
            .unwrap_or_else(|| "Analysis completed".to_string()),
    ))
}

/// Unwrap ```json ... ``` or ``` ... ``` if present.
fn strip_code_fence(s: &str) -> &str {
    let t = s.trim();
    let Some(start) = t.find("```") else {
        return t;
    };
    let after = &t[start + 3..];
    let after = after.strip_prefix("json").unwrap_or(after);
    match after.find("```") {
        Some(end) => after[..end].trim(),
        None => after.trim(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((i, _)) => format!("{}…", &s[..i]),
        None => s.to_string(),
    }
}
