// Generation client
// Composes generateContent calls against a Gemini-style endpoint, either
// plain text or text plus an inline base64 document part. The wire format
// is the collaborator's, copied as-is.


use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde_json::{Value, json};
use tracing::debug;

use crate::config::GeminiConfig;

const DEFAULT_TIMEOUT_SECONDS: u64 = 60;
const MAX_OUTPUT_TOKENS: u32 = 2048;
const TEMPERATURE: f32 = 0.2;

#[derive(Debug, Clone)]
pub struct GeminiClient {
    agent: ureq::Agent,
    endpoint: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    #[inline]
    pub fn new(config: &GeminiConfig) -> Result<Self> {
        let api_key = config
            .resolve_api_key()
            .ok_or_else(|| anyhow!("no Gemini API key configured (set GEMINI_API_KEY)"))?;

        Ok(Self::with_key(
            config.endpoint.clone(),
            config.model.clone(),
            api_key,
        ))
    }

    #[inline]
    pub fn with_key(endpoint: String, model: String, api_key: String) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
            .build()
            .into();

        Self {
            agent,
            endpoint,
            model,
            api_key,
        }
    }

    /// Plain-text generation.
    #[inline]
    pub fn generate(&self, prompt: &str) -> Result<String> {
        let body = build_request_body(prompt, None);
        self.call(&body)
    }

    /// Multimodal generation: the whole document as an inline base64 part
    /// ahead of the text prompt.
    #[inline]
    pub fn generate_with_document(
        &self,
        prompt: &str,
        mime_type: &str,
        data_base64: &str,
    ) -> Result<String> {
        let body = build_request_body(prompt, Some((mime_type, data_base64)));
        self.call(&body)
    }

    fn call(&self, body: &Value) -> Result<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.endpoint.trim_end_matches('/'),
            self.model,
            self.api_key,
        );

        debug!("Generation request to model {}", self.model);

        let request_json =
            serde_json::to_string(body).context("Failed to serialize generation request")?;

        let response_text = self
            .agent
            .post(&url)
            .header("Content-Type", "application/json")
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .context("Generation request failed")?;

        let response: Value = serde_json::from_str(&response_text)
            .context("Failed to parse generation response")?;

        extract_answer_text(&response)
    }
}

/// Build the generateContent body. The inline document part, when present,
/// precedes the text prompt.
fn build_request_body(prompt: &str, inline: Option<(&str, &str)>) -> Value {
    let mut parts = Vec::new();

    if let Some((mime_type, data)) = inline {
        parts.push(json!({
            "inlineData": {
                "mimeType": mime_type,
                "data": data,
            }
        }));
    }

    parts.push(json!({ "text": prompt }));

    json!({
        "contents": [{
            "role": "user",
            "parts": parts,
        }],
        "generationConfig": {
            "temperature": TEMPERATURE,
            "maxOutputTokens": MAX_OUTPUT_TOKENS,
        },
    })
}

fn extract_answer_text(response: &Value) -> Result<String> {
    response["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .map(|text| text.trim().to_string())
        .ok_or_else(|| anyhow!("missing candidates[0].content.parts[0].text in response"))
}
