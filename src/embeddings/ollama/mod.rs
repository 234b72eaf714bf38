
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::config::Config;

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Blocking client for the local embedding service.
///
/// Failures deliberately do not retry: a chunk whose embedding call fails is
/// dropped for the processing run, and the online path degrades to keyword
/// scoring instead.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: Url,
    model: String,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct EmbedRequest {
    model: String,
    prompt: String,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

impl OllamaClient {
    #[inline]
    pub fn new(config: &Config) -> Result<Self> {
        let base_url = config
            .ollama_url()
            .context("Failed to build embedding service URL from config")?;

        Ok(Self::from_base_url(base_url, config.ollama.model.clone()))
    }

    #[inline]
    pub fn from_base_url(base_url: Url, model: String) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
            .build()
            .into();

        Self {
            base_url,
            model,
            agent,
        }
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        self
    }

    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Check whether the service is responsive.
    #[inline]
    pub fn ping(&self) -> Result<()> {
        let url = self
            .base_url
            .join("/api/version")
            .context("Failed to build ping URL")?;

        self.agent
            .get(url.as_str())
            .call()
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .context("Failed to ping embedding service")?;

        debug!("Embedding service ping successful");
        Ok(())
    }

    /// Generate an embedding for a single text. Any network or non-2xx
    /// failure surfaces as an error the caller maps to "skip this chunk".
    #[inline]
    pub fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbedRequest {
            model: self.model.clone(),
            prompt: text.to_string(),
        };

        let url = self
            .base_url
            .join("/api/embeddings")
            .context("Failed to build embedding URL")?;

        let request_json =
            serde_json::to_string(&request).context("Failed to serialize embedding request")?;

        let response_text = self
            .agent
            .post(url.as_str())
            .header("Content-Type", "application/json")
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .context("Embedding request failed")?;

        let embed_response: EmbedResponse =
            serde_json::from_str(&response_text).context("Failed to parse embedding response")?;

        if embed_response.embedding.is_empty() {
            anyhow::bail!("embedding service returned an empty vector");
        }

        debug!(
            "Generated embedding with {} dimensions",
            embed_response.embedding.len()
        );

        Ok(embed_response.embedding)
    }

    /// Best-effort embedding: `None` means the chunk is skipped or the
    /// caller falls back to keyword scoring.
    #[inline]
    pub fn try_embed(&self, text: &str) -> Option<Vec<f32>> {
        match self.embed(text) {
            Ok(vector) => Some(vector),
            Err(e) => {
                debug!("Embedding unavailable: {e:#}");
                None
            }
        }
    }
}
