#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

use crate::chunker::ChunkingConfig;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OllamaConfig {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub model: String,
}

impl Default for OllamaConfig {
    #[inline]
    fn default() -> Self {
        Self {
            protocol: "http".to_string(),
            host: "localhost".to_string(),
            port: 11434,
            // Multilingual model; Bangla plus Latin text in the same corpus.
            model: "bge-m3:latest".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeminiConfig {
    pub endpoint: String,
    pub model: String,
    /// Empty means "read GEMINI_API_KEY from the environment".
    pub api_key: String,
}

impl Default for GeminiConfig {
    #[inline]
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-2.0-flash".to_string(),
            api_key: String::new(),
        }
    }
}

impl GeminiConfig {
    /// Resolve the API key from config or the environment.
    #[inline]
    pub fn resolve_api_key(&self) -> Option<String> {
        if !self.api_key.trim().is_empty() {
            return Some(self.api_key.clone());
        }
        std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Minimum filtered word count for a direct text layer to be accepted.
    pub min_direct_words: usize,
    pub ocr_dpi: u32,
    /// OCR is capped to the first N pages to bound processing time.
    pub max_ocr_pages: usize,
    /// Tesseract language spec, dominant script plus Latin.
    pub ocr_languages: String,
}

impl Default for ExtractionConfig {
    #[inline]
    fn default() -> Self {
        Self {
            min_direct_words: 100,
            ocr_dpi: 300,
            max_ocr_pages: 10,
            ocr_languages: "ben+eng".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IngestConfig {
    /// Directory holding the source book files. Defaults to `<base_dir>/books`.
    pub books_dir: Option<PathBuf>,
    /// Pacing between embedding requests against the local service.
    pub embed_delay_ms: u64,
}

impl Default for IngestConfig {
    #[inline]
    fn default() -> Self {
        Self {
            books_dir: None,
            embed_delay_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of chunks returned as sources per answer.
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    #[inline]
    fn default() -> Self {
        Self { top_k: 4 }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid port: {0} (must be between 1 and 65535)")]
    InvalidPort(u16),
    #[error("Invalid model name: {0} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid protocol: {0} (must be 'http' or 'https')")]
    InvalidProtocol(String),
    #[error("Invalid minimum direct word count: {0} (must be between 1 and 10000)")]
    InvalidMinDirectWords(usize),
    #[error("Invalid OCR DPI: {0} (must be between 72 and 600)")]
    InvalidOcrDpi(u32),
    #[error("Invalid OCR page cap: {0} (must be between 1 and 100)")]
    InvalidMaxOcrPages(usize),
    #[error("Invalid OCR language spec: {0} (cannot be empty)")]
    InvalidOcrLanguages(String),
    #[error("Invalid max chunk size: {0} (must be between 50 and 4096)")]
    InvalidMaxChunkSize(usize),
    #[error("Invalid overlap: {0} (must be between 0 and 512)")]
    InvalidOverlap(usize),
    #[error("Overlap ({0}) must be smaller than max chunk size ({1})")]
    OverlapTooLarge(usize, usize),
    #[error("Invalid embed delay: {0}ms (must be 10000ms or less)")]
    InvalidEmbedDelay(u64),
    #[error("Invalid top-k: {0} (must be between 1 and 20)")]
    InvalidTopK(usize),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Default for Config {
    #[inline]
    fn default() -> Self {
        Self {
            ollama: OllamaConfig::default(),
            gemini: GeminiConfig::default(),
            extraction: ExtractionConfig::default(),
            chunking: ChunkingConfig::default(),
            ingest: IngestConfig::default(),
            retrieval: RetrievalConfig::default(),
            base_dir: Config::config_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }
}

impl Config {
    #[inline]
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join("shikkha-qa"))
            .ok_or(ConfigError::DirectoryError)
    }

    #[inline]
    pub fn load() -> Result<Self> {
        let config_dir = Self::config_dir().context("Failed to resolve config directory")?;
        Self::load_from(config_dir)
    }

    #[inline]
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join("config.toml");

        if !config_path.exists() {
            return Ok(Self {
                base_dir: config_dir.as_ref().to_path_buf(),
                ..Self::default()
            });
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.base_dir = config_dir.as_ref().to_path_buf();

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        fs::create_dir_all(&self.base_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                self.base_dir.display()
            )
        })?;

        let config_path = self.config_file_path();
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ollama.validate()?;
        self.gemini.validate()?;
        self.extraction.validate()?;
        self.validate_chunking()?;

        if self.ingest.embed_delay_ms > 10_000 {
            return Err(ConfigError::InvalidEmbedDelay(self.ingest.embed_delay_ms));
        }

        if !(1..=20).contains(&self.retrieval.top_k) {
            return Err(ConfigError::InvalidTopK(self.retrieval.top_k));
        }

        Ok(())
    }

    fn validate_chunking(&self) -> Result<(), ConfigError> {
        let chunking = &self.chunking;

        if !(50..=4096).contains(&chunking.max_chunk_size) {
            return Err(ConfigError::InvalidMaxChunkSize(chunking.max_chunk_size));
        }

        if chunking.overlap > 512 {
            return Err(ConfigError::InvalidOverlap(chunking.overlap));
        }

        if chunking.overlap >= chunking.max_chunk_size {
            return Err(ConfigError::OverlapTooLarge(
                chunking.overlap,
                chunking.max_chunk_size,
            ));
        }

        Ok(())
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.base_dir.join("config.toml")
    }

    /// Directory holding one chunk-store JSON file per book
    #[inline]
    pub fn stores_dir_path(&self) -> PathBuf {
        self.base_dir.join("stores")
    }

    /// Directory holding the source book files
    #[inline]
    pub fn books_dir_path(&self) -> PathBuf {
        self.ingest
            .books_dir
            .clone()
            .unwrap_or_else(|| self.base_dir.join("books"))
    }

    #[inline]
    pub fn ollama_url(&self) -> Result<Url, ConfigError> {
        self.ollama.ollama_url()
    }
}

impl OllamaConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.protocol != "http" && self.protocol != "https" {
            return Err(ConfigError::InvalidProtocol(self.protocol.clone()));
        }

        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port));
        }

        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.model.clone()));
        }

        self.ollama_url()?;

        Ok(())
    }

    pub fn ollama_url(&self) -> Result<Url, ConfigError> {
        let url_str = format!("{}://{}:{}", self.protocol, self.host, self.port);
        Url::parse(&url_str).map_err(|_| ConfigError::InvalidUrl(url_str))
    }
}

impl GeminiConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.model.clone()));
        }

        Url::parse(&self.endpoint).map_err(|_| ConfigError::InvalidUrl(self.endpoint.clone()))?;

        Ok(())
    }
}

impl ExtractionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=10_000).contains(&self.min_direct_words) {
            return Err(ConfigError::InvalidMinDirectWords(self.min_direct_words));
        }

        if !(72..=600).contains(&self.ocr_dpi) {
            return Err(ConfigError::InvalidOcrDpi(self.ocr_dpi));
        }

        if !(1..=100).contains(&self.max_ocr_pages) {
            return Err(ConfigError::InvalidMaxOcrPages(self.max_ocr_pages));
        }

        if self.ocr_languages.trim().is_empty() {
            return Err(ConfigError::InvalidOcrLanguages(self.ocr_languages.clone()));
        }

        Ok(())
    }
}
