// Ingest module
// Offline batch pipeline: extract → sanitize → chunk → embed → persist,
// one document fully processed before the next. Per-item failures are
// recovered locally so one bad document or chunk never aborts the batch.

#[cfg(test)]
mod tests;

use std::thread;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, Document};
use crate::chunker::{chunk_text, estimate_word_count, sanitize_text};
use crate::config::Config;
use crate::embeddings::OllamaClient;
use crate::extract::Extractor;
use crate::store::{ChunkStore, StoreMetadata, StoredChunk};
use crate::{QaError, Result};

/// Outcome for one catalog document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentOutcome {
    Stored {
        chunks: usize,
        dropped: usize,
    },
    /// Neither the text layer nor OCR produced usable content.
    ExtractionFailed {
        reason: String,
    },
    /// Every embedding call failed; no store is written for this run.
    EmbeddingUnavailable,
    /// The source file is absent from the books directory.
    SourceMissing,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IngestStats {
    pub documents_stored: usize,
    pub documents_failed: usize,
    pub documents_missing: usize,
    pub chunks_created: usize,
    pub chunks_dropped: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub outcomes: Vec<(String, DocumentOutcome)>,
    pub stats: IngestStats,
}

pub struct IngestPipeline {
    config: Config,
    catalog: Catalog,
    extractor: Extractor,
    ollama: OllamaClient,
    show_progress: bool,
}

impl IngestPipeline {
    #[inline]
    pub fn new(config: Config, catalog: Catalog) -> Result<Self> {
        let extractor = Extractor::new(config.extraction.clone());
        let ollama = OllamaClient::new(&config).context("Failed to create embedding client")?;

        Ok(Self {
            config,
            catalog,
            extractor,
            ollama,
            show_progress: true,
        })
    }

    #[inline]
    pub fn without_progress(mut self) -> Self {
        self.show_progress = false;
        self
    }

    /// Process the catalog sequentially, optionally restricted to one book.
    /// Returns per-document outcomes; individual failures are recorded, not
    /// propagated.
    #[inline]
    pub fn run(&self, only_book: Option<&str>) -> Result<IngestReport> {
        self.catalog.validate()?;

        if let Some(book_id) = only_book {
            if self.catalog.get(book_id).is_none() {
                return Err(QaError::Store(format!(
                    "unknown book id '{book_id}'; see `list` for the catalog"
                )));
            }
        }

        let mut outcomes = Vec::new();
        let mut stats = IngestStats::default();

        for document in self.catalog.documents() {
            if only_book.is_some_and(|id| id != document.id) {
                continue;
            }

            info!("Processing '{}'", document.id);
            let outcome = self.process_document(document);

            match &outcome {
                DocumentOutcome::Stored { chunks, dropped } => {
                    stats.documents_stored += 1;
                    stats.chunks_created += chunks;
                    stats.chunks_dropped += dropped;
                    info!(
                        "Stored '{}': {} chunks ({} dropped)",
                        document.id, chunks, dropped
                    );
                }
                DocumentOutcome::ExtractionFailed { reason } => {
                    stats.documents_failed += 1;
                    warn!("Extraction failed for '{}': {}", document.id, reason);
                }
                DocumentOutcome::EmbeddingUnavailable => {
                    stats.documents_failed += 1;
                    warn!(
                        "Embedding service unavailable while processing '{}'",
                        document.id
                    );
                }
                DocumentOutcome::SourceMissing => {
                    stats.documents_missing += 1;
                    warn!(
                        "Source file {} not found for '{}'",
                        document.filename, document.id
                    );
                }
            }

            outcomes.push((document.id.clone(), outcome));
        }

        Ok(IngestReport { outcomes, stats })
    }

    fn process_document(&self, document: &Document) -> DocumentOutcome {
        let source_path = document.source_path(&self.config.books_dir_path());
        if !source_path.exists() {
            return DocumentOutcome::SourceMissing;
        }

        let extracted = match self.extractor.extract(&source_path, document.kind()) {
            Ok(extracted) => extracted,
            Err(e) => {
                return DocumentOutcome::ExtractionFailed {
                    reason: format!("{e:#}"),
                };
            }
        };

        debug!(
            "Extracted {} pages from '{}' via {}",
            extracted.page_count, document.id, extracted.method
        );

        let sanitized = sanitize_text(&extracted.text);
        let chunk_texts = chunk_text(
            &sanitized,
            self.config.chunking.max_chunk_size,
            self.config.chunking.overlap,
        );

        if chunk_texts.is_empty() {
            return DocumentOutcome::ExtractionFailed {
                reason: "no chunks produced after sanitization".to_string(),
            };
        }

        let (chunks, dropped) = self.embed_chunks(document, chunk_texts);

        if chunks.is_empty() {
            return DocumentOutcome::EmbeddingUnavailable;
        }

        let store = ChunkStore {
            metadata: StoreMetadata::for_document(document, extracted.method),
            total_pages: extracted.page_count,
            total_chunks: chunks.len(),
            chunks,
            processed_at: Utc::now(),
        };

        match store.save(&self.config.stores_dir_path()) {
            Ok(path) => {
                debug!("Wrote chunk store {}", path.display());
                DocumentOutcome::Stored {
                    chunks: store.total_chunks,
                    dropped,
                }
            }
            Err(e) => DocumentOutcome::ExtractionFailed {
                reason: format!("failed to persist chunk store: {e:#}"),
            },
        }
    }

    /// Embed chunks sequentially with a fixed delay between requests.
    /// A failed embedding drops that chunk for this run; survivors are
    /// reindexed so the stored sequence stays contiguous from 0.
    fn embed_chunks(
        &self,
        document: &Document,
        chunk_texts: Vec<String>,
    ) -> (Vec<StoredChunk>, usize) {
        let progress = if self.show_progress {
            let bar = ProgressBar::new(chunk_texts.len() as u64);
            bar.set_style(
                ProgressStyle::with_template(
                    "{msg} [{bar:40.cyan/blue}] {pos}/{len} chunks",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            bar.set_message(document.id.clone());
            Some(bar)
        } else {
            None
        };

        let stem = document.file_stem();
        let delay = Duration::from_millis(self.config.ingest.embed_delay_ms);
        let mut chunks = Vec::with_capacity(chunk_texts.len());
        let mut dropped = 0usize;

        for text in chunk_texts {
            let embedded = self.ollama.try_embed(&text);

            if let Some(bar) = &progress {
                bar.inc(1);
            }

            match embedded {
                Some(embedding) => {
                    let chunk_index = chunks.len();
                    let token_count = estimate_word_count(&text);
                    chunks.push(StoredChunk {
                        id: format!("{stem}-{chunk_index}"),
                        book_id: document.id.clone(),
                        chunk_index,
                        text,
                        embedding,
                        token_count,
                        class: document.class.clone(),
                        subject: document.subject,
                    });
                }
                None => {
                    dropped += 1;
                }
            }

            if !delay.is_zero() {
                thread::sleep(delay);
            }
        }

        if let Some(bar) = &progress {
            bar.finish_and_clear();
        }

        (chunks, dropped)
    }
}
