// Chunk store module
// One JSON artifact per book: chunks, vectors, and denormalized document
// metadata. Written only by the offline pipeline with full-file overwrite
// semantics; read-only at query time.


use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{Document, Subject};
use crate::extract::ExtractionMethod;
use crate::Result;

/// Denormalized document fields carried inside the store file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreMetadata {
    pub book_id: String,
    pub title: String,
    pub filename: String,
    pub class: String,
    pub subject: Subject,
    pub size_bytes: u64,
    pub extraction_method: ExtractionMethod,
}

impl StoreMetadata {
    #[inline]
    pub fn for_document(document: &Document, method: ExtractionMethod) -> Self {
        Self {
            book_id: document.id.clone(),
            title: document.title.clone(),
            filename: document.filename.clone(),
            class: document.class.clone(),
            subject: document.subject,
            size_bytes: document.size_bytes,
            extraction_method: method,
        }
    }
}

/// Unit of retrieval. Ordering is significant: adjacent chunks overlap in
/// content, and indices stay contiguous from 0 among survivors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredChunk {
    pub id: String,
    pub book_id: String,
    pub chunk_index: usize,
    pub text: String,
    pub embedding: Vec<f32>,
    /// Approximate: whitespace-split word count.
    pub token_count: usize,
    pub class: String,
    pub subject: Subject,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkStore {
    pub metadata: StoreMetadata,
    pub total_pages: usize,
    pub total_chunks: usize,
    pub chunks: Vec<StoredChunk>,
    pub processed_at: DateTime<Utc>,
}

impl ChunkStore {
    /// Persist the store, fully replacing any prior file for the book.
    #[inline]
    pub fn save(&self, stores_dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(stores_dir).with_context(|| {
            format!("Failed to create stores directory: {}", stores_dir.display())
        })?;

        let path = stores_dir.join(format!("{}.json", self.metadata.book_id));
        let content =
            serde_json::to_string_pretty(self).context("Failed to serialize chunk store")?;

        fs::write(&path, content)
            .with_context(|| format!("Failed to write chunk store: {}", path.display()))?;

        Ok(path)
    }

    #[inline]
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read chunk store: {}", path.display()))?;

        let store: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse chunk store: {}", path.display()))?;

        store.validate()?;

        Ok(store)
    }

    /// Load the store for a document if one has been built.
    #[inline]
    pub fn load_for(document: &Document, stores_dir: &Path) -> Result<Option<Self>> {
        let path = document.store_path(stores_dir);
        if !path.exists() {
            return Ok(None);
        }
        Self::load(&path).map(Some)
    }

    #[inline]
    pub fn exists_for(document: &Document, stores_dir: &Path) -> bool {
        document.store_path(stores_dir).exists()
    }

    /// Schema invariants: chunk count agrees, indices are contiguous from 0.
    #[inline]
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.total_chunks != self.chunks.len() {
            bail!(
                "chunk store for '{}' declares {} chunks but holds {}",
                self.metadata.book_id,
                self.total_chunks,
                self.chunks.len()
            );
        }

        for (expected, chunk) in self.chunks.iter().enumerate() {
            if chunk.chunk_index != expected {
                bail!(
                    "chunk store for '{}' has a gap: expected index {}, found {}",
                    self.metadata.book_id,
                    expected,
                    chunk.chunk_index
                );
            }
            if chunk.book_id != self.metadata.book_id {
                bail!(
                    "chunk {} belongs to '{}', not '{}'",
                    chunk.id,
                    chunk.book_id,
                    self.metadata.book_id
                );
            }
        }

        Ok(())
    }
}
