// Retrieval/answering engine
// Chooses between chunk retrieval over a prebuilt store and whole-document
// inline injection, composes the generation prompt, and surfaces expected
// per-query failures as typed results rather than panics or raw errors.


use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;

use anyhow::Context;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use itertools::Itertools;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, Document, INLINE_SIZE_LIMIT};
use crate::config::Config;
use crate::embeddings::OllamaClient;
use crate::gemini::GeminiClient;
use crate::knowledge::{self, Confidence};
use crate::router;
use crate::store::ChunkStore;
use crate::Result;

/// Engine lifecycle. Construction does not load anything; the caller holds
/// the handle and drives `initialize` explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    Initializing,
    Ready,
    Failed(String),
}

/// Expected, user-facing per-query failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AnswerError {
    #[error("{0}")]
    RoutingAmbiguous(String),
    #[error("{0}")]
    DocumentTooLarge(String),
    #[error("উত্তর তৈরি করা যায়নি: {0}")]
    GenerationFailed(String),
    #[error("Unknown book id '{0}'")]
    UnknownBook(String),
    #[error("Answering engine is not ready: {0}")]
    NotReady(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerMode {
    ChunkRetrieval,
    WholeDocument,
}

/// One cited source chunk with its integer similarity percentage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRef {
    pub book_title: String,
    pub text: String,
    pub similarity: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub answer: String,
    pub sources: Vec<SourceRef>,
    pub mode: AnswerMode,
}

pub struct QaEngine {
    config: Config,
    catalog: Catalog,
    ollama: OllamaClient,
    gemini: Option<GeminiClient>,
    stores: HashMap<String, ChunkStore>,
    state: EngineState,
}

impl QaEngine {
    /// Construct the engine with its collaborators injected up front.
    /// Nothing is loaded until `initialize` runs.
    #[inline]
    pub fn new(config: Config, catalog: Catalog) -> Result<Self> {
        let ollama = OllamaClient::new(&config).context("Failed to create embedding client")?;
        let gemini = GeminiClient::new(&config.gemini).ok();

        if gemini.is_none() {
            warn!("No generation API key available; whole-document answering disabled");
        }

        Ok(Self {
            config,
            catalog,
            ollama,
            gemini,
            stores: HashMap::new(),
            state: EngineState::Uninitialized,
        })
    }

    #[inline]
    pub fn state(&self) -> &EngineState {
        &self.state
    }

    /// Validate the catalog and load every present chunk store. A corrupt
    /// store file is skipped with a warning (the book degrades to
    /// whole-document mode or the size error); a broken catalog fails the
    /// engine outright.
    #[inline]
    pub fn initialize(&mut self) -> Result<()> {
        self.state = EngineState::Initializing;

        if let Err(e) = self.catalog.validate() {
            let message = format!("catalog validation failed: {e:#}");
            self.state = EngineState::Failed(message.clone());
            return Err(crate::QaError::Config(message));
        }

        let stores_dir = self.config.stores_dir_path();
        for document in self.catalog.documents() {
            match ChunkStore::load_for(document, &stores_dir) {
                Ok(Some(store)) => {
                    debug!(
                        "Loaded chunk store for '{}' ({} chunks)",
                        document.id, store.total_chunks
                    );
                    self.stores.insert(document.id.clone(), store);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("Skipping unreadable chunk store for '{}': {e:#}", document.id);
                }
            }
        }

        info!(
            "Engine ready: {} of {} books have chunk stores",
            self.stores.len(),
            self.catalog.documents().len()
        );
        self.state = EngineState::Ready;
        Ok(())
    }

    #[inline]
    pub fn has_store(&self, book_id: &str) -> bool {
        self.stores.contains_key(book_id)
    }

    /// Answer a question. `forced_book` bypasses the router but never the
    /// size gate.
    #[inline]
    pub fn answer(
        &self,
        question: &str,
        forced_book: Option<&str>,
    ) -> std::result::Result<Answer, AnswerError> {
        match &self.state {
            EngineState::Ready => {}
            EngineState::Failed(message) => {
                return Err(AnswerError::NotReady(message.clone()));
            }
            _ => {
                return Err(AnswerError::NotReady(
                    "initialize() has not completed".to_string(),
                ));
            }
        }

        let document = match forced_book {
            Some(book_id) => self
                .catalog
                .get(book_id)
                .ok_or_else(|| AnswerError::UnknownBook(book_id.to_string()))?,
            None => router::route(&self.catalog, question)
                .ok_or_else(|| AnswerError::RoutingAmbiguous(self.disambiguation_message()))?,
        };

        debug!("Answering against '{}'", document.id);

        if let Some(store) = self.stores.get(&document.id) {
            return self.answer_from_chunks(question, document, store);
        }

        if document.too_large_for_inline() {
            // Never attempt the generation call for an oversized book
            return Err(AnswerError::DocumentTooLarge(
                self.too_large_message(document),
            ));
        }

        self.answer_from_whole_document(question, document)
    }

    /// Chunk-retrieval mode: rank stored chunks against the question and
    /// compose the answer from the top matches. Embedding failure degrades
    /// the scoring to keyword overlap instead of failing the query.
    fn answer_from_chunks(
        &self,
        question: &str,
        document: &Document,
        store: &ChunkStore,
    ) -> std::result::Result<Answer, AnswerError> {
        let query_embedding = self.ollama.try_embed(question);
        if query_embedding.is_none() {
            debug!("Embedding service unavailable, falling back to keyword scoring");
        }

        let sources: Vec<SourceRef> = store
            .chunks
            .iter()
            .map(|chunk| {
                let score = match &query_embedding {
                    Some(vector) => cosine_similarity(vector, &chunk.embedding),
                    None => keyword_overlap(question, &chunk.text),
                };
                (score, chunk)
            })
            .sorted_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal))
            .take(self.config.retrieval.top_k)
            .map(|(score, chunk)| SourceRef {
                book_title: document.title.clone(),
                text: chunk.text.clone(),
                similarity: similarity_percent(score),
            })
            .collect();

        let gemini = self.gemini.as_ref().ok_or_else(|| {
            AnswerError::GenerationFailed("no generation API key configured".to_string())
        })?;

        let prompt = retrieval_prompt(question, document, &sources);
        let answer = gemini
            .generate(&prompt)
            .map_err(|e| AnswerError::GenerationFailed(format!("{e:#}")))?;

        Ok(Answer {
            answer,
            sources,
            mode: AnswerMode::ChunkRetrieval,
        })
    }

    /// Whole-document mode: the raw book, base64-encoded, plus a prompt
    /// carrying the question and a chapter hint when the locator found one.
    fn answer_from_whole_document(
        &self,
        question: &str,
        document: &Document,
    ) -> std::result::Result<Answer, AnswerError> {
        let gemini = self.gemini.as_ref().ok_or_else(|| {
            AnswerError::GenerationFailed("no generation API key configured".to_string())
        })?;

        let source_path = document.source_path(&self.config.books_dir_path());
        let bytes = fs::read(&source_path).map_err(|e| {
            AnswerError::GenerationFailed(format!(
                "could not read {}: {e}",
                source_path.display()
            ))
        })?;

        let encoded = BASE64.encode(&bytes);
        let prompt = whole_document_prompt(question, document);

        debug!(
            "Submitting '{}' inline ({} bytes) for generation",
            document.id,
            bytes.len()
        );

        let answer = gemini
            .generate_with_document(&prompt, "application/pdf", &encoded)
            .map_err(|e| AnswerError::GenerationFailed(format!("{e:#}")))?;

        Ok(Answer {
            answer,
            sources: Vec::new(),
            mode: AnswerMode::WholeDocument,
        })
    }

    /// Catalog entries currently answerable: chunk store present, or small
    /// enough for inline injection.
    fn usable_titles(&self) -> Vec<&str> {
        self.catalog
            .documents()
            .iter()
            .filter(|doc| self.stores.contains_key(&doc.id) || !doc.too_large_for_inline())
            .map(|doc| doc.title.as_str())
            .collect()
    }

    fn disambiguation_message(&self) -> String {
        let titles: Vec<&str> = self
            .catalog
            .documents()
            .iter()
            .map(|doc| doc.title.as_str())
            .collect();
        format!(
            "প্রশ্নটি কোন বইয়ের তা বোঝা যায়নি। অনুগ্রহ করে বিষয় বা বইয়ের নাম উল্লেখ করো। \
             সহায়তা করা যায় এই বইগুলোতে: {}।",
            titles.join(", ")
        )
    }

    fn too_large_message(&self, document: &Document) -> String {
        let usable = self.usable_titles();
        let usable_list = if usable.is_empty() {
            "এই মুহূর্তে কোনোটি নয়".to_string()
        } else {
            usable.join(", ")
        };
        format!(
            "দুঃখিত, '{}' বইটি সরাসরি ব্যবহারের জন্য খুব বড় ({} MB সীমার বেশি) এবং এর চাঙ্ক স্টোর \
             এখনো তৈরি হয়নি। এখন ব্যবহারযোগ্য বই: {}।",
            document.title,
            INLINE_SIZE_LIMIT / (1024 * 1024),
            usable_list
        )
    }
}

/// Prompt for chunk-retrieval mode: the question plus the retrieved
/// excerpts, with the same grounding instructions as whole-document mode.
fn retrieval_prompt(question: &str, document: &Document, sources: &[SourceRef]) -> String {
    let mut prompt = String::new();
    let _ = writeln!(
        prompt,
        "তুমি একজন সহায়ক শিক্ষক। নিচের পাঠ্যাংশগুলো '{}' (শ্রেণি {}) বই থেকে নেওয়া।",
        document.title, document.class
    );
    let _ = writeln!(prompt);

    for (i, source) in sources.iter().enumerate() {
        let _ = writeln!(prompt, "পাঠ্যাংশ {}:\n{}\n", i + 1, source.text);
    }

    let _ = writeln!(prompt, "প্রশ্ন: {question}");
    let _ = writeln!(prompt);
    let _ = writeln!(
        prompt,
        "নির্দেশনা:\n\
         - শুধুমাত্র উপরের পাঠ্যাংশ থেকে উত্তর দেবে।\n\
         - উত্তরের সাথে কোন পাঠ্যাংশ থেকে নিয়েছ তা উল্লেখ করবে।\n\
         - পাঠ্যাংশে উত্তর না থাকলে স্পষ্ট করে বলবে যে এখানে নেই; অনুমান করে উত্তর দেবে না।"
    );

    prompt
}

/// Prompt for whole-document mode, embedding the book metadata and the
/// chapter hint when the knowledge base located one.
fn whole_document_prompt(question: &str, document: &Document) -> String {
    let mut prompt = String::new();
    let _ = writeln!(
        prompt,
        "তুমি একজন সহায়ক শিক্ষক। সংযুক্ত বইটি হলো '{}' (শ্রেণি {})।",
        document.title, document.class
    );

    let located = knowledge::locate(&document.id, question);
    match located.chapter {
        Some(chapter) if located.confidence > Confidence::None => {
            let _ = writeln!(
                prompt,
                "সম্ভাব্য প্রাসঙ্গিক অধ্যায়: অধ্যায় {} ({}), পৃষ্ঠা {}। বিষয়: {}।",
                chapter.number,
                chapter.title,
                chapter.pages,
                chapter.topics.join(", ")
            );
        }
        _ => {}
    }

    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "প্রশ্ন: {question}");
    let _ = writeln!(prompt);
    let _ = writeln!(
        prompt,
        "নির্দেশনা:\n\
         - উত্তর শুধুমাত্র সংযুক্ত বইয়ের বিষয়বস্তু থেকে দেবে।\n\
         - কোন পৃষ্ঠা বা অধ্যায় থেকে উত্তর নিয়েছ তা উল্লেখ করবে।\n\
         - বইয়ে উত্তরটি না থাকলে স্পষ্ট করে বলবে যে বইয়ে এটি নেই; বাইরের জ্ঞান থেকে বানিয়ে দেবে না।"
    );

    prompt
}

/// Cosine similarity; zero when dimensions differ or a vector has no norm.
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Fallback scoring when the embedding service is down: the fraction of
/// query words (longer than two characters) present in the chunk.
#[inline]
pub fn keyword_overlap(query: &str, text: &str) -> f32 {
    let text_lower = text.to_lowercase();
    let query_words: Vec<String> = query
        .to_lowercase()
        .split_whitespace()
        .filter(|word| word.chars().count() > 2)
        .map(|word| word.to_string())
        .collect();

    if query_words.is_empty() {
        return 0.0;
    }

    let hits = query_words
        .iter()
        .filter(|word| text_lower.contains(word.as_str()))
        .count();

    hits as f32 / query_words.len() as f32
}

/// Integer similarity percentage in 0..=100.
#[inline]
pub fn similarity_percent(score: f32) -> u8 {
    (score.clamp(0.0, 1.0) * 100.0).round() as u8
}
