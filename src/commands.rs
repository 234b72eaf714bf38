use anyhow::{Context, Result};
use console::style;
use tracing::info;

use crate::catalog::Catalog;
use crate::config::Config;
use crate::embeddings::OllamaClient;
use crate::engine::{AnswerError, AnswerMode, QaEngine};
use crate::extract::command_available;
use crate::ingest::{DocumentOutcome, IngestPipeline};
use crate::store::ChunkStore;

/// Run the offline pipeline over the catalog (or a single book).
#[inline]
pub fn run_ingest(book: Option<String>) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    let catalog = Catalog::builtin();

    info!("Starting ingest over {}", config.books_dir_path().display());

    let pipeline = IngestPipeline::new(config, catalog)?;
    let report = pipeline.run(book.as_deref())?;

    println!();
    println!("Ingest complete:");
    for (book_id, outcome) in &report.outcomes {
        match outcome {
            DocumentOutcome::Stored { chunks, dropped } => {
                println!(
                    "  {} {} — {} chunks stored, {} dropped",
                    style("✓").green(),
                    book_id,
                    chunks,
                    dropped
                );
            }
            DocumentOutcome::ExtractionFailed { reason } => {
                println!(
                    "  {} {} — extraction failed: {}",
                    style("✗").red(),
                    book_id,
                    reason
                );
            }
            DocumentOutcome::EmbeddingUnavailable => {
                println!(
                    "  {} {} — embedding service unavailable, no store written",
                    style("✗").red(),
                    book_id
                );
            }
            DocumentOutcome::SourceMissing => {
                println!(
                    "  {} {} — source file not found",
                    style("-").yellow(),
                    book_id
                );
            }
        }
    }

    println!();
    println!(
        "  {} stored, {} failed, {} missing ({} chunks, {} dropped)",
        report.stats.documents_stored,
        report.stats.documents_failed,
        report.stats.documents_missing,
        report.stats.chunks_created,
        report.stats.chunks_dropped
    );

    Ok(())
}

/// Answer a question, optionally pinned to one book.
#[inline]
pub fn run_ask(question: &str, book: Option<String>) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    let mut engine = QaEngine::new(config, Catalog::builtin())?;
    engine.initialize()?;

    match engine.answer(question, book.as_deref()) {
        Ok(answer) => {
            println!();
            println!("{}", answer.answer);

            if !answer.sources.is_empty() {
                println!();
                println!("{}", style("উৎস:").bold());
                for source in &answer.sources {
                    let snippet: String = source.text.chars().take(120).collect();
                    println!(
                        "  [{}%] {} — {}",
                        style(source.similarity).cyan(),
                        style(&source.book_title).bold(),
                        snippet
                    );
                }
            }

            if answer.mode == AnswerMode::WholeDocument {
                println!();
                println!("{}", style("(সম্পূর্ণ বই থেকে উত্তর দেওয়া হয়েছে)").dim());
            }
        }
        Err(
            e @ (AnswerError::RoutingAmbiguous(_)
            | AnswerError::DocumentTooLarge(_)
            | AnswerError::GenerationFailed(_)),
        ) => {
            // Expected conditions; surface the user-facing message directly
            println!();
            println!("{}", style(e).yellow());
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}

/// List the catalog with per-book store status.
#[inline]
pub fn list_books() -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    let catalog = Catalog::builtin();
    let stores_dir = config.stores_dir_path();

    println!("Supported textbooks ({} total):", catalog.documents().len());
    println!();

    for doc in catalog.documents() {
        println!("📚 {} ({})", style(&doc.title).bold(), doc.id);
        println!("   Class: {}  Subject: {}", doc.class, doc.subject);
        println!(
            "   Size: {:.1} MB{}",
            doc.size_bytes as f64 / (1024.0 * 1024.0),
            if doc.too_large_for_inline() {
                " (above inline ceiling)"
            } else {
                ""
            }
        );

        match ChunkStore::load_for(doc, &stores_dir) {
            Ok(Some(store)) => {
                println!(
                    "   Chunk store: {} chunks, processed {}",
                    store.total_chunks,
                    store.processed_at.format("%Y-%m-%d %H:%M:%S")
                );
            }
            Ok(None) => println!("   Chunk store: not built"),
            Err(e) => println!("   Chunk store: unreadable ({e:#})"),
        }

        println!();
    }

    Ok(())
}

/// Health report: config, embedding service, generation key, stores.
#[inline]
pub fn show_status() -> Result<()> {
    let config = Config::load().unwrap_or_default();
    let catalog = Catalog::builtin();

    println!("📊 Shikkha QA Status");
    println!("{}", "=".repeat(40));
    println!();

    println!("🤖 Embedding Service:");
    match OllamaClient::new(&config) {
        Ok(client) => match client.ping() {
            Ok(()) => {
                println!(
                    "   ✅ Reachable ({}:{})",
                    config.ollama.host, config.ollama.port
                );
                println!("   📋 Model: {}", config.ollama.model);
            }
            Err(e) => {
                println!("   ❌ Unreachable: {e:#}");
            }
        },
        Err(e) => {
            println!("   ❌ Invalid configuration: {e:#}");
        }
    }

    println!();
    println!("✨ Generation Service:");
    println!("   Endpoint: {}", config.gemini.endpoint);
    println!("   Model: {}", config.gemini.model);
    if config.gemini.resolve_api_key().is_some() {
        println!("   ✅ API key configured");
    } else {
        println!("   ❌ No API key (set GEMINI_API_KEY or run `config`)");
    }

    println!();
    println!("🛠️  Extraction Tools:");
    for tool in ["pdftotext", "pdfinfo", "pdftoppm", "tesseract"] {
        if command_available(tool) {
            println!("   ✅ {tool}");
        } else {
            println!("   ❌ {tool} (not on PATH)");
        }
    }

    println!();
    println!("📚 Chunk Stores:");
    let stores_dir = config.stores_dir_path();
    let mut built = 0usize;
    for doc in catalog.documents() {
        if ChunkStore::exists_for(doc, &stores_dir) {
            println!("   ✅ {}", doc.id);
            built += 1;
        } else {
            println!("   ⏳ {} (not built)", doc.id);
        }
    }
    println!(
        "   {} of {} books indexed under {}",
        built,
        catalog.documents().len(),
        stores_dir.display()
    );

    println!();
    println!("💡 Next Steps:");
    println!("   • Use `ingest` to build chunk stores from the books directory");
    println!("   • Use `ask \"<question>\"` to get an answer with sources");

    Ok(())
}
