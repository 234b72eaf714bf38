//! End-to-end online path: routing, store-backed retrieval, and the
//! whole-document fallback against mocked embedding and generation services.

use std::fs;

use chrono::Utc;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shikkha_qa::catalog::{Catalog, Subject};
use shikkha_qa::config::Config;
use shikkha_qa::engine::{AnswerError, AnswerMode, QaEngine};
use shikkha_qa::extract::ExtractionMethod;
use shikkha_qa::store::{ChunkStore, StoreMetadata, StoredChunk};

fn base_config(base: &TempDir, ollama_uri: &str, gemini_uri: &str) -> Config {
    let url = Url::parse(ollama_uri).expect("mock URI parses");
    let mut config = Config {
        base_dir: base.path().to_path_buf(),
        ..Config::default()
    };
    config.ollama.host = url.host_str().expect("host present").to_string();
    config.ollama.port = url.port().expect("port present");
    config.gemini.endpoint = gemini_uri.to_string();
    config.gemini.api_key = "integration-test-key".to_string();
    config
}

fn physics_store() -> ChunkStore {
    let catalog = Catalog::builtin();
    let doc = catalog.get("physics-9-10").expect("book exists");

    let texts = [
        "নিউটনের গতিসূত্র অনুযায়ী বল প্রয়োগে ত্বরণ হয়।",
        "শব্দ তরঙ্গের কম্পাঙ্ক এবং তরঙ্গদৈর্ঘ্য।",
        "কাজ ক্ষমতা ও শক্তির সম্পর্ক।",
    ];
    let embeddings = [[1.0f32, 0.0], [0.0, 1.0], [0.5, 0.5]];

    let chunks = texts
        .iter()
        .zip(embeddings.iter())
        .enumerate()
        .map(|(i, (text, embedding))| StoredChunk {
            id: format!("physics_9_10-{i}"),
            book_id: doc.id.clone(),
            chunk_index: i,
            text: (*text).to_string(),
            embedding: embedding.to_vec(),
            token_count: text.split_whitespace().count(),
            class: doc.class.clone(),
            subject: Subject::Physics,
        })
        .collect::<Vec<_>>();

    ChunkStore {
        metadata: StoreMetadata::for_document(doc, ExtractionMethod::Ocr),
        total_pages: 336,
        total_chunks: chunks.len(),
        chunks,
        processed_at: Utc::now(),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn store_backed_question_returns_ranked_sources() {
    let ollama = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "embedding": [1.0, 0.0]
        })))
        .mount(&ollama)
        .await;

    let gemini = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.0-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{ "content": { "parts": [{
                "text": "নিউটনের সূত্র অনুযায়ী F = ma।"
            }] } }]
        })))
        .mount(&gemini)
        .await;

    let base = TempDir::new().expect("can create temp dir");
    let config = base_config(&base, &ollama.uri(), &gemini.uri());

    physics_store()
        .save(&config.stores_dir_path())
        .expect("store saves");

    let answer = tokio::task::spawn_blocking(move || {
        let mut engine = QaEngine::new(config, Catalog::builtin()).expect("engine constructs");
        engine.initialize().expect("initialize succeeds");
        engine.answer("force এবং ত্বরণের সম্পর্ক কী?", None)
    })
    .await
    .expect("task completes")
    .expect("answer succeeds");

    assert_eq!(answer.mode, AnswerMode::ChunkRetrieval);
    assert!(answer.answer.contains("F = ma"));
    assert!(!answer.sources.is_empty());

    // Ranked by similarity, best first, as integer percentages
    assert!(answer.sources[0].text.contains("নিউটনের"));
    assert_eq!(answer.sources[0].similarity, 100);
    for pair in answer.sources.windows(2) {
        assert!(pair[0].similarity >= pair[1].similarity);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn oversized_unindexed_book_yields_error_not_answer() {
    let ollama = MockServer::start().await;
    let gemini = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&gemini)
        .await;

    let base = TempDir::new().expect("can create temp dir");
    let config = base_config(&base, &ollama.uri(), &gemini.uri());

    let result = tokio::task::spawn_blocking(move || {
        let mut engine = QaEngine::new(config, Catalog::builtin()).expect("engine constructs");
        engine.initialize().expect("initialize succeeds");
        engine.answer("উচ্চতর গণিত: সমীকরণ সমাধান করো", None)
    })
    .await
    .expect("task completes");

    match result {
        Err(AnswerError::DocumentTooLarge(message)) => assert!(!message.is_empty()),
        other => panic!("expected DocumentTooLarge, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn forced_small_book_uses_whole_document_injection() {
    let ollama = MockServer::start().await;
    let gemini = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.0-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{ "content": { "parts": [{
                "text": "Passive voice is explained in chapter 3."
            }] } }]
        })))
        .expect(1)
        .mount(&gemini)
        .await;

    let base = TempDir::new().expect("can create temp dir");
    let config = base_config(&base, &ollama.uri(), &gemini.uri());

    let books_dir = config.books_dir_path();
    fs::create_dir_all(&books_dir).expect("can create books dir");
    fs::write(
        books_dir.join("english_grammar_9_10.pdf"),
        b"%PDF-1.4 grammar fixture",
    )
    .expect("can write book");

    let answer = tokio::task::spawn_blocking(move || {
        let mut engine = QaEngine::new(config, Catalog::builtin()).expect("engine constructs");
        engine.initialize().expect("initialize succeeds");
        engine.answer("explain passive voice", Some("english-grammar-9-10"))
    })
    .await
    .expect("task completes")
    .expect("answer succeeds");

    assert_eq!(answer.mode, AnswerMode::WholeDocument);
    assert!(answer.answer.contains("chapter 3"));
}
