//! End-to-end offline pipeline: a plain-text book is extracted, chunked,
//! embedded against a mocked service, and persisted as a chunk store.

use std::fs;

use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shikkha_qa::catalog::{Catalog, Document, Subject};
use shikkha_qa::config::Config;
use shikkha_qa::ingest::{DocumentOutcome, IngestPipeline};
use shikkha_qa::store::ChunkStore;

fn test_document() -> Document {
    Document {
        id: "bangla-notes".to_string(),
        title: "বাংলা নোট".to_string(),
        filename: "bangla_notes.txt".to_string(),
        class: "9-10".to_string(),
        subject: Subject::Physics,
        size_bytes: 2048,
    }
}

fn test_config(base: &TempDir, server_uri: &str) -> Config {
    let url = Url::parse(server_uri).expect("mock URI parses");
    let mut config = Config {
        base_dir: base.path().to_path_buf(),
        ..Config::default()
    };
    config.ollama.host = url.host_str().expect("host present").to_string();
    config.ollama.port = url.port().expect("port present");
    config.ingest.embed_delay_ms = 0;
    config.chunking.max_chunk_size = 8;
    config.chunking.overlap = 2;
    config
}

#[tokio::test(flavor = "multi_thread")]
async fn offline_pipeline_builds_store_with_overlapping_chunks() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "embedding": [0.25, 0.5, 0.25]
        })))
        .mount(&server)
        .await;

    let base = TempDir::new().expect("can create temp dir");
    let config = test_config(&base, &server.uri());

    let books_dir = config.books_dir_path();
    fs::create_dir_all(&books_dir).expect("can create books dir");
    fs::write(
        books_dir.join("bangla_notes.txt"),
        "one two three four five six. seven eight nine ten eleven twelve. \
         thirteen fourteen fifteen sixteen seventeen eighteen.",
    )
    .expect("can write book");

    let document = test_document();
    let stores_dir = config.stores_dir_path();
    let overlap = config.chunking.overlap;

    let report = tokio::task::spawn_blocking({
        let pipeline = IngestPipeline::new(config, Catalog::from_documents(vec![document.clone()]))
            .expect("pipeline constructs")
            .without_progress();
        move || pipeline.run(None)
    })
    .await
    .expect("task completes")
    .expect("run succeeds");

    assert_eq!(report.stats.documents_stored, 1);
    assert!(matches!(
        report.outcomes[0].1,
        DocumentOutcome::Stored { .. }
    ));

    let store = ChunkStore::load_for(&document, &stores_dir)
        .expect("load succeeds")
        .expect("store written");
    store.validate().expect("store is consistent");

    assert_eq!(store.metadata.book_id, "bangla-notes");
    assert_eq!(store.total_pages, 1);
    assert!(store.total_chunks > 1);

    // Adjacent chunks share the configured word overlap
    for pair in store.chunks.windows(2) {
        let prev_words: Vec<&str> = pair[0].text.split_whitespace().collect();
        let next_words: Vec<&str> = pair[1].text.split_whitespace().collect();
        assert_eq!(
            &prev_words[prev_words.len() - overlap..],
            &next_words[..overlap],
            "chunks {} and {} must overlap",
            pair[0].chunk_index,
            pair[1].chunk_index
        );
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn rerun_replaces_store_file() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "embedding": [1.0]
        })))
        .mount(&server)
        .await;

    let base = TempDir::new().expect("can create temp dir");
    let config = test_config(&base, &server.uri());

    let books_dir = config.books_dir_path();
    fs::create_dir_all(&books_dir).expect("can create books dir");
    let book_path = books_dir.join("bangla_notes.txt");
    fs::write(&book_path, "first version text one two three four five.").expect("can write book");

    let document = test_document();
    let stores_dir = config.stores_dir_path();
    let catalog = Catalog::from_documents(vec![document.clone()]);

    let pipeline = IngestPipeline::new(config, catalog)
        .expect("pipeline constructs")
        .without_progress();

    let pipeline = tokio::task::spawn_blocking(move || {
        pipeline.run(None).expect("first run succeeds");
        pipeline
    })
    .await
    .expect("task completes");

    let first = ChunkStore::load_for(&document, &stores_dir)
        .expect("load succeeds")
        .expect("store written");

    fs::write(&book_path, "second version. much shorter.").expect("can rewrite book");

    tokio::task::spawn_blocking(move || {
        pipeline.run(None).expect("second run succeeds");
    })
    .await
    .expect("task completes");

    let second = ChunkStore::load_for(&document, &stores_dir)
        .expect("load succeeds")
        .expect("store written");

    assert_ne!(first.chunks, second.chunks);
    assert!(second.chunks[0].text.contains("second version"));
}
