use super::*;
use crate::catalog::Subject;
use std::fs;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn txt_document(id: &str, filename: &str) -> Document {
    Document {
        id: id.to_string(),
        title: "টেস্ট বই".to_string(),
        filename: filename.to_string(),
        class: "9-10".to_string(),
        subject: Subject::Physics,
        size_bytes: 1024,
    }
}

fn test_config(base: &TempDir, server_uri: &str) -> Config {
    let url = Url::parse(server_uri).expect("mock server URI parses");
    let mut config = Config {
        base_dir: base.path().to_path_buf(),
        ..Config::default()
    };
    config.ollama.host = url.host_str().expect("host present").to_string();
    config.ollama.port = url.port().expect("port present");
    config.ingest.embed_delay_ms = 0;
    config.chunking.max_chunk_size = 5;
    config.chunking.overlap = 1;
    config
}

fn write_book(config: &Config, filename: &str, content: &str) {
    let books_dir = config.books_dir_path();
    fs::create_dir_all(&books_dir).expect("can create books dir");
    fs::write(books_dir.join(filename), content).expect("can write book file");
}

fn pipeline(config: Config, document: Document) -> IngestPipeline {
    IngestPipeline::new(config, Catalog::from_documents(vec![document]))
        .expect("pipeline construction succeeds")
        .without_progress()
}

#[tokio::test(flavor = "multi_thread")]
async fn txt_book_produces_contiguous_store() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "embedding": [0.5, 0.5, 0.5]
        })))
        .mount(&server)
        .await;

    let base = TempDir::new().expect("can create temp dir");
    let config = test_config(&base, &server.uri());
    let document = txt_document("test-book", "test_book.txt");
    write_book(
        &config,
        "test_book.txt",
        "one two three four. five six seven eight. nine ten eleven twelve.",
    );

    let stores_dir = config.stores_dir_path();
    let report = tokio::task::spawn_blocking({
        let pipeline = pipeline(config, document.clone());
        move || pipeline.run(None)
    })
    .await
    .expect("task completes")
    .expect("run succeeds");

    assert_eq!(report.stats.documents_stored, 1);
    assert!(report.stats.chunks_created > 1);
    assert_eq!(report.stats.chunks_dropped, 0);

    let store = ChunkStore::load_for(&document, &stores_dir)
        .expect("load succeeds")
        .expect("store written");
    store.validate().expect("store is internally consistent");

    for (i, chunk) in store.chunks.iter().enumerate() {
        assert_eq!(chunk.chunk_index, i);
        assert_eq!(chunk.id, format!("test_book-{i}"));
        assert_eq!(chunk.embedding, vec![0.5, 0.5, 0.5]);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_embedding_drops_chunk_and_reindexes() {
    let server = MockServer::start().await;

    // First request fails, everything after succeeds; the dropped chunk
    // must not leave a gap in the surviving sequence
    Mock::given(method("POST"))
        .and(path("/api/embeddings"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "embedding": [1.0, 0.0]
        })))
        .mount(&server)
        .await;

    let base = TempDir::new().expect("can create temp dir");
    let config = test_config(&base, &server.uri());
    let document = txt_document("test-book", "test_book.txt");
    write_book(
        &config,
        "test_book.txt",
        "one two three four. five six seven eight. nine ten eleven twelve.",
    );

    let stores_dir = config.stores_dir_path();
    let report = tokio::task::spawn_blocking({
        let pipeline = pipeline(config, document.clone());
        move || pipeline.run(None)
    })
    .await
    .expect("task completes")
    .expect("run succeeds");

    assert_eq!(report.stats.chunks_dropped, 1);
    assert!(report.stats.chunks_created >= 1);

    let store = ChunkStore::load_for(&document, &stores_dir)
        .expect("load succeeds")
        .expect("store written");
    store.validate().expect("surviving chunks stay contiguous");
}

#[tokio::test(flavor = "multi_thread")]
async fn embedding_service_down_writes_no_store() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let base = TempDir::new().expect("can create temp dir");
    let config = test_config(&base, &server.uri());
    let document = txt_document("test-book", "test_book.txt");
    write_book(&config, "test_book.txt", "some words worth chunking here.");

    let stores_dir = config.stores_dir_path();
    let report = tokio::task::spawn_blocking({
        let pipeline = pipeline(config, document.clone());
        move || pipeline.run(None)
    })
    .await
    .expect("task completes")
    .expect("run succeeds");

    assert_eq!(
        report.outcomes[0].1,
        DocumentOutcome::EmbeddingUnavailable
    );
    assert!(!ChunkStore::exists_for(&document, &stores_dir));
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_source_recorded_and_batch_continues() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "embedding": [0.1]
        })))
        .mount(&server)
        .await;

    let base = TempDir::new().expect("can create temp dir");
    let config = test_config(&base, &server.uri());

    let missing = txt_document("missing-book", "missing.txt");
    let present = txt_document("present-book", "present.txt");
    write_book(&config, "present.txt", "actual content to chunk and store.");

    let catalog = Catalog::from_documents(vec![missing, present]);
    let report = tokio::task::spawn_blocking({
        let pipeline = IngestPipeline::new(config, catalog)
            .expect("pipeline construction succeeds")
            .without_progress();
        move || pipeline.run(None)
    })
    .await
    .expect("task completes")
    .expect("run succeeds");

    assert_eq!(report.stats.documents_missing, 1);
    assert_eq!(report.stats.documents_stored, 1);
    assert_eq!(report.outcomes[0].1, DocumentOutcome::SourceMissing);
}

#[test]
fn unknown_book_filter_is_an_error() {
    let base = TempDir::new().expect("can create temp dir");
    let config = Config {
        base_dir: base.path().to_path_buf(),
        ..Config::default()
    };
    let pipeline = IngestPipeline::new(config, Catalog::builtin())
        .expect("pipeline construction succeeds")
        .without_progress();

    assert!(pipeline.run(Some("no-such-book")).is_err());
}
