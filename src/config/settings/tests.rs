use super::*;
use tempfile::TempDir;

#[test]
fn default_config_is_valid() {
    let config = Config::default();
    config.validate().expect("defaults should validate");
}

#[test]
fn load_missing_file_returns_defaults() {
    let temp_dir = TempDir::new().expect("can create temp dir");
    let config = Config::load_from(temp_dir.path()).expect("load should succeed");

    assert_eq!(config.ollama, OllamaConfig::default());
    assert_eq!(config.base_dir, temp_dir.path());
}

#[test]
fn save_and_reload_roundtrip() {
    let temp_dir = TempDir::new().expect("can create temp dir");
    let mut config = Config {
        base_dir: temp_dir.path().to_path_buf(),
        ..Config::default()
    };
    config.ollama.model = "custom-model:latest".to_string();
    config.chunking.max_chunk_size = 300;
    config.retrieval.top_k = 5;

    config.save().expect("save should succeed");

    let reloaded = Config::load_from(temp_dir.path()).expect("reload should succeed");
    assert_eq!(reloaded.ollama.model, "custom-model:latest");
    assert_eq!(reloaded.chunking.max_chunk_size, 300);
    assert_eq!(reloaded.retrieval.top_k, 5);
}

#[test]
fn invalid_protocol_rejected() {
    let mut config = Config::default();
    config.ollama.protocol = "ftp".to_string();

    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidProtocol(_))
    ));
}

#[test]
fn empty_embedding_model_rejected() {
    let mut config = Config::default();
    config.ollama.model = "  ".to_string();

    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidModel(_))
    ));
}

#[test]
fn overlap_must_stay_below_chunk_size() {
    let mut config = Config::default();
    config.chunking.max_chunk_size = 100;
    config.chunking.overlap = 100;

    assert!(matches!(
        config.validate(),
        Err(ConfigError::OverlapTooLarge(100, 100))
    ));
}

#[test]
fn zero_top_k_rejected() {
    let mut config = Config::default();
    config.retrieval.top_k = 0;

    assert!(matches!(config.validate(), Err(ConfigError::InvalidTopK(0))));
}

#[test]
fn books_dir_defaults_under_base_dir() {
    let temp_dir = TempDir::new().expect("can create temp dir");
    let config = Config {
        base_dir: temp_dir.path().to_path_buf(),
        ..Config::default()
    };

    assert_eq!(config.books_dir_path(), temp_dir.path().join("books"));
    assert_eq!(config.stores_dir_path(), temp_dir.path().join("stores"));
}

#[test]
fn explicit_books_dir_wins() {
    let mut config = Config::default();
    config.ingest.books_dir = Some(PathBuf::from("/data/books"));

    assert_eq!(config.books_dir_path(), PathBuf::from("/data/books"));
}
