// Embeddings module
// Client for the local embedding service

pub mod ollama;

pub use ollama::OllamaClient;
