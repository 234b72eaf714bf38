// Chunking module
// Sentence-boundary splitting with word overlap between adjacent chunks.
// Token counts are whitespace-delimited word counts, a deliberate
// approximation rather than a true tokenizer.


use serde::{Deserialize, Serialize};

/// Configuration for text chunking
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Soft maximum chunk size in words. A single oversized sentence may
    /// still exceed it.
    pub max_chunk_size: usize,
    /// Words carried over from the end of one chunk into the next.
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            max_chunk_size: 500,
            overlap: 50,
        }
    }
}

/// Sentence terminators for the supported scripts: Latin terminal
/// punctuation plus the Bengali danda.
const SENTENCE_TERMINATORS: [char; 4] = ['.', '?', '!', '\u{0964}'];

#[inline]
pub fn estimate_word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Split text into sentence-like units. A boundary is a terminator followed
/// by whitespace, so decimals and abbreviations without trailing space do
/// not split.
#[inline]
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        current.push(ch);

        if SENTENCE_TERMINATORS.contains(&ch) {
            let at_boundary = match chars.peek() {
                Some(next) => next.is_whitespace(),
                None => true,
            };

            if at_boundary {
                let sentence = current.trim();
                if !sentence.is_empty() {
                    sentences.push(sentence.to_string());
                }
                current.clear();

                while chars.peek().is_some_and(|c| c.is_whitespace()) {
                    chars.next();
                }
            }
        }
    }

    let trailing = current.trim();
    if !trailing.is_empty() {
        sentences.push(trailing.to_string());
    }

    sentences
}

/// Chunk text into overlapping, size-bounded segments.
///
/// Sentences accumulate until adding the next one would push the running
/// word count past `max_chunk_size`; the chunk is then closed and the next
/// chunk is seeded with the last `overlap` words of the closed chunk so
/// retrieval does not lose context at boundaries.
#[inline]
pub fn chunk_text(text: &str, max_chunk_size: usize, overlap: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_words = 0usize;

    for sentence in split_sentences(text) {
        let sentence_words = estimate_word_count(&sentence);

        if current_words + sentence_words > max_chunk_size && current_words > 0 {
            let closed = current.trim().to_string();
            let seed = tail_words(&closed, overlap);
            chunks.push(closed);

            current = seed;
            current_words = estimate_word_count(&current);
        }

        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&sentence);
        current_words += sentence_words;
    }

    let trailing = current.trim();
    if !trailing.is_empty() {
        chunks.push(trailing.to_string());
    }

    chunks
}

/// The last `count` whitespace-delimited words of `text`.
fn tail_words(text: &str, count: usize) -> String {
    if count == 0 {
        return String::new();
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    let start = words.len().saturating_sub(count);
    words
        .get(start..)
        .map(|tail| tail.join(" "))
        .unwrap_or_default()
}

/// Sanitize extracted text before chunking: drop characters outside the
/// allow-list (Bengali block, Bengali and ASCII digits, ASCII letters, a
/// small punctuation set) and collapse whitespace runs. This removes OCR
/// noise glyphs and layout artifacts.
#[inline]
pub fn sanitize_text(text: &str) -> String {
    let filtered: String = text.chars().filter(|&ch| is_allowed(ch)).collect();

    filtered.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_allowed(ch: char) -> bool {
    if ch.is_whitespace() || ch.is_ascii_alphanumeric() {
        return true;
    }

    // Bengali Unicode block, including Bengali digits
    if ('\u{0980}'..='\u{09FF}').contains(&ch) {
        return true;
    }

    matches!(
        ch,
        '.' | ','
            | ';'
            | ':'
            | '?'
            | '!'
            | '\u{0964}'
            | '-'
            | '('
            | ')'
            | '['
            | ']'
            | '\''
            | '"'
            | '/'
            | '+'
            | '='
            | '%'
    )
}
