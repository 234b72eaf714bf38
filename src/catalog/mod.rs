// Book catalog
// Fixed, hand-maintained list of the supported textbooks. The offline
// pipeline scans the books directory, but the online router only ever
// consults this table.


use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

/// Ceiling for submitting a whole document inline to the generation call.
pub const INLINE_SIZE_LIMIT: u64 = 20 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subject {
    Mathematics,
    Physics,
    English,
}

impl Subject {
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Subject::Mathematics => "mathematics",
            Subject::Physics => "physics",
            Subject::English => "english",
        }
    }
}

impl std::fmt::Display for Subject {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Txt,
}

/// One source textbook. Immutable once cataloged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    /// Display title, usually in Bangla script.
    pub title: String,
    pub filename: String,
    /// Grade band, e.g. "9-10".
    pub class: String,
    pub subject: Subject,
    pub size_bytes: u64,
}

impl Document {
    /// Whether this document exceeds the inline-injection ceiling.
    #[inline]
    pub fn too_large_for_inline(&self) -> bool {
        self.size_bytes > INLINE_SIZE_LIMIT
    }

    #[inline]
    pub fn kind(&self) -> DocumentKind {
        if Path::new(&self.filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"))
        {
            DocumentKind::Txt
        } else {
            DocumentKind::Pdf
        }
    }

    /// Filename without extension, used to derive chunk ids.
    #[inline]
    pub fn file_stem(&self) -> String {
        Path::new(&self.filename)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(&self.filename)
            .to_string()
    }

    #[inline]
    pub fn source_path(&self, books_dir: &Path) -> PathBuf {
        books_dir.join(&self.filename)
    }

    #[inline]
    pub fn store_path(&self, stores_dir: &Path) -> PathBuf {
        stores_dir.join(format!("{}.json", self.id))
    }
}

#[derive(Debug, Clone)]
pub struct Catalog {
    documents: Vec<Document>,
}

impl Catalog {
    /// The supported textbook set. Sizes are the published PDF sizes and
    /// determine inline eligibility; they are not probed at runtime.
    #[inline]
    pub fn builtin() -> Self {
        let documents = vec![
            Document {
                id: "higher-math-9-10".to_string(),
                title: "উচ্চতর গণিত (নবম-দশম শ্রেণি)".to_string(),
                filename: "higher_math_9_10.pdf".to_string(),
                class: "9-10".to_string(),
                subject: Subject::Mathematics,
                size_bytes: 29_360_128,
            },
            Document {
                id: "physics-9-10".to_string(),
                title: "পদার্থবিজ্ঞান (নবম-দশম শ্রেণি)".to_string(),
                filename: "physics_9_10.pdf".to_string(),
                class: "9-10".to_string(),
                subject: Subject::Physics,
                size_bytes: 13_631_488,
            },
            Document {
                id: "english-grammar-9-10".to_string(),
                title: "English Grammar and Composition (Class 9-10)".to_string(),
                filename: "english_grammar_9_10.pdf".to_string(),
                class: "9-10".to_string(),
                subject: Subject::English,
                size_bytes: 6_291_456,
            },
        ];

        Self { documents }
    }

    #[inline]
    pub fn from_documents(documents: Vec<Document>) -> Self {
        Self { documents }
    }

    #[inline]
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    #[inline]
    pub fn get(&self, id: &str) -> Option<&Document> {
        self.documents.iter().find(|doc| doc.id == id)
    }

    #[inline]
    pub fn first_by_subject(&self, subject: Subject) -> Option<&Document> {
        self.documents.iter().find(|doc| doc.subject == subject)
    }

    /// Schema validation, run once when the answering engine initializes.
    #[inline]
    pub fn validate(&self) -> Result<()> {
        if self.documents.is_empty() {
            bail!("catalog contains no documents");
        }

        for doc in &self.documents {
            if doc.id.trim().is_empty() {
                bail!("catalog document with empty id");
            }
            if doc.title.trim().is_empty() {
                bail!("catalog document '{}' has an empty title", doc.id);
            }
            if doc.filename.trim().is_empty() {
                bail!("catalog document '{}' has an empty filename", doc.id);
            }
            if doc.size_bytes == 0 {
                bail!("catalog document '{}' has a zero size", doc.id);
            }
        }

        for (i, doc) in self.documents.iter().enumerate() {
            if self.documents[..i].iter().any(|other| other.id == doc.id) {
                bail!("duplicate catalog id '{}'", doc.id);
            }
        }

        Ok(())
    }
}
