// Book router
// Keyword classifier mapping a question to the most relevant catalog
// document. Stateless and deterministic: fixed per-subject keyword lists
// scanned in a fixed order, first match wins.


use tracing::debug;

use crate::catalog::{Catalog, Document, Subject};

/// Subject keyword lists in both supported languages. Scan order is
/// math, then physics, then English, then a generic solve fallback to
/// math. Substring matching admits overlap between subjects; that
/// tradeoff is intentional and the order is load-bearing.
const MATH_KEYWORDS: &[&str] = &[
    "গণিত",
    "বীজগণিত",
    "জ্যামিতি",
    "ত্রিকোণমিতি",
    "সমীকরণ",
    "উৎপাদক",
    "লগারিদম",
    "ভেক্টর",
    "সম্ভাবনা",
    "math",
    "algebra",
    "geometry",
    "trigonometry",
    "equation",
    "logarithm",
];

const PHYSICS_KEYWORDS: &[&str] = &[
    "পদার্থবিজ্ঞান",
    "পদার্থ",
    "বল",
    "গতি",
    "ত্বরণ",
    "শক্তি",
    "তাপ",
    "আলো",
    "বিদ্যুৎ",
    "তরঙ্গ",
    "physics",
    "force",
    "motion",
    "energy",
    "velocity",
    "acceleration",
    "electricity",
];

const ENGLISH_KEYWORDS: &[&str] = &[
    "grammar",
    "tense",
    "voice",
    "narration",
    "preposition",
    "article",
    "translation",
    "ব্যাকরণ",
    "ইংরেজি",
    "english",
];

const SOLVE_FALLBACK_KEYWORDS: &[&str] = &["সমাধান", "solve", "solution"];

/// Route a question to a catalog document, or `None` when no keyword set
/// matches (the caller asks the user to disambiguate rather than guess).
#[inline]
pub fn route<'a>(catalog: &'a Catalog, question: &str) -> Option<&'a Document> {
    let question_lower = question.to_lowercase();

    let subject = if matches_any(&question_lower, MATH_KEYWORDS) {
        Subject::Mathematics
    } else if matches_any(&question_lower, PHYSICS_KEYWORDS) {
        Subject::Physics
    } else if matches_any(&question_lower, ENGLISH_KEYWORDS) {
        Subject::English
    } else if matches_any(&question_lower, SOLVE_FALLBACK_KEYWORDS) {
        // Bare "solve this" requests overwhelmingly mean math homework
        Subject::Mathematics
    } else {
        debug!("No subject keywords matched the question");
        return None;
    };

    let document = catalog.first_by_subject(subject);
    if let Some(doc) = document {
        debug!("Routed question to '{}' via {} keywords", doc.id, subject);
    }
    document
}

fn matches_any(question_lower: &str, keywords: &[&str]) -> bool {
    keywords
        .iter()
        .any(|keyword| question_lower.contains(keyword))
}
