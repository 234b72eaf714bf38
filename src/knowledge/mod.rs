// Knowledge base module
// Hand-authored chapter/topic tables per supported book, plus the scorer
// that maps a free-text question to the best-matching chapter. Read-only
// reference data, never derived from the chunk stores.


use std::sync::LazyLock;

use fancy_regex::Regex;

/// One chapter of a book: 1-based number, display title, topic keywords,
/// human-readable page range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterEntry {
    pub number: u32,
    pub title: &'static str,
    pub topics: &'static [&'static str],
    pub pages: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Confidence {
    None,
    Low,
    Medium,
    High,
}

impl std::fmt::Display for Confidence {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Confidence::None => f.write_str("none"),
            Confidence::Low => f.write_str("low"),
            Confidence::Medium => f.write_str("medium"),
            Confidence::High => f.write_str("high"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterMatch {
    pub chapter: Option<&'static ChapterEntry>,
    pub confidence: Confidence,
}

const TITLE_SCORE: u32 = 10;
const TOPIC_SCORE: u32 = 5;

static CHAPTER_REF: LazyLock<Regex> = LazyLock::new(|| {
    // A recognized marker word followed by a chapter number in either digit
    // script. Compiled once; the pattern is static.
    Regex::new(r"(?i)(?:অধ্যায়|chapter)\s*([০-৯0-9]+)").expect("chapter reference pattern compiles")
});

static HIGHER_MATH_CHAPTERS: &[ChapterEntry] = &[
    ChapterEntry {
        number: 1,
        title: "সেট ও ফাংশন",
        topics: &["সেট", "ফাংশন", "ডোমেন", "রেঞ্জ", "set", "function"],
        pages: "1-32",
    },
    ChapterEntry {
        number: 2,
        title: "বীজগাণিতিক রাশি",
        topics: &["বহুপদী", "উৎপাদক", "রাশি", "algebra", "polynomial"],
        pages: "33-68",
    },
    ChapterEntry {
        number: 3,
        title: "জ্যামিতি",
        topics: &["সরলরেখা", "বৃত্ত", "চতুর্ভুজ", "geometry", "circle"],
        pages: "69-98",
    },
    ChapterEntry {
        number: 4,
        title: "জ্যামিতিক অঙ্কন",
        topics: &["অঙ্কন", "ত্রিভুজ", "construction"],
        pages: "99-112",
    },
    ChapterEntry {
        number: 5,
        title: "সমীকরণ",
        topics: &["দ্বিঘাত", "মূল", "সমীকরণ", "equation", "quadratic"],
        pages: "113-140",
    },
    ChapterEntry {
        number: 6,
        title: "অসমতা",
        topics: &["অসমতা", "inequality"],
        pages: "141-152",
    },
    ChapterEntry {
        number: 7,
        title: "অসীম ধারা",
        topics: &["ধারা", "অনুক্রম", "series", "sequence"],
        pages: "153-166",
    },
    ChapterEntry {
        number: 8,
        title: "ত্রিকোণমিতি",
        topics: &["ত্রিকোণমিতিক অনুপাত", "ত্রিকোণমিতি", "কোণ", "sine", "cosine", "trigonometry"],
        pages: "167-200",
    },
    ChapterEntry {
        number: 9,
        title: "সূচকীয় ও লগারিদমীয় ফাংশন",
        topics: &["সূচক", "লগারিদম", "logarithm", "exponent"],
        pages: "201-224",
    },
    ChapterEntry {
        number: 10,
        title: "দ্বিপদী বিস্তৃতি",
        topics: &["দ্বিপদী", "বিস্তৃতি", "binomial"],
        pages: "225-240",
    },
    ChapterEntry {
        number: 11,
        title: "স্থানাঙ্ক জ্যামিতি",
        topics: &["স্থানাঙ্ক", "দূরত্ব", "ঢাল", "coordinate", "slope"],
        pages: "241-272",
    },
    ChapterEntry {
        number: 12,
        title: "সমতলীয় ভেক্টর",
        topics: &["ভেক্টর", "vector"],
        pages: "273-288",
    },
    ChapterEntry {
        number: 13,
        title: "ঘন জ্যামিতি",
        topics: &["ঘনক", "সিলিন্ডার", "solid", "cylinder"],
        pages: "289-304",
    },
    ChapterEntry {
        number: 14,
        title: "সম্ভাবনা",
        topics: &["সম্ভাবনা", "probability"],
        pages: "305-320",
    },
];

static PHYSICS_CHAPTERS: &[ChapterEntry] = &[
    ChapterEntry {
        number: 1,
        title: "ভৌত রাশি এবং পরিমাপ",
        topics: &["পরিমাপ", "একক", "measurement", "unit"],
        pages: "1-28",
    },
    ChapterEntry {
        number: 2,
        title: "গতি",
        topics: &["বেগ", "ত্বরণ", "দ্রুতি", "সরণ", "motion", "velocity", "acceleration"],
        pages: "29-58",
    },
    ChapterEntry {
        number: 3,
        title: "বল",
        topics: &["নিউটন", "জড়তা", "ঘর্ষণ", "ভরবেগ", "force", "newton", "friction"],
        pages: "59-88",
    },
    ChapterEntry {
        number: 4,
        title: "কাজ, ক্ষমতা ও শক্তি",
        topics: &["কাজ", "শক্তি", "ক্ষমতা", "work", "energy", "power"],
        pages: "89-112",
    },
    ChapterEntry {
        number: 5,
        title: "পদার্থের অবস্থা ও চাপ",
        topics: &["চাপ", "ঘনত্ব", "প্লবতা", "pressure", "density"],
        pages: "113-134",
    },
    ChapterEntry {
        number: 6,
        title: "বস্তুর উপর তাপের প্রভাব",
        topics: &["তাপ", "তাপমাত্রা", "প্রসারণ", "heat", "temperature"],
        pages: "135-158",
    },
    ChapterEntry {
        number: 7,
        title: "তরঙ্গ ও শব্দ",
        topics: &["তরঙ্গ", "শব্দ", "কম্পাঙ্ক", "wave", "sound", "frequency"],
        pages: "159-180",
    },
    ChapterEntry {
        number: 8,
        title: "আলোর প্রতিফলন",
        topics: &["প্রতিফলন", "দর্পণ", "প্রতিবিম্ব", "reflection", "mirror"],
        pages: "181-204",
    },
    ChapterEntry {
        number: 9,
        title: "আলোর প্রতিসরণ",
        topics: &["প্রতিসরণ", "লেন্স", "refraction", "lens"],
        pages: "205-228",
    },
    ChapterEntry {
        number: 10,
        title: "স্থির বিদ্যুৎ",
        topics: &["আধান", "স্থির বিদ্যুৎ", "charge", "static electricity"],
        pages: "229-248",
    },
    ChapterEntry {
        number: 11,
        title: "চল বিদ্যুৎ",
        topics: &["বিদ্যুৎ প্রবাহ", "রোধ", "বর্তনী", "current", "resistance", "circuit"],
        pages: "249-274",
    },
    ChapterEntry {
        number: 12,
        title: "বিদ্যুতের চৌম্বক ক্রিয়া",
        topics: &["চুম্বক", "মোটর", "জেনারেটর", "magnet", "motor"],
        pages: "275-294",
    },
    ChapterEntry {
        number: 13,
        title: "আধুনিক পদার্থবিজ্ঞান ও ইলেকট্রনিক্স",
        topics: &["ইলেকট্রন", "তেজস্ক্রিয়তা", "electronics", "radioactivity"],
        pages: "295-316",
    },
    ChapterEntry {
        number: 14,
        title: "জীবন বাঁচাতে পদার্থবিজ্ঞান",
        topics: &["এক্স-রে", "আলট্রাসনোগ্রাফি", "x-ray", "ultrasound"],
        pages: "317-336",
    },
];

static ENGLISH_GRAMMAR_CHAPTERS: &[ChapterEntry] = &[
    ChapterEntry {
        number: 1,
        title: "parts of speech",
        topics: &["noun", "verb", "adjective", "pronoun", "adverb"],
        pages: "1-24",
    },
    ChapterEntry {
        number: 2,
        title: "tense",
        topics: &["present", "past", "future", "perfect", "continuous"],
        pages: "25-52",
    },
    ChapterEntry {
        number: 3,
        title: "voice",
        topics: &["active", "passive", "voice change"],
        pages: "53-68",
    },
    ChapterEntry {
        number: 4,
        title: "narration",
        topics: &["direct speech", "indirect speech", "reported speech"],
        pages: "69-86",
    },
    ChapterEntry {
        number: 5,
        title: "articles",
        topics: &["article", "determiner"],
        pages: "87-96",
    },
    ChapterEntry {
        number: 6,
        title: "prepositions",
        topics: &["preposition"],
        pages: "97-110",
    },
    ChapterEntry {
        number: 7,
        title: "transformation of sentences",
        topics: &["transformation", "simple", "complex", "compound"],
        pages: "111-132",
    },
    ChapterEntry {
        number: 8,
        title: "right forms of verbs",
        topics: &["verb form", "subject verb agreement"],
        pages: "133-150",
    },
];

/// Chapter table for a book, if one has been authored.
#[inline]
pub fn chapters_for(book_id: &str) -> Option<&'static [ChapterEntry]> {
    match book_id {
        "higher-math-9-10" => Some(HIGHER_MATH_CHAPTERS),
        "physics-9-10" => Some(PHYSICS_CHAPTERS),
        "english-grammar-9-10" => Some(ENGLISH_GRAMMAR_CHAPTERS),
        _ => None,
    }
}

/// Map a free-text query to the best-matching chapter of a book.
///
/// An explicit chapter reference wins outright; otherwise chapters are
/// scored by title and topic substring matches against the lowercased
/// query, first chapter at the maximum score winning. The substring
/// heuristic intentionally admits false positives; the scoring and
/// tie-break rules are load-bearing and must not change.
#[inline]
pub fn locate(book_id: &str, query: &str) -> ChapterMatch {
    let Some(chapters) = chapters_for(book_id) else {
        return ChapterMatch {
            chapter: None,
            confidence: Confidence::None,
        };
    };

    if let Some(number) = explicit_chapter_reference(query) {
        if let Some(chapter) = chapters.iter().find(|ch| ch.number == number) {
            return ChapterMatch {
                chapter: Some(chapter),
                confidence: Confidence::High,
            };
        }
    }

    let query_lower = query.to_lowercase();
    let mut best: Option<&'static ChapterEntry> = None;
    let mut best_score = 0u32;

    for chapter in chapters {
        let mut score = 0u32;

        if query_lower.contains(&chapter.title.to_lowercase()) {
            score += TITLE_SCORE;
        }

        for topic in chapter.topics {
            if query_lower.contains(&topic.to_lowercase()) {
                score += TOPIC_SCORE;
            }
        }

        // Strictly greater keeps the first chapter at the maximum
        if score > best_score {
            best_score = score;
            best = Some(chapter);
        }
    }

    let confidence = if best_score >= TITLE_SCORE {
        Confidence::High
    } else if best_score >= TOPIC_SCORE {
        Confidence::Medium
    } else if best_score > 0 {
        Confidence::Low
    } else {
        Confidence::None
    };

    ChapterMatch {
        chapter: if best_score > 0 { best } else { None },
        confidence,
    }
}

/// Parse an explicit chapter reference, accepting Bengali digits.
fn explicit_chapter_reference(query: &str) -> Option<u32> {
    let captures = CHAPTER_REF.captures(query).ok().flatten()?;
    let digits = captures.get(1)?.as_str();

    let normalized: String = digits.chars().map(normalize_digit).collect();
    normalized.parse::<u32>().ok()
}

fn normalize_digit(ch: char) -> char {
    match ch {
        '০' => '0',
        '১' => '1',
        '২' => '2',
        '৩' => '3',
        '৪' => '4',
        '৫' => '5',
        '৬' => '6',
        '৭' => '7',
        '৮' => '8',
        '৯' => '9',
        other => other,
    }
}
