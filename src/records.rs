//! Import candidates. A `RawRecord` is whatever the source file said and is
//! what gets submitted; a `NormalizedMovie` is the view the preview needs,
//! produced by `normalize` and nowhere else.
use serde_json::{Map, Value};

pub type RawRecord = Map<String, Value>;

/// Prioritized keys, compared against trimmed, lower-cased record keys.
const TITLE_KEYS: &[&str] = &["title", "name"];
const YEAR_KEYS: &[&str] = &["year", "release_year", "releaseyear"];
const GENRE_KEYS: &[&str] = &["genres", "genre"];
const RATING_KEYS: &[&str] = &["rating", "imdb_rating", "vote_average"];

#[derive(Debug, Clone, PartialEq, Default)]
pub struct NormalizedMovie {
    pub title: Option<String>,
    pub year: Option<String>,
    pub genre: Option<String>,
    pub rating: Option<String>,
}

/// The one place that resolves alternate spellings.
pub fn normalize(record: &RawRecord) -> NormalizedMovie {
    let fields = Folded::new(record);
    NormalizedMovie {
        title: fields.lookup(TITLE_KEYS),
        year: fields.lookup(YEAR_KEYS),
        genre: fields.lookup(GENRE_KEYS),
        rating: fields.lookup(RATING_KEYS),
    }
}

pub fn has_title(record: &RawRecord) -> bool {
    Folded::new(record).lookup(TITLE_KEYS).is_some()
}

/// Keeps objects with a title-like field. Returns the survivors and how many
/// candidates were dropped.
pub fn accept_candidates(candidates: Vec<Value>) -> (Vec<RawRecord>, usize) {
    let total = candidates.len();
    let accepted: Vec<RawRecord> = candidates
        .into_iter()
        .filter_map(|candidate| match candidate {
            Value::Object(map) if has_title(&map) => Some(map),
            _ => None,
        })
        .collect();
    let dropped = total - accepted.len();
    (accepted, dropped)
}

pub fn strip_quotes(input: &str) -> &str {
    let trimmed = input.trim();
    for quote in ['"', '\''] {
        if trimmed.len() >= 2 && trimmed.starts_with(quote) && trimmed.ends_with(quote) {
            return trimmed[1..trimmed.len() - 1].trim();
        }
    }
    trimmed
}

pub fn normalize_key(key: &str) -> String {
    strip_quotes(key).to_ascii_lowercase()
}

/// Record keys folded once. A key already spelled exactly like the wanted
/// one beats a folded match, so `title` wins over `Title`.
struct Folded<'a> {
    entries: Vec<(String, &'a str, &'a Value)>,
}

impl<'a> Folded<'a> {
    fn new(record: &'a RawRecord) -> Self {
        Self {
            entries: record
                .iter()
                .map(|(key, value)| (key.trim().to_ascii_lowercase(), key.as_str(), value))
                .collect(),
        }
    }

    fn lookup(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|wanted| {
            let exact = self
                .entries
                .iter()
                .filter(|(_, original, _)| original == wanted);
            let folded = self
                .entries
                .iter()
                .filter(|(folded, original, _)| folded == wanted && original != wanted);
            exact.chain(folded).find_map(|(_, _, value)| value_text(value))
        })
    }
}

fn value_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::Null => return None,
        Value::String(s) => strip_quotes(s).to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(value_text)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Object(_) => return None,
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
