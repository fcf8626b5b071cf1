use crate::records::{self, normalize_key, strip_quotes, NormalizedMovie, RawRecord};
use serde_json::{Map, Value};
use tracing::{debug, info};

pub const MAX_FILE_BYTES: usize = 5 * 1024 * 1024;
pub const PREVIEW_LIMIT: usize = 3;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ImportError {
    #[error("Please select a {expected} file")]
    WrongExtension { expected: &'static str },
    #[error("File is too large ({size} bytes, limit is 5 MB)")]
    TooLarge { size: usize },
    #[error("File is not valid UTF-8 text")]
    NotText,
    #[error("Could not parse input: {0}")]
    Parse(String),
    #[error("Expected a list of movies")]
    ExpectedList,
    #[error("No valid movie records found")]
    NoValidRecords,
    #[error("Import is not ready to submit")]
    NotReady,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportMode {
    Csv,
    Json,
    Manual,
}

impl ImportMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "csv" => Some(ImportMode::Csv),
            "json" => Some(ImportMode::Json),
            "manual" | "text" => Some(ImportMode::Manual),
            _ => None,
        }
    }

    fn extension(&self) -> Option<&'static str> {
        match self {
            ImportMode::Csv => Some(".csv"),
            ImportMode::Json => Some(".json"),
            ImportMode::Manual => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImportState {
    Idle,
    SourceSelected,
    Parsed,
    Previewed,
    Submitting,
    Completed { added: usize },
    Failed { message: String },
}

/// What the preview panel shows.
#[derive(Debug, Clone, PartialEq)]
pub struct Preview {
    pub rows: Vec<NormalizedMovie>,
    pub accepted: usize,
    pub discarded: usize,
}

/// Bulk import workflow. Holds the parsed batch so a failed submit can be
/// retried without re-reading the source.
#[derive(Debug)]
pub struct ImportPipeline {
    mode: ImportMode,
    state: ImportState,
    batch: Vec<RawRecord>,
    discarded: usize,
}

impl Default for ImportPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl ImportPipeline {
    pub fn new() -> Self {
        Self {
            mode: ImportMode::Csv,
            state: ImportState::Idle,
            batch: Vec::new(),
            discarded: 0,
        }
    }

    pub fn mode(&self) -> ImportMode {
        self.mode
    }

    pub fn state(&self) -> &ImportState {
        &self.state
    }

    pub fn batch(&self) -> &[RawRecord] {
        &self.batch
    }

    /// Switching modes throws away anything loaded through the previous one.
    pub fn select_mode(&mut self, mode: ImportMode) {
        if mode != self.mode {
            debug!("Import mode {:?} -> {:?}", self.mode, mode);
        }
        self.mode = mode;
        self.cancel();
    }

    pub fn cancel(&mut self) {
        self.state = ImportState::Idle;
        self.batch.clear();
        self.discarded = 0;
    }

    pub fn can_submit(&self) -> bool {
        self.state == ImportState::Previewed && !self.batch.is_empty()
    }

    pub fn load_file(&mut self, file_name: &str, contents: &[u8]) -> Result<Preview, ImportError> {
        self.cancel();
        let expected = self.mode.extension().unwrap_or(".csv or .json");
        let matches_mode = match self.mode.extension() {
            Some(ext) => file_name.to_ascii_lowercase().ends_with(ext),
            None => false,
        };
        if !matches_mode {
            return Err(ImportError::WrongExtension { expected });
        }
        if contents.len() > MAX_FILE_BYTES {
            return Err(ImportError::TooLarge {
                size: contents.len(),
            });
        }
        self.state = ImportState::SourceSelected;

        let text = std::str::from_utf8(contents).map_err(|_| self.fail(ImportError::NotText))?;
        let parsed = match self.mode {
            ImportMode::Csv => parse_csv(text),
            _ => parse_json(text),
        };
        let candidates = parsed.map_err(|e| self.fail(e))?;
        info!(
            "Parsed {} candidates from {}",
            candidates.as_array().map_or(0, Vec::len),
            file_name
        );
        self.accept(candidates, 0)
    }

    /// Pasted text. An empty field resets the pipeline.
    pub fn load_manual(&mut self, text: &str) -> Result<Option<Preview>, ImportError> {
        self.cancel();
        if text.trim().is_empty() {
            return Ok(None);
        }
        self.state = ImportState::SourceSelected;
        let (candidates, bad_lines) = parse_manual(text).map_err(|e| self.fail(e))?;
        if bad_lines > 0 {
            debug!("Skipped {} unparseable manual lines", bad_lines);
        }
        self.accept(candidates, bad_lines).map(Some)
    }

    pub fn preview(&self) -> Preview {
        Preview {
            rows: self
                .batch
                .iter()
                .take(PREVIEW_LIMIT)
                .map(records::normalize)
                .collect(),
            accepted: self.batch.len(),
            discarded: self.discarded,
        }
    }

    /// Moves to `Submitting` and hands out the payload.
    pub fn begin_submit(&mut self) -> Result<Vec<Value>, ImportError> {
        if !self.can_submit() {
            return Err(ImportError::NotReady);
        }
        self.state = ImportState::Submitting;
        Ok(self.batch.iter().cloned().map(Value::Object).collect())
    }

    pub fn complete(&mut self, added: usize) {
        self.state = ImportState::Completed { added };
        self.batch.clear();
    }

    /// The batch survives a failed submit; the pipeline is back in preview.
    pub fn submit_failed(&mut self) {
        if self.state == ImportState::Submitting {
            self.state = ImportState::Previewed;
        }
    }

    fn accept(&mut self, candidates: Value, unparsed: usize) -> Result<Preview, ImportError> {
        let Value::Array(items) = candidates else {
            return Err(self.fail(ImportError::ExpectedList));
        };
        self.state = ImportState::Parsed;
        let (accepted, dropped) = records::accept_candidates(items);
        if accepted.is_empty() {
            return Err(self.fail(ImportError::NoValidRecords));
        }
        self.batch = accepted;
        self.discarded = dropped + unparsed;
        self.state = ImportState::Previewed;
        Ok(self.preview())
    }

    fn fail(&mut self, err: ImportError) -> ImportError {
        self.batch.clear();
        self.state = ImportState::Failed {
            message: err.to_string(),
        };
        err
    }
}

/// Header row required. Headers are trimmed, unquoted and lower-cased; values
/// are trimmed and unquoted. Values stay strings.
pub fn parse_csv(text: &str) -> Result<Value, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());
    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| ImportError::Parse(e.to_string()))?
        .iter()
        .map(normalize_key)
        .collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| ImportError::Parse(e.to_string()))?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        let mut row = Map::new();
        for (header, field) in headers.iter().zip(record.iter()) {
            if header.is_empty() {
                continue;
            }
            row.insert(header.clone(), Value::String(strip_quotes(field).to_string()));
        }
        rows.push(Value::Object(row));
    }
    Ok(Value::Array(rows))
}

pub fn parse_json(text: &str) -> Result<Value, ImportError> {
    serde_json::from_str(text).map_err(|e| ImportError::Parse(e.to_string()))
}

/// An array when the text opens with `[`, otherwise one object per line.
/// Lines that fail to parse are dropped and counted.
pub fn parse_manual(text: &str) -> Result<(Value, usize), ImportError> {
    let trimmed = text.trim();
    if trimmed.starts_with('[') {
        return parse_json(trimmed).map(|v| (v, 0));
    }
    let mut items = Vec::new();
    let mut bad = 0;
    for line in trimmed.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match serde_json::from_str::<Value>(line) {
            Ok(value) => items.push(value),
            Err(_) => bad += 1,
        }
    }
    Ok((Value::Array(items), bad))
}
