use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::canonical::canonicalize;
use crate::error::LoadError;
use crate::model::{Dataset, ProductionRecord};
use crate::schema::source;

// ── Parsing ─────────────────────────────────────────────────────────────────

/// Read and canonicalize a production document from disk.
pub fn load_dataset(path: &Path) -> Result<Dataset, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let document: Value = serde_json::from_reader(BufReader::new(file))?;
    parse_document(&document)
}

/// Parse an in-memory JSON document.
pub fn parse_str(json: &str) -> Result<Dataset, LoadError> {
    let document: Value = serde_json::from_str(json)?;
    parse_document(&document)
}

/// Convert a JSON array of objects into canonical records.
///
/// Province and regency must be present on every object. Year and production
/// values that do not parse as numbers become missing.
pub fn parse_document(document: &Value) -> Result<Dataset, LoadError> {
    let entries = document.as_array().ok_or(LoadError::NotASequence)?;

    let records = entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let obj = entry
                .as_object()
                .ok_or(LoadError::RecordNotObject { index })?;
            parse_record(index, obj)
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Dataset::new(records))
}

fn parse_record(index: usize, obj: &Map<String, Value>) -> Result<ProductionRecord, LoadError> {
    let province = text_field(obj, source::PROVINCE).ok_or(LoadError::InvalidField {
        index,
        field: source::PROVINCE,
    })?;
    let regency = text_field(obj, source::REGENCY).ok_or(LoadError::InvalidField {
        index,
        field: source::REGENCY,
    })?;

    Ok(ProductionRecord {
        province: canonicalize(&province),
        regency: canonicalize(&regency),
        year: obj.get(source::YEAR).and_then(parse_year),
        production_tons: obj.get(source::PRODUCTION_TONS).and_then(parse_production),
    })
}

fn text_field(obj: &Map<String, Value>, field: &str) -> Option<String> {
    match obj.get(field)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Numeric coercion: numbers as-is, strings trimmed and parsed, anything
/// else missing.
fn parse_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn parse_year(value: &Value) -> Option<i32> {
    let y = parse_number(value)?;
    if y.fract() != 0.0 || y < f64::from(i32::MIN) || y > f64::from(i32::MAX) {
        return None;
    }
    Some(y as i32)
}

fn parse_production(value: &Value) -> Option<f64> {
    parse_number(value).filter(|v| *v >= 0.0)
}

// ── Cache ───────────────────────────────────────────────────────────────────

/// Result of opening a document for display: a failed load degrades to an
/// empty dataset and carries the message to show.
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub dataset: Arc<Dataset>,
    pub error: Option<String>,
}

/// Load-once memo of parsed documents keyed by path.
///
/// Only successful loads are kept; a failed path is read again on the next
/// call. Entries leave the cache only through [`invalidate`](Self::invalidate),
/// [`reload`](Self::reload) or [`clear`](Self::clear).
#[derive(Debug, Default)]
pub struct DatasetCache {
    entries: HashMap<PathBuf, Arc<Dataset>>,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<Arc<Dataset>, LoadError> {
        let path = path.as_ref();
        if let Some(dataset) = self.entries.get(path) {
            debug!(path = %path.display(), "dataset cache hit");
            return Ok(Arc::clone(dataset));
        }

        let started = Instant::now();
        let dataset = Arc::new(load_dataset(path)?);
        info!(
            path = %path.display(),
            records = dataset.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "loaded production dataset"
        );

        let unknown = dataset.unrecognized_provinces();
        if !unknown.is_empty() {
            warn!(provinces = ?unknown, "provinces without coordinates; they will not appear on the map");
        }

        self.entries.insert(path.to_path_buf(), Arc::clone(&dataset));
        Ok(dataset)
    }

    /// Like [`load`](Self::load) but never fails: errors fall back to an empty
    /// dataset.
    pub fn open(&mut self, path: impl AsRef<Path>) -> LoadOutcome {
        let path = path.as_ref();
        match self.load(path) {
            Ok(dataset) => LoadOutcome {
                dataset,
                error: None,
            },
            Err(err) => {
                warn!(path = %path.display(), error = %err, "falling back to empty dataset");
                LoadOutcome {
                    dataset: Arc::new(Dataset::empty()),
                    error: Some(err.to_string()),
                }
            }
        }
    }

    pub fn reload(&mut self, path: impl AsRef<Path>) -> Result<Arc<Dataset>, LoadError> {
        let path = path.as_ref();
        self.invalidate(path);
        self.load(path)
    }

    pub fn invalidate(&mut self, path: impl AsRef<Path>) -> bool {
        self.entries.remove(path.as_ref()).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_cached(&self, path: impl AsRef<Path>) -> bool {
        self.entries.contains_key(path.as_ref())
    }
}
