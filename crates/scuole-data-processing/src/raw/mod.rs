use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, trace, warn};

pub(super) mod comuni;

pub use super::error::{DataError, Result};
pub use comuni::{LocationRecord, Region, load_comuni};

/// Extensions of the registry files worth reading.
pub const RAW_DATA_FILE_TYPES: &[&str] = &["json"];

/// Key holding the list of records inside each JSON-LD file.
pub const GRAPH_KEY: &str = "@graph";

/// One registry record exactly as published, before any cleanup.
///
/// Field names in the published data are namespaced (`miur:CODICESCUOLA`). Lookups
/// try the namespaced key first and fall back to the bare name, so both
/// `record.get("CODICESCUOLA")` and `record.get("@id")` work.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord(Map<String, Value>);

impl RawRecord {
    pub const FIELD_PREFIX: &'static str = "miur:";

    #[must_use]
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Returns the raw value for `key`, namespaced or not.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0
            .get(&format!("{}{key}", Self::FIELD_PREFIX))
            .or_else(|| self.0.get(key))
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Returns the textual form of a scalar field.
    ///
    /// Strings are returned as-is, numbers and booleans are rendered. `null`,
    /// arrays and objects are not scalar fields and yield `None`.
    #[must_use]
    pub fn scalar(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for RawRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for RawRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Walk `dir` recursively and collect the `@graph` records of every file whose
/// extension is listed in `extensions`.
///
/// Files are read in path order so repeated loads yield records in the same order.
#[instrument(name = "Load raw school records", skip(extensions), level = "info")]
pub fn load_raw_records(dir: &Path, extensions: &[&str]) -> Result<Vec<RawRecord>> {
    if !dir.is_dir() {
        warn!("Raw data directory not found");
        return Err(DataError::RequiredFilesNotFound {
            path: dir.to_path_buf(),
        });
    }
    let t_load = std::time::Instant::now();

    let mut files = Vec::new();
    collect_files(dir, extensions, &mut files)?;
    files.sort();

    let mut records = Vec::new();
    for path in &files {
        let file_records = read_graph_file(path)?;
        debug!(path = ?path, records = file_records.len(), "Read raw data file");
        records.extend(file_records);
    }

    info!(
        files = files.len(),
        records = records.len(),
        elapsed = ?t_load.elapsed(),
        "Loaded raw records"
    );
    Ok(records)
}

fn collect_files(dir: &Path, extensions: &[&str], out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, extensions, out)?;
        } else if has_extension(&path, extensions) {
            out.push(path);
        } else {
            trace!(path = ?path, "Skipping file with unsupported extension");
        }
    }
    Ok(())
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}

/// Read the `@graph` records of a single JSON-LD file.
pub fn read_graph_file(path: &Path) -> Result<Vec<RawRecord>> {
    let reader = BufReader::new(File::open(path)?);
    let document: Value = serde_json::from_reader(reader)?;

    let graph = document
        .get(GRAPH_KEY)
        .and_then(Value::as_array)
        .ok_or_else(|| DataError::MissingGraph {
            path: path.to_path_buf(),
        })?;

    Ok(graph
        .iter()
        .filter_map(|entry| match entry {
            Value::Object(fields) => Some(RawRecord::from(fields.clone())),
            other => {
                warn!(path = ?path, entry = %other, "Ignoring non-object entry in @graph");
                None
            }
        })
        .collect())
}
