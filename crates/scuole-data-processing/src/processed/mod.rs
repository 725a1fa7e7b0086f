use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

use super::error::{DataError, Result};

pub const SCHOOLS_PARQUET: &str = "schools.parquet";
const METADATA_EXTENSION: &str = "meta.json";

/// Sidecar written next to every persisted school table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMetadata {
    pub rows: usize,
    pub generated_at: DateTime<Utc>,
    /// Free-form description of where the rows came from
    pub source: String,
}

/// Columnar school data, either built in memory or backed by a Parquet file.
///
/// File-backed data is read on first access and kept in memory afterwards.
#[derive(Debug, Clone)]
pub struct SchoolData {
    path: Option<PathBuf>,
    df: OnceCell<DataFrame>,
}

impl SchoolData {
    /// Wrap an already built frame.
    #[must_use]
    pub fn from_frame(df: DataFrame) -> Self {
        Self {
            path: None,
            df: OnceCell::with_value(df),
        }
    }

    /// Point at a persisted table.
    ///
    /// The file has to exist and be readable now; a table that cannot be read
    /// makes every later search meaningless, so this fails early.
    #[instrument(name = "Open school table", level = "info")]
    pub fn open(path: &Path) -> Result<Self> {
        if let Err(e) = File::open(path) {
            warn!(error = %e, "School table is not readable");
            return Err(DataError::UnreadableTable {
                path: path.to_path_buf(),
            });
        }
        Ok(Self {
            path: Some(path.to_path_buf()),
            df: OnceCell::new(),
        })
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The table as a `DataFrame`, loading it from disk the first time.
    pub fn frame(&self) -> Result<&DataFrame> {
        self.df.get_or_try_init(|| {
            let path = self.path.as_deref().ok_or_else(|| DataError::UnreadableTable {
                path: PathBuf::new(),
            })?;
            Self::load(path)
        })
    }

    /// The table as a `LazyFrame` ready for filtering.
    pub fn lazy(&self) -> Result<LazyFrame> {
        Ok(self.frame()?.clone().lazy())
    }

    fn load(path: &Path) -> Result<DataFrame> {
        info!(
            path = ?path.file_stem(),
            "Loading and collecting into memory for the first time..."
        );
        let t_load = std::time::Instant::now();
        let df = LazyFrame::scan_parquet(path, Default::default())?.collect()?;
        info!(
            rows = df.height(),
            elapsed = ?t_load.elapsed(),
            "Loaded school table"
        );
        Ok(df)
    }
}

/// Path of the metadata sidecar for a table stored at `path`.
#[must_use]
pub fn metadata_path(path: &Path) -> PathBuf {
    path.with_extension(METADATA_EXTENSION)
}

/// Write `df` as Parquet to `path` together with its metadata sidecar.
#[instrument(name = "Save school table", skip(df), level = "info")]
pub fn save_frame(df: &mut DataFrame, path: &Path, source: &str) -> Result<TableMetadata> {
    let sink_time = std::time::Instant::now();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = File::create(path)?;
    ParquetWriter::new(&mut file).finish(df)?;

    let metadata = TableMetadata {
        rows: df.height(),
        generated_at: Utc::now(),
        source: source.to_string(),
    };
    let mut writer = BufWriter::new(File::create(metadata_path(path))?);
    serde_json::to_writer_pretty(&mut writer, &metadata)?;
    writer.flush()?;

    info!(
        path = ?path.file_stem(),
        rows = metadata.rows,
        sink_time = ?sink_time.elapsed(),
        "Saved to parquet file"
    );
    Ok(metadata)
}

/// Read the metadata sidecar of the table stored at `path`.
pub fn load_metadata(path: &Path) -> Result<TableMetadata> {
    let reader = BufReader::new(File::open(metadata_path(path))?);
    Ok(serde_json::from_reader(reader)?)
}
