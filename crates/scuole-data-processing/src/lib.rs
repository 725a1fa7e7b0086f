use once_cell::sync::Lazy;
use std::path::PathBuf;
use tracing::warn;

pub mod processed;
pub mod raw;
pub mod test_data;

static TEST_DATA_DIR: Lazy<tempfile::TempDir> = Lazy::new(|| {
    tempfile::TempDir::new().expect("Failed to create global temporary test data directory")
});

pub const DATA_DIR_DEFAULT: &str = "./scuole_data";
pub const DATA_DIR_ENV: &str = "SCUOLE_DATA_DIR";
pub const COMUNI_FILE: &str = "comuni.json";

/// Global data directory path that automatically determines the appropriate location.
///
/// Tests always get a throwaway temporary directory. Otherwise `SCUOLE_DATA_DIR`
/// wins over [`DATA_DIR_DEFAULT`].
pub static DATA_DIR: Lazy<PathBuf> = Lazy::new(|| {
    if cfg!(test) {
        let temp_dir = TEST_DATA_DIR.path().to_path_buf();
        warn!(temp_dir = ?temp_dir, "Using temporary data directory for tests");
        temp_dir
    } else {
        let dir = std::env::var(DATA_DIR_ENV).unwrap_or_else(|_| DATA_DIR_DEFAULT.to_string());
        PathBuf::from(dir)
    }
});

/// Directory holding the raw JSON-LD registry files.
pub fn raw_data_dir() -> PathBuf {
    DATA_DIR.join("raw")
}

/// Municipality reference list, next to the raw directory.
pub fn comuni_path() -> PathBuf {
    DATA_DIR.join(COMUNI_FILE)
}

/// Default location of the persisted school table.
pub fn school_table_path() -> PathBuf {
    DATA_DIR.join("processed").join(processed::SCHOOLS_PARQUET)
}

mod error {
    use polars::prelude::PolarsError;
    use std::path::PathBuf;
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum DataError {
        #[error("IO error: {0}")]
        Io(#[from] std::io::Error),
        #[error("Polars error: {0}")]
        Polars(#[from] PolarsError),
        #[error("Serialization error: {0}")]
        Serde(#[from] serde_json::Error),
        #[error("Required data files not found in {}", .path.display())]
        RequiredFilesNotFound { path: PathBuf },
        #[error("No '@graph' array in raw data file {}", .path.display())]
        MissingGraph { path: PathBuf },
        #[error("Cannot read schools, table file is not readable: {}", .path.display())]
        UnreadableTable { path: PathBuf },
    }

    pub type Result<T> = std::result::Result<T, DataError>;
}

pub use error::{DataError, Result};

// Re-export main types
pub use processed::{SchoolData, TableMetadata};
pub use raw::{LocationRecord, RawRecord, Region};
pub use test_data::{TestDataConfig, create_test_data};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_dir_is_temporary_under_test() {
        assert!(DATA_DIR.exists());
        assert!(raw_data_dir().starts_with(&*DATA_DIR));
        assert!(school_table_path().ends_with("processed/schools.parquet"));
        assert_eq!(comuni_path(), DATA_DIR.join("comuni.json"));
    }
}
