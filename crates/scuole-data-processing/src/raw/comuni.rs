use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{info, instrument};

use super::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub name: String,
}

/// A municipality from the geographic reference list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationRecord {
    pub id: String,
    pub name: String,
    /// Cadastral code ("codice catastale"), e.g. `D612` for Firenze
    pub cadastral_code: String,
    pub nuts3_2010_code: String,
    /// Province abbreviation as found on licence plates, e.g. `FI`
    pub license_plate_code: String,
    pub region: Region,
}

/// Read the municipality reference list, a JSON array of [`LocationRecord`]s.
#[instrument(name = "Load municipality reference data", level = "info")]
pub fn load_comuni(path: &Path) -> Result<Vec<LocationRecord>> {
    let reader = BufReader::new(File::open(path)?);
    let comuni: Vec<LocationRecord> = serde_json::from_reader(reader)?;
    info!(count = comuni.len(), "Loaded municipalities");
    Ok(comuni)
}
