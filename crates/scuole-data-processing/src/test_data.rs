use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde_json::{Value, json};
use tempfile::TempDir;
use tracing::info;

use super::{COMUNI_FILE, error::Result};

/// Configuration for test data generation
#[derive(Debug, Clone)]
pub struct TestDataConfig {
    /// Number of generated schools added on top of the hand-written fixtures
    pub generated_schools: usize,
    /// Number of raw files the generated schools are spread over
    pub generated_files: usize,
}

impl Default for TestDataConfig {
    fn default() -> Self {
        Self::sample()
    }
}

impl TestDataConfig {
    /// Only the hand-written fixtures, for unit tests
    pub fn minimal() -> Self {
        Self {
            generated_schools: 0,
            generated_files: 0,
        }
    }

    /// Fixtures plus a batch of generated schools, for integration tests
    pub fn sample() -> Self {
        Self {
            generated_schools: 60,
            generated_files: 3,
        }
    }
}

/// Temporary data directory laid out like a real one: `raw/` with JSON-LD files
/// and a `comuni.json` municipality reference list.
///
/// Everything is deleted when the value is dropped.
#[derive(Debug)]
pub struct TestData {
    dir: TempDir,
}

impl TestData {
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    #[must_use]
    pub fn raw_dir(&self) -> PathBuf {
        self.dir.path().join("raw")
    }

    #[must_use]
    pub fn comuni_file(&self) -> PathBuf {
        self.dir.path().join(COMUNI_FILE)
    }
}

/// Create test data files in a temporary directory.
pub fn create_test_data(config: &TestDataConfig) -> Result<TestData> {
    info!("Creating test data with config: {:?}", config);

    let dir = TempDir::new()?;
    let raw_dir = dir.path().join("raw").join("2018");
    fs::create_dir_all(&raw_dir)?;

    write_json(&raw_dir.join("toscana.json"), &graph(fixture_records()))?;

    let generated = generated_records(config.generated_schools);
    if config.generated_files > 0 && !generated.is_empty() {
        let per_file = generated.len().div_ceil(config.generated_files);
        for (i, chunk) in generated.chunks(per_file).enumerate() {
            write_json(
                &raw_dir.join(format!("generated_{i:02}.json")),
                &graph(chunk.to_vec()),
            )?;
        }
    }

    write_json(&dir.path().join(COMUNI_FILE), &comuni())?;

    Ok(TestData { dir })
}

fn write_json(path: &Path, value: &Value) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

fn graph(records: Vec<Value>) -> Value {
    json!({
        "@context": {"miur": "http://www.miur.it/ns/miur#"},
        "@graph": records,
    })
}

fn school(
    id: &str,
    name: &str,
    school_type: &str,
    city: &str,
    cad_code: &str,
    email: &str,
    parent: (&str, &str),
) -> Value {
    json!({
        "@id": format!("http://dati.istruzione.it/opendata/scuole/{id}"),
        "miur:ANNOSCOLASTICO": "201819",
        "miur:CODICESCUOLA": id,
        "miur:DENOMINAZIONESCUOLA": name,
        "miur:DESCRIZIONETIPOLOGIAGRADOISTRUZIONESCUOLA": school_type,
        "miur:INDIRIZZOEMAILSCUOLA": email,
        "miur:INDIRIZZOPECSCUOLA": "Non Disponibile",
        "miur:SITOWEBSCUOLA": "Non Disponibile",
        "miur:INDIRIZZOSCUOLA": "VIA ROMA 1",
        "miur:CAPSCUOLA": "50100",
        "miur:CODICECOMUNESCUOLA": cad_code,
        "miur:DESCRIZIONECOMUNE": city,
        "miur:CODICEISTITUTORIFERIMENTO": parent.0,
        "miur:DENOMINAZIONEISTITUTORIFERIMENTO": parent.1,
        "miur:DESCRIZIONECARATTERISTICASCUOLA": "NORMALE",
    })
}

fn fixture_records() -> Vec<Value> {
    vec![
        // sole school of the town, named after it
        school(
            "FIEE123",
            "Scuola Primaria Ponte a Sieve",
            "Scuola Primaria",
            "Ponte a Sieve",
            "Non Disponibile",
            "Non Disponibile",
            ("", ""),
        ),
        // head institute referencing itself
        school(
            "FIIC853009",
            "COMPAGNI - CARDUCCI",
            "ISTITUTO COMPRENSIVO",
            "FIRENZE",
            "D612",
            "fiic853009@istruzione.it",
            ("FIIC853009", "COMPAGNI - CARDUCCI"),
        ),
        school(
            "FIEE853021",
            "SCUOLA PRIMARIA CARDUCCI",
            "SCUOLA PRIMARIA",
            "FIRENZE",
            "D612",
            "",
            ("FIIC853009", "COMPAGNI - CARDUCCI"),
        ),
        school(
            "POEE00100X",
            "SCUOLA PRIMARIA FILIPPO MAZZEI",
            "SCUOLA PRIMARIA",
            "PRATO",
            "G999",
            "poee00100x@istruzione.it",
            ("", ""),
        ),
        // cadastral code unknown to the reference list
        school(
            "ARAA00200Q",
            "SCUOLA INFANZIA SAN LEOLINO",
            "SCUOLA INFANZIA",
            "BUCINE",
            "Z999",
            "",
            ("Non Disponibile", ""),
        ),
    ]
}

const GENERATED_CITIES: [(&str, &str); 3] = [
    ("FIRENZE", "D612"),
    ("PRATO", "G999"),
    ("PONTASSIEVE", "G825"),
];
const GENERATED_NAMES: [&str; 5] = [
    "DANTE ALIGHIERI",
    "GALILEO GALILEI",
    "LEONARDO",
    "MACHIAVELLI",
    "BOCCACCIO",
];

fn generated_records(count: usize) -> Vec<Value> {
    (0..count)
        .map(|i| {
            let (city, cad_code) = GENERATED_CITIES[i % GENERATED_CITIES.len()];
            let name = GENERATED_NAMES[i % GENERATED_NAMES.len()];
            let id = format!("GEEE{i:06}");
            school(
                &id,
                &format!("SCUOLA PRIMARIA {name}"),
                "SCUOLA PRIMARIA",
                city,
                cad_code,
                "",
                ("", ""),
            )
        })
        .collect()
}

fn comuni() -> Value {
    json!([
        {
            "id": "048017",
            "name": "Firenze",
            "cadastral_code": "D612",
            "nuts3_2010_code": "ITI14",
            "license_plate_code": "FI",
            "region": {"name": "Toscana"}
        },
        {
            "id": "100005",
            "name": "Prato",
            "cadastral_code": "G999",
            "nuts3_2010_code": "ITI15",
            "license_plate_code": "PO",
            "region": {"name": "Toscana"}
        },
        {
            "id": "048033",
            "name": "Pontassieve",
            "cadastral_code": "G825",
            "nuts3_2010_code": "ITI14",
            "license_plate_code": "FI",
            "region": {"name": "Toscana"}
        }
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::{RAW_DATA_FILE_TYPES, load_raw_records};

    #[test]
    fn test_minimal_test_data() {
        let data = create_test_data(&TestDataConfig::minimal()).unwrap();
        assert!(data.raw_dir().is_dir());
        assert!(data.comuni_file().is_file());

        let records = load_raw_records(&data.raw_dir(), RAW_DATA_FILE_TYPES).unwrap();
        assert_eq!(records.len(), 5);
    }

    #[test]
    fn test_sample_test_data_spreads_generated_schools() {
        let config = TestDataConfig::sample();
        let data = create_test_data(&config).unwrap();

        let files = fs::read_dir(data.raw_dir().join("2018")).unwrap().count();
        assert_eq!(files, 1 + config.generated_files);

        let records = load_raw_records(&data.raw_dir(), RAW_DATA_FILE_TYPES).unwrap();
        assert_eq!(records.len(), 5 + config.generated_schools);
    }
}
