//! Geographic reference lookups by cadastral code.

use std::path::Path;
use std::sync::Arc;

use ahash::AHashMap as HashMap;
use scuole_data_processing::{LocationRecord, raw::load_comuni};
use thiserror::Error;
use tracing::{info, instrument};

/// Resolves a municipality from its cadastral code.
///
/// Implementations are read-only and shared across threads while a batch of
/// records is normalized in parallel.
pub trait GeoLookup: Send + Sync {
    /// Returns the municipality registered under `code`, if any.
    fn by_cadastral_code(&self, code: &str) -> Option<LocationRecord>;
}

impl<T: GeoLookup + ?Sized> GeoLookup for &T {
    fn by_cadastral_code(&self, code: &str) -> Option<LocationRecord> {
        (**self).by_cadastral_code(code)
    }
}

impl<T: GeoLookup + ?Sized> GeoLookup for Arc<T> {
    fn by_cadastral_code(&self, code: &str) -> Option<LocationRecord> {
        (**self).by_cadastral_code(code)
    }
}

/// Lookup that never finds anything, for running without reference data.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGeoLookup;

impl GeoLookup for NoGeoLookup {
    fn by_cadastral_code(&self, _code: &str) -> Option<LocationRecord> {
        None
    }
}

/// Why a record could not be placed on the map.
///
/// Both cases are expected in the published data and are never surfaced to
/// callers of the normalizer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeoMiss {
    #[error("cadastral code missing, cannot get location (id: {id})")]
    MissingCadastralCode { id: String },
    #[error("cannot find location via cadastral code (code: {code})")]
    UnknownCadastralCode { code: String },
}

/// Resolve the location of school `id` from its cadastral code.
pub fn resolve_location<G: GeoLookup + ?Sized>(
    lookup: &G,
    id: &str,
    cad_code: &str,
) -> Result<LocationRecord, GeoMiss> {
    if cad_code.is_empty() {
        return Err(GeoMiss::MissingCadastralCode { id: id.to_string() });
    }
    lookup
        .by_cadastral_code(cad_code)
        .ok_or_else(|| GeoMiss::UnknownCadastralCode {
            code: cad_code.to_string(),
        })
}

/// In-memory municipality index keyed by cadastral code.
///
/// Codes are matched case-insensitively and ignoring surrounding whitespace.
#[derive(Debug, Clone, Default)]
pub struct ComuniIndex {
    by_code: HashMap<String, LocationRecord>,
}

impl ComuniIndex {
    pub fn new(comuni: impl IntoIterator<Item = LocationRecord>) -> Self {
        let by_code = comuni
            .into_iter()
            .map(|comune| (normalize_code(&comune.cadastral_code), comune))
            .collect();
        Self { by_code }
    }

    /// Load the index from a municipality reference file.
    #[instrument(name = "Build municipality index", level = "info")]
    pub fn from_file(path: &Path) -> scuole_data_processing::Result<Self> {
        let index = Self::new(load_comuni(path)?);
        info!(municipalities = index.len(), "Municipality index ready");
        Ok(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }
}

impl GeoLookup for ComuniIndex {
    fn by_cadastral_code(&self, code: &str) -> Option<LocationRecord> {
        self.by_code.get(&normalize_code(code)).cloned()
    }
}

fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}
