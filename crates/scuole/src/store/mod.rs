//! Candidate retrieval.
//!
//! Retrieval is deliberately coarse: any school whose name or city contains at
//! least one query token comes back, and scoring sorts out the rest.

mod table;

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::SchoolEntity;
pub use error::CandidateError;
pub use table::{SchoolTable, columns};

/// Narrows the catalog down to schools worth scoring.
pub trait CandidateSource: Send + Sync {
    /// Schools whose name or city contains at least one of `tokens`, ignoring
    /// case, in storage order. No tokens means no candidates.
    fn find_by_tokens(&self, tokens: &[String]) -> Result<Vec<SchoolEntity>, CandidateError>;
}

impl<T: CandidateSource + ?Sized> CandidateSource for &T {
    fn find_by_tokens(&self, tokens: &[String]) -> Result<Vec<SchoolEntity>, CandidateError> {
        (**self).find_by_tokens(tokens)
    }
}

impl<T: CandidateSource + ?Sized> CandidateSource for Arc<T> {
    fn find_by_tokens(&self, tokens: &[String]) -> Result<Vec<SchoolEntity>, CandidateError> {
        (**self).find_by_tokens(tokens)
    }
}

/// Whether `entity` is a candidate for any of the lower-cased `tokens`.
pub(crate) fn matches_any(entity: &SchoolEntity, tokens: &[String]) -> bool {
    let name = entity.name.to_lowercase();
    let city = entity.city_name.to_lowercase();
    tokens
        .iter()
        .any(|token| name.contains(token.as_str()) || city.contains(token.as_str()))
}

/// A catalog held as plain entities, for small data sets and tests.
#[derive(Debug, Clone, Default)]
pub struct InMemorySchools {
    schools: Vec<SchoolEntity>,
}

impl InMemorySchools {
    pub fn new(schools: Vec<SchoolEntity>) -> Self {
        Self { schools }
    }

    pub fn schools(&self) -> &[SchoolEntity] {
        &self.schools
    }

    pub fn len(&self) -> usize {
        self.schools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schools.is_empty()
    }
}

impl FromIterator<SchoolEntity> for InMemorySchools {
    fn from_iter<I: IntoIterator<Item = SchoolEntity>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl CandidateSource for InMemorySchools {
    #[instrument(name = "In-memory candidates", level = "debug", skip_all)]
    fn find_by_tokens(&self, tokens: &[String]) -> Result<Vec<SchoolEntity>, CandidateError> {
        if tokens.is_empty() {
            return Ok(Vec::new());
        }
        let tokens: Vec<String> = tokens.iter().map(|t| t.to_lowercase()).collect();
        let found: Vec<_> = self
            .schools
            .iter()
            .filter(|school| matches_any(school, &tokens))
            .cloned()
            .collect();
        debug!(candidates = found.len(), "Retrieved candidates");
        Ok(found)
    }
}

mod error {
    use polars::prelude::PolarsError;
    use scuole_data_processing::DataError;
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum CandidateError {
        #[error("Candidate query failed: {0}")]
        DataFrame(#[from] PolarsError),
        #[error("School table unavailable: {0}")]
        Data(#[from] DataError),
    }
}
