//! The [`SchoolSearcher`] entry point and catalog construction.
//!
//! ```rust
//! use scuole::{InMemorySchools, SchoolEntity, SchoolSearcher, SearchConfig};
//!
//! let catalog: InMemorySchools = [SchoolEntity {
//!     id: "POEE00100X".to_string(),
//!     name: "FILIPPO MAZZEI".to_string(),
//!     city_name: "Prato".to_string(),
//!     ..Default::default()
//! }]
//! .into_iter()
//! .collect();
//!
//! let searcher = SchoolSearcher::new(catalog, SearchConfig::default());
//! let results = searcher.search("scuola primaria Mazzei, Prato")?;
//! assert_eq!(results[0].entity.id, "POEE00100X");
//! # Ok::<(), scuole::error::ScuoleError>(())
//! ```

use std::path::Path;

use anyhow::Context;
use rayon::prelude::*;
use scuole_data_processing::RawRecord;
use tracing::{debug, info, instrument, warn};

use crate::{
    CandidateSource, ComuniIndex, GeoLookup, RecordNormalizer, SchoolTable, ScoredMatch,
    SearchConfig,
    error::Result,
    search::{QueryTokenizer, ResultRanker, ScoringEngine},
};

/// Searches a school catalog with free-text queries.
///
/// Each query is tokenized, the candidate source is asked for every school
/// matching at least one token, candidates are scored and the ranked list is
/// returned. A searcher holds no mutable state and can be shared between
/// threads.
#[derive(Debug, Clone)]
pub struct SchoolSearcher<C> {
    source: C,
    config: SearchConfig,
    tokenizer: QueryTokenizer,
    engine: ScoringEngine,
    ranker: ResultRanker,
}

impl<C: CandidateSource> SchoolSearcher<C> {
    pub fn new(source: C, config: SearchConfig) -> Self {
        Self {
            tokenizer: QueryTokenizer::from_config(&config),
            engine: ScoringEngine::new(&config),
            ranker: ResultRanker::new(config.tie_break),
            source,
            config,
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn source(&self) -> &C {
        &self.source
    }

    /// Ranked matches for `query`, best first.
    ///
    /// Only a blank query is an error. When the candidate source fails the
    /// failure is logged and the search returns no results.
    #[instrument(name = "School search", level = "debug", skip(self))]
    pub fn search(&self, query: &str) -> Result<Vec<ScoredMatch>> {
        let prepared = self.tokenizer.prepare(query)?;
        debug!(tokens = ?prepared.tokens, "Tokenized query");

        let candidates = match self.source.find_by_tokens(&prepared.tokens) {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(error = %e, query, "Candidate retrieval failed, returning no results");
                Vec::new()
            }
        };

        let scored = candidates
            .into_iter()
            .map(|entity| {
                self.engine
                    .score(&prepared.tokens, &prepared.normalized, entity)
            })
            .collect();
        let ranked = self.ranker.rank_limited(scored, self.config.limit);
        debug!(results = ranked.len(), "Ranked matches");
        Ok(ranked)
    }

    /// Run many searches in parallel, results in query order.
    ///
    /// Fails if any query is blank.
    #[instrument(
        name = "Bulk school search",
        level = "info",
        skip_all,
        fields(queries = queries.len())
    )]
    pub fn search_bulk<S: AsRef<str> + Sync>(
        &self,
        queries: &[S],
    ) -> Result<Vec<Vec<ScoredMatch>>> {
        let t_search = std::time::Instant::now();
        let results = queries
            .par_iter()
            .map(|query| self.search(query.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        info!(elapsed = ?t_search.elapsed(), "Bulk search complete");
        Ok(results)
    }
}

impl SchoolSearcher<SchoolTable> {
    /// Searcher over a table persisted with [`SchoolTable::save`].
    pub fn open(path: &Path, config: SearchConfig) -> Result<Self> {
        Ok(Self::new(SchoolTable::open(path)?, config))
    }
}

/// Normalize `records` into a school table.
///
/// Records without a school code are logged and left out; everything else ends
/// up in the table, in input order.
#[instrument(name = "Build catalog", level = "info", skip_all, fields(records = records.len()))]
pub fn build_catalog<G: GeoLookup>(
    records: &[RawRecord],
    normalizer: &RecordNormalizer<G>,
) -> Result<SchoolTable> {
    let t_build = std::time::Instant::now();
    let mut skipped = 0_usize;
    let entities: Vec<_> = normalizer
        .normalize_all(records)
        .into_iter()
        .enumerate()
        .filter_map(|(position, result)| {
            result
                .inspect_err(|e| {
                    warn!(position, error = %e, "Skipping record");
                    skipped += 1;
                })
                .ok()
        })
        .collect();

    let table = SchoolTable::from_entities(&entities)?;
    info!(
        schools = entities.len(),
        skipped,
        geolocated = entities.iter().filter(|e| e.is_geolocated()).count(),
        elapsed = ?t_build.elapsed(),
        "Catalog built"
    );
    Ok(table)
}

/// Build a catalog from the raw registry files in `raw_dir`, resolving
/// municipalities from the reference list at `comuni_path`.
pub fn build_catalog_from_files(raw_dir: &Path, comuni_path: &Path) -> Result<SchoolTable> {
    let geo = ComuniIndex::from_file(comuni_path)
        .with_context(|| format!("loading municipalities from {}", comuni_path.display()))?;
    let records = scuole_data_processing::raw::load_raw_records(
        raw_dir,
        scuole_data_processing::raw::RAW_DATA_FILE_TYPES,
    )?;
    build_catalog(&records, &RecordNormalizer::new(geo))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        InMemorySchools, NoGeoLookup, SchoolEntity, ScoringMode, TieBreak, error::ScuoleError,
        store::CandidateError,
    };
    use polars::prelude::PolarsError;

    fn school(id: &str, name: &str, city: &str) -> SchoolEntity {
        SchoolEntity {
            id: id.to_string(),
            name: name.to_string(),
            city_name: city.to_string(),
            ..Default::default()
        }
    }

    fn catalog() -> InMemorySchools {
        [
            school("FIEE853021", "CARDUCCI", "Firenze"),
            school("FIEE123", "Ponte a Sieve", "Ponte a Sieve"),
            school("POEE00100X", "FILIPPO MAZZEI", "Prato"),
            school("FIEE999", "MAZZEI", "Firenze"),
        ]
        .into_iter()
        .collect()
    }

    struct FailingSource;

    impl CandidateSource for FailingSource {
        fn find_by_tokens(
            &self,
            _tokens: &[String],
        ) -> std::result::Result<Vec<SchoolEntity>, CandidateError> {
            Err(PolarsError::NoData("table gone".into()).into())
        }
    }

    #[test]
    fn test_search_ranks_city_and_name_matches_first() {
        let searcher = SchoolSearcher::new(catalog(), SearchConfig::default());
        let results = searcher.search("Mazzei Firenze").unwrap();
        assert_eq!(results[0].entity.id, "FIEE999");
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn test_misspelled_query_still_finds_school() {
        let searcher = SchoolSearcher::new(catalog(), SearchConfig::default());
        let results = searcher.search("pnote sieve").unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].entity.id, "FIEE123");
        assert!(results[0].breakdown.fuzzy_score.unwrap() > 0.0);
    }

    #[test]
    fn test_blank_query_fails() {
        let searcher = SchoolSearcher::new(catalog(), SearchConfig::default());
        assert!(matches!(searcher.search("  "), Err(ScuoleError::SearchError(_))));
        assert!(searcher.search_bulk(&["Prato", ""]).is_err());
    }

    #[test]
    fn test_only_noise_returns_nothing() {
        let searcher = SchoolSearcher::new(catalog(), SearchConfig::default());
        assert!(searcher.search("scuola di via").unwrap().is_empty());
    }

    #[test]
    fn test_source_failure_degrades_to_empty() {
        let searcher = SchoolSearcher::new(FailingSource, SearchConfig::default());
        assert!(searcher.search("Carducci").unwrap().is_empty());
    }

    #[test]
    fn test_limit_and_tie_break() {
        let config = SearchConfig::builder()
            .scoring_mode(ScoringMode::Simple)
            .tie_break(TieBreak::EntityId)
            .limit(1)
            .build();
        let searcher = SchoolSearcher::new(catalog(), config);
        let results = searcher.search("Mazzei").unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].entity.id, "FIEE999");
    }

    #[test]
    fn test_search_bulk_keeps_query_order() {
        let searcher = SchoolSearcher::new(catalog(), SearchConfig::default());
        let results = searcher.search_bulk(&["Carducci", "Prato", "nothing"]).unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0][0].entity.id, "FIEE853021");
        assert_eq!(results[1][0].entity.id, "POEE00100X");
        assert!(results[2].is_empty());
    }

    #[test]
    fn test_build_catalog_skips_records_without_code() {
        let records = vec![
            RawRecord::from_iter([
                ("miur:CODICESCUOLA", "FIEE853021"),
                ("miur:DENOMINAZIONESCUOLA", "CARDUCCI"),
            ]),
            RawRecord::from_iter([("miur:DENOMINAZIONESCUOLA", "SENZA CODICE")]),
        ];
        let table = build_catalog(&records, &RecordNormalizer::new(NoGeoLookup)).unwrap();
        let schools = table.all_schools().unwrap();
        assert_eq!(schools.len(), 1);
        assert_eq!(schools[0].id, "FIEE853021");
    }

    #[test]
    fn test_missing_comuni_file_is_reported_with_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("comuni.json");
        let err = build_catalog_from_files(dir.path(), &missing).unwrap_err();
        assert!(matches!(err, ScuoleError::Other(_)));
        assert!(err.to_string().contains("comuni.json"));
    }
}
