//! Scuole - Italian School Registry Search
//!
//! Scuole turns the open data published by the Italian Ministry of Education into a
//! clean, searchable catalog of schools. Raw registry records are normalized into
//! [`SchoolEntity`] values, enriched with municipality, province and region data
//! from their cadastral code, and made searchable through a hybrid of weighted
//! substring matching and word-order-insensitive fuzzy similarity.
//!
//! # Quick Start
//!
//! ```rust
//! use scuole::{ComuniIndex, RecordNormalizer, SchoolSearcher, SearchConfig, build_catalog};
//! use scuole::data_processing::{TestDataConfig, create_test_data, raw};
//!
//! let data = create_test_data(&TestDataConfig::minimal())?;
//! let records = raw::load_raw_records(&data.raw_dir(), raw::RAW_DATA_FILE_TYPES)?;
//!
//! let normalizer = RecordNormalizer::new(ComuniIndex::from_file(&data.comuni_file())?);
//! let catalog = build_catalog(&records, &normalizer)?;
//!
//! let searcher = SchoolSearcher::new(catalog, SearchConfig::default());
//! for hit in searcher.search("Carducci Firenze")? {
//!     println!("{hit}");
//! }
//! # Ok::<(), scuole::error::ScuoleError>(())
//! ```
//!
//! # Features
//!
//! - **Normalization**: unavailable markers dropped, grade level stripped from names,
//!   institutional e-mail fallback, parent institute links
//! - **Geo Enrichment**: municipality, NUTS3 code, province and region by cadastral code
//! - **Hybrid Search**: name and city substring weights plus fuzzy similarity that
//!   survives misspellings and word swaps
//! - **Columnar Storage**: the catalog is a Polars table persisted as Parquet
//! - **Batch Processing**: records are normalized and queries answered in parallel
use once_cell::sync::OnceCell;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

mod config;
mod core;
pub mod error;
mod normalize;
mod search;
mod store;

pub use crate::core::{SchoolSearcher, build_catalog, build_catalog_from_files};

pub use config::SearchConfigBuilder;
pub use normalize::{
    ComuniIndex, DEFAULT_INSTITUTIONAL_DOMAIN, DebugInfo, FALLBACK_SCHOOL_TYPE, GeoLookup,
    GeoMiss, NoGeoLookup, NormalizeConfig, NormalizeError, ParentSchool, RecordNormalizer,
    SchoolEntity, clean_field, fields, resolve_location, strip_school_type,
};
pub use polars;
pub use scuole_data_processing as data_processing;
pub use scuole_data_processing::{LocationRecord, RawRecord, Region};
pub use search::{
    DEFAULT_CITY_NAME_WEIGHT, DEFAULT_MIN_TOKEN_LEN, DEFAULT_SCHOOL_NAME_WEIGHT,
    DEFAULT_STOPWORDS, QueryTokenizer, ResultRanker, ScoreBreakdown, ScoredMatch, ScoringEngine,
    ScoringMode, SearchConfig, SearchError, TieBreak, TokenizedQuery, normalize_query,
    substring_score, token_sort_ratio,
};
pub use store::{CandidateError, CandidateSource, InMemorySchools, SchoolTable, columns};

static LOGGER_INIT: OnceCell<()> = OnceCell::new();

/// Initialize logging for the Scuole library.
///
/// `RUST_LOG` takes precedence over `level`. Calling this more than once is
/// harmless, only the first call installs a subscriber.
///
/// ```rust
/// use scuole::init_logging;
/// use tracing::Level;
///
/// init_logging(Level::INFO)?;
/// # Ok::<(), scuole::error::ScuoleError>(())
/// ```
pub fn init_logging(level: impl Into<LevelFilter>) -> Result<&'static (), error::ScuoleError> {
    LOGGER_INIT.get_or_try_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(level.into().to_string()))?
            .add_directive("polars=warn".parse()?);

        tracing_subscriber::fmt::fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .init();
        Ok(())
    })
}
