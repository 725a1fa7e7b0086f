//! Search functionality for school matching.
//!
//! A query goes through three stages: the [`QueryTokenizer`] turns it into
//! meaningful tokens, the [`ScoringEngine`] scores every candidate school against
//! them and the [`ResultRanker`] orders the scored matches.

pub use error::SearchError;
mod ranking;
mod scoring;
mod tokenizer;

pub use ranking::{ResultRanker, TieBreak};
pub use scoring::{
    ScoreBreakdown, ScoredMatch, ScoringEngine, ScoringMode, substring_score, token_sort_ratio,
};
pub use tokenizer::{QueryTokenizer, TokenizedQuery, normalize_query};

use crate::SearchConfigBuilder;

/// Words that say nothing about which school is meant.
pub const DEFAULT_STOPWORDS: &[&str] = &[
    "di",
    "del",
    "dei",
    "dello",
    "della",
    "a",
    "al",
    "allo",
    "alla",
    "alle",
    "scuola",
    "istituto",
    "comprensivo",
    "primaria",
    "plesso",
    "san",
    "santo",
    "santa",
    "materna",
    "infanzia",
];

pub const DEFAULT_MIN_TOKEN_LEN: usize = 5;
pub const DEFAULT_SCHOOL_NAME_WEIGHT: f64 = 50.0;
pub const DEFAULT_CITY_NAME_WEIGHT: f64 = 80.0;

/// Configuration for school search.
///
/// Use [`SearchConfigBuilder`] for an ergonomic way to create configurations.
///
/// ```rust
/// use scuole::{ScoringMode, SearchConfig};
///
/// let config = SearchConfig::builder()
///     .scoring_mode(ScoringMode::Simple)
///     .limit(10)
///     .build();
/// assert_eq!(config.limit, Some(10));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    /// Substring matching only, or substring plus fuzzy similarity
    pub scoring_mode: ScoringMode,
    /// Points for every token found in the school name
    pub school_name_weight: f64,
    /// Points for every token found in the city name
    pub city_name_weight: f64,
    /// How schools with equal scores are ordered
    pub tie_break: TieBreak,
    /// Maximum number of results to return, unlimited when `None`
    pub limit: Option<usize>,
    /// Tokens shorter than this many characters are ignored
    pub min_token_len: usize,
    /// Tokens equal to one of these (ignoring case) are ignored
    pub stopwords: Vec<String>,
}

impl SearchConfig {
    pub fn builder() -> SearchConfigBuilder {
        SearchConfigBuilder::default()
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            scoring_mode: ScoringMode::default(),
            school_name_weight: DEFAULT_SCHOOL_NAME_WEIGHT,
            city_name_weight: DEFAULT_CITY_NAME_WEIGHT,
            tie_break: TieBreak::default(),
            limit: None,
            min_token_len: DEFAULT_MIN_TOKEN_LEN,
            stopwords: DEFAULT_STOPWORDS.iter().map(ToString::to_string).collect(),
        }
    }
}

mod error {
    use thiserror::Error;

    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum SearchError {
        #[error("search keyword mandatory (got {query:?})")]
        EmptyQuery { query: String },
    }
}
