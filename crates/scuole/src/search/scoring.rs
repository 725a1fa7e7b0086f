use std::{fmt, str::FromStr};

use itertools::Itertools;
use rapidfuzz::fuzz;

use super::SearchConfig;
use crate::{SchoolEntity, error::ScuoleError};

/// How candidate schools are scored.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ScoringMode {
    /// Weighted substring matches only
    Simple,
    /// Weighted substring matches plus word-order-insensitive fuzzy similarity
    #[default]
    Fuzzy,
}

impl ScoringMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Fuzzy => "fuzzy",
        }
    }
}

impl fmt::Display for ScoringMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScoringMode {
    type Err = ScuoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "simple" => Ok(Self::Simple),
            "fuzzy" => Ok(Self::Fuzzy),
            _ => Err(ScuoleError::ConfigError(format!(
                "Invalid search algorithm '{s}', expected 'simple' or 'fuzzy'"
            ))),
        }
    }
}

/// The independently computed parts of a score.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScoreBreakdown {
    /// Name substring matches times the name weight
    pub school_name_score: f64,
    /// City substring matches times the city weight
    pub city_name_score: f64,
    /// Fuzzy similarity on a 0-100 scale, `None` in simple mode
    pub fuzzy_score: Option<f64>,
}

impl ScoreBreakdown {
    #[must_use]
    pub fn total(&self) -> f64 {
        self.school_name_score + self.city_name_score + self.fuzzy_score.unwrap_or(0.0)
    }
}

/// A candidate school together with its relevance for one query.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredMatch {
    pub entity: SchoolEntity,
    /// Higher is better
    pub score: f64,
    pub breakdown: ScoreBreakdown,
}

impl fmt::Display for ScoredMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>7.1}  {}", self.score, self.entity)
    }
}

/// Number of `tokens` contained in `field`, ignoring case.
///
/// Every occurrence of a token in the list counts, so a token repeated in the
/// query counts twice.
#[must_use]
pub fn substring_score<S: AsRef<str>>(tokens: &[S], field: &str) -> usize {
    let field = field.to_lowercase();
    tokens
        .iter()
        .filter(|token| field.contains(&token.as_ref().to_lowercase()))
        .count()
}

/// Word-order-insensitive similarity of two strings on a 0-100 scale.
///
/// Both strings are lower-cased, anything that is not alphanumeric separates
/// words, words are sorted and the sorted strings compared with an Indel ratio.
/// The result is rounded to a whole number.
///
/// ```rust
/// use scuole::token_sort_ratio;
///
/// assert_eq!(token_sort_ratio("Ponte a Sieve", "sieve, PONTE a"), 100.0);
/// assert_eq!(token_sort_ratio("", "Firenze"), 0.0);
/// ```
#[must_use]
pub fn token_sort_ratio(a: &str, b: &str) -> f64 {
    let a = sorted_tokens(a);
    let b = sorted_tokens(b);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    (fuzz::ratio(a.chars(), b.chars()) * 100.0).round()
}

fn sorted_tokens(s: &str) -> String {
    s.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .sorted_unstable()
        .join(" ")
}

/// Scores candidate schools against a tokenized query.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringEngine {
    mode: ScoringMode,
    school_name_weight: f64,
    city_name_weight: f64,
}

impl Default for ScoringEngine {
    fn default() -> Self {
        Self::new(&SearchConfig::default())
    }
}

impl ScoringEngine {
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            mode: config.scoring_mode,
            school_name_weight: config.school_name_weight,
            city_name_weight: config.city_name_weight,
        }
    }

    pub fn mode(&self) -> ScoringMode {
        self.mode
    }

    /// Score `entity` for the filtered `tokens` of a query whose normalized,
    /// unfiltered text is `query`.
    ///
    /// A school that matches no token literally keeps a substring score of zero
    /// and can still rank through fuzzy similarity.
    pub fn score<S: AsRef<str>>(
        &self,
        tokens: &[S],
        query: &str,
        entity: SchoolEntity,
    ) -> ScoredMatch {
        let school_name_score =
            substring_score(tokens, &entity.name) as f64 * self.school_name_weight;
        let city_name_score =
            substring_score(tokens, &entity.city_name) as f64 * self.city_name_weight;

        let fuzzy_score = match self.mode {
            ScoringMode::Simple => None,
            ScoringMode::Fuzzy => Some(token_sort_ratio(query, &entity.search_text())),
        };

        let breakdown = ScoreBreakdown {
            school_name_score,
            city_name_score,
            fuzzy_score,
        };
        ScoredMatch {
            score: breakdown.total(),
            breakdown,
            entity,
        }
    }
}
