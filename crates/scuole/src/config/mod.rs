use crate::{
    error::ScuoleError,
    search::{ScoringMode, SearchConfig, TieBreak},
};

/// Builder for creating search configurations with ergonomic defaults
#[derive(Debug, Clone, Default)]
pub struct SearchConfigBuilder {
    config: SearchConfig,
}

impl SearchConfigBuilder {
    /// Create a new builder with the production defaults
    pub fn new() -> Self {
        Self {
            config: SearchConfig::default(),
        }
    }

    /// Create a builder that only counts literal token matches
    pub fn simple() -> Self {
        Self::new().scoring_mode(ScoringMode::Simple)
    }

    /// Create a builder that adds fuzzy similarity to literal matches
    pub fn fuzzy() -> Self {
        Self::new().scoring_mode(ScoringMode::Fuzzy)
    }

    pub fn scoring_mode(mut self, mode: ScoringMode) -> Self {
        self.config.scoring_mode = mode;
        self
    }

    /// Set the scoring mode by name, `"simple"` or `"fuzzy"`
    pub fn scoring_mode_str(self, mode: &str) -> Result<Self, ScuoleError> {
        Ok(self.scoring_mode(mode.parse()?))
    }

    /// Set the points awarded per token found in the school and city name
    pub fn weights(mut self, school_name: f64, city_name: f64) -> Result<Self, ScuoleError> {
        for (label, weight) in [("school name", school_name), ("city name", city_name)] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(ScuoleError::ConfigError(format!(
                    "{label} weight must be a non-negative number, got {weight}"
                )));
            }
        }
        self.config.school_name_weight = school_name;
        self.config.city_name_weight = city_name;
        Ok(self)
    }

    /// Set the maximum number of results to return
    pub fn limit(mut self, limit: usize) -> Self {
        self.config.limit = Some(limit);
        self
    }

    /// Return every match
    pub fn unlimited(mut self) -> Self {
        self.config.limit = None;
        self
    }

    pub fn tie_break(mut self, tie_break: TieBreak) -> Self {
        self.config.tie_break = tie_break;
        self
    }

    /// Ignore query tokens shorter than `len` characters
    pub fn min_token_len(mut self, len: usize) -> Self {
        self.config.min_token_len = len;
        self
    }

    /// Replace the list of ignored words
    pub fn stopwords<S: Into<String>>(mut self, stopwords: impl IntoIterator<Item = S>) -> Self {
        self.config.stopwords = stopwords.into_iter().map(Into::into).collect();
        self
    }

    /// Build the final configuration
    pub fn build(self) -> SearchConfig {
        self.config
    }
}
