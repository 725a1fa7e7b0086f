use ahash::AHashSet as HashSet;
use once_cell::sync::Lazy;
use regex::Regex;

use super::{SearchConfig, SearchError};

static SCUOLA_PRIMARIA: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)scuola primaria").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Clean up a raw query before it is split.
///
/// Drops the ubiquitous "scuola primaria" prefix, turns `,` `;` `.` into spaces and
/// collapses whitespace. The result still contains stopwords and short words.
#[must_use]
pub fn normalize_query(query: &str) -> String {
    let query = SCUOLA_PRIMARIA.replace_all(query, "");
    let query = query.replace([',', ';', '.'], " ");
    WHITESPACE.replace_all(query.trim(), " ").into_owned()
}

/// A query after tokenization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenizedQuery {
    /// Output of [`normalize_query`], the text fuzzy matching runs against
    pub normalized: String,
    /// Tokens left after stopword and length filtering, in query order
    pub tokens: Vec<String>,
}

/// Splits search queries into the tokens worth matching.
#[derive(Debug, Clone)]
pub struct QueryTokenizer {
    stopwords: HashSet<String>,
    min_token_len: usize,
}

impl Default for QueryTokenizer {
    fn default() -> Self {
        Self::from_config(&SearchConfig::default())
    }
}

impl QueryTokenizer {
    pub fn new<S: AsRef<str>>(
        stopwords: impl IntoIterator<Item = S>,
        min_token_len: usize,
    ) -> Self {
        Self {
            stopwords: stopwords
                .into_iter()
                .map(|w| w.as_ref().to_lowercase())
                .collect(),
            min_token_len,
        }
    }

    pub fn from_config(config: &SearchConfig) -> Self {
        Self::new(&config.stopwords, config.min_token_len)
    }

    /// Filtered tokens of `query`.
    ///
    /// ```rust
    /// use scuole::QueryTokenizer;
    ///
    /// let tokenizer = QueryTokenizer::default();
    /// let tokens = tokenizer.tokenize("Scuola Primaria Carducci, Firenze")?;
    /// assert_eq!(tokens, ["Carducci", "Firenze"]);
    /// assert!(tokenizer.tokenize("la via")?.is_empty());
    /// # Ok::<(), scuole::SearchError>(())
    /// ```
    pub fn tokenize(&self, query: &str) -> Result<Vec<String>, SearchError> {
        self.prepare(query).map(|q| q.tokens)
    }

    /// Normalize and tokenize `query`, keeping the normalized text around.
    ///
    /// Fails only for blank queries. A query made entirely of stopwords and short
    /// words yields no tokens.
    pub fn prepare(&self, query: &str) -> Result<TokenizedQuery, SearchError> {
        if query.trim().is_empty() {
            return Err(SearchError::EmptyQuery {
                query: query.to_string(),
            });
        }
        let normalized = normalize_query(query);
        let tokens = self.filter_tokens(&normalized);
        Ok(TokenizedQuery { normalized, tokens })
    }

    fn filter_tokens(&self, normalized: &str) -> Vec<String> {
        normalized
            .split(' ')
            .filter(|token| self.keep(token))
            .map(ToString::to_string)
            .collect()
    }

    /// Whether `token` is one of the ignored words.
    #[must_use]
    pub fn is_stopword(&self, token: &str) -> bool {
        self.stopwords.contains(&token.to_lowercase())
    }

    fn keep(&self, token: &str) -> bool {
        !token.is_empty()
            && token.chars().count() >= self.min_token_len
            && !self.is_stopword(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_query() {
        assert_eq!(
            normalize_query("  SCUOLA PRIMARIA   Carducci,Firenze;  via.Roma "),
            "Carducci Firenze via Roma"
        );
        assert_eq!(normalize_query("scuola primaria"), "");
        assert_eq!(normalize_query("Ponte\ta\nSieve"), "Ponte a Sieve");
    }

    #[test]
    fn test_short_and_stopword_tokens_are_dropped() {
        let tokenizer = QueryTokenizer::default();
        assert!(tokenizer.tokenize("la via").unwrap().is_empty());
        assert_eq!(
            tokenizer
                .tokenize("Istituto Comprensivo Santa Maria Novella")
                .unwrap(),
            ["Maria", "Novella"]
        );
        // stopword check ignores case
        assert_eq!(
            tokenizer.tokenize("PLESSO Infanzia MATERNA Rodari").unwrap(),
            ["Rodari"]
        );
        assert_eq!(tokenizer.tokenize("Gianni Rodari").unwrap(), ["Gianni", "Rodari"]);
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        let tokenizer = QueryTokenizer::default();
        // four characters, six bytes
        assert!(tokenizer.tokenize("àèìò").unwrap().is_empty());
        assert_eq!(tokenizer.tokenize("Forlì").unwrap(), ["Forlì"]);
    }

    #[test]
    fn test_blank_query_is_an_error() {
        let tokenizer = QueryTokenizer::default();
        for query in ["", "   ", "\t\n"] {
            assert_eq!(
                tokenizer.tokenize(query),
                Err(SearchError::EmptyQuery {
                    query: query.to_string()
                })
            );
        }
        // only noise, but not blank
        assert!(tokenizer.tokenize("scuola primaria").unwrap().is_empty());
    }

    #[test]
    fn test_prepare_keeps_normalized_query() {
        let tokenizer = QueryTokenizer::default();
        let prepared = tokenizer.prepare("Scuola primaria di Pnote a Sieve").unwrap();
        assert_eq!(prepared.normalized, "di Pnote a Sieve");
        assert_eq!(prepared.tokens, ["Pnote", "Sieve"]);
    }

    #[test]
    fn test_tokenize_is_idempotent_without_noise() {
        let tokenizer = QueryTokenizer::default();
        for query in ["Carducci Firenze", "Galilei, Pontassieve", "Mazzei; Prato. Filippo"] {
            let tokens = tokenizer.tokenize(query).unwrap();
            let again = tokenizer.tokenize(&tokens.join(" ")).unwrap();
            assert_eq!(tokens, again);
        }
    }

    #[test]
    fn test_custom_configuration() {
        let tokenizer = QueryTokenizer::new(["firenze"], 3);
        assert_eq!(
            tokenizer.tokenize("via Roma Firenze").unwrap(),
            ["via", "Roma"]
        );
        assert!(tokenizer.is_stopword("FIRENZE"));
        assert!(!tokenizer.is_stopword("scuola"));
    }
}
