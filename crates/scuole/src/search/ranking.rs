use std::cmp::Ordering;

use super::ScoredMatch;

/// Ordering of matches with equal scores.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TieBreak {
    /// Later retrieved candidates first.
    ///
    /// Equivalent to a stable ascending sort followed by a reversal, the historic
    /// ordering of the search endpoint.
    #[default]
    ReverseRetrievalOrder,
    /// Ascending school code, independent of retrieval order
    EntityId,
}

/// Orders scored matches, best first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResultRanker {
    tie_break: TieBreak,
}

impl ResultRanker {
    pub fn new(tie_break: TieBreak) -> Self {
        Self { tie_break }
    }

    pub fn tie_break(&self) -> TieBreak {
        self.tie_break
    }

    /// Sort `matches` by descending score.
    ///
    /// `matches` must be in retrieval order. The output is a permutation of the
    /// input.
    #[must_use]
    pub fn rank(&self, mut matches: Vec<ScoredMatch>) -> Vec<ScoredMatch> {
        match self.tie_break {
            TieBreak::ReverseRetrievalOrder => {
                matches.sort_by(|a, b| a.score.total_cmp(&b.score));
                matches.reverse();
            }
            TieBreak::EntityId => {
                matches.sort_by(|a, b| match b.score.total_cmp(&a.score) {
                    Ordering::Equal => a.entity.id.cmp(&b.entity.id),
                    other => other,
                });
            }
        }
        matches
    }

    /// Rank `matches` and keep the best `limit`, all of them when `None`.
    #[must_use]
    pub fn rank_limited(
        &self,
        matches: Vec<ScoredMatch>,
        limit: Option<usize>,
    ) -> Vec<ScoredMatch> {
        let mut ranked = self.rank(matches);
        if let Some(limit) = limit {
            ranked.truncate(limit);
        }
        ranked
    }
}
