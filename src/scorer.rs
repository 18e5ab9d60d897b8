// 🧮 Composite Scorer - weighted mean of the enabled field similarities
//
//   score      = Σ w·sim / Σ w   over enabled fields present on both sides
//   name_score = same, restricted to the six name fields
//
// A candidate with nothing to compare (Σ w = 0) carries no evidence and is dropped.

use crate::comparator::compare;
use crate::config::MatcherConfig;
use crate::identity::{Field, FieldValue, RegisterIdentity};
use crate::query::MatchQuery;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldScores {
    pub score: f64,
    pub name_score: f64,
    /// At least one name field was compared
    pub name_evaluated: bool,
}

/// Running Σ w·sim and Σ w
#[derive(Debug, Default, Clone, Copy)]
struct Accumulator {
    weighted: f64,
    weight: f64,
}

impl Accumulator {
    fn add(&mut self, similarity: f64, weight: f64) {
        self.weighted += similarity * weight;
        self.weight += weight;
    }

    fn mean(&self) -> Option<f64> {
        if self.weight > 0.0 {
            Some((self.weighted / self.weight).clamp(0.0, 1.0))
        } else {
            None
        }
    }
}

/// Query values resolved once, then scored against every candidate
#[derive(Debug, Clone)]
pub struct CompositeScorer<'q> {
    terms: Vec<(Field, FieldValue<'q>, f64)>,
}

impl<'q> CompositeScorer<'q> {
    pub fn new(query: &'q MatchQuery, config: &MatcherConfig) -> Self {
        let terms = Field::ALL
            .iter()
            .filter_map(|field| {
                query
                    .active_value(*field)
                    .map(|value| (*field, value, config.weight(*field)))
            })
            .collect();

        CompositeScorer { terms }
    }

    /// Scores for one candidate, or `None` if no weighted field could be compared
    pub fn score(&self, candidate: &RegisterIdentity) -> Option<FieldScores> {
        let mut all = Accumulator::default();
        let mut names = Accumulator::default();
        let mut name_evaluated = false;

        for (field, query_value, weight) in &self.terms {
            let Some(similarity) =
                compare(field.kind(), Some(*query_value), candidate.value(*field))
            else {
                continue;
            };

            all.add(similarity, *weight);
            if field.is_name() {
                names.add(similarity, *weight);
                name_evaluated = true;
            }
        }

        let score = all.mean()?;
        Some(FieldScores {
            score,
            name_score: names.mean().unwrap_or(0.0),
            name_evaluated,
        })
    }
}
