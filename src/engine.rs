// 🔍 Matching Engine - scatter-score, then gather-rank
//
// 1. Validate the query (no work at all for an unusable query)
// 2. Enumerate the whole register (failure aborts the search)
// 3. Score every identity in parallel; the register is read-only here
// 4. Barrier: rank the complete scored set, then truncate

use crate::config::MatcherConfig;
use crate::error::{MatchError, Result};
use crate::identity::RegisterIdentity;
use crate::query::MatchQuery;
use crate::ranker::{rank_by, Ranked};
use crate::register::RegisterSource;
use crate::scorer::{CompositeScorer, FieldScores};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

// ============================================================================
// CANDIDATE RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateResult {
    /// `dss_id` of the register identity
    pub identity_ref: String,

    /// Composite score over all usable fields (0.0 - 1.0)
    pub score: f64,

    /// Score over the name fields only (0.0 - 1.0)
    pub name_score: f64,

    pub rank_dense: u32,
    pub rank_competition: u32,
    pub row_number: u32,

    // Display snapshot of the identity
    pub birth_year: Option<i32>,
    pub location: Option<String>,
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,

    /// Names were compared but agree poorly
    pub low_name_score: bool,

    /// Birth years differ by at least the configured gap
    pub birth_year_gap: bool,
}

// ============================================================================
// MATCH ENGINE
// ============================================================================

pub struct MatchEngine {
    config: MatcherConfig,
    /// Dedicated pool when parallelism is bounded; otherwise the global pool
    pool: Option<rayon::ThreadPool>,
}

impl MatchEngine {
    pub fn new(config: MatcherConfig) -> Result<Self> {
        config.validate()?;

        let pool = match config.parallelism {
            Some(threads) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|i| format!("dss-score-{}", i))
                    .build()
                    .map_err(|e| MatchError::Config(format!("cannot build scoring pool: {}", e)))?,
            ),
            None => None,
        };

        Ok(MatchEngine { config, pool })
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Ranked candidates for `query`, best first
    pub fn search<R: RegisterSource + ?Sized>(
        &self,
        register: &R,
        query: &MatchQuery,
    ) -> Result<Vec<CandidateResult>> {
        query.validate()?;
        let started = Instant::now();

        let identities = register.identities()?;
        debug!(
            register_size = identities.len(),
            criteria = %query.criteria_label(),
            "scoring register"
        );

        let scored = self.score_all(&identities, query);
        let scored_count = scored.len();

        let mut ranked = rank_by(scored, |c| c.1.score, |c| c.0.dss_id.as_str());
        if let Some(limit) = self.config.result_limit() {
            ranked.truncate(limit);
        }

        let results: Vec<CandidateResult> = ranked
            .into_iter()
            .map(|r| self.to_result(r, query))
            .collect();

        info!(
            register_size = identities.len(),
            scored = scored_count,
            returned = results.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "search complete"
        );

        Ok(results)
    }

    fn score_all<'a>(
        &self,
        identities: &'a [RegisterIdentity],
        query: &MatchQuery,
    ) -> Vec<(&'a RegisterIdentity, FieldScores)> {
        let scorer = CompositeScorer::new(query, &self.config);
        let run = || {
            identities
                .par_iter()
                .filter_map(|identity| scorer.score(identity).map(|s| (identity, s)))
                .collect::<Vec<_>>()
        };

        match &self.pool {
            Some(pool) => pool.install(run),
            None => run(),
        }
    }

    fn to_result(
        &self,
        ranked: Ranked<(&RegisterIdentity, FieldScores)>,
        query: &MatchQuery,
    ) -> CandidateResult {
        let (identity, scores) = ranked.item;

        let low_name_score =
            scores.name_evaluated && scores.name_score < self.config.low_name_score_threshold;

        let birth_year_gap = match (query.birth_year, identity.birth_year) {
            (Some(q), Some(c)) => {
                q.abs_diff(c) >= self.config.birth_year_gap_warn.unsigned_abs()
            }
            _ => false,
        };

        CandidateResult {
            identity_ref: identity.dss_id.clone(),
            score: scores.score,
            name_score: scores.name_score,
            rank_dense: ranked.rank_dense,
            rank_competition: ranked.rank_competition,
            row_number: ranked.row_number,
            birth_year: identity.birth_year,
            location: identity.location(),
            first_name: identity.first_name.clone(),
            middle_name: identity.middle_name.clone(),
            last_name: identity.last_name.clone(),
            gender: identity.gender.clone(),
            low_name_score,
            birth_year_gap,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
