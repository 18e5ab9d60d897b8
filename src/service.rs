// 🚪 Match service - the four operations offered to the gateway
//
// Search, AssignMatch, CheckExists, GetStatus (+ review recording).
// AssignMatch does not call CheckExists itself; the gateway is expected to.

use crate::config::MatcherConfig;
use crate::engine::{CandidateResult, MatchEngine};
use crate::error::Result;
use crate::ledger::{CaseKey, MatchLedger, MatchRecord, MatchStatus};
use crate::query::MatchQuery;
use crate::register::RegisterSource;

pub struct MatchService<R: RegisterSource> {
    engine: MatchEngine,
    register: R,
    ledger: MatchLedger,
}

impl<R: RegisterSource> MatchService<R> {
    pub fn new(config: MatcherConfig, register: R, ledger: MatchLedger) -> Result<Self> {
        Ok(MatchService {
            engine: MatchEngine::new(config)?,
            register,
            ledger,
        })
    }

    pub fn engine(&self) -> &MatchEngine {
        &self.engine
    }

    pub fn ledger(&self) -> &MatchLedger {
        &self.ledger
    }

    pub fn search(&self, query: &MatchQuery) -> Result<Vec<CandidateResult>> {
        self.engine.search(&self.register, query)
    }

    pub fn assign_match(&self, record: &MatchRecord) -> Result<i64> {
        self.ledger.assign(record)
    }

    pub fn check_exists(&self, key: &CaseKey) -> Result<bool> {
        self.ledger.exists(key)
    }

    pub fn get_status(&self, key: &CaseKey) -> Result<MatchStatus> {
        self.ledger.status(key)
    }

    pub fn record_review(
        &self,
        match_id: i64,
        status: &str,
        comment: Option<&str>,
        reviewer: &str,
    ) -> Result<String> {
        self.ledger.record_review(match_id, status, comment, reviewer)
    }
}

/// Build the ledger record for assigning `candidate` to `case`
pub fn snapshot_record(
    case: &CaseKey,
    record_no: &str,
    query: &MatchQuery,
    candidate: &CandidateResult,
) -> MatchRecord {
    MatchRecord {
        record_no: record_no.to_string(),
        facility: case.facility.clone(),
        identifiers: case.identifiers.clone(),
        search_criteria: query.criteria_label(),
        dss_id: candidate.identity_ref.clone(),
        score: candidate.score,
        rank_dense: candidate.rank_dense,
        rank_competition: candidate.rank_competition,
        row_number: candidate.row_number,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{Field, RegisterIdentity};
    use crate::ledger::ClinicIdentifiers;
    use crate::register::InMemoryRegister;

    fn service() -> MatchService<InMemoryRegister> {
        let config = MatcherConfig::default();
        let ledger = MatchLedger::open_in_memory(&config).unwrap();
        let register = InMemoryRegister::new(vec![RegisterIdentity {
            dss_id: "DSS-7".into(),
            last_name: Some("Mwangi".into()),
            gender: Some("F".into()),
            ..Default::default()
        }]);
        MatchService::new(config, register, ledger).unwrap()
    }

    #[test]
    fn test_snapshot_carries_ranks_and_criteria() {
        let service = service();
        let query = MatchQuery::new()
            .with_text(Field::LastName, "Mwangi")
            .with_text(Field::Gender, "F");
        let best = service.search(&query).unwrap().remove(0);

        let case = CaseKey::new(
            "Kisesa HC",
            ClinicIdentifiers {
                unique_anc: Some("ANC-33".into()),
                ..Default::default()
            },
        );
        let record = snapshot_record(&case, "R-17", &query, &best);

        assert_eq!(record.dss_id, "DSS-7");
        assert_eq!(record.search_criteria, "last_name+gender");
        assert_eq!(record.score, 1.0);
        assert_eq!((record.rank_dense, record.rank_competition, record.row_number), (1, 1, 1));

        assert!(!service.check_exists(&case).unwrap());
        let id = service.assign_match(&record).unwrap();
        assert!(service.check_exists(&case).unwrap());

        service.record_review(id, "confirmed", None, "clerk").unwrap();
        assert_eq!(service.get_status(&case).unwrap().status, "confirmed");
    }
}
