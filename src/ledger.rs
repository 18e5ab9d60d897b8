// 📒 Match Ledger - append-only record of operator assignment decisions
//
// - assign:  appends a MatchRecord (never updates or deletes)
// - exists:  has this facility case already been assigned?
// - status:  most advanced status across the case's records and reviews
//
// exists → assign is a check-then-act pair and is NOT atomic: two operators
// assigning the same case concurrently can both pass `exists` and both insert.
// Duplicates stay visible (see `records_for_case`) for manual reconciliation.

use crate::config::{MatcherConfig, ASSIGNED_STATUS};
use crate::error::{MatchError, Result};
use crate::validation::{ValidationResult, Validator};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

// ============================================================================
// CLINIC IDENTIFIERS
// ============================================================================

/// Facility-side case identifiers; together with the facility they key a case
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClinicIdentifiers {
    pub unique_ctc_id_number: Option<String>,
    pub tgr_form_number: Option<String>,
    pub file_ref: Option<String>,
    pub ctc_infant: Option<String>,
    pub unique_htc: Option<String>,
    pub unique_anc: Option<String>,
    pub anc_infant: Option<String>,
    pub heid_infant: Option<String>,
}

/// Absent and empty are the same identifier
pub fn normalize(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("")
}

impl ClinicIdentifiers {
    /// All eight identifiers, in column order, with absent values as ""
    pub fn normalized(&self) -> [&str; 8] {
        [
            normalize(&self.unique_ctc_id_number),
            normalize(&self.tgr_form_number),
            normalize(&self.file_ref),
            normalize(&self.ctc_infant),
            normalize(&self.unique_htc),
            normalize(&self.unique_anc),
            normalize(&self.anc_infant),
            normalize(&self.heid_infant),
        ]
    }

    /// Equality under absent/empty normalization
    pub fn same_case(&self, other: &ClinicIdentifiers) -> bool {
        self.normalized() == other.normalized()
    }

    fn from_row(row: &Row<'_>, first: usize) -> rusqlite::Result<Self> {
        Ok(ClinicIdentifiers {
            unique_ctc_id_number: row.get(first)?,
            tgr_form_number: row.get(first + 1)?,
            file_ref: row.get(first + 2)?,
            ctc_infant: row.get(first + 3)?,
            unique_htc: row.get(first + 4)?,
            unique_anc: row.get(first + 5)?,
            anc_infant: row.get(first + 6)?,
            heid_infant: row.get(first + 7)?,
        })
    }
}

/// Facility plus clinic identifiers: one logical case
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseKey {
    pub facility: String,
    #[serde(flatten)]
    pub identifiers: ClinicIdentifiers,
}

impl CaseKey {
    pub fn new(facility: impl Into<String>, identifiers: ClinicIdentifiers) -> Self {
        CaseKey {
            facility: facility.into(),
            identifiers,
        }
    }

    pub fn validate(&self) -> ValidationResult {
        let mut v = Validator::new("CaseKey");
        v.require("facility", &self.facility);
        v.finish()
    }
}

// ============================================================================
// MATCH RECORD
// ============================================================================

/// One assignment decision plus a snapshot of the winning candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub record_no: String,
    pub facility: String,
    #[serde(flatten)]
    pub identifiers: ClinicIdentifiers,
    /// Which query fields produced the candidate, e.g. `last_name+gender`
    pub search_criteria: String,
    /// `dss_id` of the assigned register identity
    pub dss_id: String,
    pub score: f64,
    pub rank_dense: u32,
    pub rank_competition: u32,
    pub row_number: u32,
}

impl MatchRecord {
    pub fn case_key(&self) -> CaseKey {
        CaseKey::new(self.facility.clone(), self.identifiers.clone())
    }

    pub fn validate(&self) -> ValidationResult {
        let mut v = Validator::new("MatchRecord");
        v.require("facility", &self.facility)
            .require("record_no", &self.record_no)
            .require("dss_id", &self.dss_id)
            .require("search_criteria", &self.search_criteria)
            .require_unit_range("score", self.score)
            .require_positive("rank_dense", i64::from(self.rank_dense))
            .require_positive("rank_competition", i64::from(self.rank_competition))
            .require_positive("row_number", i64::from(self.row_number));
        v.finish()
    }
}

/// A record as stored, with its ledger id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMatch {
    pub id: i64,
    #[serde(flatten)]
    pub record: MatchRecord,
    pub created_at: DateTime<Utc>,
}

/// Downstream review of an assignment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewEvent {
    pub event_id: String,
    pub match_id: i64,
    pub status: String,
    pub comment: Option<String>,
    pub reviewer: String,
    pub created_at: DateTime<Utc>,
}

/// Aggregated status for a case; `("", None)` when nothing matches
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchStatus {
    pub status: String,
    pub comment: Option<String>,
}

// ============================================================================
// SCHEMA
// ============================================================================

/// `?1` is the facility, `?2..?9` the normalized identifiers
const CASE_FILTER: &str = "facility = ?1
      AND coalesce(unique_ctcid_number, '') = ?2
      AND coalesce(tgr_form_number, '') = ?3
      AND coalesce(file_ref, '') = ?4
      AND coalesce(ctc_infant, '') = ?5
      AND coalesce(unique_htc, '') = ?6
      AND coalesce(unique_anc, '') = ?7
      AND coalesce(anc_infant, '') = ?8
      AND coalesce(heid_infant, '') = ?9";

pub fn setup_ledger(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")
        .map_err(MatchError::LedgerUnavailable)?;

    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS matches (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            record_no TEXT NOT NULL,
            facility TEXT NOT NULL,
            unique_ctcid_number TEXT,
            tgr_form_number TEXT,
            file_ref TEXT,
            ctc_infant TEXT,
            unique_htc TEXT,
            unique_anc TEXT,
            anc_infant TEXT,
            heid_infant TEXT,
            search_criteria TEXT NOT NULL,
            dss_id TEXT NOT NULL,
            score REAL NOT NULL,
            rank_no_gap INTEGER NOT NULL,
            rank_gap INTEGER NOT NULL,
            row_number INTEGER NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS match_reviews (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            match_id INTEGER NOT NULL REFERENCES matches(id),
            status TEXT NOT NULL,
            comment TEXT,
            reviewer TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE TRIGGER IF NOT EXISTS matches_append_only_update
        BEFORE UPDATE ON matches
        BEGIN SELECT RAISE(ABORT, 'matches is append-only'); END;

        CREATE TRIGGER IF NOT EXISTS matches_append_only_delete
        BEFORE DELETE ON matches
        BEGIN SELECT RAISE(ABORT, 'matches is append-only'); END;

        CREATE TRIGGER IF NOT EXISTS match_reviews_append_only_update
        BEFORE UPDATE ON match_reviews
        BEGIN SELECT RAISE(ABORT, 'match_reviews is append-only'); END;

        CREATE TRIGGER IF NOT EXISTS match_reviews_append_only_delete
        BEFORE DELETE ON match_reviews
        BEGIN SELECT RAISE(ABORT, 'match_reviews is append-only'); END;

        CREATE VIEW IF NOT EXISTS match_status_view AS
            SELECT m.facility, {cols}, '{assigned}' AS status, NULL AS comment
            FROM matches m
            UNION ALL
            SELECT m.facility, {cols}, r.status, r.comment
            FROM match_reviews r JOIN matches m ON m.id = r.match_id;

        CREATE INDEX IF NOT EXISTS idx_matches_case ON matches(facility, unique_ctcid_number);
        CREATE INDEX IF NOT EXISTS idx_reviews_match ON match_reviews(match_id);",
        cols = "m.unique_ctcid_number, m.tgr_form_number, m.file_ref, m.ctc_infant,
                m.unique_htc, m.unique_anc, m.anc_infant, m.heid_infant",
        assigned = ASSIGNED_STATUS,
    ))
    .map_err(MatchError::LedgerUnavailable)
}

// ============================================================================
// LEDGER
// ============================================================================

pub struct MatchLedger {
    conn: Connection,
    /// Least advanced first
    status_vocabulary: Vec<String>,
}

impl MatchLedger {
    pub fn new(conn: Connection, config: &MatcherConfig) -> Result<Self> {
        setup_ledger(&conn)?;
        Ok(MatchLedger {
            conn,
            status_vocabulary: config.status_vocabulary.clone(),
        })
    }

    pub fn open(path: &Path, config: &MatcherConfig) -> Result<Self> {
        let conn = Connection::open(path).map_err(MatchError::LedgerUnavailable)?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(MatchError::LedgerUnavailable)?;
        Self::new(conn, config)
    }

    pub fn open_in_memory(config: &MatcherConfig) -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(MatchError::LedgerUnavailable)?;
        Self::new(conn, config)
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Append a validated record and return its ledger id.
    /// Does not check for an existing assignment; call `exists` first.
    pub fn assign(&self, record: &MatchRecord) -> Result<i64> {
        record.validate()?;

        let ids = &record.identifiers;
        self.conn
            .execute(
                "INSERT INTO matches (
                    record_no, facility, unique_ctcid_number, tgr_form_number, file_ref,
                    ctc_infant, unique_htc, unique_anc, anc_infant, heid_infant,
                    search_criteria, dss_id, score, rank_no_gap, rank_gap, row_number,
                    created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
                params![
                    record.record_no,
                    record.facility,
                    ids.unique_ctc_id_number,
                    ids.tgr_form_number,
                    ids.file_ref,
                    ids.ctc_infant,
                    ids.unique_htc,
                    ids.unique_anc,
                    ids.anc_infant,
                    ids.heid_infant,
                    record.search_criteria,
                    record.dss_id,
                    record.score,
                    record.rank_dense,
                    record.rank_competition,
                    record.row_number,
                    Utc::now().to_rfc3339(),
                ],
            )
            .map_err(MatchError::LedgerUnavailable)?;

        let id = self.conn.last_insert_rowid();
        info!(
            match_id = id,
            facility = %record.facility,
            record_no = %record.record_no,
            dss_id = %record.dss_id,
            "match assigned"
        );
        Ok(id)
    }

    /// Has any record already been assigned to this case?
    pub fn exists(&self, key: &CaseKey) -> Result<bool> {
        key.validate()?;

        let sql = format!("SELECT EXISTS (SELECT 1 FROM matches WHERE {})", CASE_FILTER);
        let [a, b, c, d, e, f, g, h] = key.identifiers.normalized();
        let found: bool = self
            .conn
            .query_row(&sql, params![key.facility, a, b, c, d, e, f, g, h], |row| {
                row.get(0)
            })
            .map_err(MatchError::LedgerUnavailable)?;

        if found {
            warn!(facility = %key.facility, "case already has an assignment");
        } else {
            debug!(facility = %key.facility, "case not yet assigned");
        }
        Ok(found)
    }

    /// Most advanced status across the case's records and reviews
    pub fn status(&self, key: &CaseKey) -> Result<MatchStatus> {
        key.validate()?;

        let sql = format!(
            "SELECT status, comment FROM match_status_view WHERE {}",
            CASE_FILTER
        );
        let [a, b, c, d, e, f, g, h] = key.identifiers.normalized();
        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(MatchError::LedgerUnavailable)?;
        let rows = stmt
            .query_map(params![key.facility, a, b, c, d, e, f, g, h], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
            })
            .map_err(MatchError::LedgerUnavailable)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(MatchError::LedgerUnavailable)?;

        Ok(self.most_advanced(rows))
    }

    /// Known statuses rank by vocabulary position, above any unknown status;
    /// unknown statuses compare lexicographically among themselves.
    fn status_key<'s>(&self, status: &'s str) -> (Option<usize>, &'s str) {
        (
            self.status_vocabulary.iter().position(|s| s == status),
            status,
        )
    }

    fn most_advanced(&self, rows: Vec<(String, Option<String>)>) -> MatchStatus {
        let Some(best) = rows
            .iter()
            .map(|(status, _)| status.as_str())
            .max_by(|a, b| self.status_key(a).cmp(&self.status_key(b)))
        else {
            return MatchStatus::default();
        };

        let comment = rows
            .iter()
            .filter(|(status, _)| status == best)
            .filter_map(|(_, comment)| comment.clone())
            .max();

        MatchStatus {
            status: best.to_string(),
            comment,
        }
    }

    /// Append a review event for an existing match; returns the event id
    pub fn record_review(
        &self,
        match_id: i64,
        status: &str,
        comment: Option<&str>,
        reviewer: &str,
    ) -> Result<String> {
        let mut v = Validator::new("ReviewEvent");
        v.require("reviewer", reviewer).require("status", status);
        if !status.trim().is_empty() && !self.status_vocabulary.iter().any(|s| s == status) {
            v.fail(
                "status",
                format!(
                    "Unknown status {:?}, expected one of {}",
                    status,
                    self.status_vocabulary.join(", ")
                ),
            );
        }
        if self.find(match_id)?.is_none() {
            v.fail("match_id", format!("No match with id {}", match_id));
        }
        v.finish()?;

        let event_id = uuid::Uuid::new_v4().to_string();
        self.conn
            .execute(
                "INSERT INTO match_reviews (event_id, match_id, status, comment, reviewer, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    event_id,
                    match_id,
                    status,
                    comment.filter(|c| !c.trim().is_empty()),
                    reviewer,
                    Utc::now().to_rfc3339(),
                ],
            )
            .map_err(MatchError::LedgerUnavailable)?;

        info!(match_id, status, reviewer, "review recorded");
        Ok(event_id)
    }

    pub fn find(&self, match_id: i64) -> Result<Option<StoredMatch>> {
        let sql = format!("{} WHERE id = ?1", SELECT_MATCHES);
        self.conn
            .query_row(&sql, params![match_id], stored_match_from_row)
            .optional()
            .map_err(MatchError::LedgerUnavailable)
    }

    /// Every record for a case, oldest first (duplicates included)
    pub fn records_for_case(&self, key: &CaseKey) -> Result<Vec<StoredMatch>> {
        key.validate()?;

        let sql = format!("{} WHERE {} ORDER BY id", SELECT_MATCHES, CASE_FILTER);
        let [a, b, c, d, e, f, g, h] = key.identifiers.normalized();
        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(MatchError::LedgerUnavailable)?;
        let records = stmt
            .query_map(
                params![key.facility, a, b, c, d, e, f, g, h],
                stored_match_from_row,
            )
            .map_err(MatchError::LedgerUnavailable)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(MatchError::LedgerUnavailable)?;

        Ok(records)
    }

    pub fn reviews_for_match(&self, match_id: i64) -> Result<Vec<ReviewEvent>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT event_id, match_id, status, comment, reviewer, created_at
                 FROM match_reviews WHERE match_id = ?1 ORDER BY id",
            )
            .map_err(MatchError::LedgerUnavailable)?;

        let reviews = stmt
            .query_map(params![match_id], |row| {
                let created_at: String = row.get(5)?;
                Ok(ReviewEvent {
                    event_id: row.get(0)?,
                    match_id: row.get(1)?,
                    status: row.get(2)?,
                    comment: row.get(3)?,
                    reviewer: row.get(4)?,
                    created_at: parse_timestamp(&created_at, 5)?,
                })
            })
            .map_err(MatchError::LedgerUnavailable)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(MatchError::LedgerUnavailable)?;

        Ok(reviews)
    }

    /// Number of match records; never decreases
    pub fn count(&self) -> Result<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM matches", [], |row| row.get(0))
            .map_err(MatchError::LedgerUnavailable)
    }
}

const SELECT_MATCHES: &str = "SELECT id, record_no, facility,
        unique_ctcid_number, tgr_form_number, file_ref, ctc_infant,
        unique_htc, unique_anc, anc_infant, heid_infant,
        search_criteria, dss_id, score, rank_no_gap, rank_gap, row_number, created_at
     FROM matches";

fn stored_match_from_row(row: &Row<'_>) -> rusqlite::Result<StoredMatch> {
    let created_at: String = row.get(17)?;
    Ok(StoredMatch {
        id: row.get(0)?,
        record: MatchRecord {
            record_no: row.get(1)?,
            facility: row.get(2)?,
            identifiers: ClinicIdentifiers::from_row(row, 3)?,
            search_criteria: row.get(11)?,
            dss_id: row.get(12)?,
            score: row.get(13)?,
            rank_dense: row.get(14)?,
            rank_competition: row.get(15)?,
            row_number: row.get(16)?,
        },
        created_at: parse_timestamp(&created_at, 17)?,
    })
}

fn parse_timestamp(value: &str, column: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                column,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger() -> MatchLedger {
        MatchLedger::open_in_memory(&MatcherConfig::default()).unwrap()
    }

    fn ids(ctc: &str, file_ref: Option<&str>) -> ClinicIdentifiers {
        ClinicIdentifiers {
            unique_ctc_id_number: Some(ctc.to_string()),
            file_ref: file_ref.map(str::to_string),
            ..Default::default()
        }
    }

    fn record(facility: &str, identifiers: ClinicIdentifiers) -> MatchRecord {
        MatchRecord {
            record_no: "R-001".to_string(),
            facility: facility.to_string(),
            identifiers,
            search_criteria: "last_name+gender".to_string(),
            dss_id: "DSS-1".to_string(),
            score: 0.92,
            rank_dense: 1,
            rank_competition: 1,
            row_number: 1,
        }
    }

    #[test]
    fn test_assign_then_exists() {
        let ledger = ledger();
        let rec = record("Kisesa HC", ids("CTC-1", None));

        assert!(!ledger.exists(&rec.case_key()).unwrap());
        let id = ledger.assign(&rec).unwrap();
        assert!(id > 0);
        assert!(ledger.exists(&rec.case_key()).unwrap());

        let other_facility = CaseKey::new("Magu DH", ids("CTC-1", None));
        assert!(!ledger.exists(&other_facility).unwrap());
    }

    #[test]
    fn test_null_and_empty_identifiers_are_the_same_case() {
        let ledger = ledger();
        ledger.assign(&record("Kisesa HC", ids("CTC-1", None))).unwrap();

        let with_empty = CaseKey::new("Kisesa HC", ids("CTC-1", Some("")));
        assert!(ledger.exists(&with_empty).unwrap());
        assert!(ids("CTC-1", None).same_case(&ids("CTC-1", Some(""))));

        let with_value = CaseKey::new("Kisesa HC", ids("CTC-1", Some("F-9")));
        assert!(!ledger.exists(&with_value).unwrap());
    }

    #[test]
    fn test_assign_validation_lists_missing_fields() {
        let ledger = ledger();
        let mut rec = record("", ids("CTC-1", None));
        rec.record_no = String::new();
        rec.dss_id = " ".to_string();
        rec.search_criteria = String::new();

        let err = ledger.assign(&rec).unwrap_err();
        let fields: Vec<&str> = err
            .validation_errors()
            .iter()
            .map(|e| e.field.as_str())
            .collect();
        assert_eq!(fields, vec!["facility", "record_no", "dss_id", "search_criteria"]);
        assert_eq!(ledger.count().unwrap(), 0);
    }

    #[test]
    fn test_exists_requires_facility() {
        let ledger = ledger();
        let err = ledger.exists(&CaseKey::new("", ids("CTC-1", None))).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_duplicates_are_kept() {
        let ledger = ledger();
        let rec = record("Kisesa HC", ids("CTC-1", None));

        let first = ledger.assign(&rec).unwrap();
        let second = ledger.assign(&rec).unwrap();
        assert_ne!(first, second);
        assert_eq!(ledger.count().unwrap(), 2);

        let records = ledger.records_for_case(&rec.case_key()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, first);
        assert_eq!(records[1].record, rec);
    }

    #[test]
    fn test_ledger_is_append_only() {
        let ledger = ledger();
        let id = ledger.assign(&record("Kisesa HC", ids("CTC-1", None))).unwrap();

        let update = ledger
            .connection()
            .execute("UPDATE matches SET dss_id = 'DSS-X' WHERE id = ?1", params![id]);
        assert!(update.is_err());
        let delete = ledger
            .connection()
            .execute("DELETE FROM matches WHERE id = ?1", params![id]);
        assert!(delete.is_err());
        assert_eq!(ledger.count().unwrap(), 1);
    }

    #[test]
    fn test_status_empty_when_unassigned() {
        let ledger = ledger();
        let status = ledger
            .status(&CaseKey::new("Kisesa HC", ids("CTC-404", None)))
            .unwrap();
        assert_eq!(status, MatchStatus { status: String::new(), comment: None });
    }

    #[test]
    fn test_status_follows_reviews() {
        let ledger = ledger();
        let rec = record("Kisesa HC", ids("CTC-1", None));
        let id = ledger.assign(&rec).unwrap();

        let status = ledger.status(&rec.case_key()).unwrap();
        assert_eq!(status.status, "assigned");
        assert_eq!(status.comment, None);

        ledger
            .record_review(id, "confirmed", Some("birth year checked"), "field-team")
            .unwrap();
        ledger.record_review(id, "reviewed", Some("looks right"), "clerk").unwrap();

        let status = ledger.status(&rec.case_key()).unwrap();
        assert_eq!(status.status, "confirmed");
        assert_eq!(status.comment.as_deref(), Some("birth year checked"));
        assert_eq!(ledger.reviews_for_match(id).unwrap().len(), 2);
    }

    #[test]
    fn test_status_comment_picked_among_ties() {
        let ledger = ledger();
        let rec = record("Kisesa HC", ids("CTC-1", None));
        let id = ledger.assign(&rec).unwrap();
        ledger.record_review(id, "reviewed", None, "a").unwrap();
        ledger.record_review(id, "reviewed", Some("second look"), "b").unwrap();

        let status = ledger.status(&rec.case_key()).unwrap();
        assert_eq!(status.status, "reviewed");
        assert_eq!(status.comment.as_deref(), Some("second look"));
    }

    #[test]
    fn test_unknown_status_ranks_below_vocabulary() {
        let ledger = ledger();
        let rows = vec![
            ("zzz-legacy".to_string(), Some("old".to_string())),
            ("assigned".to_string(), None),
            ("aaa-legacy".to_string(), None),
        ];
        let status = ledger.most_advanced(rows);
        assert_eq!(status.status, "assigned");

        let only_unknown = vec![
            ("aaa-legacy".to_string(), None),
            ("zzz-legacy".to_string(), Some("old".to_string())),
        ];
        let status = ledger.most_advanced(only_unknown);
        assert_eq!(status.status, "zzz-legacy");
        assert_eq!(status.comment.as_deref(), Some("old"));
    }

    #[test]
    fn test_review_validation() {
        let ledger = ledger();
        let id = ledger.assign(&record("Kisesa HC", ids("CTC-1", None))).unwrap();

        let err = ledger.record_review(id, "approved", None, "").unwrap_err();
        let fields: Vec<&str> = err
            .validation_errors()
            .iter()
            .map(|e| e.field.as_str())
            .collect();
        assert_eq!(fields, vec!["reviewer", "status"]);

        let err = ledger.record_review(id + 100, "confirmed", None, "clerk").unwrap_err();
        assert_eq!(err.validation_errors()[0].field, "match_id");
    }

    #[test]
    fn test_dropped_table_is_ledger_unavailable() {
        let ledger = ledger();
        ledger
            .connection()
            .execute_batch("DROP VIEW match_status_view; DROP TABLE match_reviews; DROP TABLE matches;")
            .unwrap();

        let key = CaseKey::new("Kisesa HC", ids("CTC-1", None));
        assert!(matches!(ledger.exists(&key), Err(MatchError::LedgerUnavailable(_))));
        assert!(matches!(ledger.status(&key), Err(MatchError::LedgerUnavailable(_))));
        assert!(matches!(
            ledger.assign(&record("Kisesa HC", ids("CTC-1", None))),
            Err(MatchError::LedgerUnavailable(_))
        ));
    }

    #[test]
    fn test_case_key_json_shape() {
        let json = r#"{ "facility": "Kisesa HC", "unique_ctc_id_number": "CTC-1", "file_ref": null }"#;
        let key: CaseKey = serde_json::from_str(json).unwrap();
        assert_eq!(key.facility, "Kisesa HC");
        assert_eq!(key.identifiers.unique_ctc_id_number.as_deref(), Some("CTC-1"));
        assert_eq!(key.identifiers.file_ref, None);
    }
}
