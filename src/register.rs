// 🗂️ Register store - read-only enumeration of register identities
//
// The engine only ever asks for the full register; a failure to enumerate
// fails the whole search (never a partial candidate list).

use crate::error::{MatchError, Result};
use crate::identity::RegisterIdentity;
use crate::validation::Validator;
use chrono::Utc;
use rusqlite::{params, Connection};
use std::path::Path;
use tracing::{debug, info};

// ============================================================================
// REGISTER SOURCE
// ============================================================================

pub trait RegisterSource {
    /// Every identity in the register
    fn identities(&self) -> Result<Vec<RegisterIdentity>>;
}

/// Vec-backed register, used by tests and callers that already hold the data
#[derive(Debug, Clone, Default)]
pub struct InMemoryRegister {
    identities: Vec<RegisterIdentity>,
}

impl InMemoryRegister {
    pub fn new(identities: Vec<RegisterIdentity>) -> Self {
        InMemoryRegister { identities }
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}

impl RegisterSource for InMemoryRegister {
    fn identities(&self) -> Result<Vec<RegisterIdentity>> {
        Ok(self.identities.clone())
    }
}

impl<R: RegisterSource + ?Sized> RegisterSource for &R {
    fn identities(&self) -> Result<Vec<RegisterIdentity>> {
        (**self).identities()
    }
}

// ============================================================================
// SQLITE REGISTER
// ============================================================================

/// Register table in SQLite, read page by page in `dss_id` order
pub struct SqliteRegister {
    conn: Connection,
    page_size: usize,
}

impl SqliteRegister {
    pub fn new(conn: Connection, page_size: usize) -> Result<Self> {
        setup_register(&conn)?;
        Ok(SqliteRegister {
            conn,
            page_size: page_size.max(1),
        })
    }

    pub fn open(path: &Path, page_size: usize) -> Result<Self> {
        let conn = Connection::open(path).map_err(MatchError::register)?;
        Self::new(conn, page_size)
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn import(&self, identities: &[RegisterIdentity]) -> Result<usize> {
        import_register(&self.conn, identities)
    }

    pub fn count(&self) -> Result<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM register_identities", [], |row| row.get(0))
            .map_err(MatchError::register)
    }

    fn page(&self, offset: usize) -> rusqlite::Result<Vec<RegisterIdentity>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT dss_id, first_name, middle_name, last_name,
                    tl_first_name, tl_middle_name, tl_last_name,
                    gender, birth_day, birth_month, birth_year,
                    village, sub_village
             FROM register_identities
             ORDER BY dss_id
             LIMIT ?1 OFFSET ?2",
        )?;

        let rows = stmt
            .query_map(params![self.page_size as i64, offset as i64], |row| {
                Ok(RegisterIdentity {
                    dss_id: row.get(0)?,
                    first_name: row.get(1)?,
                    middle_name: row.get(2)?,
                    last_name: row.get(3)?,
                    tl_first_name: row.get(4)?,
                    tl_middle_name: row.get(5)?,
                    tl_last_name: row.get(6)?,
                    gender: row.get(7)?,
                    birth_day: row.get(8)?,
                    birth_month: row.get(9)?,
                    birth_year: row.get(10)?,
                    village: row.get(11)?,
                    sub_village: row.get(12)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
    }
}

impl RegisterSource for SqliteRegister {
    fn identities(&self) -> Result<Vec<RegisterIdentity>> {
        let mut all = Vec::new();
        loop {
            let page = self.page(all.len()).map_err(MatchError::register)?;
            let fetched = page.len();
            all.extend(page);
            if fetched < self.page_size {
                break;
            }
        }
        debug!(count = all.len(), "enumerated register");
        Ok(all)
    }
}

pub fn setup_register(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS register_identities (
            dss_id TEXT PRIMARY KEY NOT NULL,
            first_name TEXT,
            middle_name TEXT,
            last_name TEXT,
            tl_first_name TEXT,
            tl_middle_name TEXT,
            tl_last_name TEXT,
            gender TEXT,
            birth_day INTEGER,
            birth_month INTEGER,
            birth_year INTEGER,
            village TEXT,
            sub_village TEXT,
            ingested_at TEXT NOT NULL
        );",
    )
    .map_err(MatchError::register)
}

/// Insert or replace identities by `dss_id`, all-or-nothing
pub fn import_register(conn: &Connection, identities: &[RegisterIdentity]) -> Result<usize> {
    let mut v = Validator::new("RegisterIdentity");
    for (index, identity) in identities.iter().enumerate() {
        if identity.dss_id.trim().is_empty() {
            v.fail("dss_id", format!("Required field is empty (row {})", index + 1));
        }
    }
    v.finish()?;

    let ingested_at = Utc::now().to_rfc3339();
    let tx = conn.unchecked_transaction().map_err(MatchError::register)?;
    {
        let mut stmt = tx
            .prepare(
                "INSERT OR REPLACE INTO register_identities (
                    dss_id, first_name, middle_name, last_name,
                    tl_first_name, tl_middle_name, tl_last_name,
                    gender, birth_day, birth_month, birth_year,
                    village, sub_village, ingested_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            )
            .map_err(MatchError::register)?;

        for identity in identities {
            stmt.execute(params![
                identity.dss_id.trim(),
                identity.first_name,
                identity.middle_name,
                identity.last_name,
                identity.tl_first_name,
                identity.tl_middle_name,
                identity.tl_last_name,
                identity.gender,
                identity.birth_day,
                identity.birth_month,
                identity.birth_year,
                identity.village,
                identity.sub_village,
                ingested_at,
            ])
            .map_err(MatchError::register)?;
        }
    }
    tx.commit().map_err(MatchError::register)?;

    info!(count = identities.len(), "imported register identities");
    Ok(identities.len())
}

/// Read register identities from a CSV export (headers match the field names)
pub fn load_register_csv(csv_path: &Path) -> Result<Vec<RegisterIdentity>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(csv_path)
        .map_err(MatchError::register)?;

    let mut identities = Vec::new();
    for result in rdr.deserialize() {
        let identity: RegisterIdentity = result.map_err(MatchError::register)?;
        identities.push(identity);
    }

    Ok(identities)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn person(id: &str, last: &str) -> RegisterIdentity {
        RegisterIdentity {
            dss_id: id.to_string(),
            last_name: Some(last.to_string()),
            birth_year: Some(1988),
            ..Default::default()
        }
    }

    #[test]
    fn test_sqlite_register_pages_through_everything() {
        let conn = Connection::open_in_memory().unwrap();
        let register = SqliteRegister::new(conn, 2).unwrap();

        let people: Vec<RegisterIdentity> = (1..=5)
            .map(|i| person(&format!("DSS-{:03}", i), "Mwangi"))
            .collect();
        register.import(&people).unwrap();

        let loaded = register.identities().unwrap();
        assert_eq!(loaded.len(), 5);
        assert_eq!(loaded[0].dss_id, "DSS-001");
        assert_eq!(loaded[4].dss_id, "DSS-005");
        assert_eq!(loaded[2].birth_year, Some(1988));
        assert_eq!(register.count().unwrap(), 5);
    }

    #[test]
    fn test_import_replaces_by_id() {
        let conn = Connection::open_in_memory().unwrap();
        let register = SqliteRegister::new(conn, 100).unwrap();

        register.import(&[person("DSS-1", "Mwangi")]).unwrap();
        register.import(&[person("DSS-1", "Mwanga")]).unwrap();

        let loaded = register.identities().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].last_name.as_deref(), Some("Mwanga"));
    }

    #[test]
    fn test_import_rejects_blank_id() {
        let conn = Connection::open_in_memory().unwrap();
        let register = SqliteRegister::new(conn, 100).unwrap();

        let err = register
            .import(&[person("DSS-1", "Mwangi"), person(" ", "Juma")])
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(register.count().unwrap(), 0);
    }

    #[test]
    fn test_missing_table_is_register_unavailable() {
        let conn = Connection::open_in_memory().unwrap();
        let register = SqliteRegister::new(conn, 100).unwrap();
        register
            .connection()
            .execute("DROP TABLE register_identities", [])
            .unwrap();

        let err = register.identities().unwrap_err();
        assert!(matches!(err, MatchError::RegisterUnavailable(_)));
    }

    #[test]
    fn test_load_register_csv() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "dss_id,first_name,middle_name,last_name,tl_first_name,tl_middle_name,tl_last_name,gender,birth_day,birth_month,birth_year,village,sub_village"
        )
        .unwrap();
        writeln!(file, "DSS-1,Neema,,Mwangi,,,,F,12,4,1990,Kisesa,Igekemaja").unwrap();
        writeln!(file, "DSS-2,Juma,Ali,Otieno,,,,M,,xx,1985,Kisesa,").unwrap();

        let identities = load_register_csv(file.path()).unwrap();
        assert_eq!(identities.len(), 2);

        assert_eq!(identities[0].middle_name, None);
        assert_eq!(identities[0].birth_day, Some(12));
        assert_eq!(identities[0].sub_village.as_deref(), Some("Igekemaja"));

        assert_eq!(identities[1].birth_day, None);
        assert_eq!(identities[1].birth_month, None);
        assert_eq!(identities[1].birth_year, Some(1985));
    }

    #[test]
    fn test_in_memory_register() {
        let register = InMemoryRegister::new(vec![person("DSS-1", "Mwangi")]);
        assert_eq!(register.len(), 1);
        assert!(!register.is_empty());
        assert_eq!(register.identities().unwrap().len(), 1);
    }
}
