// 🗄️ Ledger Store - SQLite persistence for one (bank, currency, year) workbook
//
// A save rewrites every section inside one IMMEDIATE transaction: either the
// whole workbook lands or nothing does. A second writer gets SQLITE_BUSY,
// surfaced as `LedgerError::Busy`.

use super::workbook::{Cell, CellValue, Workbook, Worksheet};
use crate::error::{LedgerError, LedgerResult};
use crate::movement::{Bank, Currency};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OpenFlags, TransactionBehavior};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// How long a writer waits on a locked store before giving up
const BUSY_TIMEOUT: Duration = Duration::from_millis(250);

const KIND_EMPTY: &str = "empty";
const KIND_TEXT: &str = "text";
const KIND_NUMBER: &str = "number";

/// Ledger file name for a (bank, currency, year)
///
/// `MOVIMIENTOS DE BANCO BCP SOLES 2026.db`
pub fn generate_file_name(bank: Bank, currency: Currency, year: i32) -> String {
    format!("MOVIMIENTOS DE BANCO {} {} {}.db", bank.name(), currency.name(), year)
}

// ============================================================================
// AUDIT EVENTS
// ============================================================================

/// Audit trail entry, one per merged section
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LedgerEvent {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    /// Section name (month)
    pub section: String,
    pub data: serde_json::Value,
    pub actor: String,
}

impl LedgerEvent {
    pub fn new(event_type: &str, section: &str, data: serde_json::Value, actor: &str) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            section: section.to_string(),
            data,
            actor: actor.to_string(),
        }
    }
}

// ============================================================================
// STORE
// ============================================================================

pub struct LedgerStore {
    conn: Connection,
    path: PathBuf,
}

impl LedgerStore {
    /// Open (or create) the store at `path`
    pub fn open(path: &Path) -> LedgerResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        setup_schema(&conn)?;

        Ok(LedgerStore {
            conn,
            path: path.to_path_buf(),
        })
    }

    pub fn open_in_memory() -> LedgerResult<Self> {
        let conn = Connection::open_in_memory()?;
        setup_schema(&conn)?;
        Ok(LedgerStore {
            conn,
            path: PathBuf::from(":memory:"),
        })
    }

    /// Open an existing store, or provision one from `template` (another
    /// store file) or the built-in template.
    pub fn load_or_provision(path: &Path, template: Option<&Path>) -> LedgerResult<(Self, Workbook)> {
        let store = Self::open(path)?;

        if let Some(workbook) = store.load_workbook()? {
            tracing::debug!(path = %path.display(), "ledger loaded");
            return Ok((store, workbook));
        }

        let workbook = match template {
            Some(template_path) => {
                tracing::info!(
                    path = %path.display(),
                    template = %template_path.display(),
                    "provisioning ledger from template"
                );
                load_template(template_path)?
            }
            None => {
                tracing::info!(path = %path.display(), "provisioning ledger from built-in template");
                Workbook::template()
            }
        };

        Ok((store, workbook))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored workbook, `None` for a freshly created store
    pub fn load_workbook(&self) -> LedgerResult<Option<Workbook>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM sheets ORDER BY position")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        if names.is_empty() {
            return Ok(None);
        }

        let mut cell_stmt = self.conn.prepare(
            "SELECT row, col, kind, value, num_fmt FROM cells WHERE sheet = ?1 ORDER BY row, col",
        )?;

        let mut workbook = Workbook::new();
        for name in names {
            let mut ws = Worksheet::new(name.as_str());
            let rows = cell_stmt
                .query_map(params![name], |row| {
                    Ok((
                        row.get::<_, u32>(0)?,
                        row.get::<_, u32>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, Option<String>>(4)?,
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()?;

            for (r, c, kind, value, num_fmt) in rows {
                let value = decode_value(&kind, value)
                    .ok_or_else(|| LedgerError::Corrupt(format!("{}!R{}C{}: bad {} cell", name, r, c, kind)))?;
                ws.set_cell(r, c, Cell { value, num_fmt });
            }
            workbook.add_sheet(ws);
        }

        Ok(Some(workbook))
    }

    /// Replace the stored workbook and append `events`, all or nothing
    pub fn save_workbook(&mut self, workbook: &Workbook, events: &[LedgerEvent]) -> LedgerResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        tx.execute("DELETE FROM cells", [])?;
        tx.execute("DELETE FROM sheets", [])?;

        {
            let mut sheet_stmt = tx.prepare("INSERT INTO sheets (position, name) VALUES (?1, ?2)")?;
            let mut cell_stmt = tx.prepare(
                "INSERT INTO cells (sheet, row, col, kind, value, num_fmt)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;

            for (position, ws) in workbook.sheets().iter().enumerate() {
                sheet_stmt.execute(params![position as i64, ws.name()])?;
                for (row, col, cell) in ws.cells() {
                    let (kind, value) = encode_value(&cell.value);
                    cell_stmt.execute(params![ws.name(), row, col, kind, value, cell.num_fmt])?;
                }
            }

            for event in events {
                insert_event(&tx, event)?;
            }
        }

        tx.commit()?;
        tracing::debug!(path = %self.path.display(), events = events.len(), "ledger saved");
        Ok(())
    }

    /// Audit trail for one section, oldest first
    pub fn events_for_section(&self, section: &str) -> LedgerResult<Vec<LedgerEvent>> {
        let mut stmt = self.conn.prepare(
            "SELECT event_id, timestamp, event_type, section, data, actor
             FROM events
             WHERE section = ?1
             ORDER BY id",
        )?;

        let events = stmt
            .query_map(params![section], |row| {
                let timestamp_str: String = row.get(1)?;
                let data_json: String = row.get(4)?;

                Ok(LedgerEvent {
                    event_id: row.get(0)?,
                    timestamp: DateTime::parse_from_rfc3339(&timestamp_str)
                        .map_err(|_| rusqlite::Error::InvalidQuery)?
                        .with_timezone(&Utc),
                    event_type: row.get(2)?,
                    section: row.get(3)?,
                    data: serde_json::from_str(&data_json)
                        .map_err(|_| rusqlite::Error::InvalidQuery)?,
                    actor: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(events)
    }
}

fn setup_schema(conn: &Connection) -> LedgerResult<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS sheets (
            position INTEGER PRIMARY KEY,
            name TEXT UNIQUE NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS cells (
            sheet TEXT NOT NULL,
            row INTEGER NOT NULL,
            col INTEGER NOT NULL,
            kind TEXT NOT NULL,
            value TEXT NOT NULL,
            num_fmt TEXT,
            PRIMARY KEY (sheet, row, col)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            section TEXT NOT NULL,
            data TEXT NOT NULL,
            actor TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_section ON events(section)",
        [],
    )?;

    Ok(())
}

fn insert_event(conn: &Connection, event: &LedgerEvent) -> LedgerResult<()> {
    let data_json = serde_json::to_string(&event.data)
        .map_err(|e| LedgerError::Corrupt(format!("event data: {}", e)))?;

    conn.execute(
        "INSERT INTO events (
            event_id, timestamp, event_type, section, data, actor
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            event.event_id,
            event.timestamp.to_rfc3339(),
            event.event_type,
            event.section,
            data_json,
            event.actor,
        ],
    )?;

    Ok(())
}

/// Template files must already exist; they are never created or migrated
fn load_template(path: &Path) -> LedgerResult<Workbook> {
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_WRITE)?;
    let template = LedgerStore {
        conn,
        path: path.to_path_buf(),
    };
    template
        .load_workbook()?
        .ok_or_else(|| LedgerError::Corrupt(format!("template {} has no sections", path.display())))
}

fn encode_value(value: &CellValue) -> (&'static str, String) {
    match value {
        CellValue::Empty => (KIND_EMPTY, String::new()),
        CellValue::Text(s) => (KIND_TEXT, s.clone()),
        CellValue::Number(d) => (KIND_NUMBER, d.to_string()),
    }
}

fn decode_value(kind: &str, value: String) -> Option<CellValue> {
    match kind {
        KIND_EMPTY => Some(CellValue::Empty),
        KIND_TEXT => Some(CellValue::Text(value)),
        KIND_NUMBER => Decimal::from_str(&value).ok().map(CellValue::Number),
        _ => None,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{MergeEngine, COL_DEBIT, COL_OPERATION, TEXT_FORMAT};
    use crate::movement::Movement;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    #[test]
    fn test_generate_file_name() {
        assert_eq!(
            generate_file_name(Bank::Bcp, Currency::Soles, 2026),
            "MOVIMIENTOS DE BANCO BCP SOLES 2026.db"
        );
        assert_eq!(
            generate_file_name(Bank::Interbank, Currency::Dolares, 2025),
            "MOVIMIENTOS DE BANCO INTERBANK DOLARES 2025.db"
        );
    }

    #[test]
    fn test_new_store_is_provisioned_from_builtin_template() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledgers").join("new.db");

        let (store, workbook) = LedgerStore::load_or_provision(&path, None).unwrap();

        assert!(path.exists());
        assert_eq!(workbook.sheets().len(), 12);
        assert!(store.load_workbook().unwrap().is_none());
    }

    #[test]
    fn test_round_trip_keeps_leading_zeros_and_formats() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(generate_file_name(Bank::Bcp, Currency::Soles, 2026));

        let (mut store, mut workbook) = LedgerStore::load_or_provision(&path, None).unwrap();
        let ws = workbook.prepare_section(1, 2026, Bank::Bcp, Currency::Soles).unwrap();
        let movement = Movement::new(
            NaiveDate::from_ymd_opt(2026, 1, 13).unwrap(),
            "00061864",
            "218.30".parse().unwrap(),
        );
        MergeEngine::new().merge(ws, &[movement]);
        store.save_workbook(&workbook, &[]).unwrap();
        drop(store);

        let (_, reloaded) = LedgerStore::load_or_provision(&path, None).unwrap();
        assert_eq!(reloaded, workbook);

        let enero = reloaded.sheet("ENERO").unwrap();
        let op = enero.cell(7, COL_OPERATION).unwrap();
        assert_eq!(op.value, CellValue::Text("00061864".to_string()));
        assert_eq!(op.num_fmt.as_deref(), Some(TEXT_FORMAT));
        assert_eq!(enero.value(7, COL_DEBIT).as_text(), "218.30");
        assert_eq!(enero.value(1, 1).as_text(), "MOVIMIENTOS DE BANCO BCP SOLES");
    }

    #[test]
    fn test_events_saved_with_workbook() {
        let mut store = LedgerStore::open_in_memory().unwrap();
        let event = LedgerEvent::new(
            "section_merged",
            "ENERO",
            serde_json::json!({ "written": 2 }),
            "importer",
        );

        store.save_workbook(&Workbook::template(), &[event.clone()]).unwrap();

        let events = store.events_for_section("ENERO").unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_id, event.event_id);
        assert_eq!(events[0].data["written"], 2);
        assert!(store.events_for_section("FEBRERO").unwrap().is_empty());
    }

    #[test]
    fn test_provision_from_template_file() {
        let dir = TempDir::new().unwrap();
        let template_path = dir.path().join("plantilla.db");

        let mut custom = Workbook::new();
        let mut ws = Worksheet::new("Enero");
        ws.set_value(1, 1, CellValue::text("EMPRESA SAC - {MES} {AÑO}"));
        custom.add_sheet(ws);
        LedgerStore::open(&template_path)
            .unwrap()
            .save_workbook(&custom, &[])
            .unwrap();

        let path = dir.path().join("ledger.db");
        let (_, workbook) = LedgerStore::load_or_provision(&path, Some(&template_path)).unwrap();
        assert_eq!(workbook, custom);
    }

    #[test]
    fn test_empty_template_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let template_path = dir.path().join("vacia.db");
        LedgerStore::open(&template_path).unwrap();

        let err = LedgerStore::load_or_provision(&dir.path().join("l.db"), Some(&template_path))
            .err()
            .unwrap();
        assert!(matches!(err, LedgerError::Corrupt(_)));
    }

    #[test]
    fn test_second_writer_gets_busy() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("locked.db");

        let mut store = LedgerStore::open(&path).unwrap();

        let mut holder = Connection::open(&path).unwrap();
        let lock = holder
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .unwrap();

        let err = store.save_workbook(&Workbook::template(), &[]).unwrap_err();
        assert!(err.is_retryable());

        lock.rollback().unwrap();
    }
}
