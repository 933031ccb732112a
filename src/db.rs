use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{info, warn};

use crate::assemble::CaseRecord;
use crate::error::CaseError;
use crate::report::{build_workbook, ReportRenderer, Sheet, Workbook};

type Result<T> = std::result::Result<T, CaseError>;

pub fn connect(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS sheets (
            name       TEXT PRIMARY KEY,
            position   INTEGER NOT NULL,
            hidden     BOOLEAN NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS cells (
            sheet      TEXT NOT NULL REFERENCES sheets(name) ON DELETE CASCADE,
            row        INTEGER NOT NULL,
            col        INTEGER NOT NULL,
            value      TEXT NOT NULL,
            PRIMARY KEY (sheet, row, col)
        );
        CREATE INDEX IF NOT EXISTS idx_cells_sheet ON cells(sheet, row);

        CREATE TABLE IF NOT EXISTS case_record (
            id         INTEGER PRIMARY KEY CHECK(id = 1),
            json       TEXT NOT NULL,
            written_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        ",
    )?;
    Ok(())
}

/// Replace whatever the artifact held with `workbook`. Rows and columns are
/// stored 1-based; empty cells are not stored.
pub fn save_workbook(conn: &Connection, workbook: &Workbook, record_json: &str) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        tx.execute_batch("DELETE FROM cells; DELETE FROM sheets; DELETE FROM case_record;")?;
        let mut sheet_stmt =
            tx.prepare("INSERT INTO sheets (name, position, hidden) VALUES (?1, ?2, ?3)")?;
        let mut cell_stmt =
            tx.prepare("INSERT INTO cells (sheet, row, col, value) VALUES (?1, ?2, ?3, ?4)")?;

        for (pos, sheet) in workbook.sheets.iter().enumerate() {
            sheet_stmt.execute(params![sheet.name, pos as i64, sheet.hidden])?;
            for (r, row) in sheet.rows.iter().enumerate() {
                for (c, value) in row.iter().enumerate() {
                    if value.is_empty() {
                        continue;
                    }
                    count += cell_stmt.execute(params![
                        sheet.name,
                        r as i64 + 1,
                        c as i64 + 1,
                        value
                    ])?;
                }
            }
        }
        tx.execute("INSERT INTO case_record (id, json) VALUES (1, ?1)", [record_json])?;
    }
    tx.commit()?;
    Ok(count)
}

/// Sheet names in workbook order with their hidden flag.
pub fn list_sheets(conn: &Connection) -> Result<Vec<(String, bool)>> {
    let mut stmt = conn.prepare("SELECT name, hidden FROM sheets ORDER BY position")?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Rebuild a sheet's grid. Rows with no stored cells come back empty.
pub fn fetch_sheet(conn: &Connection, name: &str) -> Result<Option<Sheet>> {
    let hidden: Option<bool> = conn
        .query_row("SELECT hidden FROM sheets WHERE name = ?1", [name], |row| row.get(0))
        .optional()?;
    let Some(hidden) = hidden else {
        return Ok(None);
    };

    let mut stmt =
        conn.prepare("SELECT row, col, value FROM cells WHERE sheet = ?1 ORDER BY row, col")?;
    let cells = stmt
        .query_map([name], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?, row.get::<_, String>(2)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut rows: Vec<Vec<String>> = Vec::new();
    for (r, c, value) in cells {
        // Coordinates are 1-based; anything else did not come from this crate.
        let (Some(r), Some(c)) = (to_index(r), to_index(c)) else {
            warn!(sheet = name, row = r, col = c, "skipping cell outside the grid");
            continue;
        };
        if rows.len() <= r {
            rows.resize(r + 1, Vec::new());
        }
        let row = &mut rows[r];
        if row.len() <= c {
            row.resize(c + 1, String::new());
        }
        row[c] = value;
    }

    Ok(Some(Sheet {
        name: name.to_string(),
        hidden,
        rows,
    }))
}

fn to_index(coord: i64) -> Option<usize> {
    usize::try_from(coord).ok()?.checked_sub(1)
}

pub fn fetch_record_json(conn: &Connection) -> Result<Option<String>> {
    let json = conn
        .query_row("SELECT json FROM case_record WHERE id = 1", [], |row| row.get(0))
        .optional()?;
    Ok(json)
}

/// The case workbook as a SQLite file.
pub struct SqliteReport {
    path: PathBuf,
}

impl SqliteReport {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SqliteReport { path: path.into() }
    }
}

impl ReportRenderer for SqliteReport {
    fn render(&self, record: &CaseRecord) -> Result<()> {
        let workbook = build_workbook(record);
        let json = serde_json::to_string(record)?;
        let conn = connect(&self.path)?;
        init_schema(&conn)?;
        let cells = save_workbook(&conn, &workbook, &json)?;
        info!(
            path = %self.path.display(),
            sheets = workbook.sheets.len(),
            cells,
            "workbook written"
        );
        Ok(())
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{CASE_DATA_SHEET, RAW_SHEET, SUMMARY_SHEET};

    fn sheet(name: &str, hidden: bool, rows: &[&[&str]]) -> Sheet {
        Sheet {
            name: name.to_string(),
            hidden,
            rows: rows
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        }
    }

    fn workbook() -> Workbook {
        Workbook {
            sheets: vec![
                sheet(CASE_DATA_SHEET, false, &[&["Property Details"], &["Field", "Value"], &[]]),
                sheet(SUMMARY_SHEET, false, &[&["Case Summary"], &[], &["Borrower", "TAN AH KOW"]]),
                sheet(RAW_SHEET, true, &[&["Bankruptcy / Winding Up"], &["Raw", "HC/B 1/2020"]]),
            ],
        }
    }

    #[test]
    fn save_and_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let conn = connect(&dir.path().join("case.sqlite")).unwrap();
        init_schema(&conn).unwrap();

        let count = save_workbook(&conn, &workbook(), "{}").unwrap();
        assert_eq!(count, 9);

        let sheets = list_sheets(&conn).unwrap();
        assert_eq!(
            sheets,
            vec![
                (CASE_DATA_SHEET.to_string(), false),
                (SUMMARY_SHEET.to_string(), false),
                (RAW_SHEET.to_string(), true),
            ]
        );

        let summary = fetch_sheet(&conn, SUMMARY_SHEET).unwrap().unwrap();
        assert_eq!(summary, workbook().sheets[1]);
        assert!(fetch_sheet(&conn, "Nope").unwrap().is_none());
        assert_eq!(fetch_record_json(&conn).unwrap().as_deref(), Some("{}"));
    }

    #[test]
    fn cells_below_one_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let conn = connect(&dir.path().join("foreign.sqlite")).unwrap();
        init_schema(&conn).unwrap();
        conn.execute_batch(
            "INSERT INTO sheets (name, position, hidden) VALUES ('Summary', 0, 0);
             INSERT INTO cells (sheet, row, col, value) VALUES ('Summary', 0, 1, 'zero row');
             INSERT INTO cells (sheet, row, col, value) VALUES ('Summary', 1, -3, 'negative col');
             INSERT INTO cells (sheet, row, col, value) VALUES ('Summary', 2, 1, 'Borrower');",
        )
        .unwrap();

        let summary = fetch_sheet(&conn, SUMMARY_SHEET).unwrap().unwrap();
        assert_eq!(summary.rows, vec![Vec::<String>::new(), vec!["Borrower".to_string()]]);
    }

    #[test]
    fn save_replaces_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let conn = connect(&dir.path().join("case.sqlite")).unwrap();
        init_schema(&conn).unwrap();

        save_workbook(&conn, &workbook(), "{}").unwrap();
        let smaller = Workbook {
            sheets: vec![sheet(SUMMARY_SHEET, false, &[&["Case Summary"]])],
        };
        save_workbook(&conn, &smaller, "{\"v\":2}").unwrap();

        assert_eq!(list_sheets(&conn).unwrap().len(), 1);
        assert!(fetch_sheet(&conn, RAW_SHEET).unwrap().is_none());
        assert_eq!(fetch_record_json(&conn).unwrap().as_deref(), Some("{\"v\":2}"));
    }

    #[test]
    fn renderer_writes_artifact() {
        use crate::assemble::assemble;
        use crate::parser::extract::extract_all;
        use chrono::NaiveDate;

        let read = |n: &str| std::fs::read_to_string(format!("tests/fixtures/{}.txt", n)).unwrap();
        let docs = extract_all(&read("stars"), &read("sccb"), &read("cbs"));
        let record = assemble(
            &docs.property,
            &docs.registry,
            &docs.credit,
            Vec::new(),
            Vec::new(),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        );

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Case_Output.sqlite");
        SqliteReport::new(&path).render(&record).unwrap();
        // Rendering twice must not fail on existing rows.
        SqliteReport::new(&path).render(&record).unwrap();

        let conn = connect(&path).unwrap();
        let summary = fetch_sheet(&conn, SUMMARY_SHEET).unwrap().unwrap();
        assert_eq!(summary.value("SCCB Litigation"), Some("Present (Plaintiff)"));
        let raw = fetch_sheet(&conn, RAW_SHEET).unwrap().unwrap();
        assert!(raw.hidden);
    }
}
