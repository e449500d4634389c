use std::path::Path;

use anyhow::Result;
use rusqlite::{params, Connection};

use crate::record::Dataset;

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS runs (
            id          INTEGER PRIMARY KEY,
            started_at  TEXT NOT NULL,
            category    TEXT NOT NULL,
            row_count   INTEGER NOT NULL,
            csv_path    TEXT,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- One snapshot of the listing per run, joinable on reference_code
        CREATE TABLE IF NOT EXISTS listings (
            id              INTEGER PRIMARY KEY,
            run_id          INTEGER NOT NULL REFERENCES runs(id),
            reference_code  TEXT NOT NULL,
            local_reference TEXT,
            title           TEXT,
            price           TEXT,
            currency        TEXT NOT NULL,
            url             TEXT,
            collection      TEXT,
            source_id       TEXT,
            UNIQUE(run_id, reference_code)
        );
        CREATE INDEX IF NOT EXISTS idx_listings_reference ON listings(reference_code);
        ",
    )?;
    Ok(())
}

pub struct RunInfo<'a> {
    pub started_at: &'a str,
    pub category: &'a str,
    pub csv_path: Option<&'a str>,
}

/// Store a finalized dataset as a new run. Returns the run id.
pub fn save_snapshot(conn: &Connection, run: &RunInfo, dataset: &Dataset) -> Result<i64> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO runs (started_at, category, row_count, csv_path) VALUES (?1, ?2, ?3, ?4)",
        params![run.started_at, run.category, dataset.len() as i64, run.csv_path],
    )?;
    let run_id = tx.last_insert_rowid();
    {
        let mut stmt = tx.prepare(
            "INSERT INTO listings
                (run_id, reference_code, local_reference, title, price, currency, url, collection, source_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )?;
        for row in dataset.rows() {
            stmt.execute(params![
                run_id,
                row.reference_code,
                row.local_reference,
                row.title,
                row.price.map(|p| p.to_string()),
                row.currency,
                row.url,
                row.collection,
                row.source_id,
            ])?;
        }
    }
    tx.commit()?;
    Ok(run_id)
}

pub struct RunSummary {
    pub id: i64,
    pub started_at: String,
    pub category: String,
    pub row_count: i64,
    pub priced: i64,
    pub csv_path: Option<String>,
}

/// Stored runs, newest first, with how many rows carried a price.
pub fn list_runs(conn: &Connection, limit: usize) -> Result<Vec<RunSummary>> {
    let mut stmt = conn.prepare(
        "SELECT r.id, r.started_at, r.category, r.row_count, r.csv_path,
                (SELECT COUNT(*) FROM listings l WHERE l.run_id = r.id AND l.price IS NOT NULL)
         FROM runs r
         ORDER BY r.id DESC
         LIMIT ?1",
    )?;
    let rows = stmt
        .query_map(params![limit as i64], |row| {
            Ok(RunSummary {
                id: row.get(0)?,
                started_at: row.get(1)?,
                category: row.get(2)?,
                row_count: row.get(3)?,
                csv_path: row.get(4)?,
                priced: row.get(5)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}
