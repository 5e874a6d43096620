//! # Motif Catalogue Storage
//!
//! SQLite persistence for derived motif records. The store owns duplicate
//! detection: `motifs.checksum` is UNIQUE, and an insert that collides is
//! reported as [`InsertOutcome::Duplicate`] rather than an error.
//!
//! Every function takes a plain `&Connection`, so callers can pass a
//! `rusqlite::Transaction` (which derefs to one) to batch a whole import.

use crate::derive::DerivedRecord;
use anyhow::{Context, Result};
use log::{debug, info, trace};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::fs;
use std::path::Path;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS sources (
    id          INTEGER PRIMARY KEY,
    name        TEXT    NOT NULL UNIQUE,
    region      TEXT,
    collection  TEXT,
    license     TEXT,
    url         TEXT,
    notes       TEXT
);

CREATE TABLE IF NOT EXISTS motifs (
    id                      INTEGER PRIMARY KEY,
    pitch_sequence          TEXT    NOT NULL,
    rhythm_sequence         TEXT,
    interval_profile        TEXT    NOT NULL,
    length                  INTEGER NOT NULL,
    allowed_transpositions  TEXT    NOT NULL DEFAULT '*',
    first_pitch             TEXT,
    last_pitch              TEXT,
    source_id               INTEGER REFERENCES sources(id),
    original_filename       TEXT,
    descriptor              TEXT,
    license                 TEXT,
    difficulty              INTEGER CHECK (difficulty BETWEEN 1 AND 5),
    recognition_score       INTEGER,
    checksum                TEXT    NOT NULL UNIQUE,
    created_at              TEXT    NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS tags (
    id       INTEGER PRIMARY KEY,
    name     TEXT NOT NULL UNIQUE,
    category TEXT
);

CREATE TABLE IF NOT EXISTS motif_tags (
    motif_id INTEGER NOT NULL REFERENCES motifs(id) ON DELETE CASCADE,
    tag_id   INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
    PRIMARY KEY (motif_id, tag_id)
);

CREATE INDEX IF NOT EXISTS idx_motifs_length ON motifs(length);
CREATE INDEX IF NOT EXISTS idx_motifs_first_pitch ON motifs(first_pitch);
CREATE INDEX IF NOT EXISTS idx_motifs_interval_profile ON motifs(interval_profile);
";

/// Open (creating if needed) the catalogue at `path` and make sure the
/// schema exists.
pub fn open(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let conn = Connection::open(path)
        .with_context(|| format!("Rusqlite DB connection refused. DB location: {}", path.display()))?;
    conn.pragma_update(None, "foreign_keys", true)
        .context("Failed to enable foreign keys")?;
    init_schema(&conn)?;
    Ok(conn)
}

/// Create a fresh catalogue. With `force`, an existing file is deleted first;
/// without it, an existing catalogue is kept and only missing tables added.
pub fn init_database(path: &Path, force: bool) -> Result<Connection> {
    if path.exists() {
        if force {
            info!("Removing existing database at {}", path.display());
            fs::remove_file(path)
                .with_context(|| format!("Failed to remove existing database {}", path.display()))?;
        } else {
            info!("Database already exists at {}, keeping contents", path.display());
        }
    }
    open(path)
}

/// Idempotent schema creation.
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)
        .context("Invalid SQL when creating catalogue schema")
}

/// Provenance row for a group of motifs.
#[derive(Debug, Clone, Default)]
pub struct SourceInfo {
    pub name: String,
    pub region: String,
    pub collection: String,
    pub license: String,
    pub url: Option<String>,
    pub notes: Option<String>,
}

/// Look up a source by name, inserting it when missing. Returns its id.
pub fn get_or_create_source(conn: &Connection, source: &SourceInfo) -> Result<i64> {
    let existing: Option<i64> = conn
        .query_row("SELECT id FROM sources WHERE name = ?1", [&source.name], |row| row.get(0))
        .optional()
        .with_context(|| format!("Failed to look up source `{}`", source.name))?;
    if let Some(id) = existing {
        return Ok(id);
    }

    conn.execute(
        "INSERT INTO sources (name, region, collection, license, url, notes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            source.name,
            source.region,
            source.collection,
            source.license,
            source.url,
            source.notes
        ],
    )
    .with_context(|| format!("Failed to insert source `{}`", source.name))?;

    debug!("Created source `{}`", source.name);
    Ok(conn.last_insert_rowid())
}

/// A derived record plus the provenance the catalogue stores with it.
#[derive(Debug, Clone)]
pub struct NewMotif<'a> {
    pub record: &'a DerivedRecord,
    pub source_id: i64,
    pub original_filename: &'a str,
    pub descriptor: &'a str,
    pub license: &'a str,
    pub recognition_score: Option<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(i64),
    /// A motif with the same checksum is already stored.
    Duplicate,
}

pub fn insert_motif(conn: &Connection, motif: &NewMotif<'_>) -> Result<InsertOutcome> {
    let record = motif.record;
    let result = conn.execute(
        "INSERT INTO motifs (
            pitch_sequence, rhythm_sequence, interval_profile, length,
            first_pitch, last_pitch, source_id, original_filename,
            descriptor, license, difficulty, recognition_score, checksum
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            record.pitch_sequence,
            record.rhythm_sequence,
            record.interval_profile,
            record.length as i64,
            record.first_pitch,
            record.last_pitch,
            motif.source_id,
            motif.original_filename,
            motif.descriptor,
            motif.license,
            record.difficulty,
            motif.recognition_score,
            record.fingerprint,
        ],
    );

    match result {
        Ok(_) => Ok(InsertOutcome::Inserted(conn.last_insert_rowid())),
        Err(rusqlite::Error::SqliteFailure(err, _)) if is_unique_violation(&err) => {
            trace!("Duplicate checksum {} ({})", record.fingerprint, motif.descriptor);
            Ok(InsertOutcome::Duplicate)
        }
        Err(err) => Err(err).with_context(|| {
            format!("Invalid SQL statement when INSERTing motif `{}`", motif.descriptor)
        }),
    }
}

fn is_unique_violation(err: &rusqlite::ffi::Error) -> bool {
    err.code == ErrorCode::ConstraintViolation
        && err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
}

/// Look up a tag by name, inserting it under `category` when missing.
pub fn get_or_create_tag(conn: &Connection, name: &str, category: &str) -> Result<i64> {
    let existing: Option<i64> = conn
        .query_row("SELECT id FROM tags WHERE name = ?1", [name], |row| row.get(0))
        .optional()
        .with_context(|| format!("Failed to look up tag `{name}`"))?;
    if let Some(id) = existing {
        return Ok(id);
    }

    conn.execute(
        "INSERT INTO tags (name, category) VALUES (?1, ?2)",
        params![name, category],
    )
    .with_context(|| format!("Failed to insert tag `{name}`"))?;
    Ok(conn.last_insert_rowid())
}

/// Link a motif to a tag. Linking twice is a no-op.
pub fn tag_motif(conn: &Connection, motif_id: i64, tag_id: i64) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO motif_tags (motif_id, tag_id) VALUES (?1, ?2)",
        params![motif_id, tag_id],
    )
    .with_context(|| format!("Failed to tag motif {motif_id} with tag {tag_id}"))?;
    Ok(())
}

/// Get-or-create `name` under `category` and attach it to `motif_id`.
pub fn add_tag(conn: &Connection, motif_id: i64, name: &str, category: &str) -> Result<()> {
    let tag_id = get_or_create_tag(conn, name, category)?;
    tag_motif(conn, motif_id, tag_id)
}

/// Delete every motif, tag, link and source. The schema stays.
pub fn clean(conn: &mut Connection) -> Result<CatalogCounts> {
    let tx = conn.transaction()?;
    for table in ["motif_tags", "motifs", "sources", "tags"] {
        tx.execute(&format!("DELETE FROM {table}"), [])
            .with_context(|| format!("Failed to clear table {table}"))?;
    }
    tx.commit().context("Commiting SQL transaction failed.")?;

    counts(conn)
}

/// Row counts for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogCounts {
    pub motifs: i64,
    pub sources: i64,
    pub tags: i64,
    pub tag_links: i64,
}

pub fn counts(conn: &Connection) -> Result<CatalogCounts> {
    let count = |table: &str| -> Result<i64> {
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
            .with_context(|| format!("Could not count rows in {table}"))
    };

    Ok(CatalogCounts {
        motifs: count("motifs")?,
        sources: count("sources")?,
        tags: count("tags")?,
        tag_links: count("motif_tags")?,
    })
}

/// `(difficulty, motif count)` pairs, easiest first.
pub fn difficulty_histogram(conn: &Connection) -> Result<Vec<(u8, i64)>> {
    let mut stmt = conn
        .prepare("SELECT difficulty, COUNT(*) FROM motifs GROUP BY difficulty ORDER BY difficulty")
        .context("Invalid SQL statement when grouping motifs by difficulty")?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .context("Cannot query difficulty histogram.")?;

    let mut histogram = Vec::new();
    for row in rows {
        histogram.push(row.context("Queried difficulty row unwrap failed.")?);
    }
    Ok(histogram)
}

/// `(source name, motif count)` pairs, largest first.
pub fn source_breakdown(conn: &Connection) -> Result<Vec<(String, i64)>> {
    let mut stmt = conn
        .prepare(
            "SELECT s.name, COUNT(m.id) FROM sources s
             LEFT JOIN motifs m ON m.source_id = s.id
             GROUP BY s.id ORDER BY COUNT(m.id) DESC, s.name",
        )
        .context("Invalid SQL statement when grouping motifs by source")?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .context("Cannot query source breakdown.")?;

    let mut breakdown = Vec::new();
    for row in rows {
        breakdown.push(row.context("Queried source row unwrap failed.")?);
    }
    Ok(breakdown)
}
