//! # Import Pipelines
//!
//! Walks a source collection on disk, decodes every file, derives catalogue
//! records and stores them. Three collections are supported:
//!
//! - **Stave** (`*.krn` folk songs): discovered recursively, decoded in
//!   parallel, optionally exploded into motifs.
//! - **Theme dataset**: `data_META/*.json` records paired with semicolon
//!   separated `data_SCORE_CSV/*.csv` note tables.
//! - **Curated themes**: one JSON file holding hand-picked themes, either as
//!   note names with durations or as precomputed sequences with their own
//!   difficulty and recognition scores.
//!
//! Decoding is pure and runs on the rayon pool. Storage is sequential and
//! wrapped in one transaction per run, so an aborted import leaves the
//! catalogue untouched.
//!
//! Per-file problems never abort a run: they are logged and counted in the
//! returned [`ProcessingStats`].

use crate::config::ImportSettings;
use crate::db::{self, InsertOutcome, NewMotif, SourceInfo};
use crate::decode::{decode_scaled, ScaledMelody, SourceInput};
use crate::derive::{derive_with, DerivedRecord, DifficultyScale};
use crate::event_table::{RawEventRow, WorkMetadata};
use crate::melody::Melody;
use crate::motif;
use crate::themes::{self, CuratedCollection, CuratedEntry};
use anyhow::{bail, Context, Result};
use log::{debug, info, warn};
use rayon::prelude::*;
use rusqlite::Connection;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const PROGRESS_INTERVAL: usize = 100;

const STAVE_EXTENSION: &str = "krn";
const STAVE_LICENSE: &str = "Public Domain";
const STAVE_URL: &str = "https://github.com/ccarh/essen-folksong-collection";

/// Genre keywords turned into tags when found in a folk song's genre record.
const STAVE_GENRE_KEYWORDS: [&str; 10] = [
    "kinder", "wiegen", "lied", "liebe", "nacht", "weihnacht", "tanz", "ballade", "folk", "children",
];

const THEME_SOURCE_NAME: &str = "MTD - Musical Theme Dataset";
const THEME_LICENSE: &str = "Public Domain";
const THEME_META_DIR: &str = "data_META";
const THEME_SCORE_DIR: &str = "data_SCORE_CSV";

/// Composers whose themes a general audience is likely to know.
pub const RECOGNIZABLE_COMPOSERS: [&str; 24] = [
    "Beethoven", "Mozart", "Bach", "Chopin", "Tchaikovsky", "Vivaldi", "Handel", "Schubert",
    "Brahms", "Debussy", "Haydn", "Schumann", "Mendelssohn", "Liszt", "Wagner", "Strauss",
    "Dvorak", "Prokofiev", "Rachmaninoff", "Stravinsky", "Bizet", "Puccini", "Verdi", "Rossini",
];

const RECOGNIZABLE_SCORE: u8 = 8;
const OTHER_COMPOSER_SCORE: u8 = 6;

const CURATED_SOURCE_NAME: &str = "Curated Popular Songs";
const CURATED_LICENSE: &str = "Mixed - see individual themes";
const PRECOMPUTED_SOURCE_NAME: &str = "Curated Themes - Iconic Melodies";
const PRECOMPUTED_LICENSE: &str = "Various - see source";

/// Counters for one import run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProcessingStats {
    pub total_files: usize,
    pub parsed: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub errors: usize,
    pub too_short: usize,
    pub too_long: usize,
    /// Skipped by the recognizable-composer filter.
    pub filtered_out: usize,
}

impl fmt::Display for ProcessingStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(60);
        writeln!(f, "{rule}")?;
        writeln!(f, "Total files:         {}", self.total_files)?;
        writeln!(f, "Successfully parsed: {}", self.parsed)?;
        writeln!(f, "Inserted to DB:      {}", self.inserted)?;
        writeln!(f, "Duplicates:          {}", self.duplicates)?;
        writeln!(f, "Too short:           {}", self.too_short)?;
        writeln!(f, "Too long:            {}", self.too_long)?;
        writeln!(f, "Filtered out:        {}", self.filtered_out)?;
        writeln!(f, "Errors:              {}", self.errors)?;
        write!(f, "{rule}")
    }
}

/// Where a stored record came from and how it is described.
struct Provenance<'a> {
    source_id: i64,
    license: &'a str,
    descriptor: &'a str,
    recognition_score: Option<u8>,
}

/// Derive and insert one melody, updating `stats`. Returns the new row id,
/// or `None` when the checksum was already catalogued.
fn store(
    conn: &Connection,
    melody: &Melody,
    scale: DifficultyScale,
    provenance: &Provenance<'_>,
    stats: &mut ProcessingStats,
) -> Result<Option<i64>> {
    let record: DerivedRecord = derive_with(melody, scale)
        .with_context(|| format!("Failed to derive record for `{}`", melody.title()))?;

    let outcome = db::insert_motif(
        conn,
        &NewMotif {
            record: &record,
            source_id: provenance.source_id,
            original_filename: &melody.metadata.source_filename,
            descriptor: provenance.descriptor,
            license: provenance.license,
            recognition_score: provenance.recognition_score,
        },
    )?;

    Ok(match outcome {
        InsertOutcome::Inserted(id) => {
            stats.inserted += 1;
            Some(id)
        }
        InsertOutcome::Duplicate => {
            stats.duplicates += 1;
            None
        }
    })
}

fn log_progress(done: usize, total: usize, unit: &str) {
    if done % PROGRESS_INTERVAL == 0 {
        info!("Progress: {done}/{total} {unit}...");
    }
}

// ---------------------------------------------------------------------------
// Stave collection
// ---------------------------------------------------------------------------

/// Every `*.krn` file under `root` (or only under `root/<region>` for each
/// given region), sorted by path.
pub fn find_stave_files(root: &Path, regions: &[String]) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        bail!("Stave collection root {} is not a directory", root.display());
    }

    let search_roots: Vec<PathBuf> = if regions.is_empty() {
        vec![root.to_path_buf()]
    } else {
        regions
            .iter()
            .map(|region| root.join(region))
            .filter(|path| {
                let exists = path.is_dir();
                if !exists {
                    warn!("Region directory {} does not exist, skipping", path.display());
                }
                exists
            })
            .collect()
    };

    let mut files = Vec::new();
    for search_root in search_roots {
        for entry in WalkDir::new(&search_root).follow_links(false) {
            match entry {
                Ok(entry) => {
                    let is_stave = entry.file_type().is_file()
                        && entry
                            .path()
                            .extension()
                            .is_some_and(|ext| ext.eq_ignore_ascii_case(STAVE_EXTENSION));
                    if is_stave {
                        files.push(entry.into_path());
                    }
                }
                Err(err) => warn!("Error accessing entry: {err}"),
            }
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}

/// Source row for a stave file, from its directory relative to `root`:
/// `<continent>/<region>/<collection>/file.krn`.
fn stave_source(root: &Path, path: &Path) -> SourceInfo {
    let dirs: Vec<String> = path
        .parent()
        .and_then(|parent| parent.strip_prefix(root).ok())
        .map(|relative| {
            relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();

    let region = dirs
        .get(1)
        .or_else(|| dirs.first())
        .cloned()
        .unwrap_or_else(|| "misc".to_string());
    let collection = dirs.get(2).cloned().unwrap_or_else(|| "misc".to_string());

    SourceInfo {
        name: format!("Essen - {region}/{collection}"),
        region,
        collection,
        license: STAVE_LICENSE.to_string(),
        url: Some(STAVE_URL.to_string()),
        notes: None,
    }
}

/// Genre keywords present in a free-text genre record.
fn genre_keywords(genre: &str) -> impl Iterator<Item = &'static str> + '_ {
    let genre = genre.to_lowercase();
    STAVE_GENRE_KEYWORDS
        .into_iter()
        .filter(move |keyword| genre.contains(keyword))
}

/// Read and decode one stave file. Non-UTF-8 bytes are replaced rather
/// than failing the file.
pub fn decode_stave_file(path: &Path) -> Result<ScaledMelody> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let text = String::from_utf8_lossy(&bytes);
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(decode_scaled(SourceInput::Stave {
        text: &text,
        filename: &filename,
    })?)
}

/// Import a folk-song collection.
///
/// # Errors
///
/// Fails when `root` is not a directory, when the motif settings are
/// invalid, or on a database error. Unreadable or note-less files are only
/// counted.
pub fn import_stave(
    conn: &mut Connection,
    root: &Path,
    regions: &[String],
    limit: Option<usize>,
    settings: &ImportSettings,
) -> Result<ProcessingStats> {
    let options = settings.motif_options();
    // Reject bad window settings before any work is done.
    motif::windows(0, options).context("Invalid motif settings")?;

    let mut files = find_stave_files(root, regions)?;
    if let Some(limit) = limit {
        files.truncate(limit);
    }

    info!("Importing stave collection from {}", root.display());
    info!(
        "Motif extraction: {} ({}-{} notes, stride {})",
        settings.extract_motifs, settings.min_notes, settings.max_notes, settings.stride
    );
    info!("Processing: {} files", files.len());

    let mut stats = ProcessingStats {
        total_files: files.len(),
        ..Default::default()
    };

    let decoded: Vec<(&PathBuf, Result<ScaledMelody>)> = files
        .par_iter()
        .map(|path| (path, decode_stave_file(path)))
        .collect();

    let tx = conn.transaction()?;
    for (i, (path, result)) in decoded.into_iter().enumerate() {
        log_progress(i + 1, stats.total_files, "files");

        let ScaledMelody { melody, scale } = match result {
            Ok(decoded) => decoded,
            Err(err) => {
                warn!("Error processing {}: {err:#}", path.display());
                stats.errors += 1;
                continue;
            }
        };
        stats.parsed += 1;

        let source_id = db::get_or_create_source(&tx, &stave_source(root, path))?;

        let candidates: Vec<Melody> = if settings.extract_motifs {
            motif::motifs(&melody, options)?.collect()
        } else if melody.len() < settings.min_notes {
            stats.too_short += 1;
            continue;
        } else if melody.len() > settings.max_notes {
            stats.too_long += 1;
            continue;
        } else {
            vec![melody]
        };

        for candidate in &candidates {
            let provenance = Provenance {
                source_id,
                license: STAVE_LICENSE,
                descriptor: candidate.title(),
                recognition_score: None,
            };
            let Some(motif_id) = store(&tx, candidate, scale, &provenance, &mut stats)? else {
                continue;
            };
            if let Some(genre) = &candidate.metadata.genre {
                for keyword in genre_keywords(genre) {
                    db::add_tag(&tx, motif_id, keyword, "genre")?;
                }
            }
        }
    }
    tx.commit().context("Committing SQL transaction failed.")?;

    info!("Stave import finished: {} inserted", stats.inserted);
    Ok(stats)
}

// ---------------------------------------------------------------------------
// Theme dataset
// ---------------------------------------------------------------------------

/// Parse a semicolon-separated note table with a `Pitch;Start;Duration`
/// header (column order free). Missing columns leave the field `None`.
///
/// ```
/// use melodex::ingest::parse_score_csv;
///
/// let rows = parse_score_csv("Start;Pitch;Duration\n0.0;60;0.5\n");
/// assert_eq!(rows[0].pitch.as_deref(), Some("60"));
/// assert_eq!(rows[0].start.as_deref(), Some("0.0"));
/// ```
#[must_use]
pub fn parse_score_csv(text: &str) -> Vec<RawEventRow> {
    let mut lines = text.lines().filter(|line| !line.trim().is_empty());
    let Some(header) = lines.next() else {
        return Vec::new();
    };

    let columns: Vec<&str> = header
        .split(';')
        .map(|name| name.trim().trim_start_matches('\u{feff}').trim_matches('"'))
        .collect();
    let position = |name: &str| columns.iter().position(|c| *c == name);
    let (pitch, start, duration) = (position("Pitch"), position("Start"), position("Duration"));

    lines
        .map(|line| {
            let fields: Vec<&str> = line.split(';').collect();
            let field = |index: Option<usize>| {
                index
                    .and_then(|i| fields.get(i))
                    .map(|value| value.trim().trim_matches('"').to_string())
            };
            RawEventRow {
                pitch: field(pitch),
                start: field(start),
                duration: field(duration),
            }
        })
        .collect()
}

/// `"MTD1005"` from `"MTD1005_Beethoven_Op096-01.json"`.
fn theme_key(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let key = stem.split('_').next()?;
    key.starts_with("MTD").then(|| key.to_string())
}

fn sorted_files_with_extension(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).with_context(|| format!("Failed to read directory {}", dir.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.with_context(|| format!("Failed to list {}", dir.display()))?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == extension) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Metadata files paired with their note table (if any), sorted by
/// metadata path.
pub fn find_theme_files(dataset_root: &Path) -> Result<Vec<(PathBuf, Option<PathBuf>)>> {
    let meta_files = sorted_files_with_extension(&dataset_root.join(THEME_META_DIR), "json")?;
    let score_dir = dataset_root.join(THEME_SCORE_DIR);
    let score_files = if score_dir.is_dir() {
        sorted_files_with_extension(&score_dir, "csv")?
    } else {
        warn!("Score directory {} is missing", score_dir.display());
        Vec::new()
    };

    let mut scores_by_key: HashMap<String, PathBuf> = HashMap::new();
    for path in score_files {
        if let Some(key) = theme_key(&path) {
            scores_by_key.entry(key).or_insert(path);
        }
    }

    Ok(meta_files
        .into_iter()
        .map(|meta| {
            let score = theme_key(&meta).and_then(|key| scores_by_key.get(&key).cloned());
            (meta, score)
        })
        .collect())
}

/// Read one theme's metadata and note table and decode it.
pub fn decode_theme_files(meta_path: &Path, score_path: Option<&Path>) -> Result<(WorkMetadata, ScaledMelody)> {
    let meta_text = fs::read_to_string(meta_path)
        .with_context(|| format!("Failed to read {}", meta_path.display()))?;
    let metadata: WorkMetadata = serde_json::from_str(&meta_text)
        .with_context(|| format!("Invalid theme metadata in {}", meta_path.display()))?;

    let Some(score_path) = score_path else {
        bail!("No note table for {}", meta_path.display());
    };
    let score_text = fs::read_to_string(score_path)
        .with_context(|| format!("Failed to read {}", score_path.display()))?;
    let rows = parse_score_csv(&score_text);

    let decoded = decode_scaled(SourceInput::EventTable {
        metadata: &metadata,
        rows: &rows,
    })?;
    Ok((metadata, decoded))
}

#[must_use]
pub fn is_recognizable(composer: &str) -> bool {
    RECOGNIZABLE_COMPOSERS.contains(&composer)
}

fn theme_source() -> SourceInfo {
    SourceInfo {
        name: THEME_SOURCE_NAME.to_string(),
        region: "Various".to_string(),
        collection: "MTD".to_string(),
        license: THEME_LICENSE.to_string(),
        url: Some("https://github.com/MTG/MTD".to_string()),
        notes: Some("2,067 classical and modern musical themes".to_string()),
    }
}

/// Import the theme dataset rooted at `dataset_root`. Themes are stored
/// whole; `min_notes`/`theme_max_notes` filter them by length.
pub fn import_themes(
    conn: &mut Connection,
    dataset_root: &Path,
    limit: Option<usize>,
    settings: &ImportSettings,
) -> Result<ProcessingStats> {
    let mut files = find_theme_files(dataset_root)?;
    if let Some(limit) = limit {
        files.truncate(limit);
    }

    info!("Importing theme dataset from {}", dataset_root.display());
    info!(
        "Theme length: {}-{} notes, only recognizable composers: {}",
        settings.min_notes, settings.theme_max_notes, settings.only_recognizable
    );
    info!("Processing: {} themes", files.len());

    let mut stats = ProcessingStats {
        total_files: files.len(),
        ..Default::default()
    };

    let decoded: Vec<(&PathBuf, Result<(WorkMetadata, ScaledMelody)>)> = files
        .par_iter()
        .map(|(meta, score)| (meta, decode_theme_files(meta, score.as_deref())))
        .collect();

    let tx = conn.transaction()?;
    let source_id = db::get_or_create_source(&tx, &theme_source())?;

    for (i, (meta_path, result)) in decoded.into_iter().enumerate() {
        log_progress(i + 1, stats.total_files, "themes");

        let (metadata, ScaledMelody { melody, scale }) = match result {
            Ok(decoded) => decoded,
            Err(err) => {
                warn!("Error processing {}: {err:#}", meta_path.display());
                stats.errors += 1;
                continue;
            }
        };
        stats.parsed += 1;

        let composer = metadata.composer_or_unknown();
        let recognizable = is_recognizable(composer);
        if settings.only_recognizable && !recognizable {
            debug!("Skipping theme by {composer}");
            stats.filtered_out += 1;
            continue;
        }
        if melody.len() < settings.min_notes {
            stats.too_short += 1;
            continue;
        }
        if melody.len() > settings.theme_max_notes {
            stats.too_long += 1;
            continue;
        }

        let descriptor = format!("{composer} - {}", metadata.display_title());
        let provenance = Provenance {
            source_id,
            license: THEME_LICENSE,
            descriptor: &descriptor,
            recognition_score: Some(if recognizable { RECOGNIZABLE_SCORE } else { OTHER_COMPOSER_SCORE }),
        };
        if let Some(motif_id) = store(&tx, &melody, scale, &provenance, &mut stats)? {
            db::add_tag(&tx, motif_id, composer, "composer")?;
        }
    }
    tx.commit().context("Committing SQL transaction failed.")?;

    info!("Theme import finished: {} inserted", stats.inserted);
    Ok(stats)
}

// ---------------------------------------------------------------------------
// Curated themes
// ---------------------------------------------------------------------------

fn curated_source() -> SourceInfo {
    SourceInfo {
        name: CURATED_SOURCE_NAME.to_string(),
        region: "International".to_string(),
        collection: "50 Recognizable Themes".to_string(),
        license: CURATED_LICENSE.to_string(),
        url: None,
        notes: Some("Hand-curated collection of highly recognizable songs".to_string()),
    }
}

fn precomputed_source() -> SourceInfo {
    SourceInfo {
        name: PRECOMPUTED_SOURCE_NAME.to_string(),
        region: "Various".to_string(),
        collection: "curated".to_string(),
        license: "Various - see individual entries".to_string(),
        url: None,
        notes: Some("Hand-curated collection of the most recognizable musical themes".to_string()),
    }
}

/// Source row id, created on first use.
fn lazy_source(conn: &Connection, slot: &mut Option<i64>, info: fn() -> SourceInfo) -> Result<i64> {
    if let Some(id) = *slot {
        return Ok(id);
    }
    let id = db::get_or_create_source(conn, &info())?;
    *slot = Some(id);
    Ok(id)
}

/// Import a curated theme file (`{ "themes": [...] }`). Note-name entries
/// and precomputed entries may be mixed; each kind gets its own source row.
pub fn import_curated(conn: &mut Connection, path: &Path) -> Result<ProcessingStats> {
    let text = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let collection: CuratedCollection = serde_json::from_str(&text)
        .with_context(|| format!("Invalid curated theme file {}", path.display()))?;

    info!("Loaded {} curated themes from {}", collection.themes.len(), path.display());

    let mut stats = ProcessingStats {
        total_files: collection.themes.len(),
        ..Default::default()
    };

    let tx = conn.transaction()?;
    let (mut curated_id, mut precomputed_id) = (None, None);

    for entry in &collection.themes {
        let (name, descriptor, license, recognition, composer) = match entry {
            CuratedEntry::Notes(theme) => (
                &theme.name,
                theme.descriptor(),
                CURATED_LICENSE,
                themes::recognition_score(&theme.name),
                theme.composer.as_deref(),
            ),
            CuratedEntry::Precomputed(theme) => (
                &theme.title,
                theme.title.clone(),
                PRECOMPUTED_LICENSE,
                theme.recognition_score,
                theme.composer.as_deref(),
            ),
        };

        let ScaledMelody { melody, scale } = match decode_scaled(SourceInput::from(entry)) {
            Ok(decoded) => decoded,
            Err(err) => {
                warn!("Error importing `{name}`: {err}");
                stats.errors += 1;
                continue;
            }
        };
        stats.parsed += 1;

        let source_id = match entry {
            CuratedEntry::Notes(_) => lazy_source(&tx, &mut curated_id, curated_source)?,
            CuratedEntry::Precomputed(_) => lazy_source(&tx, &mut precomputed_id, precomputed_source)?,
        };
        let provenance = Provenance {
            source_id,
            license,
            descriptor: &descriptor,
            recognition_score: Some(recognition),
        };
        let Some(motif_id) = store(&tx, &melody, scale, &provenance, &mut stats)? else {
            debug!("Skipped `{name}` (duplicate)");
            continue;
        };

        if let Some(genre) = &melody.metadata.genre {
            db::add_tag(&tx, motif_id, genre, "genre")?;
        }
        if let Some(composer) = composer {
            db::add_tag(&tx, motif_id, composer, "composer")?;
        }
    }
    tx.commit().context("Committing SQL transaction failed.")?;

    Ok(stats)
}

/// Decode a single stave file and derive the record for the whole melody.
pub fn inspect_stave(path: &Path) -> Result<(Melody, DerivedRecord)> {
    let ScaledMelody { melody, scale } = decode_stave_file(path)?;
    let record = derive_with(&melody, scale)
        .with_context(|| format!("Failed to derive record for {}", path.display()))?;
    Ok((melody, record))
}
