//! # Integration Tests for Melodex
//!
//! End-to-end tests that run the import pipelines against small on-disk
//! collections and check what lands in the catalogue, plus a few runs of the
//! compiled binary.

use anyhow::Result;
use melodex::config::{ImportSettings, RuntimeConfig};
use melodex::{db, ingest};
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

const ENTCHEN: &str = "!!!OTL: Alle meine Entchen
!!!ARE: Europa, Mitteleuropa, Deutschland
!!!AGN: Kinderlied
**kern
*M2/4
*k[]
8c 8d 8e 8f
4g 4g
=1
8a 8a 8a 8a
2g
*-
";

/// Same pitches as [`ENTCHEN`], different rhythm.
const ENTCHEN_SWUNG: &str = "!!!OTL: Entchen (variant)
**kern
4c 4d 4e 4f
8g 8g
16a 16a 16a 16a
4g
*-
";

const SHORT_TUNE: &str = "!!!OTL: Kurz\n**kern\n4c 4e 4g\n*-\n";

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// `root/europa/deutschl/{kinder,zuccal}/...` with one undecodable file.
fn create_stave_collection() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(&root.join("europa/deutschl/kinder/kind001.krn"), ENTCHEN);
    write(&root.join("europa/deutschl/zuccal/zucc001.krn"), ENTCHEN_SWUNG);
    write(&root.join("europa/deutschl/zuccal/empty.krn"), "!!!OTL: Nothing\n**kern\n*-\n");
    dir
}

fn create_theme_dataset() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(
        &root.join("data_META/MTD0001_Beethoven_Op001.json"),
        r#"{"MTDID": "MTD0001", "ComposerID": "Beethoven", "WorkID": "Op001", "WorkTitle": "Sonata"}"#,
    );
    write(
        &root.join("data_SCORE_CSV/MTD0001_Beethoven_Op001.csv"),
        "Pitch;Start;Duration\n60;0.0;0.5\n62;0.5;0.5\n64;1.0;0.5\n65;1.5;1.0\n67;2.5;0.25\n",
    );
    write(
        &root.join("data_META/MTD0002_Nobody_W2.json"),
        r#"{"MTDID": "MTD0002", "ComposerID": "Nobody", "WorkID": "W2", "WorkTitle": null}"#,
    );
    write(
        &root.join("data_SCORE_CSV/MTD0002_Nobody_W2.csv"),
        "Pitch;Start;Duration\n67;0;0.5\n69;0.5;0.5\n71;1;0.5\n72;1.5;0.5\n",
    );
    // Metadata without a note table.
    write(
        &root.join("data_META/MTD0003_Mozart_K1.json"),
        r#"{"MTDID": "MTD0003", "ComposerID": "Mozart", "WorkID": "K1"}"#,
    );
    dir
}

fn open_db(dir: &TempDir) -> Result<(PathBuf, Connection)> {
    let db_path = dir.path().join("motifs.db");
    let conn = db::open(&db_path)?;
    Ok((db_path, conn))
}

fn tag_names(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM tags ORDER BY name")?;
    let names = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(names)
}

#[cfg(test)]
mod stave_import_tests {
    use super::*;

    #[test]
    fn test_motif_import_counts_and_dedup() -> Result<()> {
        let collection = create_stave_collection();
        let scratch = TempDir::new()?;
        let (_, mut conn) = open_db(&scratch)?;

        let stats = ingest::import_stave(
            &mut conn,
            collection.path(),
            &[],
            None,
            &ImportSettings::default(),
        )?;

        // 11 notes, lengths 4..=11, stride 3: 3+3+2+2+2+1+1+1 windows.
        assert_eq!(stats.total_files, 3);
        assert_eq!(stats.parsed, 2);
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.inserted, 15);
        assert_eq!(stats.duplicates, 15);

        let counts = db::counts(&conn)?;
        assert_eq!(counts.motifs, 15);
        assert_eq!(counts.sources, 2);
        assert_eq!(tag_names(&conn)?, ["kinder", "lied"]);
        assert_eq!(counts.tag_links, 30);
        Ok(())
    }

    #[test]
    fn test_stored_rows_carry_provenance() -> Result<()> {
        let collection = create_stave_collection();
        let scratch = TempDir::new()?;
        let (_, mut conn) = open_db(&scratch)?;
        ingest::import_stave(
            &mut conn,
            collection.path(),
            &["europa/deutschl/kinder".to_string()],
            None,
            &ImportSettings::default(),
        )?;

        let (pitches, rhythm, profile, descriptor, filename, transpositions, source): (
            String,
            String,
            String,
            String,
            String,
            String,
            String,
        ) = conn.query_row(
            "SELECT m.pitch_sequence, m.rhythm_sequence, m.interval_profile, m.descriptor,
                    m.original_filename, m.allowed_transpositions, s.name
             FROM motifs m JOIN sources s ON s.id = m.source_id
             WHERE m.length = 4 ORDER BY m.id LIMIT 1",
            [],
            |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                ))
            },
        )?;

        assert_eq!(pitches, "C D E F");
        assert_eq!(rhythm, "8 8 8 8");
        assert_eq!(profile, "+2 +2 +1");
        assert_eq!(descriptor, "Alle meine Entchen (motif 1-4)");
        assert_eq!(filename, "kind001.krn");
        assert_eq!(transpositions, "*");
        assert_eq!(source, "Essen - deutschl/kinder");
        Ok(())
    }

    #[test]
    fn test_reimport_is_all_duplicates() -> Result<()> {
        let collection = create_stave_collection();
        let scratch = TempDir::new()?;
        let (_, mut conn) = open_db(&scratch)?;
        let settings = ImportSettings::default();

        ingest::import_stave(&mut conn, collection.path(), &[], None, &settings)?;
        let again = ingest::import_stave(&mut conn, collection.path(), &[], None, &settings)?;

        assert_eq!(again.inserted, 0);
        assert_eq!(again.duplicates, 30);
        assert_eq!(db::counts(&conn)?.motifs, 15);
        Ok(())
    }

    #[test]
    fn test_whole_melody_import_filters_length() -> Result<()> {
        let collection = create_stave_collection();
        write(&collection.path().join("europa/deutschl/kinder/kurz.krn"), SHORT_TUNE);
        let scratch = TempDir::new()?;
        let (_, mut conn) = open_db(&scratch)?;

        let settings = ImportSettings {
            extract_motifs: false,
            max_notes: 20,
            ..Default::default()
        };
        let stats = ingest::import_stave(&mut conn, collection.path(), &[], None, &settings)?;

        assert_eq!(stats.parsed, 3);
        assert_eq!(stats.too_short, 1);
        assert_eq!(stats.inserted, 1);
        assert_eq!(stats.duplicates, 1);

        let descriptor: String = conn.query_row("SELECT descriptor FROM motifs", [], |row| row.get(0))?;
        assert_eq!(descriptor, "Alle meine Entchen");
        Ok(())
    }

    #[test]
    fn test_limit_and_bad_settings() -> Result<()> {
        let collection = create_stave_collection();
        let scratch = TempDir::new()?;
        let (_, mut conn) = open_db(&scratch)?;

        let limited = ingest::import_stave(&mut conn, collection.path(), &[], Some(1), &ImportSettings::default())?;
        assert_eq!(limited.total_files, 1);

        let bad = ImportSettings {
            stride: 0,
            ..Default::default()
        };
        assert!(ingest::import_stave(&mut conn, collection.path(), &[], None, &bad).is_err());
        Ok(())
    }
}

#[cfg(test)]
mod theme_import_tests {
    use super::*;

    #[test]
    fn test_recognizable_only() -> Result<()> {
        let dataset = create_theme_dataset();
        let scratch = TempDir::new()?;
        let (_, mut conn) = open_db(&scratch)?;

        let stats = ingest::import_themes(&mut conn, dataset.path(), None, &ImportSettings::default())?;
        assert_eq!(stats.total_files, 3);
        assert_eq!(stats.parsed, 2);
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.filtered_out, 1);
        assert_eq!(stats.inserted, 1);

        let (descriptor, rhythm, filename, recognition, difficulty): (String, String, String, u8, u8) =
            conn.query_row(
                "SELECT descriptor, rhythm_sequence, original_filename, recognition_score, difficulty FROM motifs",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
            )?;
        assert_eq!(descriptor, "Beethoven - Sonata");
        assert_eq!(rhythm, "4 4 4 2 8");
        assert_eq!(filename, "MTD0001.csv");
        assert_eq!(recognition, 8);
        assert_eq!(difficulty, 1);
        assert_eq!(tag_names(&conn)?, ["Beethoven"]);

        let source: String = conn.query_row("SELECT name FROM sources", [], |row| row.get(0))?;
        assert_eq!(source, "MTD - Musical Theme Dataset");
        Ok(())
    }

    #[test]
    fn test_all_composers_and_length_filter() -> Result<()> {
        let dataset = create_theme_dataset();
        let scratch = TempDir::new()?;
        let (_, mut conn) = open_db(&scratch)?;

        let everyone = ImportSettings {
            only_recognizable: false,
            ..Default::default()
        };
        let stats = ingest::import_themes(&mut conn, dataset.path(), None, &everyone)?;
        assert_eq!(stats.inserted, 2);

        let other: (String, u8) = conn.query_row(
            "SELECT descriptor, recognition_score FROM motifs WHERE original_filename = 'MTD0002.csv'",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        assert_eq!(other, ("Nobody - W2".to_string(), 6));

        db::clean(&mut conn)?;
        let strict = ImportSettings {
            only_recognizable: false,
            min_notes: 5,
            theme_max_notes: 5,
            ..Default::default()
        };
        let stats = ingest::import_themes(&mut conn, dataset.path(), None, &strict)?;
        assert_eq!(stats.too_short, 1);
        assert_eq!(stats.inserted, 1);
        Ok(())
    }

    #[test]
    fn test_default_keeps_fourteen_note_theme() -> Result<()> {
        let dataset = TempDir::new()?;
        write(
            &dataset.path().join("data_META/MTD0100_Mozart_K525.json"),
            r#"{"MTDID": "MTD0100", "ComposerID": "Mozart", "WorkID": "K525", "WorkTitle": "Serenade"}"#,
        );
        let rows: String = (0..14)
            .map(|i| format!("{};{}.0;0.5\n", 60 + i, i))
            .collect();
        write(
            &dataset.path().join("data_SCORE_CSV/MTD0100_Mozart_K525.csv"),
            &format!("Pitch;Start;Duration\n{rows}"),
        );
        let scratch = TempDir::new()?;
        let (_, mut conn) = open_db(&scratch)?;

        let stats = ingest::import_themes(&mut conn, dataset.path(), None, &ImportSettings::default())?;
        assert_eq!(stats.too_long, 0);
        assert_eq!(stats.inserted, 1);

        let length: i64 = conn.query_row("SELECT length FROM motifs", [], |row| row.get(0))?;
        assert_eq!(length, 14);

        db::clean(&mut conn)?;
        let capped = ImportSettings {
            theme_max_notes: 12,
            ..Default::default()
        };
        let stats = ingest::import_themes(&mut conn, dataset.path(), None, &capped)?;
        assert_eq!(stats.too_long, 1);
        assert_eq!(stats.inserted, 0);
        Ok(())
    }

    #[test]
    fn test_missing_meta_dir_is_error() -> Result<()> {
        let empty = TempDir::new()?;
        let scratch = TempDir::new()?;
        let (_, mut conn) = open_db(&scratch)?;
        assert!(ingest::import_themes(&mut conn, empty.path(), None, &ImportSettings::default()).is_err());
        Ok(())
    }
}

#[cfg(test)]
mod curated_import_tests {
    use super::*;

    const THEMES: &str = r#"{"themes": [
        {"id": 1, "name": "Ode to Joy", "composer": "Beethoven", "tempo": 120,
         "notes": ["E4", "E4", "F4", "G4", "G4", "F4", "E4", "D4"],
         "durations": [0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5]},
        {"id": 2, "name": "Broken", "tempo": 100, "notes": ["xx", "??"]}
    ]}"#;

    #[test]
    fn test_curated_import() -> Result<()> {
        let scratch = TempDir::new()?;
        let themes_path = scratch.path().join("themes.json");
        fs::write(&themes_path, THEMES)?;
        let (_, mut conn) = open_db(&scratch)?;

        let stats = ingest::import_curated(&mut conn, &themes_path)?;
        assert_eq!(stats.total_files, 2);
        assert_eq!(stats.inserted, 1);
        assert_eq!(stats.errors, 1);

        let (descriptor, recognition, length): (String, u8, i64) = conn.query_row(
            "SELECT descriptor, recognition_score, length FROM motifs",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        assert_eq!(descriptor, "Ode to Joy (120 BPM)");
        assert_eq!(recognition, 10);
        assert_eq!(length, 8);
        assert_eq!(tag_names(&conn)?, ["Beethoven", "classical"]);

        let again = ingest::import_curated(&mut conn, &themes_path)?;
        assert_eq!(again.duplicates, 1);
        Ok(())
    }

    const PRECOMPUTED: &str = r#"{"themes": [
        {"id": "t1", "title": "Fate", "pitch_sequence": "G G G D#", "rhythm_sequence": "8 8 8 2",
         "length": 4, "difficulty": 4, "recognition_score": 10, "composer": "Beethoven"},
        {"id": "t2", "title": "Shark", "pitch_sequence": "E F E F",
         "length": 4, "difficulty": 1, "recognition_score": 9, "genre": "film_tv"}
    ]}"#;

    #[test]
    fn test_precomputed_import_keeps_supplied_scores() -> Result<()> {
        let scratch = TempDir::new()?;
        let themes_path = scratch.path().join("curated_themes.json");
        fs::write(&themes_path, PRECOMPUTED)?;
        let (_, mut conn) = open_db(&scratch)?;

        let stats = ingest::import_curated(&mut conn, &themes_path)?;
        assert_eq!(stats.total_files, 2);
        assert_eq!(stats.inserted, 2);
        assert_eq!(stats.errors, 0);

        let (descriptor, rhythm, profile, filename, license, difficulty, recognition): (
            String,
            String,
            String,
            String,
            String,
            u8,
            u8,
        ) = conn.query_row(
            "SELECT descriptor, rhythm_sequence, interval_profile, original_filename, license,
                    difficulty, recognition_score
             FROM motifs WHERE pitch_sequence = 'G G G D#'",
            [],
            |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                ))
            },
        )?;
        assert_eq!(descriptor, "Fate");
        assert_eq!(rhythm, "8 8 8 2");
        assert_eq!(profile, "+0 +0 -4");
        assert_eq!(filename, "t1.json");
        assert_eq!(license, "Various - see source");
        assert_eq!(difficulty, 4);
        assert_eq!(recognition, 10);

        assert_eq!(tag_names(&conn)?, ["Beethoven", "classical", "film_tv"]);
        let source: String = conn.query_row("SELECT name FROM sources", [], |row| row.get(0))?;
        assert_eq!(source, "Curated Themes - Iconic Melodies");

        let again = ingest::import_curated(&mut conn, &themes_path)?;
        assert_eq!(again.duplicates, 2);
        Ok(())
    }

    #[test]
    fn test_invalid_curated_file() -> Result<()> {
        let scratch = TempDir::new()?;
        let path = scratch.path().join("themes.json");
        fs::write(&path, "{\"not_themes\": []}")?;
        let (_, mut conn) = open_db(&scratch)?;
        assert!(ingest::import_curated(&mut conn, &path).is_err());
        Ok(())
    }
}

#[cfg(test)]
mod database_integration_tests {
    use super::*;

    #[test]
    fn test_init_database_force_recreates() -> Result<()> {
        let collection = create_stave_collection();
        let scratch = TempDir::new()?;
        let config = RuntimeConfig::with_db_path(scratch.path().join("nested/motifs.db"));

        let mut conn = db::init_database(&config.db_path, false)?;
        ingest::import_stave(&mut conn, collection.path(), &[], None, &config.import)?;
        drop(conn);

        let kept = db::init_database(&config.db_path, false)?;
        assert_eq!(db::counts(&kept)?.motifs, 15);
        drop(kept);

        let fresh = db::init_database(&config.db_path, true)?;
        assert_eq!(db::counts(&fresh)?.motifs, 0);
        Ok(())
    }

    #[test]
    fn test_clean_keeps_schema() -> Result<()> {
        let collection = create_stave_collection();
        let scratch = TempDir::new()?;
        let (_, mut conn) = open_db(&scratch)?;
        ingest::import_stave(&mut conn, collection.path(), &[], None, &ImportSettings::default())?;

        let remaining = db::clean(&mut conn)?;
        assert_eq!(remaining, db::CatalogCounts::default());

        let stats = ingest::import_stave(&mut conn, collection.path(), &[], None, &ImportSettings::default())?;
        assert_eq!(stats.inserted, 15);
        Ok(())
    }
}

#[cfg(test)]
mod cli_tests {
    use super::*;

    fn melodex(db_path: &Path, args: &[&str]) -> std::process::Output {
        Command::new(env!("CARGO_BIN_EXE_melodex"))
            .arg("--db")
            .arg(db_path)
            .args(args)
            .env_remove("RUST_LOG")
            .output()
            .expect("Failed to run melodex")
    }

    #[test]
    fn test_cli_help_displays_correctly() {
        let output = Command::new(env!("CARGO_BIN_EXE_melodex"))
            .arg("--help")
            .output()
            .expect("Failed to run help command");

        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("melodex"));
        assert!(stdout.contains("import-stave"));
        assert!(stdout.contains("import-themes"));
        assert!(stdout.contains("inspect"));
    }

    #[test]
    fn test_import_then_stats() {
        let collection = create_stave_collection();
        let scratch = TempDir::new().unwrap();
        let db_path = scratch.path().join("cli.db");

        assert!(melodex(&db_path, &["init-db"]).status.success());

        let root = collection.path().to_str().unwrap();
        let import = melodex(&db_path, &["import-stave", root, "--max-notes", "6"]);
        assert!(import.status.success());
        let report = String::from_utf8_lossy(&import.stdout);
        // lengths 4..=6 of 11 notes, stride 3: 3+3+2
        assert!(report.contains("Inserted to DB:      8"), "{report}");

        let stats = melodex(&db_path, &["stats"]);
        let stdout = String::from_utf8_lossy(&stats.stdout);
        assert!(stdout.contains("Motifs:    8"), "{stdout}");
        assert!(stdout.contains("Essen - deutschl/kinder"));
    }

    #[test]
    fn test_inspect_prints_record() {
        let scratch = TempDir::new().unwrap();
        let song = scratch.path().join("song.krn");
        fs::write(&song, ENTCHEN).unwrap();

        let output = melodex(&scratch.path().join("unused.db"), &["inspect", song.to_str().unwrap()]);
        assert!(output.status.success());

        let record: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(record["pitch_sequence"], "C D E F G G A A A A G");
        assert_eq!(record["length"], 11);
        assert_eq!(record["fingerprint"].as_str().unwrap().len(), 64);
    }

    #[test]
    fn test_completion_generation() {
        let output = Command::new(env!("CARGO_BIN_EXE_melodex"))
            .args(["completion", "bash"])
            .output()
            .expect("Failed to run completion command");

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("_melodex"));
        assert!(stdout.contains("complete"));
    }
}
