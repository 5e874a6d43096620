//! # Melodex - Motif Catalogue Builder
//!
//! Melodex decodes symbolic melodies (folk-song stave files, note-event
//! tables and curated theme lists) into short motifs with interval profiles,
//! fingerprints and difficulty scores, and stores them in SQLite.
//!
//! ## Usage
//!
//! ```bash
//! # Create the catalogue
//! melodex init-db
//!
//! # Import sources
//! melodex import-stave /path/to/essen-folksong-collection
//! melodex import-themes /path/to/MTD
//! melodex import-curated themes.json
//!
//! # Inspect results
//! melodex stats
//! melodex inspect song.krn
//! ```

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use log::{debug, info};
use melodex::cli::{self, Command};
use melodex::config::RuntimeConfig;
use melodex::ingest::ProcessingStats;
use melodex::{completion, db, ingest};
use std::io;

/// Main entry point for the Melodex application.
///
/// Initializes logging, parses command-line arguments, resolves the
/// catalogue location and routes commands to the library.
///
/// # Logging
///
/// Initializes environment logger which can be controlled via `RUST_LOG`:
/// - `RUST_LOG=info melodex import-stave ...` - Progress reports
/// - `RUST_LOG=melodex::stave=trace melodex inspect x.krn` - Skipped tokens
fn main() -> Result<()> {
    env_logger::init();

    let cli::Args {
        db: db_override,
        config: settings_path,
        command,
    } = cli::Args::parse();

    // Completion needs neither a database nor settings, so resolution is deferred.
    let resolve = || -> Result<RuntimeConfig> {
        let config = RuntimeConfig::resolve(db_override.clone(), settings_path.as_deref())?;
        debug!("Using catalogue at {}", config.db_path.display());
        Ok(config)
    };

    match command {
        Command::InitDb { force } => {
            let config = resolve()?;
            db::init_database(&config.db_path, force)?;
            println!("Catalogue ready at {}", config.db_path.display());
        }
        Command::ImportStave {
            root,
            limit,
            lengths,
            stride,
            no_extract_motifs,
            regions,
        } => {
            let mut config = resolve()?;
            lengths.apply(&mut config.import);
            if let Some(stride) = stride {
                config.import.stride = stride;
            }
            if no_extract_motifs {
                config.import.extract_motifs = false;
            }

            let mut conn = db::open(&config.db_path)?;
            let stats = ingest::import_stave(&mut conn, &root, &regions, limit, &config.import)?;
            report("Stave import complete", &stats);
        }
        Command::ImportThemes {
            root,
            limit,
            lengths,
            all_composers,
            clean,
        } => {
            let mut config = resolve()?;
            lengths.apply_to_themes(&mut config.import);
            if all_composers {
                config.import.only_recognizable = false;
            }

            let mut conn = db::open(&config.db_path)?;
            if clean {
                info!("Cleaning catalogue before import");
                db::clean(&mut conn)?;
            }
            let stats = ingest::import_themes(&mut conn, &root, limit, &config.import)?;
            report("Theme import complete", &stats);
        }
        Command::ImportCurated { path } => {
            let config = resolve()?;
            let mut conn = db::open(&config.db_path)?;
            let stats = ingest::import_curated(&mut conn, &path)?;
            report("Curated import complete", &stats);
        }
        Command::Clean => {
            let config = resolve()?;
            let mut conn = db::open(&config.db_path)?;
            let remaining = db::clean(&mut conn)?;
            println!("Catalogue cleaned");
            println!("   Remaining motifs:    {}", remaining.motifs);
            println!("   Remaining tag links: {}", remaining.tag_links);
            println!("   Remaining tags:      {}", remaining.tags);
            println!("   Remaining sources:   {}", remaining.sources);
        }
        Command::Stats => {
            let config = resolve()?;
            let conn = db::open(&config.db_path)?;
            let counts = db::counts(&conn)?;
            println!("Catalogue: {}", config.db_path.display());
            println!("   Motifs:    {}", counts.motifs);
            println!("   Sources:   {}", counts.sources);
            println!("   Tags:      {}", counts.tags);
            println!("   Tag links: {}", counts.tag_links);

            println!("\nBy difficulty:");
            for (difficulty, count) in db::difficulty_histogram(&conn)? {
                println!("   {difficulty}: {count}");
            }
            println!("\nBy source:");
            for (source, count) in db::source_breakdown(&conn)? {
                println!("   {count:>7}  {source}");
            }
        }
        Command::Inspect { path } => {
            let (melody, record) = ingest::inspect_stave(&path)?;
            info!("Decoded `{}` ({} notes)", melody.title(), melody.len());
            let json = serde_json::to_string_pretty(&record)
                .context("Failed to serialize derived record")?;
            println!("{json}");
        }
        Command::Completion { shell } => {
            let mut cmd = cli::Args::command();
            completion::generate_completions(
                clap_complete::Shell::from(shell),
                &mut cmd,
                &mut io::stdout(),
            );
        }
    }

    Ok(())
}

fn report(title: &str, stats: &ProcessingStats) {
    println!("\n{title}");
    println!("{stats}");
    if stats.inserted > 0 {
        println!("Catalogue gained {} motifs", stats.inserted);
    } else {
        println!("No motifs inserted");
    }
}
