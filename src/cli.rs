//! # Command-Line Interface Module
//!
//! This module defines the command-line interface for Melodex using Clap derive macros.
//! It provides a type-safe way to parse command-line arguments and route them to
//! the import pipelines and catalogue maintenance.
//!
//! ## Commands
//!
//! - `init-db`: Create the motif catalogue
//! - `import-stave`: Import a folk-song collection of `.krn` files
//! - `import-themes`: Import the musical theme dataset
//! - `import-curated`: Import a curated theme JSON file
//! - `clean`: Delete every catalogued motif, keeping the schema
//! - `stats`: Summarize the catalogue
//! - `inspect`: Decode one `.krn` file and print its derived record
//!
//! ## Examples
//!
//! ```bash
//! melodex init-db
//! melodex import-stave ~/data/essen --regions europa/deutschl/kinder
//! melodex import-themes ~/data/MTD --all-composers
//! melodex inspect song.krn
//! ```

use crate::config::ImportSettings;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shell types supported for completion generation
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    PowerShell,
    /// Elvish shell
    Elvish,
}

/// Main application arguments structure.
///
/// Global options select the catalogue and settings file; everything else is
/// reached through a subcommand.
#[derive(Parser, Debug)]
#[command(name = "melodex")]
#[command(about = "Melodex: decode symbolic melodies into a searchable motif catalogue")]
#[command(version)]
pub struct Args {
    /// Catalogue database file (defaults to the platform data directory)
    #[arg(long, global = true, env = "MELODEX_DB", value_hint = clap::ValueHint::FilePath)]
    pub db: Option<PathBuf>,

    /// JSON file with import settings (motif lengths, stride, filters)
    #[arg(long, global = true, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Motif window flags shared by the import commands. Unset flags keep the
/// value from the settings file.
#[derive(clap::Args, Debug, Default, Clone)]
pub struct LengthArgs {
    /// Minimum motif (or theme) length in notes
    #[arg(long)]
    pub min_notes: Option<usize>,

    /// Maximum motif (or theme) length in notes
    #[arg(long)]
    pub max_notes: Option<usize>,
}

impl LengthArgs {
    /// Override the motif bounds used by stave imports.
    pub fn apply(&self, settings: &mut ImportSettings) {
        if let Some(min) = self.min_notes {
            settings.min_notes = min;
        }
        if let Some(max) = self.max_notes {
            settings.max_notes = max;
        }
    }

    /// Override the whole-theme bounds used by theme-dataset imports.
    pub fn apply_to_themes(&self, settings: &mut ImportSettings) {
        if let Some(min) = self.min_notes {
            settings.min_notes = min;
        }
        if let Some(max) = self.max_notes {
            settings.theme_max_notes = max;
        }
    }
}

/// Enumeration of all available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the motif catalogue
    ///
    /// Creates the database file and its tables. An existing catalogue is
    /// kept unless --force is given.
    InitDb {
        /// Delete and recreate an existing database
        #[arg(long)]
        force: bool,
    },

    /// Import a folk-song collection of stave (.krn) files
    ///
    /// Recursively finds every .krn file under the root, decodes it and
    /// stores either its motifs or the whole melody.
    ImportStave {
        /// Collection root (e.g. the essen-folksong-collection checkout)
        #[arg(value_hint = clap::ValueHint::DirPath)]
        root: PathBuf,

        /// Process at most this many files
        #[arg(long)]
        limit: Option<usize>,

        #[command(flatten)]
        lengths: LengthArgs,

        /// Offset step between motif windows
        #[arg(long)]
        stride: Option<usize>,

        /// Store whole melodies instead of extracting motifs
        #[arg(long)]
        no_extract_motifs: bool,

        /// Only import these sub-directories of the root (e.g. europa/deutschl)
        #[arg(long, num_args = 1..)]
        regions: Vec<String>,
    },

    /// Import the musical theme dataset
    ///
    /// Expects data_META/*.json metadata and data_SCORE_CSV/*.csv note
    /// tables under the dataset root. Themes are stored whole.
    ImportThemes {
        /// Dataset root directory
        #[arg(value_hint = clap::ValueHint::DirPath)]
        root: PathBuf,

        /// Process at most this many themes
        #[arg(long)]
        limit: Option<usize>,

        #[command(flatten)]
        lengths: LengthArgs,

        /// Import every composer, not only well-known ones
        #[arg(long)]
        all_composers: bool,

        /// Empty the catalogue before importing
        #[arg(long)]
        clean: bool,
    },

    /// Import a curated theme JSON file
    ImportCurated {
        /// File of the form { "themes": [...] }
        #[arg(value_hint = clap::ValueHint::FilePath)]
        path: PathBuf,
    },

    /// Delete every motif, tag and source, keeping the schema
    Clean,

    /// Show catalogue counts and breakdowns
    Stats,

    /// Decode one .krn file and print its derived record as JSON
    Inspect {
        #[arg(value_hint = clap::ValueHint::FilePath)]
        path: PathBuf,
    },

    /// Generate shell completions
    ///
    /// Usage: melodex completion bash > ~/.local/share/bash-completion/completions/melodex
    Completion {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_import_stave_flags() {
        let args = Args::parse_from([
            "melodex",
            "--db",
            "/tmp/m.db",
            "import-stave",
            "/data/essen",
            "--limit",
            "10",
            "--max-notes",
            "8",
            "--no-extract-motifs",
            "--regions",
            "europa/deutschl",
            "asia/china",
        ]);
        assert_eq!(args.db, Some(PathBuf::from("/tmp/m.db")));

        let Command::ImportStave {
            root,
            limit,
            lengths,
            stride,
            no_extract_motifs,
            regions,
        } = args.command
        else {
            panic!("expected import-stave");
        };
        assert_eq!(root, PathBuf::from("/data/essen"));
        assert_eq!(limit, Some(10));
        assert_eq!(stride, None);
        assert!(no_extract_motifs);
        assert_eq!(regions, ["europa/deutschl", "asia/china"]);

        let mut settings = ImportSettings::default();
        lengths.apply(&mut settings);
        assert_eq!((settings.min_notes, settings.max_notes), (4, 8));
    }

    #[test]
    fn test_import_themes_lengths_target_theme_bound() {
        let args = Args::parse_from(["melodex", "import-themes", "/data/MTD", "--max-notes", "20"]);
        let Command::ImportThemes { lengths, .. } = args.command else {
            panic!("expected import-themes");
        };

        let mut settings = ImportSettings::default();
        lengths.apply_to_themes(&mut settings);
        assert_eq!(settings.theme_max_notes, 20);
        assert_eq!(settings.max_notes, 12);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = Args::parse_from(["melodex", "stats", "--db", "x.db"]);
        assert_eq!(args.db, Some(PathBuf::from("x.db")));
        assert!(matches!(args.command, Command::Stats));
    }
}
