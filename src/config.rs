//! # Configuration Module
//!
//! This module handles configuration management and data directory setup for
//! Melodex. It provides the platform-appropriate catalogue location and the
//! import settings shared by every pipeline.
//!
//! ## Data Storage
//!
//! Melodex stores its motif catalogue in the platform-standard data directory:
//! - Linux: `~/.local/share/melodex/`
//! - macOS: `~/Library/Application Support/melodex/`
//! - Windows: `%APPDATA%\melodex\`
//!
//! ## Import Settings
//!
//! Motif window bounds and filters can be supplied as a JSON file; any key
//! left out keeps its default:
//!
//! ```json
//! { "min_notes": 4, "max_notes": 12, "stride": 3, "extract_motifs": true }
//! ```
//!
//! Themes from the theme dataset are stored whole and use their own upper
//! bound, `theme_max_notes` (15 by default).

use crate::motif::MotifOptions;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Returns the platform-appropriate database file path.
///
/// This function locates the standard data directory for the current platform
/// and creates the Melodex subdirectory if it doesn't exist. The database file
/// is named `motifs.db` and stores sources, motifs and tags.
///
/// # Errors
///
/// This function will return an error if:
/// - The system data directory cannot be determined
/// - The melodex subdirectory cannot be created due to permissions
///
/// # Examples
///
/// ```no_run
/// use melodex::config::get_db_path;
///
/// let db_path = get_db_path()?;
/// println!("Catalogue location: {}", db_path.display());
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn get_db_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join("motifs.db"))
}

/// Returns the platform-appropriate data directory for Melodex, creating it
/// when missing.
pub fn get_data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir().ok_or_else(|| {
        anyhow::anyhow!(
            "Could not determine system data directory. Please ensure your platform supports standard data directories, or pass --db."
        )
    })?;

    let melodex_dir = data_dir.join("melodex");
    fs::create_dir_all(&melodex_dir).with_context(|| {
        format!(
            "Failed to create Melodex data directory at {}. Please check file permissions.",
            melodex_dir.display()
        )
    })?;

    Ok(melodex_dir)
}

/// Configuration for runtime behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Path to the database file
    pub db_path: PathBuf,
    pub import: ImportSettings,
}

impl RuntimeConfig {
    /// Resolve the database path (explicit or platform default) and load
    /// import settings from `settings_path` when given.
    pub fn resolve(db_path: Option<PathBuf>, settings_path: Option<&Path>) -> Result<Self> {
        let db_path = match db_path {
            Some(path) => path,
            None => get_db_path()?,
        };
        let import = match settings_path {
            Some(path) => ImportSettings::load(path)?,
            None => ImportSettings::default(),
        };
        Ok(Self { db_path, import })
    }

    /// Create configuration with explicit database path
    pub fn with_db_path(db_path: PathBuf) -> Self {
        Self {
            db_path,
            import: ImportSettings::default(),
        }
    }
}

/// Knobs shared by the import pipelines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSettings {
    /// Shortest motif (or whole melody when motifs are off).
    pub min_notes: usize,
    /// Longest motif (or whole melody when motifs are off).
    pub max_notes: usize,
    /// Longest theme kept from the theme dataset.
    pub theme_max_notes: usize,
    /// Offset step between motif windows.
    pub stride: usize,
    /// Explode stave melodies into motifs instead of storing them whole.
    pub extract_motifs: bool,
    /// Only import theme-dataset entries by well-known composers.
    pub only_recognizable: bool,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            min_notes: 4,
            max_notes: 12,
            theme_max_notes: 15,
            stride: 3,
            extract_motifs: true,
            only_recognizable: true,
        }
    }
}

impl ImportSettings {
    /// Read settings from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Invalid settings JSON in {}", path.display()))
    }

    #[must_use]
    pub fn motif_options(&self) -> MotifOptions {
        MotifOptions::new(self.min_notes, self.max_notes, self.stride)
    }
}
