//! Single decoding entry point over every supported source kind.
//!
//! Each variant carries already-materialized input (text, parsed rows or a
//! deserialized record); reading files and parsing JSON/CSV is left to the
//! caller.

use crate::derive::DifficultyScale;
use crate::error::DecodeError;
use crate::event_table::{self, RawEventRow, WorkMetadata};
use crate::melody::Melody;
use crate::stave;
use crate::themes::{self, CuratedEntry, CuratedTheme, PrecomputedTheme};

/// Raw input for one melody, tagged by format.
#[derive(Debug, Clone)]
pub enum SourceInput<'a> {
    /// Stave notation text and the name of the file it came from.
    Stave { text: &'a str, filename: &'a str },
    /// A theme metadata record and its note-event rows.
    EventTable {
        metadata: &'a WorkMetadata,
        rows: &'a [RawEventRow],
    },
    /// A curated theme given as note names.
    Curated(&'a CuratedTheme),
    /// A curated theme given as a ready-made pitch sequence.
    Precomputed(&'a PrecomputedTheme),
}

impl<'a> From<&'a CuratedEntry> for SourceInput<'a> {
    fn from(entry: &'a CuratedEntry) -> Self {
        match entry {
            CuratedEntry::Notes(theme) => SourceInput::Curated(theme),
            CuratedEntry::Precomputed(theme) => SourceInput::Precomputed(theme),
        }
    }
}

impl SourceInput<'_> {
    /// Difficulty variant used by this source's import path.
    #[must_use]
    pub fn difficulty_scale(&self) -> DifficultyScale {
        match self {
            SourceInput::Stave { .. } => DifficultyScale::Folk,
            SourceInput::EventTable { .. } => DifficultyScale::Theme,
            SourceInput::Curated(theme) => theme.difficulty_scale(),
            SourceInput::Precomputed(theme) => theme.difficulty_scale(),
        }
    }
}

/// Decode any source into a [`Melody`].
///
/// ```
/// use melodex::decode::{decode, SourceInput};
///
/// let melody = decode(SourceInput::Stave { text: "8g 8e 4c", filename: "x.krn" }).unwrap();
/// assert_eq!(melody.len(), 3);
/// ```
pub fn decode(input: SourceInput<'_>) -> Result<Melody, DecodeError> {
    match input {
        SourceInput::Stave { text, filename } => stave::decode(text, filename),
        SourceInput::EventTable { metadata, rows } => event_table::decode(metadata, rows),
        SourceInput::Curated(theme) => themes::decode(theme),
        SourceInput::Precomputed(theme) => themes::decode_precomputed(theme),
    }
}

/// A decoded melody with the difficulty variant of the source it came from.
#[derive(Debug, Clone)]
pub struct ScaledMelody {
    pub melody: Melody,
    pub scale: DifficultyScale,
}

/// [`decode`], keeping the source's difficulty variant alongside.
pub fn decode_scaled(input: SourceInput<'_>) -> Result<ScaledMelody, DecodeError> {
    let scale = input.difficulty_scale();
    Ok(ScaledMelody {
        melody: decode(input)?,
        scale,
    })
}
