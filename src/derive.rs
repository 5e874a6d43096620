//! # Interval, Fingerprint and Difficulty Calculator
//!
//! Turns a melody (or motif) into the flat [`DerivedRecord`] that the
//! catalogue stores.
//!
//! The interval profile is a raw difference of chromatic indices, so it is
//! octave-unaware: C4 to C5 is `+0`, B to C is `-11`. The fingerprint is a
//! SHA-256 digest of the pitch sequence alone; rhythm and metadata never
//! reach it, so restatements with different timing collide. Collisions are
//! resolved by the store, not here.

use crate::error::DeriveError;
use crate::melody::{Melody, SymbolicNote};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Length / average-interval cutoffs; the first rung both fit wins.
type Ladder = [(usize, f64); 4];

const FOLK_LADDER: Ladder = [(5, 2.0), (10, 3.0), (15, 4.0), (20, 5.0)];
const THEME_LADDER: Ladder = [(5, 2.0), (8, 3.0), (12, 4.0), (15, 5.0)];

pub const MIN_DIFFICULTY: u8 = 1;
pub const MAX_DIFFICULTY: u8 = 5;

/// Difficulty heuristic variants. Each import path has its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DifficultyScale {
    /// Stave (folk-song) imports.
    #[default]
    Folk,
    /// Event-table (theme dataset) imports, with tighter length cutoffs.
    Theme,
    /// Curated themes: counts length, tempo and accidentals.
    Tempo { bpm: u32 },
    /// Score supplied by the source itself, clamped into range.
    Fixed(u8),
}

/// Everything the catalogue stores about one melody or motif.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedRecord {
    pub pitch_sequence: String,
    pub rhythm_sequence: String,
    pub interval_profile: String,
    pub length: usize,
    pub first_pitch: String,
    pub last_pitch: String,
    pub difficulty: u8,
    pub fingerprint: String,
}

/// Derive with the folk difficulty scale.
pub fn derive(melody: &Melody) -> Result<DerivedRecord, DeriveError> {
    derive_with(melody, DifficultyScale::default())
}

pub fn derive_with(melody: &Melody, scale: DifficultyScale) -> Result<DerivedRecord, DeriveError> {
    let (Some(first), Some(last)) = (melody.notes.first(), melody.notes.last()) else {
        return Err(DeriveError::EmptyMelody);
    };

    let pitch_sequence = pitch_sequence(&melody.notes);
    let indices = melody.chromatic_indices();

    Ok(DerivedRecord {
        fingerprint: fingerprint(&pitch_sequence),
        pitch_sequence,
        rhythm_sequence: join(melody.notes.iter().map(|n| n.duration.to_string())),
        interval_profile: interval_profile(&indices),
        length: melody.len(),
        first_pitch: first.pitch.to_string(),
        last_pitch: last.pitch.to_string(),
        difficulty: difficulty(melody, scale),
    })
}

fn join(items: impl Iterator<Item = String>) -> String {
    items.collect::<Vec<_>>().join(" ")
}

/// Space-joined pitch spellings, e.g. `"C D Eb"`.
#[must_use]
pub fn pitch_sequence(notes: &[SymbolicNote]) -> String {
    join(notes.iter().map(|n| n.pitch.to_string()))
}

/// Signed index differences between neighbours, e.g. `"+2 +2 +1"`.
///
/// ```
/// use melodex::derive::interval_profile;
///
/// assert_eq!(interval_profile(&[0, 2, 4, 5]), "+2 +2 +1");
/// assert_eq!(interval_profile(&[11, 0]), "-11");
/// assert_eq!(interval_profile(&[7]), "");
/// ```
#[must_use]
pub fn interval_profile(indices: &[u8]) -> String {
    join(
        indices
            .windows(2)
            .map(|pair| format!("{:+}", i32::from(pair[1]) - i32::from(pair[0]))),
    )
}

/// Hex SHA-256 of the whitespace-normalized pitch sequence.
#[must_use]
pub fn fingerprint(pitch_sequence: &str) -> String {
    let normalized = pitch_sequence.split_whitespace().collect::<Vec<_>>().join(" ");
    format!("{:x}", Sha256::digest(normalized.as_bytes()))
}

/// Mean absolute index difference, `None` below two notes.
#[must_use]
pub fn average_interval(indices: &[u8]) -> Option<f64> {
    if indices.len() < 2 {
        return None;
    }
    let total: i32 = indices
        .windows(2)
        .map(|pair| (i32::from(pair[1]) - i32::from(pair[0])).abs())
        .sum();
    Some(f64::from(total) / (indices.len() - 1) as f64)
}

/// Difficulty score in `1..=5`. Always 1 below two notes, unless the
/// score is [`Fixed`](DifficultyScale::Fixed).
#[must_use]
pub fn difficulty(melody: &Melody, scale: DifficultyScale) -> u8 {
    if let DifficultyScale::Fixed(score) = scale {
        return score.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY);
    }

    let length = melody.len();
    let Some(avg_interval) = average_interval(&melody.chromatic_indices()) else {
        return MIN_DIFFICULTY;
    };

    match scale {
        DifficultyScale::Folk => ladder_score(&FOLK_LADDER, length, avg_interval),
        DifficultyScale::Theme => ladder_score(&THEME_LADDER, length, avg_interval),
        DifficultyScale::Tempo { bpm } => {
            let altered = melody.notes.iter().any(|n| n.pitch.is_altered());
            let bumps = [length > 12, length > 14, bpm > 150, altered]
                .into_iter()
                .filter(|&b| b)
                .count() as u8;
            (MIN_DIFFICULTY + bumps).min(MAX_DIFFICULTY)
        }
        DifficultyScale::Fixed(score) => score.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY),
    }
}

fn ladder_score(ladder: &Ladder, length: usize, avg_interval: f64) -> u8 {
    ladder
        .iter()
        .position(|&(max_len, max_avg)| length <= max_len && avg_interval <= max_avg)
        .map_or(MAX_DIFFICULTY, |rung| rung as u8 + MIN_DIFFICULTY)
}
