//! # Curated Theme Decoder
//!
//! Hand-picked themes arrive as JSON with note names that carry their own
//! octave (`"C4"`, `"D#5"`) and durations as fractions of a whole note.
//! Pitches are moved into the shared two-octave window by
//! [`normalize_range`](crate::range::normalize_range) before they become
//! notes, so curated themes always come out sharp-spelled.

use crate::derive::DifficultyScale;
use crate::error::DecodeError;
use crate::event_table::string_or_number;
use crate::melody::{DurationToken, Melody, MelodyMetadata, SymbolicNote};
use crate::pitch::{parse_note_with_octave, PitchClass, SpelledPitch};
use crate::range::normalize_range;
use log::{debug, trace};
use serde::Deserialize;

/// Beat fraction to note-value token; the nearest entry wins.
const FRACTION_TABLE: [(f64, &str); 8] = [
    (2.0, "1"),
    (1.5, "2."),
    (1.0, "2"),
    (0.75, "4."),
    (0.5, "4"),
    (0.33, "4"),
    (0.25, "8"),
    (0.17, "16"),
];

/// Name keywords per genre, checked in order.
const GENRE_KEYWORDS: [(&str, &[&str]); 6] = [
    ("traditional_holiday", &["christmas", "jingle", "silent night", "rudolph", "deck"]),
    (
        "film_tv",
        &["star wars", "harry potter", "pirates", "bond", "mission", "thrones", "simpsons", "addams", "indiana"],
    ),
    ("game", &["mario", "tetris", "nokia"]),
    (
        "classical",
        &["beethoven", "mozart", "für elise", "ode to joy", "canon", "eine kleine", "entertainer", "wedding march"],
    ),
    ("rock", &["rock you", "nation army", "smoke on the water", "black", "child"]),
    (
        "traditional_folk",
        &[
            "happy birthday", "twinkle", "mary", "old macdonald", "frère", "yankee", "amazing grace",
            "auld", "greensleeves", "camptown", "susanna", "london bridge", "this old man",
        ],
    ),
];

const FALLBACK_GENRE: &str = "popular";

/// Recognition tiers, most recognizable first.
const RECOGNITION_TIERS: [(u8, &[&str]); 4] = [
    (
        10,
        &["happy birthday", "star wars", "imperial march", "super mario", "für elise", "ode to joy", "jingle bells", "twinkle"],
    ),
    (
        9,
        &["harry potter", "james bond", "mission impossible", "tetris", "beethoven", "pirates caribbean", "game of thrones"],
    ),
    (8, &["pink panther", "wedding march", "amazing grace", "silent night", "canon"]),
    (7, &["seven nation", "smoke on the water", "greensleeves", "yankee doodle"]),
];

const DEFAULT_RECOGNITION: u8 = 6;

/// Genre tag for precomputed themes that name none.
pub const PRECOMPUTED_DEFAULT_GENRE: &str = "classical";

/// Octave given to precomputed pitches, which carry none.
const PRECOMPUTED_OCTAVE: i32 = 5;

/// Top-level curated file: `{ "themes": [...] }`.
#[derive(Debug, Clone, Deserialize)]
pub struct CuratedCollection {
    pub themes: Vec<CuratedEntry>,
}

/// One entry of a curated file. Both shapes may be mixed in one file.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CuratedEntry {
    /// Note names with octaves, beat fractions and a tempo.
    Notes(CuratedTheme),
    /// Sequences and scores worked out ahead of time.
    Precomputed(PrecomputedTheme),
}

#[derive(Debug, Clone, Deserialize)]
pub struct CuratedTheme {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    pub notes: Vec<String>,
    #[serde(default)]
    pub durations: Vec<f64>,
    #[serde(default)]
    pub tempo: u32,
    #[serde(default)]
    pub composer: Option<String>,
}

impl CuratedTheme {
    /// Difficulty variant for this theme's tempo.
    #[must_use]
    pub fn difficulty_scale(&self) -> DifficultyScale {
        DifficultyScale::Tempo { bpm: self.tempo }
    }

    /// `"Name (120 BPM)"`.
    #[must_use]
    pub fn descriptor(&self) -> String {
        format!("{} ({} BPM)", self.name, self.tempo)
    }
}

/// A theme whose pitch sequence, difficulty and recognition score were
/// prepared by hand.
#[derive(Debug, Clone, Deserialize)]
pub struct PrecomputedTheme {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    pub title: String,
    /// Space-separated spellings, e.g. `"G G G Eb"`.
    pub pitch_sequence: String,
    #[serde(default)]
    pub rhythm_sequence: Option<String>,
    #[serde(default)]
    pub length: Option<usize>,
    pub difficulty: u8,
    pub recognition_score: u8,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub composer: Option<String>,
}

impl PrecomputedTheme {
    #[must_use]
    pub fn difficulty_scale(&self) -> DifficultyScale {
        DifficultyScale::Fixed(self.difficulty)
    }

    #[must_use]
    pub fn genre(&self) -> &str {
        self.genre.as_deref().unwrap_or(PRECOMPUTED_DEFAULT_GENRE)
    }
}

/// Nearest note-value token for a beat fraction.
#[must_use]
pub fn fraction_token(fraction: f64) -> DurationToken {
    FRACTION_TABLE
        .iter()
        .min_by(|(a, _), (b, _)| (a - fraction).abs().total_cmp(&(b - fraction).abs()))
        .map_or_else(DurationToken::default, |(_, token)| DurationToken::new(*token))
}

/// Genre label guessed from a theme name.
#[must_use]
pub fn categorize(name: &str) -> &'static str {
    let name = name.to_lowercase();
    GENRE_KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|w| name.contains(w)))
        .map_or(FALLBACK_GENRE, |(genre, _)| *genre)
}

/// How recognizable a theme is, 1–10, guessed from its name.
#[must_use]
pub fn recognition_score(name: &str) -> u8 {
    let name = name.to_lowercase();
    RECOGNITION_TIERS
        .iter()
        .find(|(_, phrases)| phrases.iter().any(|p| name.contains(p)))
        .map_or(DEFAULT_RECOGNITION, |(score, _)| *score)
}

/// Decode one curated theme, normalizing its register.
pub fn decode(theme: &CuratedTheme) -> Result<Melody, DecodeError> {
    let source_filename = format!("{}.json", theme.id);

    // Durations stay paired with their note even when a neighbour is skipped.
    let (pitches, durations): (Vec<(PitchClass, i32)>, Vec<DurationToken>) = theme
        .notes
        .iter()
        .enumerate()
        .filter_map(|(i, raw)| match parse_note_with_octave(raw) {
            Ok((pitch, octave)) => {
                let duration = theme
                    .durations
                    .get(i)
                    .map_or_else(DurationToken::default, |&f| fraction_token(f));
                Some(((pitch.pitch_class(), octave), duration))
            }
            Err(err) => {
                trace!("Skipping curated note in `{source_filename}`: {err}");
                None
            }
        })
        .unzip();

    if pitches.is_empty() {
        debug!("No notes decoded from curated theme `{source_filename}`");
        return Err(DecodeError::NoNotes {
            source_name: source_filename,
        });
    }

    let notes = normalize_range(&pitches)
        .into_iter()
        .zip(durations)
        .map(|((class, octave), duration)| SymbolicNote::new(SpelledPitch::from(class), octave, duration))
        .collect();

    let mut metadata = MelodyMetadata::unknown(source_filename);
    metadata.title = theme.name.clone();
    metadata.region = "Various".to_string();
    metadata.genre = Some(categorize(&theme.name).to_string());
    metadata.composer = theme.composer.clone();
    metadata.tempo_bpm = Some(theme.tempo);

    Ok(Melody::new(metadata, notes))
}

/// Decode a precomputed theme. Spellings are kept as written; every note
/// sits in one octave since the record has none.
pub fn decode_precomputed(theme: &PrecomputedTheme) -> Result<Melody, DecodeError> {
    let source_filename = format!("{}.json", theme.id);
    let rhythm: Vec<&str> = theme
        .rhythm_sequence
        .as_deref()
        .map(|r| r.split_whitespace().collect())
        .unwrap_or_default();

    let notes: Vec<SymbolicNote> = theme
        .pitch_sequence
        .split_whitespace()
        .enumerate()
        .filter_map(|(i, raw)| match raw.parse::<SpelledPitch>() {
            Ok(pitch) => {
                let duration = rhythm.get(i).map_or_else(DurationToken::default, |&t| DurationToken::new(t));
                Some(SymbolicNote::new(pitch, PRECOMPUTED_OCTAVE, duration))
            }
            Err(err) => {
                trace!("Skipping precomputed pitch in `{source_filename}`: {err}");
                None
            }
        })
        .collect();

    if notes.is_empty() {
        debug!("No notes decoded from precomputed theme `{source_filename}`");
        return Err(DecodeError::NoNotes {
            source_name: source_filename,
        });
    }
    if let Some(length) = theme.length.filter(|&length| length != notes.len()) {
        debug!("`{source_filename}` declares {length} notes but has {}", notes.len());
    }

    let mut metadata = MelodyMetadata::unknown(source_filename);
    metadata.title = theme.title.clone();
    metadata.region = "Various".to_string();
    metadata.genre = Some(theme.genre().to_string());
    metadata.composer = theme.composer.clone();

    Ok(Melody::new(metadata, notes))
}
