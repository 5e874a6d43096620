//! Canonical, format-independent melody representation.
//!
//! Both decoders produce a [`Melody`]; motifs are plain `Melody` values too,
//! holding a copy of a contiguous run of their parent's notes.

use crate::pitch::{PitchClass, SpelledPitch};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Symbolic note-value code, e.g. `"4"` for a quarter or `"8."` for a
/// dotted eighth. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DurationToken(String);

impl DurationToken {
    /// Token used when the source gives no duration.
    pub const QUARTER: &'static str = "4";

    /// Wraps `token`, falling back to a quarter note when it is blank.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        let token = token.into();
        if token.trim().is_empty() {
            Self::default()
        } else {
            Self(token)
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for DurationToken {
    fn default() -> Self {
        Self(Self::QUARTER.to_string())
    }
}

impl fmt::Display for DurationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One performed pitch event. Built once by a decoder, then left alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolicNote {
    pub pitch: SpelledPitch,
    /// MIDI-style octave, C4 = middle C.
    pub octave: i32,
    pub duration: DurationToken,
}

impl SymbolicNote {
    #[must_use]
    pub fn new(pitch: SpelledPitch, octave: i32, duration: DurationToken) -> Self {
        Self {
            pitch,
            octave,
            duration,
        }
    }

    #[must_use]
    pub fn pitch_class(&self) -> PitchClass {
        self.pitch.pitch_class()
    }

    #[must_use]
    pub fn chromatic_index(&self) -> u8 {
        self.pitch.chromatic_index()
    }
}

impl fmt::Display for SymbolicNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.pitch, self.octave)
    }
}

/// Descriptive fields carried alongside the notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MelodyMetadata {
    pub title: String,
    pub region: String,
    /// Collection-specific source code (stave `SCT` record).
    pub source_code: String,
    pub key_signature: String,
    pub time_signature: String,
    pub mode: Option<String>,
    pub genre: Option<String>,
    pub composer: Option<String>,
    pub tempo_bpm: Option<u32>,
    pub source_filename: String,
}

impl MelodyMetadata {
    /// Placeholder metadata: `"Unknown"` title and region, everything else empty.
    #[must_use]
    pub fn unknown(source_filename: impl Into<String>) -> Self {
        Self {
            title: "Unknown".to_string(),
            region: "Unknown".to_string(),
            source_code: String::new(),
            key_signature: String::new(),
            time_signature: String::new(),
            mode: None,
            genre: None,
            composer: None,
            tempo_bpm: None,
            source_filename: source_filename.into(),
        }
    }
}

/// Ordered notes in performance order plus metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Melody {
    pub metadata: MelodyMetadata,
    pub notes: Vec<SymbolicNote>,
}

impl Melody {
    #[must_use]
    pub fn new(metadata: MelodyMetadata, notes: Vec<SymbolicNote>) -> Self {
        Self { metadata, notes }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.notes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.metadata.title
    }

    /// Chromatic indices of every note, in order.
    #[must_use]
    pub fn chromatic_indices(&self) -> Vec<u8> {
        self.notes.iter().map(SymbolicNote::chromatic_index).collect()
    }

    /// Independent copy of `notes[start..start + len]` titled with its
    /// 1-based note range, e.g. `"Title (motif 4-9)"`.
    ///
    /// The caller guarantees the range is in bounds.
    #[must_use]
    pub(crate) fn sub_melody(&self, start: usize, len: usize) -> Melody {
        let mut metadata = self.metadata.clone();
        metadata.title = format!("{} (motif {}-{})", self.metadata.title, start + 1, start + len);
        Melody {
            metadata,
            notes: self.notes[start..start + len].to_vec(),
        }
    }
}
