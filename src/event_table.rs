//! # Event-Table Decoder
//!
//! Decodes tabular note events (MIDI pitch, start, duration in seconds), as
//! shipped by the Musical Theme Dataset, into a [`Melody`].
//!
//! Rows stay in source order; they are assumed to be in performance order
//! already and are never re-sorted by start time. A row whose fields do not
//! parse as numbers is skipped on its own.

use crate::error::DecodeError;
use crate::melody::{DurationToken, Melody, MelodyMetadata, SymbolicNote};
use crate::pitch::{PitchClass, SpelledPitch};
use log::{debug, trace};
use serde::{Deserialize, Deserializer};

/// Seconds-to-token ladder, checked top to bottom.
const DURATION_LADDER: [(f64, &str); 4] = [(0.9, "2"), (0.4, "4"), (0.2, "8"), (0.1, "16")];

/// Token for anything shorter than the last rung.
const SHORTEST_TOKEN: &str = "32";

/// Per-theme metadata record (`data_META/*.json`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct WorkMetadata {
    #[serde(rename = "MTDID", default, deserialize_with = "string_or_number")]
    pub theme_id: String,
    #[serde(rename = "ComposerID", default, deserialize_with = "string_or_number")]
    pub composer: String,
    #[serde(rename = "WorkID", default, deserialize_with = "string_or_number")]
    pub work_id: String,
    #[serde(rename = "WorkTitle", default, deserialize_with = "string_or_number")]
    pub work_title: String,
    #[serde(rename = "ThemeInstruments", default, deserialize_with = "string_or_number")]
    pub instruments: String,
}

impl WorkMetadata {
    /// Composer, or `"Unknown"` when the record has none.
    #[must_use]
    pub fn composer_or_unknown(&self) -> &str {
        if self.composer.is_empty() {
            "Unknown"
        } else {
            &self.composer
        }
    }

    /// Work title, falling back to the work identifier.
    #[must_use]
    pub fn display_title(&self) -> &str {
        if self.work_title.is_empty() {
            &self.work_id
        } else {
            &self.work_title
        }
    }

    /// Theme id without its `MTD` prefix.
    #[must_use]
    pub fn bare_id(&self) -> &str {
        self.theme_id.strip_prefix("MTD").unwrap_or(&self.theme_id)
    }
}

/// The metadata files mix JSON strings, numbers and nulls for the same keys.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// One unparsed row. Fields are `None` when the column was missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEventRow {
    pub pitch: Option<String>,
    pub start: Option<String>,
    pub duration: Option<String>,
}

impl RawEventRow {
    pub fn new(pitch: &str, start: &str, duration: &str) -> Self {
        Self {
            pitch: Some(pitch.to_string()),
            start: Some(start.to_string()),
            duration: Some(duration.to_string()),
        }
    }
}

/// A row that parsed cleanly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteEvent {
    pub midi_pitch: i32,
    pub start: f64,
    pub duration: f64,
}

impl NoteEvent {
    fn parse(row: &RawEventRow) -> Option<Self> {
        let number = |field: &Option<String>| -> Option<f64> {
            field
                .as_deref()?
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
        };

        Some(Self {
            // Pitch columns are sometimes written as floats ("60.0").
            midi_pitch: number(&row.pitch)?.trunc() as i32,
            start: number(&row.start)?,
            duration: number(&row.duration)?,
        })
    }

    fn to_note(self) -> SymbolicNote {
        let (class, octave) = PitchClass::from_midi(self.midi_pitch);
        SymbolicNote::new(
            SpelledPitch::from(class),
            octave,
            duration_token(self.duration),
        )
    }
}

/// Map a duration in seconds onto a note-value token.
///
/// ```
/// use melodex::event_table::duration_token;
///
/// assert_eq!(duration_token(1.2).as_str(), "2");
/// assert_eq!(duration_token(0.5).as_str(), "4");
/// assert_eq!(duration_token(0.05).as_str(), "32");
/// ```
#[must_use]
pub fn duration_token(seconds: f64) -> DurationToken {
    DURATION_LADDER
        .iter()
        .find(|(threshold, _)| seconds >= *threshold)
        .map_or_else(
            || DurationToken::new(SHORTEST_TOKEN),
            |(_, token)| DurationToken::new(*token),
        )
}

/// Decode one theme. Fails only when no row parsed.
pub fn decode(metadata: &WorkMetadata, rows: &[RawEventRow]) -> Result<Melody, DecodeError> {
    let source_filename = format!("MTD{}.csv", metadata.bare_id());

    let notes: Vec<SymbolicNote> = rows
        .iter()
        .filter_map(|row| {
            let event = NoteEvent::parse(row);
            if event.is_none() {
                trace!("Skipping unparsable event row {row:?} in `{source_filename}`");
            }
            event
        })
        .map(NoteEvent::to_note)
        .collect();

    if notes.is_empty() {
        debug!("No notes decoded from event table `{source_filename}`");
        return Err(DecodeError::NoNotes {
            source_name: source_filename,
        });
    }

    let mut melody_metadata = MelodyMetadata::unknown(source_filename);
    melody_metadata.title = metadata.display_title().to_string();
    melody_metadata.source_code = metadata.work_id.clone();
    melody_metadata.composer = Some(metadata.composer_or_unknown().to_string());

    Ok(Melody::new(melody_metadata, notes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn beethoven() -> WorkMetadata {
        serde_json::from_str(
            r#"{"MTDID": "MTD1005", "ComposerID": "Beethoven", "WorkID": "Op096-01",
                "WorkTitle": null, "ThemeInstruments": "vl"}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_metadata_fallbacks() {
        let meta = beethoven();
        assert_eq!(meta.display_title(), "Op096-01");
        assert_eq!(meta.bare_id(), "1005");
        assert_eq!(meta.composer_or_unknown(), "Beethoven");
        assert_eq!(WorkMetadata::default().composer_or_unknown(), "Unknown");
    }

    #[test]
    fn test_numeric_metadata_fields() {
        let meta: WorkMetadata =
            serde_json::from_str(r#"{"MTDID": 42, "WorkID": 7}"#).unwrap();
        assert_eq!(meta.theme_id, "42");
        assert_eq!(meta.work_id, "7");
    }

    #[test]
    fn test_decodes_rows_in_order() {
        let rows = [
            RawEventRow::new("60", "0", "0.5"),
            RawEventRow::new("64", "0.5", "0.5"),
        ];
        let melody = decode(&beethoven(), &rows).unwrap();

        let rendered: Vec<String> = melody.notes.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, ["C4", "E4"]);
        assert_eq!(melody.chromatic_indices(), [0, 4]);
        assert_eq!(melody.metadata.source_filename, "MTD1005.csv");
        assert_eq!(melody.metadata.composer.as_deref(), Some("Beethoven"));
        assert_eq!(melody.title(), "Op096-01");
    }

    #[test]
    fn test_rows_not_resorted() {
        let rows = [
            RawEventRow::new("67", "2.0", "0.5"),
            RawEventRow::new("60", "0.0", "0.5"),
        ];
        let melody = decode(&beethoven(), &rows).unwrap();
        assert_eq!(melody.chromatic_indices(), [7, 0]);
    }

    #[test]
    fn test_bad_rows_skipped() {
        let rows = [
            RawEventRow::new("sixty", "0", "0.5"),
            RawEventRow::new("61.0", "0.5", "0.25"),
            RawEventRow {
                pitch: Some("62".into()),
                start: None,
                duration: Some("0.5".into()),
            },
            RawEventRow::new("70", "1", "NaN"),
        ];
        let melody = decode(&beethoven(), &rows).unwrap();
        assert_eq!(melody.len(), 1);
        assert_eq!(melody.notes[0].to_string(), "C#4");
        assert_eq!(melody.notes[0].duration.as_str(), "8");
    }

    #[test]
    fn test_all_rows_bad_is_failure() {
        let rows = [RawEventRow::new("x", "y", "z")];
        assert!(matches!(
            decode(&beethoven(), &rows),
            Err(DecodeError::NoNotes { .. })
        ));
        assert!(decode(&beethoven(), &[]).is_err());
    }

    #[test]
    fn test_duration_ladder_boundaries() {
        let cases = [
            (0.9, "2"),
            (0.899, "4"),
            (0.4, "4"),
            (0.2, "8"),
            (0.1, "16"),
            (0.099, "32"),
            (0.0, "32"),
        ];
        for (seconds, token) in cases {
            assert_eq!(duration_token(seconds).as_str(), token, "{seconds}s");
        }
    }

    #[test]
    fn test_low_midi_octaves() {
        let rows = [RawEventRow::new("11", "0", "1"), RawEventRow::new("12", "1", "1")];
        let melody = decode(&beethoven(), &rows).unwrap();
        let rendered: Vec<String> = melody.notes.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, ["B-1", "C0"]);
    }
}
