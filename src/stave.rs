//! # Stave Notation Decoder
//!
//! Decodes the compact letter/duration stave format (Humdrum `**kern`, as
//! used by the Essen folk-song collection) into a [`Melody`].
//!
//! ## Line kinds
//!
//! - `!!!TAG: value`: reference record (title, region, genre, ...)
//! - `*k[b-e-]`, `*M3/4`, `*G:`: key, meter and mode directives
//! - `=` barline and `*-` terminator (ends note extraction)
//! - anything else: whitespace-separated note tokens
//!
//! ## Note tokens
//!
//! `<duration><letters><accidental>`, e.g. `4c`, `8.BB-`, `16ee#`. The
//! letter's case and repetition count give the octave: `c` is C4, `cc` C5,
//! `C` C3, `CC` C2. Rests (`4r`) are dropped without leaving a gap.

use crate::error::DecodeError;
use crate::melody::{DurationToken, Melody, MelodyMetadata, SymbolicNote};
use crate::pitch::{Accidental, Letter, SpelledPitch, MIDDLE_C_OCTAVE};
use lazy_static::lazy_static;
use log::{debug, trace};
use regex::Regex;
use std::collections::HashMap;

/// Characters wrapped around tokens for phrasing, ties and grouping.
const DECORATION: &[char] = &['{', '}', '(', ')', '[', ']'];

const TERMINATOR: &str = "*-";

lazy_static! {
    static ref NOTE_TOKEN: Regex = Regex::new(r"^(\d+\.?)([a-gA-G]+|r)([-#]*)").unwrap();
    static ref REFERENCE_RECORD: Regex = Regex::new(r"^!!!([A-Z]+):\s*(.+)").unwrap();
    static ref KEY_DIRECTIVE: Regex = Regex::new(r"^\*k\[([a-g#-]*)\]").unwrap();
    static ref METER_DIRECTIVE: Regex = Regex::new(r"^\*M(\d+/\d+)").unwrap();
    static ref MODE_DIRECTIVE: Regex = Regex::new(r"^\*([A-Ga-g][#b-]*):").unwrap();
}

/// Decode a whole stave source. Fails only when not a single note token
/// could be decoded.
///
/// ```
/// use melodex::stave;
///
/// let melody = stave::decode("**kern\n4c 4d 4e 4f\n*-\n", "scale.krn").unwrap();
/// assert_eq!(melody.len(), 4);
/// assert_eq!(melody.title(), "Unknown");
/// ```
pub fn decode(content: &str, filename: &str) -> Result<Melody, DecodeError> {
    let lines: Vec<&str> = content.trim().lines().collect();

    let notes = extract_notes(&lines);
    if notes.is_empty() {
        debug!("No notes decoded from stave source `{filename}`");
        return Err(DecodeError::NoNotes {
            source_name: filename.to_string(),
        });
    }

    let metadata = extract_metadata(&lines, filename);
    trace!("Decoded {} notes from `{filename}`", notes.len());
    Ok(Melody::new(metadata, notes))
}

/// Best-effort metadata scan over every line; missing tags get placeholders.
fn extract_metadata(lines: &[&str], filename: &str) -> MelodyMetadata {
    let mut records: HashMap<String, String> = HashMap::new();
    let mut key = None;
    let mut meter = None;
    let mut mode = None;

    for line in lines {
        let line = line.trim_end();
        if line.starts_with("!!!") {
            if let Some(caps) = REFERENCE_RECORD.captures(line) {
                records.insert(caps[1].to_string(), caps[2].trim().to_string());
            }
        } else if line.starts_with("*k[") {
            if let Some(caps) = KEY_DIRECTIVE.captures(line) {
                let signature = &caps[1];
                key = Some(if signature.is_empty() { "C" } else { signature }.to_string());
            }
        } else if line.starts_with("*M") {
            if let Some(caps) = METER_DIRECTIVE.captures(line) {
                meter = Some(caps[1].to_string());
            }
        } else if line.starts_with('*') && line.contains(':') {
            if let Some(caps) = MODE_DIRECTIVE.captures(line) {
                mode = Some(caps[1].to_string());
            }
        }
    }

    let mut metadata = MelodyMetadata::unknown(filename);
    if let Some(title) = records.remove("OTL") {
        metadata.title = title;
    }
    if let Some(region) = records.remove("ARE") {
        metadata.region = region;
    }
    metadata.source_code = records.remove("SCT").unwrap_or_default();
    metadata.genre = records.remove("AGN");
    metadata.key_signature = key.unwrap_or_default();
    metadata.time_signature = meter.unwrap_or_default();
    metadata.mode = mode;
    metadata
}

fn extract_notes(lines: &[&str]) -> Vec<SymbolicNote> {
    let mut notes = Vec::new();

    for line in lines {
        let line = line.trim_end();
        if line.starts_with(TERMINATOR) {
            break;
        }
        if line.trim().is_empty() || line.starts_with(['!', '*', '=']) {
            continue;
        }

        for token in line.split_whitespace() {
            match decode_token(token) {
                Token::Note(note) => notes.push(note),
                Token::Rest => {}
                Token::Unrecognized => trace!("Skipping unrecognized stave token `{token}`"),
            }
        }
    }

    notes
}

#[derive(Debug, PartialEq, Eq)]
enum Token {
    Note(SymbolicNote),
    Rest,
    Unrecognized,
}

fn decode_token(raw: &str) -> Token {
    let token = raw.trim_matches(DECORATION);
    let Some(caps) = NOTE_TOKEN.captures(token) else {
        return Token::Unrecognized;
    };

    let pitch_field = &caps[2];
    if pitch_field == "r" {
        return Token::Rest;
    }

    match decode_pitch(pitch_field, &caps[3]) {
        Some((pitch, octave)) => Token::Note(SymbolicNote::new(
            pitch,
            octave,
            DurationToken::new(&caps[1]),
        )),
        None => Token::Unrecognized,
    }
}

/// Decode a single note token such as `8.dd-` into a note. Rests, decorations
/// only, and malformed tokens yield `None`.
#[must_use]
pub fn decode_note_token(token: &str) -> Option<SymbolicNote> {
    match decode_token(token) {
        Token::Note(note) => Some(note),
        Token::Rest | Token::Unrecognized => None,
    }
}

/// Letters must repeat a single character in one case.
fn decode_pitch(letters: &str, marks: &str) -> Option<(SpelledPitch, i32)> {
    let first = letters.chars().next()?;
    if !letters.chars().all(|c| c == first) {
        return None;
    }
    let letter = Letter::from_char(first)?;
    let accidental = Accidental::from_marks(marks)?;

    let repeats = letters.len() as i32;
    let octave = if first.is_ascii_lowercase() {
        MIDDLE_C_OCTAVE + repeats - 1
    } else {
        MIDDLE_C_OCTAVE - repeats
    };

    Some((SpelledPitch::new(letter, accidental), octave))
}

/// Re-encode a note as a stave token. Flats are written `-`, sharps `#`.
#[must_use]
pub fn encode_note_token(note: &SymbolicNote) -> String {
    let letter = note.pitch.letter.as_char();
    let (letter, repeats) = if note.octave >= MIDDLE_C_OCTAVE {
        (letter.to_ascii_lowercase(), note.octave - MIDDLE_C_OCTAVE + 1)
    } else {
        (letter, MIDDLE_C_OCTAVE - note.octave)
    };
    let marks = note.pitch.accidental.suffix().replace('b', "-");

    let mut token = note.duration.to_string();
    for _ in 0..repeats {
        token.push(letter);
    }
    token.push_str(&marks);
    token
}
