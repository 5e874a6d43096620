//! # Pitch Model
//!
//! The 12 chromatic pitch classes, the letter + accidental spellings that
//! source material uses for them, and the octave numbering convention.
//!
//! Octaves follow the MIDI convention: C4 is middle C, MIDI note 60.
//! Every spelling (sharp, flat, double accidentals) maps onto exactly one
//! chromatic index in `0..12`, so `Db` and `C#` are the same pitch class
//! even though decoders may keep the spelling they were given.

use crate::error::PitchParseError;
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// Octave of middle C.
pub const MIDDLE_C_OCTAVE: i32 = 4;

/// One of the 12 canonical pitch classes, labelled with sharps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PitchClass {
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
    A,
    ASharp,
    B,
}

impl PitchClass {
    /// Chromatic table, indexed by chromatic index.
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::CSharp,
        PitchClass::D,
        PitchClass::DSharp,
        PitchClass::E,
        PitchClass::F,
        PitchClass::FSharp,
        PitchClass::G,
        PitchClass::GSharp,
        PitchClass::A,
        PitchClass::ASharp,
        PitchClass::B,
    ];

    /// Chromatic index (C=0 … B=11).
    #[must_use]
    pub const fn index(self) -> u8 {
        self as u8
    }

    /// Pitch class for any integer, wrapping into `0..12`.
    #[must_use]
    pub fn from_index(index: i32) -> Self {
        Self::ALL[index.rem_euclid(12) as usize]
    }

    /// Canonical (sharp) label, e.g. `"C#"`.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            PitchClass::C => "C",
            PitchClass::CSharp => "C#",
            PitchClass::D => "D",
            PitchClass::DSharp => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::FSharp => "F#",
            PitchClass::G => "G",
            PitchClass::GSharp => "G#",
            PitchClass::A => "A",
            PitchClass::ASharp => "A#",
            PitchClass::B => "B",
        }
    }

    /// Split a MIDI note number into pitch class and octave.
    ///
    /// ```
    /// use melodex::pitch::PitchClass;
    ///
    /// assert_eq!(PitchClass::from_midi(60), (PitchClass::C, 4));
    /// assert_eq!(PitchClass::from_midi(64), (PitchClass::E, 4));
    /// ```
    #[must_use]
    pub fn from_midi(midi: i32) -> (Self, i32) {
        (Self::from_index(midi), midi.div_euclid(12) - 1)
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Natural note letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Letter {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl Letter {
    /// Letter for an ASCII character, ignoring case.
    #[must_use]
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'C' => Some(Letter::C),
            'D' => Some(Letter::D),
            'E' => Some(Letter::E),
            'F' => Some(Letter::F),
            'G' => Some(Letter::G),
            'A' => Some(Letter::A),
            'B' => Some(Letter::B),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Letter::C => 'C',
            Letter::D => 'D',
            Letter::E => 'E',
            Letter::F => 'F',
            Letter::G => 'G',
            Letter::A => 'A',
            Letter::B => 'B',
        }
    }

    /// Chromatic index of the natural note.
    #[must_use]
    pub const fn natural_index(self) -> i32 {
        match self {
            Letter::C => 0,
            Letter::D => 2,
            Letter::E => 4,
            Letter::F => 5,
            Letter::G => 7,
            Letter::A => 9,
            Letter::B => 11,
        }
    }
}

/// Accidental attached to a letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Accidental {
    DoubleFlat,
    Flat,
    #[default]
    Natural,
    Sharp,
    DoubleSharp,
}

impl Accidental {
    /// Semitone offset from the natural letter.
    #[must_use]
    pub const fn offset(self) -> i32 {
        match self {
            Accidental::DoubleFlat => -2,
            Accidental::Flat => -1,
            Accidental::Natural => 0,
            Accidental::Sharp => 1,
            Accidental::DoubleSharp => 2,
        }
    }

    /// Suffix used when spelling a pitch (`b` for flats, `#` for sharps).
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Accidental::DoubleFlat => "bb",
            Accidental::Flat => "b",
            Accidental::Natural => "",
            Accidental::Sharp => "#",
            Accidental::DoubleSharp => "##",
        }
    }

    /// Parse a run of `b`/`-` (flats) or `#` (sharps). Mixed runs and runs
    /// longer than two are not accidentals.
    #[must_use]
    pub fn from_marks(marks: &str) -> Option<Self> {
        match marks {
            "" => Some(Accidental::Natural),
            "b" | "-" => Some(Accidental::Flat),
            "bb" | "--" => Some(Accidental::DoubleFlat),
            "#" => Some(Accidental::Sharp),
            "##" => Some(Accidental::DoubleSharp),
            _ => None,
        }
    }
}

/// A pitch class as it was written: letter plus accidental.
///
/// Keeps the source spelling (`Bb` stays `Bb`) while still resolving to a
/// single chromatic index for interval arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpelledPitch {
    pub letter: Letter,
    pub accidental: Accidental,
}

impl SpelledPitch {
    #[must_use]
    pub const fn new(letter: Letter, accidental: Accidental) -> Self {
        Self { letter, accidental }
    }

    /// Chromatic index, enharmonically unified (C=0 … B=11).
    #[must_use]
    pub fn chromatic_index(self) -> u8 {
        self.pitch_class().index()
    }

    #[must_use]
    pub fn pitch_class(self) -> PitchClass {
        PitchClass::from_index(self.letter.natural_index() + self.accidental.offset())
    }

    /// True when the spelling carries a sharp or flat.
    #[must_use]
    pub fn is_altered(self) -> bool {
        self.accidental != Accidental::Natural
    }
}

impl From<PitchClass> for SpelledPitch {
    /// Sharp spelling of a canonical pitch class.
    fn from(class: PitchClass) -> Self {
        let (letter, accidental) = match class {
            PitchClass::C => (Letter::C, Accidental::Natural),
            PitchClass::CSharp => (Letter::C, Accidental::Sharp),
            PitchClass::D => (Letter::D, Accidental::Natural),
            PitchClass::DSharp => (Letter::D, Accidental::Sharp),
            PitchClass::E => (Letter::E, Accidental::Natural),
            PitchClass::F => (Letter::F, Accidental::Natural),
            PitchClass::FSharp => (Letter::F, Accidental::Sharp),
            PitchClass::G => (Letter::G, Accidental::Natural),
            PitchClass::GSharp => (Letter::G, Accidental::Sharp),
            PitchClass::A => (Letter::A, Accidental::Natural),
            PitchClass::ASharp => (Letter::A, Accidental::Sharp),
            PitchClass::B => (Letter::B, Accidental::Natural),
        };
        Self { letter, accidental }
    }
}

impl fmt::Display for SpelledPitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.letter.as_char(), self.accidental.suffix())
    }
}

impl FromStr for SpelledPitch {
    type Err = PitchParseError;

    /// Parses `C`, `C#`, `Db`, `Bbb`, `F##` and the like.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let letter = chars
            .next()
            .and_then(Letter::from_char)
            .ok_or_else(|| PitchParseError::new(s))?;
        let accidental =
            Accidental::from_marks(chars.as_str()).ok_or_else(|| PitchParseError::new(s))?;
        Ok(Self { letter, accidental })
    }
}

/// Octaves a note name may carry, matching the MIDI note range.
pub const NOTE_OCTAVES: RangeInclusive<i32> = -1..=9;

/// Split a note name with octave such as `"D#5"` into spelling and octave.
/// Octaves outside [`NOTE_OCTAVES`] are rejected.
pub fn parse_note_with_octave(s: &str) -> Result<(SpelledPitch, i32), PitchParseError> {
    let s = s.trim();
    let name = s.trim_end_matches(|c: char| c.is_ascii_digit());
    let octave: i32 = s[name.len()..]
        .parse()
        .map_err(|_| PitchParseError::new(s))?;
    if !NOTE_OCTAVES.contains(&octave) {
        return Err(PitchParseError::new(s));
    }
    Ok((name.parse()?, octave))
}
