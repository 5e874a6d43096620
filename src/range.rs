//! # Range Normalizer
//!
//! Moves a pitch/octave sequence into a fixed two-octave window so that
//! imported themes share one register.
//!
//! Absolute pitch here is `chromatic index + 12 * octave`, which puts the
//! window `60..=83` at C5–B6 in MIDI-style octave numbers.
//!
//! Sequences spanning at most 23 semitones are translated rigidly, keeping
//! their exact shape. Wider sequences are shifted so the lowest note sits on
//! the floor and every note still outside is clamped to the nearest edge,
//! which flattens the contour at the top.

use crate::pitch::PitchClass;

/// Lowest absolute pitch in the window.
pub const WINDOW_FLOOR: i32 = 60;
/// Highest absolute pitch in the window.
pub const WINDOW_CEILING: i32 = 83;

/// Absolute pitch number used by the normalizer.
#[must_use]
pub fn absolute_pitch(class: PitchClass, octave: i32) -> i32 {
    i32::from(class.index()) + 12 * octave
}

/// Inverse of [`absolute_pitch`]. Always spells with sharps.
#[must_use]
pub fn from_absolute(absolute: i32) -> (PitchClass, i32) {
    (PitchClass::from_index(absolute), absolute.div_euclid(12))
}

/// Normalize `notes` into `WINDOW_FLOOR..=WINDOW_CEILING`.
///
/// A sequence already inside the window is returned unchanged.
///
/// ```
/// use melodex::pitch::PitchClass;
/// use melodex::range::normalize_range;
///
/// let low = [(PitchClass::C, 3), (PitchClass::E, 3), (PitchClass::G, 3)];
/// let shifted = normalize_range(&low);
/// assert_eq!(shifted, [(PitchClass::C, 5), (PitchClass::E, 5), (PitchClass::G, 5)]);
/// ```
#[must_use]
pub fn normalize_range(notes: &[(PitchClass, i32)]) -> Vec<(PitchClass, i32)> {
    let absolutes: Vec<i32> = notes
        .iter()
        .map(|&(class, octave)| absolute_pitch(class, octave))
        .collect();

    let (Some(&min), Some(&max)) = (absolutes.iter().min(), absolutes.iter().max()) else {
        return Vec::new();
    };

    let shift = window_shift(min, max);
    absolutes
        .into_iter()
        .map(|absolute| from_absolute((absolute + shift).clamp(WINDOW_FLOOR, WINDOW_CEILING)))
        .collect()
}

fn window_shift(min: i32, max: i32) -> i32 {
    if min >= WINDOW_FLOOR && max <= WINDOW_CEILING {
        return 0;
    }

    let mut shift = WINDOW_FLOOR - min;
    if max - min <= WINDOW_CEILING - WINDOW_FLOOR && max + shift > WINDOW_CEILING {
        shift = WINDOW_CEILING - max;
    }
    shift
}
