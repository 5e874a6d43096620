//! # Motif Extractor
//!
//! Breaks a melody into overlapping, bounded-length sub-melodies.
//!
//! For every length `L` in `min_length..=min(max_length, n)` and every
//! offset `s = 0, stride, 2*stride, ...` with `s + L <= n`, exactly one
//! motif holding `notes[s..s + L]` is produced. Iteration order is
//! ascending length, then ascending offset.
//!
//! [`windows`] yields the `(length, offset)` pairs lazily and can be cloned
//! to restart; [`motifs`] turns them into [`Melody`] values one at a time so
//! long melodies need not be exploded into memory at once.

use crate::error::MotifError;
use crate::melody::Melody;
use serde::{Deserialize, Serialize};

/// Window bounds for motif extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotifOptions {
    pub min_length: usize,
    pub max_length: usize,
    pub stride: usize,
}

impl Default for MotifOptions {
    fn default() -> Self {
        Self {
            min_length: 4,
            max_length: 12,
            stride: 3,
        }
    }
}

impl MotifOptions {
    #[must_use]
    pub const fn new(min_length: usize, max_length: usize, stride: usize) -> Self {
        Self {
            min_length,
            max_length,
            stride,
        }
    }

    fn validate(self) -> Result<Self, MotifError> {
        if self.stride == 0 {
            return Err(MotifError::ZeroStride);
        }
        if self.min_length == 0 {
            return Err(MotifError::ZeroMinLength);
        }
        Ok(self)
    }
}

/// One motif position inside the parent melody.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub length: usize,
    pub offset: usize,
}

/// Lazy `(length, offset)` enumeration over a melody of `note_count` notes.
#[derive(Debug, Clone)]
pub struct Windows {
    note_count: usize,
    max_length: usize,
    stride: usize,
    length: usize,
    offset: usize,
}

impl Iterator for Windows {
    type Item = Window;

    fn next(&mut self) -> Option<Window> {
        while self.length <= self.max_length {
            let fits = self
                .offset
                .checked_add(self.length)
                .is_some_and(|end| end <= self.note_count);
            if fits {
                let window = Window {
                    length: self.length,
                    offset: self.offset,
                };
                self.offset = self.offset.saturating_add(self.stride);
                return Some(window);
            }
            self.length += 1;
            self.offset = 0;
        }
        None
    }
}

/// Window positions for a melody of `note_count` notes.
pub fn windows(note_count: usize, options: MotifOptions) -> Result<Windows, MotifError> {
    let options = options.validate()?;
    Ok(Windows {
        note_count,
        max_length: options.max_length.min(note_count),
        stride: options.stride,
        length: options.min_length,
        offset: 0,
    })
}

/// Lazily materialized motifs of one melody.
#[derive(Debug, Clone)]
pub struct Motifs<'a> {
    melody: &'a Melody,
    windows: Windows,
}

impl Iterator for Motifs<'_> {
    type Item = Melody;

    fn next(&mut self) -> Option<Melody> {
        self.windows
            .next()
            .map(|window| self.melody.sub_melody(window.offset, window.length))
    }
}

/// Motif iterator over `melody`.
pub fn motifs(melody: &Melody, options: MotifOptions) -> Result<Motifs<'_>, MotifError> {
    if melody.is_empty() {
        return Err(MotifError::EmptyMelody);
    }
    Ok(Motifs {
        melody,
        windows: windows(melody.len(), options)?,
    })
}

/// Every motif of `melody`, collected.
///
/// ```
/// use melodex::{motif, stave};
///
/// let melody = stave::decode("4c 4d 4e 4f 4g", "m.krn").unwrap();
/// let found = motif::extract_motifs(&melody, 4, 12, 1).unwrap();
/// let titles: Vec<&str> = found.iter().map(|m| m.title()).collect();
/// assert_eq!(titles, ["Unknown (motif 1-4)", "Unknown (motif 2-5)", "Unknown (motif 1-5)"]);
/// ```
pub fn extract_motifs(
    melody: &Melody,
    min_length: usize,
    max_length: usize,
    stride: usize,
) -> Result<Vec<Melody>, MotifError> {
    Ok(motifs(melody, MotifOptions::new(min_length, max_length, stride))?.collect())
}
