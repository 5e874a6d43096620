//! Symbolic melody decoding and motif cataloguing.
//!
//! Core modules:
//! - [`stave`] - Stave (kern-style) notation decoder
//! - [`event_table`] - Note-event table decoder (MIDI pitch, start, duration)
//! - [`themes`] - Curated theme decoder with register normalization
//! - [`decode`] - Single entry point over every source kind
//! - [`motif`] - Overlapping motif extraction
//! - [`derive`] - Interval profile, fingerprint and difficulty
//!
//! ### Supporting Modules
//!
//! - [`pitch`] - Letters, accidentals, pitch classes and spellings
//! - [`melody`] - The canonical [`Melody`](melody::Melody) every decoder produces
//! - [`range`] - Moves pitches into a fixed two-octave window
//! - [`error`] - Typed errors for the core
//! - [`config`] - Data directory and import settings
//! - [`db`] - SQLite motif catalogue
//! - [`ingest`] - Import pipelines with parallel decoding
//! - [`cli`] - Command-line interface definitions with clap integration
//! - [`completion`] - Shell completion generation
//!
//! ## Quick Start Example
//!
//! ```
//! use melodex::{derive, motif, stave};
//!
//! let text = "!!!OTL: Alle meine Entchen\n*M2/4\n8c 8d 8e 8f 4g 4g\n*-\n";
//! let melody = stave::decode(text, "entchen.krn")?;
//! assert_eq!(melody.title(), "Alle meine Entchen");
//!
//! let record = derive::derive(&melody)?;
//! assert_eq!(record.pitch_sequence, "C D E F G G");
//! assert_eq!(record.interval_profile, "+2 +2 +1 +2 +0");
//!
//! let motifs = motif::extract_motifs(&melody, 4, 6, 2)?;
//! assert_eq!(motifs[0].title(), "Alle meine Entchen (motif 1-4)");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Data Flow
//!
//! Source text or rows are decoded into a [`Melody`](melody::Melody), optionally split
//! into motifs, and each piece is reduced to a [`DerivedRecord`](derive::DerivedRecord):
//!
//! - **pitch sequence**: spelled pitch classes, octave dropped (`"C D Eb"`)
//! - **rhythm sequence**: note-value tokens (`"4 8 8."`)
//! - **interval profile**: signed chromatic differences (`"+2 +1"`)
//! - **fingerprint**: SHA-256 of the pitch sequence, the catalogue's dedup key
//! - **difficulty**: 1 to 5 from length and average leap
//!
//! The decoding core does no I/O. Reading files, walking directories and
//! storing records is done by [`ingest`] and [`db`].
//!
//! ## Error Handling
//!
//! Core functions return typed errors from [`error`]. Tokens or rows that
//! cannot be read are skipped and logged at `trace` level rather than
//! failing the whole melody. The import and storage layers return
//! `anyhow::Result` with context attached.
//!
//! ## Testing
//!
//! Run tests with:
//! ```bash
//! cargo test
//! cargo bench  # decoding and motif extraction throughput
//! ```

pub mod cli;
pub mod completion;
pub mod config;
pub mod db;
pub mod decode;
pub mod derive;
pub mod error;
pub mod event_table;
pub mod ingest;
pub mod melody;
pub mod motif;
pub mod pitch;
pub mod range;
pub mod stave;
pub mod themes;
