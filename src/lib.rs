//! Self-refilling generative radio.
//!
//! A background producer keeps a small buffer of finished tracks topped up:
//! it picks a randomized prompt, asks the resident music generator for a
//! waveform, normalizes and fades it, estimates its tempo and enqueues it.
//! Listeners connect over a WebSocket and are handed the oldest buffered
//! track, or told to wait while the buffer refills.
//!
//! ## Architecture
//!
//! ```text
//! PromptSelector → GenerationManager → PostProcessor → TempoAnalyzer
//!                   (DaemonGenerator)                       ↓
//!                                                      TrackBuffer
//!                                                           ↓
//!                               listeners ← /ws ← Dispatcher ← pop
//!                               listeners ← /tracks/<file> (static)
//! ```
//!
//! ## Modules
//!
//! - [`prompt`] — base prompt catalog and musical key modifiers
//! - [`manager`] — resident generator behind a request channel
//! - [`generator`] — [`generator::MusicGenerator`] and the Unix-socket daemon client
//! - [`audio`] — WAV I/O, loudness/fade post-processing, tempo estimation
//! - [`buffer`] — bounded FIFO between producer and listeners
//! - [`producer`] — the endless production loop
//! - [`protocol`] / [`server`] — listener events and the HTTP front

pub mod audio;
pub mod buffer;
pub mod config;
pub mod generator;
pub mod manager;
pub mod producer;
pub mod prompt;
pub mod protocol;
pub mod server;
pub mod track;

mod error;

pub use error::{Error, Result};
