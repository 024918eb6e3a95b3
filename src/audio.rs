//! Audio adapters around the generated waveform.
//!
//! - [`wav`] — interleaved PCM in memory and WAV file I/O
//! - [`post_process`] — loudness normalization and fades, in place
//! - [`tempo`] — BPM estimation from a finished file

pub mod post_process;
pub mod tempo;
pub mod wav;

pub use post_process::{PostProcess, PostProcessor};
pub use tempo::{EstimateTempo, TempoAnalyzer};
pub use wav::PcmAudio;
