//! Loudness normalization and fades, applied to a WAV file in place.
//!
//! Level is measured as RMS against a full scale of 1.0, the same dBFS notion
//! broadcast tools use for quick gain matching. Fades are linear in
//! amplitude.

use std::path::Path;
use std::time::Duration;

use crate::audio::PcmAudio;
use crate::config::RadioConfig;
use crate::{Error, Result};

/// In-place audio transform run on every freshly generated file.
pub trait PostProcess: Send {
    fn process(&self, path: &Path) -> Result<()>;
}

/// Normalizes to a fixed dBFS target and fades both ends.
#[derive(Debug, Clone)]
pub struct PostProcessor {
    target_dbfs: f32,
    fade: Duration,
}

impl PostProcessor {
    pub fn new(target_dbfs: f32, fade: Duration) -> Self {
        Self { target_dbfs, fade }
    }

    pub fn from_config(config: &RadioConfig) -> Self {
        Self::new(config.target_dbfs, Duration::from_millis(config.fade_ms as u64))
    }

    /// Apply the full chain to in-memory audio.
    pub fn apply(&self, audio: &mut PcmAudio) {
        normalize_loudness(&mut audio.samples, self.target_dbfs);
        let fade_frames = (self.fade.as_secs_f64() * audio.sample_rate as f64).round() as usize;
        apply_fades(audio, fade_frames);
        for s in audio.samples.iter_mut() {
            *s = s.clamp(-1.0, 1.0);
        }
    }
}

impl PostProcess for PostProcessor {
    fn process(&self, path: &Path) -> Result<()> {
        let mut audio = PcmAudio::read(path)
            .map_err(|e| Error::PostProcess(format!("decode {}: {e}", path.display())))?;
        self.apply(&mut audio);
        audio
            .write(path)
            .map_err(|e| Error::PostProcess(format!("encode {}: {e}", path.display())))?;
        tracing::debug!(
            path = %path.display(),
            duration_s = audio.duration_s(),
            "post-processed"
        );
        Ok(())
    }
}

/// RMS level in dBFS; `-inf` for silence or empty input.
pub fn dbfs(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return f32::NEG_INFINITY;
    }
    let mean_square = samples.iter().map(|&s| (s as f64) * (s as f64)).sum::<f64>()
        / samples.len() as f64;
    if mean_square <= 0.0 {
        return f32::NEG_INFINITY;
    }
    (10.0 * mean_square.log10()) as f32
}

/// Scale samples so their RMS level lands on `target_dbfs`. Silence is left alone.
pub fn normalize_loudness(samples: &mut [f32], target_dbfs: f32) {
    let current = dbfs(samples);
    if !current.is_finite() {
        return;
    }
    let gain = 10f32.powf((target_dbfs - current) / 20.0);
    for s in samples.iter_mut() {
        *s *= gain;
    }
}

/// Linear fade-in over the first `fade_frames` frames and fade-out over the
/// last, clamped to the clip length.
pub fn apply_fades(audio: &mut PcmAudio, fade_frames: usize) {
    let channels = audio.channels.max(1) as usize;
    let frames = audio.frames();
    let fade_frames = fade_frames.min(frames);
    if fade_frames == 0 {
        return;
    }

    for i in 0..fade_frames {
        let gain = i as f32 / fade_frames as f32;
        let head = i * channels;
        let tail = (frames - 1 - i) * channels;
        for ch in 0..channels {
            audio.samples[head + ch] *= gain;
            audio.samples[tail + ch] *= gain;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant(level: f32, seconds: f32, sample_rate: u32, channels: u16) -> PcmAudio {
        let frames = (seconds * sample_rate as f32) as usize;
        PcmAudio {
            samples: vec![level; frames * channels as usize],
            sample_rate,
            channels,
        }
    }

    #[test]
    fn test_dbfs_of_full_scale_and_silence() {
        assert!(dbfs(&[1.0, -1.0]).abs() < 1e-6);
        assert!((dbfs(&[0.1; 64]) + 20.0).abs() < 1e-4);
        assert_eq!(dbfs(&[0.0; 8]), f32::NEG_INFINITY);
        assert_eq!(dbfs(&[]), f32::NEG_INFINITY);
    }

    #[test]
    fn test_normalize_hits_target() {
        let mut samples: Vec<f32> = (0..4800)
            .map(|i| 0.05 * (i as f32 * 0.05).sin())
            .collect();
        normalize_loudness(&mut samples, -14.0);
        assert!((dbfs(&samples) + 14.0).abs() < 0.01);
    }

    #[test]
    fn test_normalize_leaves_silence() {
        let mut samples = vec![0.0f32; 100];
        normalize_loudness(&mut samples, -14.0);
        assert!(samples.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_fades_zero_both_ends_stereo() {
        let mut audio = constant(0.5, 1.0, 100, 2);
        apply_fades(&mut audio, 20);
        assert_eq!(&audio.samples[..2], &[0.0, 0.0]);
        let n = audio.samples.len();
        assert_eq!(&audio.samples[n - 2..], &[0.0, 0.0]);
        // Half-way through the fade-in.
        assert!((audio.samples[10 * 2] - 0.25).abs() < 1e-6);
        // Untouched middle.
        assert!((audio.samples[50 * 2] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_fade_longer_than_clip_is_clamped() {
        let mut audio = constant(0.5, 0.5, 100, 1);
        apply_fades(&mut audio, 1000);
        assert_eq!(audio.samples[0], 0.0);
        assert_eq!(audio.samples[49], 0.0);
        assert!(audio.samples.iter().all(|s| (0.0..=0.5).contains(s)));
    }

    #[test]
    fn test_process_rewrites_file_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw.wav");
        constant(0.1, 3.0, 1000, 1).write(&path).unwrap();

        let processor = PostProcessor::new(-14.0, Duration::from_millis(1000));
        processor.process(&path).unwrap();

        let out = PcmAudio::read(&path).unwrap();
        assert_eq!(out.sample_rate, 1000);
        assert_eq!(out.frames(), 3000);
        assert_eq!(out.samples[0], 0.0);
        assert_eq!(out.samples[2999], 0.0);
        let expected = 10f32.powf(-14.0 / 20.0);
        assert!((out.samples[1500] - expected).abs() < 1e-4);
    }

    #[test]
    fn test_process_garbage_is_post_process_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.wav");
        std::fs::write(&path, b"nope").unwrap();
        let processor = PostProcessor::new(-14.0, Duration::from_secs(2));
        assert!(matches!(processor.process(&path), Err(Error::PostProcess(_))));
    }
}
