//! Tempo estimation from a finished audio file.
//!
//! Spectral-flux onset envelope (Hann-windowed STFT), then autocorrelation of
//! the mean-removed envelope over the lags that cover the BPM range. Each
//! local maximum becomes a candidate; the strongest wins.

use std::f32::consts::PI;
use std::path::Path;

use rustfft::FftPlanner;
use rustfft::num_complex::Complex;

use crate::audio::PcmAudio;
use crate::{Error, Result};

/// Scalar tempo estimate for a file on disk.
pub trait EstimateTempo: Send {
    /// BPM ≥ 0; 0 when no periodic pulse is found.
    fn estimate(&self, path: &Path) -> Result<f32>;
}

/// One tempo hypothesis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoCandidate {
    pub bpm: f32,
    /// Unnormalized autocorrelation at the candidate lag.
    pub score: f32,
}

/// Onset-autocorrelation BPM estimator.
#[derive(Debug, Clone)]
pub struct TempoAnalyzer {
    /// STFT window length in samples (power of two).
    pub window_size: usize,
    /// STFT hop in samples; sets the envelope rate.
    pub hop_size: usize,
    pub min_bpm: f32,
    pub max_bpm: f32,
}

impl Default for TempoAnalyzer {
    fn default() -> Self {
        Self {
            window_size: 1024,
            hop_size: 128,
            min_bpm: 60.0,
            max_bpm: 200.0,
        }
    }
}

impl TempoAnalyzer {
    /// Candidates ranked by score, strongest first. Empty for silence or
    /// clips too short to hold two beats at `min_bpm`.
    pub fn candidates(&self, audio: &PcmAudio) -> Vec<TempoCandidate> {
        if audio.sample_rate == 0 || audio.samples.is_empty() {
            return Vec::new();
        }
        let envelope = self.onset_envelope(&audio.to_mono());
        let env_rate = audio.sample_rate as f32 / self.hop_size as f32;

        let lag_min = ((60.0 * env_rate / self.max_bpm).ceil() as usize).max(2);
        let lag_max = (60.0 * env_rate / self.min_bpm).floor() as usize;
        if lag_max <= lag_min || envelope.len() <= lag_max + 1 {
            return Vec::new();
        }

        let mean = envelope.iter().sum::<f32>() / envelope.len() as f32;
        let centered: Vec<f32> = envelope.iter().map(|&e| e - mean).collect();
        let autocorr = |lag: usize| -> f32 {
            centered[..centered.len() - lag]
                .iter()
                .zip(&centered[lag..])
                .map(|(a, b)| a * b)
                .sum()
        };

        // scores[i] holds the autocorrelation at lag (lag_min - 1 + i).
        let scores: Vec<f32> = (lag_min - 1..=lag_max + 1).map(autocorr).collect();

        let mut candidates: Vec<TempoCandidate> = (1..scores.len() - 1)
            .filter(|&i| scores[i] > 0.0 && scores[i] > scores[i - 1] && scores[i] >= scores[i + 1])
            .map(|i| {
                let (left, mid, right) = (scores[i - 1], scores[i], scores[i + 1]);
                let curvature = left - 2.0 * mid + right;
                let offset = if curvature.abs() > f32::EPSILON {
                    (0.5 * (left - right) / curvature).clamp(-0.5, 0.5)
                } else {
                    0.0
                };
                let lag = (lag_min - 1 + i) as f32 + offset;
                TempoCandidate {
                    bpm: ((60.0 * env_rate / lag) * 100.0).round() / 100.0,
                    score: mid,
                }
            })
            .collect();

        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
        candidates
    }

    /// Half-wave-rectified spectral flux, one value per hop.
    pub fn onset_envelope(&self, mono: &[f32]) -> Vec<f32> {
        let n = self.window_size;
        let hop = self.hop_size.max(1);
        if mono.len() < n {
            return Vec::new();
        }

        let window: Vec<f32> = (0..n)
            .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / n as f32).cos()))
            .collect();
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(n);

        let bins = n / 2 + 1;
        let mut frame = vec![Complex::new(0.0f32, 0.0); n];
        let mut prev = vec![0.0f32; bins];
        let mut envelope = Vec::with_capacity((mono.len() - n) / hop + 1);

        let mut pos = 0;
        while pos + n <= mono.len() {
            for (k, slot) in frame.iter_mut().enumerate() {
                *slot = Complex::new(mono[pos + k] * window[k], 0.0);
            }
            fft.process(&mut frame);

            let mut flux = 0.0f32;
            for (bin, prev_mag) in prev.iter_mut().enumerate() {
                let mag = frame[bin].norm();
                flux += (mag - *prev_mag).max(0.0);
                *prev_mag = mag;
            }
            // The first frame has no predecessor.
            envelope.push(if pos == 0 { 0.0 } else { flux });
            pos += hop;
        }
        envelope
    }
}

impl EstimateTempo for TempoAnalyzer {
    fn estimate(&self, path: &Path) -> Result<f32> {
        let audio = PcmAudio::read(path)
            .map_err(|e| Error::Analysis(format!("decode {}: {e}", path.display())))?;
        let bpm = self
            .candidates(&audio)
            .first()
            .map(|c| c.bpm)
            .unwrap_or(0.0);
        tracing::debug!(path = %path.display(), bpm, "tempo estimated");
        Ok(bpm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Decaying 2 kHz blips every `period` samples.
    fn click_track(sample_rate: u32, period: usize, seconds: f32) -> PcmAudio {
        let len = (sample_rate as f32 * seconds) as usize;
        let mut samples = vec![0.0f32; len];
        let mut start = 0;
        while start < len {
            for i in 0..200.min(len - start) {
                let t = i as f32 / sample_rate as f32;
                samples[start + i] = 0.8 * (2.0 * PI * 2000.0 * t).sin() * (-(i as f32) / 40.0).exp();
            }
            start += period;
        }
        PcmAudio {
            samples,
            sample_rate,
            channels: 1,
        }
    }

    #[test]
    fn test_click_track_tempo() {
        // 86 hops of 128 samples at 22.05 kHz per beat: 120.19 BPM.
        let audio = click_track(22050, 86 * 128, 10.0);
        let analyzer = TempoAnalyzer::default();
        let candidates = analyzer.candidates(&audio);
        assert!(!candidates.is_empty());
        let bpm = candidates[0].bpm;
        assert!((bpm - 120.19).abs() < 1.0, "got {bpm}");
    }

    #[test]
    fn test_estimate_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clicks.wav");
        click_track(22050, 86 * 128, 10.0).write(&path).unwrap();
        let bpm = TempoAnalyzer::default().estimate(&path).unwrap();
        assert!((bpm - 120.19).abs() < 1.0, "got {bpm}");
    }

    #[test]
    fn test_silence_is_zero_bpm() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("silence.wav");
        PcmAudio {
            samples: vec![0.0; 22050 * 4],
            sample_rate: 22050,
            channels: 1,
        }
        .write(&path)
        .unwrap();
        assert_eq!(TempoAnalyzer::default().estimate(&path).unwrap(), 0.0);
    }

    #[test]
    fn test_too_short_has_no_candidates() {
        let audio = click_track(22050, 11008, 0.2);
        assert!(TempoAnalyzer::default().candidates(&audio).is_empty());
    }

    #[test]
    fn test_undecodable_file_is_analysis_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.wav");
        std::fs::write(&path, [0u8; 16]).unwrap();
        assert!(matches!(
            TempoAnalyzer::default().estimate(&path),
            Err(Error::Analysis(_))
        ));
    }
}
