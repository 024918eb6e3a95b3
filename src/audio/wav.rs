//! Interleaved PCM audio and WAV file I/O.

use std::path::Path;

use crate::{Error, Result};

/// Interleaved `f32` samples in [-1, 1] with their format.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl PcmAudio {
    /// Read a WAV file. Integer formats are scaled to [-1, 1].
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let reader = hound::WavReader::open(path)?;
        let spec = reader.spec();

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<std::result::Result<Vec<_>, _>>()?,
            hound::SampleFormat::Int => {
                let max_val = (1u64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / max_val))
                    .collect::<std::result::Result<Vec<_>, _>>()?
            }
        };

        Ok(Self {
            samples,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
        })
    }

    /// Write as 32-bit float WAV, replacing any existing file.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        if self.channels == 0 || self.sample_rate == 0 {
            return Err(Error::Audio(format!(
                "invalid format: {} Hz, {} channels",
                self.sample_rate, self.channels
            )));
        }
        let spec = hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(path, spec)?;
        for &s in &self.samples {
            writer.write_sample(s)?;
        }
        writer.finalize()?;
        Ok(())
    }

    /// Number of sample frames (one sample per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels as usize
        }
    }

    pub fn duration_s(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Average the channels of each frame.
    pub fn to_mono(&self) -> Vec<f32> {
        let channels = self.channels.max(1) as usize;
        if channels == 1 {
            return self.samples.clone();
        }
        self.samples
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_read_keeps_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.wav");
        let original = PcmAudio {
            samples: vec![0.0, 0.5, -0.5, 1.0, -1.0, 0.25],
            sample_rate: 32000,
            channels: 2,
        };
        original.write(&path).unwrap();
        let loaded = PcmAudio::read(&path).unwrap();
        assert_eq!(loaded.sample_rate, 32000);
        assert_eq!(loaded.channels, 2);
        assert_eq!(loaded.frames(), 3);
        for (a, b) in loaded.samples.iter().zip(original.samples.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_read_int16_is_scaled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("int.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        writer.write_sample(16384i16).unwrap();
        writer.write_sample(-32768i16).unwrap();
        writer.finalize().unwrap();

        let loaded = PcmAudio::read(&path).unwrap();
        assert!((loaded.samples[0] - 0.5).abs() < 1e-6);
        assert!((loaded.samples[1] + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_read_garbage_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.wav");
        std::fs::write(&path, b"definitely not a RIFF file").unwrap();
        assert!(matches!(PcmAudio::read(&path), Err(Error::Audio(_))));
    }

    #[test]
    fn test_to_mono_and_duration() {
        let audio = PcmAudio {
            samples: vec![1.0, 0.0, 0.5, 0.5],
            sample_rate: 2,
            channels: 2,
        };
        assert_eq!(audio.to_mono(), vec![0.5, 0.5]);
        assert!((audio.duration_s() - 1.0).abs() < 1e-9);
    }
}
