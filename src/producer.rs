//! The track producer: an endless generate → post-process → analyze loop.
//!
//! Runs on its own OS thread because every stage is blocking work. The only
//! thing that slows it down is a full [`TrackBuffer`]; the only thing that
//! stops it is the stop flag or the generation manager going away. Any other
//! failure costs one iteration and a backoff.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::audio::{EstimateTempo, PcmAudio, PostProcess, PostProcessor, TempoAnalyzer};
use crate::buffer::TrackBuffer;
use crate::config::RadioConfig;
use crate::manager::GenerationManager;
use crate::prompt::PromptSelector;
use crate::track::Track;
use crate::{Error, Result};

/// Outcome of one successful producer iteration.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// A new track was pushed; carries its id.
    Produced(String),
    /// Buffer at capacity; nothing was generated.
    BufferFull,
}

pub struct Producer {
    manager: GenerationManager,
    buffer: Arc<TrackBuffer>,
    selector: PromptSelector,
    post_processor: Box<dyn PostProcess>,
    tempo: Box<dyn EstimateTempo>,
    rng: ChaCha8Rng,
    output_dir: PathBuf,
    backoff: Duration,
    sequence: u64,
    stop: Arc<AtomicBool>,
}

impl Producer {
    /// Producer with the stock prompt catalog, post-processor and tempo analyzer.
    pub fn new(manager: GenerationManager, buffer: Arc<TrackBuffer>, config: &RadioConfig) -> Self {
        Self {
            manager,
            buffer,
            selector: PromptSelector::default(),
            post_processor: Box::new(PostProcessor::from_config(config)),
            tempo: Box::new(TempoAnalyzer::default()),
            rng: ChaCha8Rng::from_entropy(),
            output_dir: config.output_dir.clone(),
            backoff: config.backoff(),
            sequence: 0,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_selector(mut self, selector: PromptSelector) -> Self {
        self.selector = selector;
        self
    }

    pub fn with_post_processor(mut self, post_processor: Box<dyn PostProcess>) -> Self {
        self.post_processor = post_processor;
        self
    }

    pub fn with_tempo_estimator(mut self, tempo: Box<dyn EstimateTempo>) -> Self {
        self.tempo = tempo;
        self
    }

    /// Deterministic prompts.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        self
    }

    /// Flag that ends [`run`](Self::run) after the current iteration.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// One iteration. Failed iterations leave no file and no track behind.
    pub fn step(&mut self) -> Result<Step> {
        if self.buffer.is_full() {
            return Ok(Step::BufferFull);
        }

        let prompt = self.selector.select(&mut self.rng);
        tracing::info!(prompt = %prompt, "generating");
        let audio = self.manager.generate_blocking(&prompt)?;

        let id = Track::make_id(unix_millis(), self.sequence);
        self.sequence += 1;
        let file_name = format!("{id}.wav");
        let path = self.output_dir.join(&file_name);

        let bpm = match self.finish(&audio, &path) {
            Ok(bpm) => bpm,
            Err(e) => {
                if path.exists() {
                    if let Err(rm) = std::fs::remove_file(&path) {
                        tracing::warn!(path = %path.display(), "could not discard failed asset: {rm}");
                    }
                }
                return Err(e);
            }
        };

        tracing::info!(id = %id, bpm, "track ready");
        self.buffer.push(Track {
            id: id.clone(),
            file_name,
            bpm,
            prompt,
        });
        Ok(Step::Produced(id))
    }

    /// Persist, post-process and analyze one waveform; returns the BPM.
    fn finish(&self, audio: &PcmAudio, path: &Path) -> Result<f32> {
        if audio.samples.is_empty() {
            return Err(Error::Generation("generator returned an empty waveform".into()));
        }
        audio.write(path)?;
        self.post_processor.process(path)?;
        let bpm = self.tempo.estimate(path)?;
        if !bpm.is_finite() || bpm < 0.0 {
            return Err(Error::Analysis(format!("invalid tempo estimate {bpm}")));
        }
        Ok(bpm)
    }

    /// Loop until stopped. Never returns on an ordinary failure.
    pub fn run(mut self) {
        tracing::info!(
            capacity = self.buffer.capacity(),
            output = %self.output_dir.display(),
            "producer started"
        );
        while !self.stop.load(Ordering::Relaxed) {
            match self.step() {
                Ok(Step::Produced(_)) => {}
                Ok(Step::BufferFull) => thread::sleep(self.backoff),
                Err(Error::Manager(e)) => {
                    tracing::error!("generation manager unavailable, producer stopping: {e}");
                    return;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "iteration failed, retrying");
                    thread::sleep(self.backoff);
                }
            }
        }
        tracing::info!("producer stopped");
    }

    /// Run on a dedicated, named thread.
    pub fn spawn(self) -> std::io::Result<thread::JoinHandle<()>> {
        thread::Builder::new()
            .name("track-producer".into())
            .spawn(move || self.run())
    }
}

fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}
