//! Generation manager — keeps the generator resident and serializes requests.
//!
//! The manager owns one [`MusicGenerator`] on a dedicated blocking thread.
//! Callers submit prompts through a cloneable handle; requests are processed
//! one at a time in arrival order. Loading happens once, up front, and a load
//! failure is returned from [`GenerationManager::start`] so the daemon can
//! exit instead of running without a model.
//!
//! # Example
//!
//! ```no_run
//! use melody_radio::config::RadioConfig;
//! use melody_radio::generator::DaemonGenerator;
//! use melody_radio::manager::GenerationManager;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = RadioConfig::default();
//!     let daemon = config.daemon.clone();
//!     let manager = GenerationManager::start(move || DaemonGenerator::connect(&daemon, 30.0))
//!         .await
//!         .unwrap();
//!     let audio = manager.generate("ambient piano").await.unwrap();
//! }
//! ```

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use tokio::sync::{mpsc, oneshot};

use crate::audio::PcmAudio;
use crate::generator::MusicGenerator;
use crate::{Error, Result};

/// A submitted generation request.
struct PendingRequest {
    prompt: String,
    reply: oneshot::Sender<Result<PcmAudio>>,
}

/// Handle for submitting prompts to a running manager.
#[derive(Clone)]
pub struct GenerationManager {
    tx: mpsc::Sender<PendingRequest>,
}

impl GenerationManager {
    /// Load the generator with `load` and start the worker thread.
    ///
    /// `load` runs on a blocking thread; its error is fatal for the caller.
    pub async fn start<G, F>(load: F) -> Result<Self>
    where
        G: MusicGenerator,
        F: FnOnce() -> Result<G> + Send + 'static,
    {
        let generator = tokio::task::spawn_blocking(move || {
            tracing::info!("loading generator");
            load()
        })
        .await
        .map_err(|join_error| Error::Manager(format!("generator load task panicked: {join_error}")))?
        .map_err(|e| Error::Manager(format!("generator load failed: {e}")))?;

        let (tx, rx) = mpsc::channel::<PendingRequest>(16);

        tokio::task::spawn_blocking(move || run_manager(generator, rx));

        Ok(Self { tx })
    }

    /// Submit a prompt and wait for the waveform.
    pub async fn generate(&self, prompt: &str) -> Result<PcmAudio> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(PendingRequest {
                prompt: prompt.to_string(),
                reply: reply_tx,
            })
            .await
            .map_err(|_| Error::Manager("manager has shut down".into()))?;

        reply_rx
            .await
            .map_err(|_| Error::Manager("manager dropped reply channel".into()))?
    }

    /// Blocking variant of [`generate`](Self::generate) for plain threads.
    ///
    /// Panics if called from inside an async context.
    pub fn generate_blocking(&self, prompt: &str) -> Result<PcmAudio> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .blocking_send(PendingRequest {
                prompt: prompt.to_string(),
                reply: reply_tx,
            })
            .map_err(|_| Error::Manager("manager has shut down".into()))?;

        reply_rx
            .blocking_recv()
            .map_err(|_| Error::Manager("manager dropped reply channel".into()))?
    }
}

/// The manager loop. Runs on a dedicated blocking thread until every handle
/// is dropped.
fn run_manager<G: MusicGenerator>(mut generator: G, mut rx: mpsc::Receiver<PendingRequest>) {
    while let Some(request) = rx.blocking_recv() {
        let started = Instant::now();
        let result = panic::catch_unwind(AssertUnwindSafe(|| generator.generate(&request.prompt)))
            .unwrap_or_else(|payload| {
                Err(Error::Generation(format!(
                    "generator panicked: {}",
                    panic_message(payload.as_ref())
                )))
            });
        match &result {
            Ok(audio) => tracing::info!(
                elapsed_s = started.elapsed().as_secs_f64(),
                duration_s = audio.duration_s(),
                "generation finished"
            ),
            Err(error) => tracing::warn!(%error, "generation failed"),
        }
        // Caller may have gone away.
        let _ = request.reply.send(result);
    }
    tracing::info!("generation manager shut down");
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Echoes the prompt length as the number of frames.
    struct CountingGenerator;

    impl MusicGenerator for CountingGenerator {
        fn generate(&mut self, prompt: &str) -> Result<PcmAudio> {
            if prompt == "fail" {
                return Err(Error::Generation("asked to fail".into()));
            }
            if prompt == "panic" {
                panic!("tensor shape mismatch");
            }
            Ok(PcmAudio {
                samples: vec![0.0; prompt.len()],
                sample_rate: 1000,
                channels: 1,
            })
        }
    }

    #[tokio::test]
    async fn test_generate_round_trip() {
        let manager = GenerationManager::start(|| Ok(CountingGenerator)).await.unwrap();
        let audio = manager.generate("abcd").await.unwrap();
        assert_eq!(audio.frames(), 4);
    }

    #[tokio::test]
    async fn test_generator_error_reaches_caller_and_worker_survives() {
        let manager = GenerationManager::start(|| Ok(CountingGenerator)).await.unwrap();
        assert!(matches!(
            manager.generate("fail").await,
            Err(Error::Generation(_))
        ));
        assert_eq!(manager.generate("ok").await.unwrap().frames(), 2);
    }

    #[tokio::test]
    async fn test_generator_panic_becomes_error_and_worker_survives() {
        let manager = GenerationManager::start(|| Ok(CountingGenerator)).await.unwrap();
        match manager.generate("panic").await {
            Err(Error::Generation(msg)) => assert!(msg.contains("tensor shape mismatch")),
            other => panic!("expected generation error, got {other:?}"),
        }
        assert_eq!(manager.generate("ok").await.unwrap().frames(), 2);
    }

    #[tokio::test]
    async fn test_load_failure_is_fatal() {
        let result = GenerationManager::start(|| -> Result<CountingGenerator> {
            Err(Error::Generation("model weights missing".into()))
        })
        .await;
        match result {
            Err(Error::Manager(msg)) => assert!(msg.contains("model weights missing")),
            _ => panic!("expected manager error"),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_generate_blocking_from_plain_thread() {
        let manager = GenerationManager::start(|| Ok(CountingGenerator)).await.unwrap();
        let frames = tokio::task::spawn_blocking(move || manager.generate_blocking("xyz"))
            .await
            .unwrap()
            .unwrap()
            .frames();
        assert_eq!(frames, 3);
    }
}
