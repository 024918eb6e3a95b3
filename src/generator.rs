//! The generative model, seen from the radio: `prompt → waveform`.
//!
//! [`MusicGenerator`] is the only thing the rest of the crate knows about the
//! model. [`DaemonGenerator`] implements it by delegating to a resident
//! ACE-Step generation daemon over its Unix socket:
//!
//! ```text
//! → {"caption": "...", "duration_s": 30.0, "output": "/spool/123-0.wav"}
//! ← {"ok": true, "path": "/spool/123-0.wav", "duration_s": 30.0, ...}
//! ← {"ok": false, "error": "generation failed: ..."}
//! ```
//!
//! One request per connection. The daemon writes the WAV; we read it back and
//! remove the spool file.

use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::audio::PcmAudio;
use crate::config::DaemonConfig;
use crate::{Error, Result};

/// Text-to-music collaborator. One prompt in, one waveform out.
pub trait MusicGenerator: Send + 'static {
    fn generate(&mut self, prompt: &str) -> Result<PcmAudio>;
}

#[derive(Debug, Serialize)]
struct DaemonRequest<'a> {
    caption: &'a str,
    duration_s: f64,
    output: String,
}

#[derive(Debug, Deserialize)]
struct DaemonResponse {
    ok: bool,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Client for the ACE-Step generation daemon.
#[derive(Debug)]
pub struct DaemonGenerator {
    socket: PathBuf,
    duration_s: f64,
    timeout: Option<Duration>,
    spool_dir: PathBuf,
    requests: u64,
}

impl DaemonGenerator {
    /// Probe the daemon socket and prepare the spool directory.
    ///
    /// Fails when the daemon is unreachable; the radio cannot run without it.
    pub fn connect(config: &DaemonConfig, duration_s: f64) -> Result<Self> {
        UnixStream::connect(&config.socket).map_err(|e| {
            Error::Generation(format!(
                "cannot reach generation daemon at {}: {e}",
                config.socket.display()
            ))
        })?;

        let spool_dir = match &config.spool_dir {
            Some(dir) => dir.clone(),
            None => dirs::data_local_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("melody-radio/spool"),
        };
        std::fs::create_dir_all(&spool_dir)?;

        tracing::info!(
            socket = %config.socket.display(),
            spool = %spool_dir.display(),
            "generation daemon reachable"
        );

        Ok(Self {
            socket: config.socket.clone(),
            duration_s,
            timeout: config.timeout_s.map(Duration::from_secs),
            spool_dir,
            requests: 0,
        })
    }

    fn next_spool_path(&mut self) -> PathBuf {
        let path = self
            .spool_dir
            .join(format!("{}-{}.wav", std::process::id(), self.requests));
        self.requests += 1;
        path
    }

    fn round_trip(&self, request: &DaemonRequest<'_>) -> Result<DaemonResponse> {
        let mut stream = UnixStream::connect(&self.socket)
            .map_err(|e| Error::Generation(format!("daemon connect: {e}")))?;
        stream.set_read_timeout(self.timeout)?;

        let mut line = serde_json::to_string(request)?;
        line.push('\n');
        stream.write_all(line.as_bytes())?;

        let mut reply = String::new();
        BufReader::new(stream).read_line(&mut reply)?;
        if reply.trim().is_empty() {
            return Err(Error::Generation(
                "daemon closed the connection without a response".into(),
            ));
        }
        serde_json::from_str(&reply)
            .map_err(|e| Error::Generation(format!("malformed daemon response: {e}")))
    }
}

impl MusicGenerator for DaemonGenerator {
    fn generate(&mut self, prompt: &str) -> Result<PcmAudio> {
        let output = self.next_spool_path();
        let request = DaemonRequest {
            caption: prompt,
            duration_s: self.duration_s,
            output: output.to_string_lossy().into_owned(),
        };

        // The daemon may have written part of the file before failing or timing out.
        let response = match self.round_trip(&request) {
            Ok(response) => response,
            Err(e) => {
                discard_spooled(&output);
                return Err(e);
            }
        };
        if !response.ok {
            discard_spooled(&output);
            return Err(Error::Generation(
                response
                    .error
                    .unwrap_or_else(|| "daemon reported failure".to_string()),
            ));
        }

        let path = response.path.map(PathBuf::from).unwrap_or_else(|| output.clone());
        let audio = read_spooled(&path);
        discard_spooled(&path);
        if path != output {
            discard_spooled(&output);
        }
        audio
    }
}

fn discard_spooled(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), "could not remove spool file: {e}"),
    }
}

fn read_spooled(path: &Path) -> Result<PcmAudio> {
    let audio = PcmAudio::read(path)
        .map_err(|e| Error::Generation(format!("unreadable daemon output: {e}")))?;
    if audio.samples.is_empty() {
        return Err(Error::Generation("daemon returned an empty waveform".into()));
    }
    Ok(audio)
}
