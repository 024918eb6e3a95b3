//! Finished, ready-to-serve tracks.

/// A generated, post-processed and analyzed track.
///
/// Immutable once built. The buffer owns it until one listener receives it;
/// after that only the file on disk remains.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    /// Unique id, `track_<unix millis>_<sequence>`.
    pub id: String,
    /// File name of the asset inside the output directory.
    pub file_name: String,
    /// Estimated tempo, ≥ 0 (0 when no pulse was found).
    pub bpm: f32,
    /// Full generation prompt, base description plus key modifier.
    pub prompt: String,
}

impl Track {
    /// Id for the `sequence`-th track produced at `unix_millis`.
    pub fn make_id(unix_millis: u128, sequence: u64) -> String {
        format!("track_{unix_millis}_{sequence:04}")
    }
}
