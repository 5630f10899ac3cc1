use std::path::Path;

use tracing::debug;

use crate::audio_loader;
use crate::config::Config;
use crate::database::{TrackInfo, TrackStore};
use crate::error::Result;
use crate::hashing::{self, Landmark};
use crate::matcher::{self, Match};
use crate::peaks;
use crate::spectrogram;

/// Facade tying the fingerprinting pipeline to a track store.
///
/// Holds the configuration for both sides of the pipeline, so ingest and
/// query are guaranteed to hash identically. The configuration is validated
/// here, once; the stages assume it is sound.
pub struct Recognizer {
    config: Config,
    store: TrackStore,
}

impl Recognizer {
    pub fn new(config: Config, store: TrackStore) -> Result<Self> {
        config.validate()?;
        Ok(Recognizer { config, store })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &TrackStore {
        &self.store
    }

    /// Run the front end: spectrogram, peak picking, landmark hashing.
    pub fn fingerprint(&self, samples: &[f32]) -> Result<Vec<Landmark>> {
        let spec = spectrogram::compute(samples, &self.config)?;
        let peaks = peaks::find_peaks(&spec, self.config.peak_threshold_db);
        let landmarks = hashing::landmarks(&peaks, self.config.target_zone_size);
        debug!(
            samples = samples.len(),
            peaks = peaks.len(),
            landmarks = landmarks.len(),
            "fingerprinted buffer"
        );
        Ok(landmarks)
    }

    /// Fingerprint a PCM buffer and add it to the library.
    ///
    /// Ingest is complete-or-discard: if fingerprinting fails nothing is
    /// stored, and the store writes catalogue row and postings atomically.
    pub fn enroll(&mut self, name: &str, artist: Option<&str>, samples: &[f32]) -> Result<u32> {
        let landmarks = self.fingerprint(samples)?;
        let duration_s = samples.len() as f32 / self.config.sample_rate as f32;
        self.store
            .enroll_track(name, artist, Some(duration_s), &landmarks)
    }

    /// Decode a file and enroll it; the title defaults to the file stem.
    pub fn enroll_file(
        &mut self,
        path: &Path,
        name: Option<&str>,
        artist: Option<&str>,
    ) -> Result<u32> {
        let samples = audio_loader::load_audio(path, self.config.sample_rate)?;
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("untitled");
        self.enroll(name.unwrap_or(stem), artist, &samples)
    }

    /// Fingerprint a query buffer and rank library tracks against it.
    pub fn identify(&self, samples: &[f32]) -> Result<Vec<Match>> {
        let landmarks = self.fingerprint(samples)?;
        matcher::match_landmarks(&landmarks, &self.store, &self.config)
    }

    pub fn identify_file(&self, path: &Path) -> Result<Vec<Match>> {
        let samples = audio_loader::load_audio(path, self.config.sample_rate)?;
        self.identify(&samples)
    }

    pub fn track(&self, track_id: u32) -> Result<Option<TrackInfo>> {
        self.store.track(track_id)
    }

    pub fn list_tracks(&self) -> Result<Vec<TrackInfo>> {
        self.store.list_tracks()
    }

    /// Convert a match offset (in hop bins) to seconds into the track.
    pub fn offset_seconds(&self, offset: i32) -> f32 {
        offset as f32 * self.config.hop_size as f32 / self.config.sample_rate as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn construction_validates_the_config() {
        let store = TrackStore::open_in_memory().unwrap();
        let bad = Config {
            target_zone_size: 0,
            ..Config::default()
        };
        assert!(matches!(
            Recognizer::new(bad, store),
            Err(Error::ConfigInvalid(_))
        ));
    }

    #[test]
    fn short_query_surfaces_input_too_short() {
        let store = TrackStore::open_in_memory().unwrap();
        let recognizer = Recognizer::new(Config::default(), store).unwrap();
        assert!(matches!(
            recognizer.identify(&[0.0; 100]),
            Err(Error::InputTooShort { .. })
        ));
        assert!(matches!(
            recognizer.identify(&[]),
            Err(Error::InputTooShort { got: 0, .. })
        ));
    }

    #[test]
    fn offset_seconds_uses_hop_over_rate() {
        let store = TrackStore::open_in_memory().unwrap();
        let recognizer = Recognizer::new(Config::default(), store).unwrap();
        let secs = recognizer.offset_seconds(129);
        assert!((secs - 129.0 * 512.0 / 22_050.0).abs() < 1e-4);
    }
}
