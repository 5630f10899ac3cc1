use crate::error::{Error, Result};

/// Tunable parameters for the whole pipeline.
///
/// A `Config` is validated once at construction and treated as immutable
/// afterwards; processing never re-checks it. The same configuration must be
/// used for ingesting a track and for querying against it, otherwise the
/// hashes on the two sides will not line up.
#[derive(Debug, Clone)]
pub struct Config {
    /// Input PCM rate in Hz. The caller resamples to this before handing
    /// samples to the pipeline.
    pub sample_rate: u32,
    /// STFT window length in samples.
    pub window_size: u32,
    /// STFT hop in samples; `window_size - overlap`.
    pub hop_size: u32,
    /// Minimum spectrogram amplitude for a cell to qualify as a peak, in dB.
    /// Lower means more peaks, more hashes, more index bulk, higher recall.
    pub peak_threshold_db: f32,
    /// Target-zone size: the maximum number of pair partners per anchor and
    /// the maximum time distance (in bins) a partner may sit at.
    pub target_zone_size: u32,
    /// Minimum similarity score for the matcher to report a track.
    pub match_threshold: f32,
    /// Cap on the number of matches returned.
    pub max_results: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            sample_rate: 22_050,
            window_size: 1024,
            hop_size: 512,
            peak_threshold_db: -40.0,
            target_zone_size: 10,
            match_threshold: 0.10,
            max_results: 5,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(Error::ConfigInvalid("sample_rate must be non-zero".into()));
        }
        if self.window_size == 0 {
            return Err(Error::ConfigInvalid("window_size must be non-zero".into()));
        }
        if self.hop_size == 0 {
            return Err(Error::ConfigInvalid("hop_size must be non-zero".into()));
        }
        if self.hop_size >= self.window_size {
            return Err(Error::ConfigInvalid(format!(
                "hop_size ({}) must be smaller than window_size ({})",
                self.hop_size, self.window_size
            )));
        }
        if self.target_zone_size == 0 {
            return Err(Error::ConfigInvalid(
                "target_zone_size must be non-zero".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.match_threshold) {
            return Err(Error::ConfigInvalid(format!(
                "match_threshold ({}) must lie in [0, 1]",
                self.match_threshold
            )));
        }
        Ok(())
    }
}
