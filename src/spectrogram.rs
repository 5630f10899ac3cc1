use std::f32::consts::PI;

use rustfft::FftPlanner;
use rustfft::num_complex::Complex;
use tracing::debug;

use crate::config::Config;
use crate::error::{Error, Result};

/// Floor added to the power spectrum before the dB conversion so that silent
/// cells map to a finite value (-100 dB) instead of -inf.
const DB_FLOOR: f32 = 1e-10;

/// Magnitude spectrogram in decibels, with axis metadata.
///
/// Storage is frame-major: `mag_db[t][f]` with `t` a time bin and `f` a
/// frequency bin. `freqs[f]` is in Hz, `times[t]` in seconds. The struct is
/// ephemeral; it lives only for the duration of one fingerprinting pass.
#[derive(Debug)]
pub struct Spectrogram {
    pub mag_db: Vec<Vec<f32>>,
    pub freqs: Vec<f32>,
    pub times: Vec<f32>,
}

impl Spectrogram {
    /// Number of time bins.
    pub fn frames(&self) -> usize {
        self.mag_db.len()
    }

    /// Number of frequency bins (`window_size / 2 + 1`).
    pub fn bins(&self) -> usize {
        self.freqs.len()
    }
}

// Periodic Hann: w[n] = 0.5 * (1 - cos(2*pi*n / W)). The periodic form keeps
// the 50%-overlap analysis COLA-exact.
fn hann_window(window_size: usize) -> Vec<f32> {
    (0..window_size)
        .map(|n| 0.5 * (1.0 - (2.0 * PI * n as f32 / window_size as f32).cos()))
        .collect()
}

/// Short-time Fourier transform of a mono PCM buffer.
///
/// Frames are `window_size` samples long, advanced by `hop_size`. Each frame
/// is Hann-windowed, transformed, reduced to its one-sided power spectrum and
/// converted to dB. Fails with [`Error::InputTooShort`] when the buffer does
/// not cover a single window.
pub fn compute(samples: &[f32], config: &Config) -> Result<Spectrogram> {
    let window_size = config.window_size as usize;
    let hop_size = config.hop_size as usize;

    if samples.len() < window_size {
        return Err(Error::InputTooShort {
            got: samples.len(),
            need: window_size,
        });
    }

    let num_frames = (samples.len() - window_size) / hop_size + 1;
    let num_bins = window_size / 2 + 1;

    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(window_size);
    let window = hann_window(window_size);

    let mut buffer: Vec<Complex<f32>> = vec![Complex::new(0.0, 0.0); window_size];
    let mut mag_db = Vec::with_capacity(num_frames);

    for frame in 0..num_frames {
        let start = frame * hop_size;
        let chunk = &samples[start..start + window_size];

        for (slot, (&sample, &w)) in buffer.iter_mut().zip(chunk.iter().zip(window.iter())) {
            *slot = Complex::new(sample * w, 0.0);
        }
        fft.process(&mut buffer);

        let row: Vec<f32> = buffer[..num_bins]
            .iter()
            .map(|c| 10.0 * (c.norm_sqr() + DB_FLOOR).log10())
            .collect();
        mag_db.push(row);
    }

    let sample_rate = config.sample_rate as f32;
    let freqs = (0..num_bins)
        .map(|f| f as f32 * sample_rate / window_size as f32)
        .collect();
    let times = (0..num_frames)
        .map(|t| (t * hop_size) as f32 / sample_rate)
        .collect();

    debug!(
        samples = samples.len(),
        frames = num_frames,
        bins = num_bins,
        "computed spectrogram"
    );

    Ok(Spectrogram {
        mag_db,
        freqs,
        times,
    })
}
