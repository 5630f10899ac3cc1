use std::fs::File;
use std::path::Path;

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use crate::error::{Error, Result};

const RESAMPLE_CHUNK: usize = 1024;

/// Decode an audio file to mono f32 PCM at `target_sample_rate`.
///
/// Any container and codec symphonia understands is accepted. Channels are
/// mixed down by averaging; material at a different native rate is resampled
/// with a windowed-sinc filter.
pub fn load_audio(path: &Path, target_sample_rate: u32) -> Result<Vec<f32>> {
    let (samples, native_rate) = decode_mono(path)?;
    debug!(
        path = %path.display(),
        native_rate,
        samples = samples.len(),
        "decoded audio"
    );

    if native_rate == target_sample_rate {
        return Ok(samples);
    }
    resample(&samples, native_rate, target_sample_rate, path)
}

fn decode_error(path: &Path, source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Error {
    Error::Decode {
        path: path.display().to_string(),
        source: source.into(),
    }
}

fn decode_mono(path: &Path) -> Result<(Vec<f32>, u32)> {
    let src = File::open(path).map_err(|e| decode_error(path, e))?;
    let mss = MediaSourceStream::new(Box::new(src), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|s| s.to_str()) {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| decode_error(path, e))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL && t.codec_params.sample_rate.is_some())
        .ok_or_else(|| decode_error(path, "no decodable audio track"))?;
    let track_id = track.id;
    let native_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| decode_error(path, "audio track reports no sample rate"))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| decode_error(path, e))?;

    let mut samples = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(decode_error(path, e)),
        };
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                let channels = spec.channels.count();
                if channels == 0 {
                    return Err(decode_error(path, "decoded packet reports zero channels"));
                }

                let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buffer.copy_interleaved_ref(decoded);
                for frame in buffer.samples().chunks_exact(channels) {
                    samples.push(frame.iter().sum::<f32>() / channels as f32);
                }
            }
            // A corrupt packet is recoverable; skip it and keep going.
            Err(SymphoniaError::DecodeError(e)) => {
                warn!(path = %path.display(), error = e, "skipping undecodable packet");
            }
            Err(e) => return Err(decode_error(path, e)),
        }
    }

    Ok((samples, native_rate))
}

fn resample(samples: &[f32], from_rate: u32, to_rate: u32, path: &Path) -> Result<Vec<f32>> {
    let ratio = f64::from(to_rate) / f64::from(from_rate);
    let params = SincInterpolationParameters {
        sinc_len: 128,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 128,
        window: WindowFunction::Blackman2,
    };
    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.1, params, RESAMPLE_CHUNK, 1)
        .map_err(|e| decode_error(path, e))?;

    let mut out = Vec::with_capacity((samples.len() as f64 * ratio) as usize + RESAMPLE_CHUNK);
    let mut pos = 0;
    while samples.len() - pos >= resampler.input_frames_next() {
        let take = resampler.input_frames_next();
        let chunk = [&samples[pos..pos + take]];
        let mut produced = resampler
            .process(&chunk, None)
            .map_err(|e| decode_error(path, e))?;
        out.append(&mut produced[0]);
        pos += take;
    }
    if pos < samples.len() {
        let tail = [&samples[pos..]];
        let mut produced = resampler
            .process_partial(Some(&tail), None)
            .map_err(|e| decode_error(path, e))?;
        out.append(&mut produced[0]);
    }
    // Drain what the filter delay is still holding back.
    let mut produced = resampler
        .process_partial(None::<&[&[f32]]>, None)
        .map_err(|e| decode_error(path, e))?;
    out.append(&mut produced[0]);

    debug!(from_rate, to_rate, resampled = out.len(), "resampled audio");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::f32::consts::PI;

    fn write_wav(path: &Path, rate: u32, channels: u16, secs: f32) {
        let spec = hound::WavSpec {
            channels,
            sample_rate: rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        let frames = (secs * rate as f32) as usize;
        for i in 0..frames {
            let sample = 0.5 * (2.0 * PI * 440.0 * i as f32 / rate as f32).sin();
            let quantized = (sample * i16::MAX as f32) as i16;
            for _ in 0..channels {
                writer.write_sample(quantized).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    fn dominant_bin(samples: &[f32]) -> usize {
        let spec = crate::spectrogram::compute(samples, &Config::default()).unwrap();
        let frame = &spec.mag_db[spec.frames() / 2];
        frame
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(f, _)| f)
            .unwrap()
    }

    #[test]
    fn loads_wav_at_native_rate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_wav(&path, 22_050, 1, 1.0);

        let samples = load_audio(&path, 22_050).unwrap();
        assert_eq!(samples.len(), 22_050);
        assert!((19..=21).contains(&dominant_bin(&samples)));
    }

    #[test]
    fn mixes_stereo_down_and_resamples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        write_wav(&path, 44_100, 2, 1.0);

        let samples = load_audio(&path, 22_050).unwrap();
        // Windowed-sinc edges trim a little; the length must still be close
        // to one second at the target rate.
        let expected = 22_050f32;
        assert!(
            (samples.len() as f32 - expected).abs() < expected * 0.05,
            "resampled to {} samples",
            samples.len()
        );
        assert!((19..=21).contains(&dominant_bin(&samples)));
    }

    #[test]
    fn missing_file_is_a_decode_error() {
        let err = load_audio(Path::new("/nonexistent/file.wav"), 22_050).unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }
}
