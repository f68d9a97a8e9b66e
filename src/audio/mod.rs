//! Raw audio as produced by the extraction step:
//! headerless, mono, 32-bit float, little-endian (FFmpeg's `f32le`).

use std::{path::Path, time::Instant};

use bytes::{Buf, Bytes};
use rayon::prelude::*;
use tracing::{trace, warn};

use crate::error::SyncError;


const BYTES_PER_SAMPLE: usize = std::mem::size_of::<f32>();

/// Samples are decoded in parallel, in blocks of this many samples.
const SAMPLES_PER_DECODE_BLOCK: usize = 16_384;


/// Mono audio samples at a known sample rate.
#[derive(Clone, PartialEq, Debug)]
pub struct RawAudio {
    pub samples: Vec<f32>,
    pub sample_rate_hz: u32,
}

impl RawAudio {
    pub fn new(samples: Vec<f32>, sample_rate_hz: u32) -> Self {
        Self {
            samples,
            sample_rate_hz,
        }
    }

    /// Load `f32le` samples from `input_file_path`.
    ///
    /// Trailing bytes that do not form a whole sample are dropped.
    /// An empty file yields no samples; deciding whether that is acceptable
    /// is up to the caller.
    pub fn load_from_file<P>(input_file_path: P, sample_rate_hz: u32) -> Result<Self, SyncError>
    where
        P: AsRef<Path>,
    {
        let input_file_path = input_file_path.as_ref();
        let time_before_file_read = Instant::now();


        let file_contents = {
            let bytes_vec =
                std::fs::read(input_file_path).map_err(|error| SyncError::AudioRead {
                    path: input_file_path.to_path_buf(),
                    source: error,
                })?;

            Bytes::from(bytes_vec)
        };

        trace!(
            "Reading {} took {} milliseconds.",
            input_file_path.display(),
            time_before_file_read.elapsed().as_secs_f64() * 1000f64
        );


        let trailing_byte_count = file_contents.len() % BYTES_PER_SAMPLE;
        if trailing_byte_count != 0 {
            warn!(
                "{} ends with {} stray byte(s) that do not form a whole sample, ignoring them.",
                input_file_path.display(),
                trailing_byte_count
            );
        }

        let time_before_decode = Instant::now();
        let samples = decode_f32le_samples(&file_contents[..file_contents.len() - trailing_byte_count]);

        trace!(
            "Decoding {} samples took {} milliseconds.",
            samples.len(),
            time_before_decode.elapsed().as_secs_f64() * 1000f64
        );


        Ok(Self::new(samples, sample_rate_hz))
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_seconds(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate_hz as f64
    }
}


/// Decodes whole little-endian `f32` samples; `raw` must be a multiple of four bytes long.
/// Blocks are decoded in parallel, the output keeps file order.
fn decode_f32le_samples(raw: &[u8]) -> Vec<f32> {
    debug_assert!(raw.len() % BYTES_PER_SAMPLE == 0);

    raw.par_chunks(SAMPLES_PER_DECODE_BLOCK * BYTES_PER_SAMPLE)
        .map(|mut block| {
            let mut decoded = Vec::with_capacity(block.len() / BYTES_PER_SAMPLE);

            while block.remaining() >= BYTES_PER_SAMPLE {
                decoded.push(block.get_f32_le());
            }

            decoded
        })
        .collect::<Vec<_>>()
        .concat()
}


#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::test_support::encode_f32le as encode;

    #[test]
    fn loads_samples_in_file_order() {
        let samples: Vec<f32> = (0..(SAMPLES_PER_DECODE_BLOCK * 3 + 17))
            .map(|index| (index as f32 * 0.01).sin())
            .collect();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&encode(&samples)).unwrap();

        let audio = RawAudio::load_from_file(file.path(), 8_000).unwrap();

        assert_eq!(audio.samples, samples);
        assert_eq!(audio.sample_rate_hz, 8_000);
    }

    #[test]
    fn stray_trailing_bytes_are_dropped() {
        let mut bytes = encode(&[1.0, -0.5]);
        bytes.extend_from_slice(&[0xAB, 0xCD]);

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&bytes).unwrap();

        let audio = RawAudio::load_from_file(file.path(), 40_000).unwrap();
        assert_eq!(audio.samples, vec![1.0, -0.5]);
    }

    #[test]
    fn empty_file_yields_no_samples() {
        let file = tempfile::NamedTempFile::new().unwrap();

        let audio = RawAudio::load_from_file(file.path(), 40_000).unwrap();
        assert!(audio.is_empty());
        assert_eq!(audio.duration_seconds(), 0.0);
    }

    #[test]
    fn missing_file_is_an_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let missing = temp_dir.path().join("missing.raw");

        let error = RawAudio::load_from_file(&missing, 40_000).unwrap_err();
        assert!(matches!(error, SyncError::AudioRead { path, .. } if path == missing));
    }

    #[test]
    fn duration_follows_sample_rate() {
        let audio = RawAudio::new(vec![0.0; 20_000], 40_000);
        assert_eq!(audio.len(), 20_000);
        assert_eq!(audio.duration_seconds(), 0.5);
    }
}
