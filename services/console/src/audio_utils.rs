use base64::Engine;
use rubato::{FastFixedIn, PolynomialDegree, Resampler};

/// Rate the Live API expects microphone audio at.
pub const LIVE_API_INPUT_SAMPLE_RATE: f64 = 16000.0;
/// Rate the Live API speaks at unless configured otherwise.
pub const LIVE_API_OUTPUT_SAMPLE_RATE: f64 = 24000.0;
/// Input frames fed to the resampler per call.
pub const RESAMPLER_CHUNK_SIZE: usize = 1024;

/// Creates a resampler to convert between audio sample rates.
pub fn create_resampler(
    in_sampling_rate: f64,
    out_sampling_rate: f64,
    chunk_size: usize,
) -> anyhow::Result<FastFixedIn<f32>> {
    let resampler = FastFixedIn::<f32>::new(
        out_sampling_rate / in_sampling_rate,
        1.0,
        PolynomialDegree::Cubic,
        chunk_size,
        1,
    )?;
    Ok(resampler)
}

/// A mono resampler that accepts input of any length.
///
/// Samples are buffered until a full resampler chunk is available; the
/// remainder waits for the next call. When both rates match, input passes
/// straight through.
pub struct StreamResampler {
    inner: Option<FastFixedIn<f32>>,
    pending: Vec<f32>,
}

impl StreamResampler {
    pub fn new(in_rate: u32, out_rate: u32) -> anyhow::Result<Self> {
        let inner = if in_rate == out_rate {
            None
        } else {
            Some(create_resampler(
                in_rate as f64,
                out_rate as f64,
                RESAMPLER_CHUNK_SIZE,
            )?)
        };
        Ok(Self {
            inner,
            pending: Vec::new(),
        })
    }

    pub fn process(&mut self, samples: &[f32]) -> anyhow::Result<Vec<f32>> {
        let Some(resampler) = self.inner.as_mut() else {
            return Ok(samples.to_vec());
        };
        self.pending.extend_from_slice(samples);

        let mut out = Vec::new();
        while self.pending.len() >= RESAMPLER_CHUNK_SIZE {
            let chunk: Vec<f32> = self.pending.drain(..RESAMPLER_CHUNK_SIZE).collect();
            let mut resampled = resampler.process(&[chunk], None)?;
            out.append(&mut resampled[0]);
        }
        Ok(out)
    }

    /// Drops buffered input.
    pub fn reset(&mut self) {
        self.pending.clear();
        if let Some(resampler) = self.inner.as_mut() {
            resampler.reset();
        }
    }
}

/// Interprets little-endian PCM16 bytes as f32 samples between -1.0 and 1.0.
/// A trailing odd byte is ignored.
pub fn pcm16_bytes_to_f32(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(2)
        .map(|chunk| {
            let v = i16::from_le_bytes([chunk[0], chunk[1]]);
            (v as f32 / 32768.0).clamp(-1.0, 1.0)
        })
        .collect()
}

/// Encodes a slice of f32 samples into a base64 string (converting to i16 PCM first).
pub fn encode_f32_to_base64_i16(pcm32: &[f32]) -> String {
    let pcm16: Vec<u8> = convert_f32_to_i16(pcm32)
        .into_iter()
        .flat_map(i16::to_le_bytes)
        .collect();
    base64::engine::general_purpose::STANDARD.encode(&pcm16)
}

/// Converts a slice of f32 samples to a vector of i16 samples.
pub fn convert_f32_to_i16(pcm32: &[f32]) -> Vec<i16> {
    pcm32
        .iter()
        .map(|&sample| (sample * i16::MAX as f32).clamp(i16::MIN as f32, i16::MAX as f32) as i16)
        .collect()
}

/// Averages interleaved frames down to one channel.
pub fn downmix_to_mono(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Peak absolute amplitude, clamped to 0.0..=1.0.
pub fn peak_level(samples: &[f32]) -> f32 {
    samples
        .iter()
        .filter(|s| s.is_finite())
        .fold(0.0f32, |peak, s| peak.max(s.abs()))
        .min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_create_resampler() {
        assert!(create_resampler(48000.0, 16000.0, RESAMPLER_CHUNK_SIZE).is_ok());
        assert!(create_resampler(24000.0, 44100.0, RESAMPLER_CHUNK_SIZE).is_ok());
    }

    #[test]
    fn test_pcm16_bytes_to_f32() {
        // 16384 and -32768, little endian, plus a dangling byte.
        let samples = pcm16_bytes_to_f32(&[0x00, 0x40, 0x00, 0x80, 0x7f]);
        assert_eq!(samples.len(), 2);
        assert_abs_diff_eq!(samples[0], 0.5, epsilon = 0.0001);
        assert_abs_diff_eq!(samples[1], -1.0, epsilon = 0.0001);
        assert!(pcm16_bytes_to_f32(&[]).is_empty());
    }

    #[test]
    fn test_encode_f32_to_base64_i16() {
        let encoded = encode_f32_to_base64_i16(&[0.0, 1.0, -2.0]);
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .unwrap();
        assert_eq!(bytes, vec![0x00, 0x00, 0xff, 0x7f, 0x00, 0x80]);
    }

    #[test]
    fn test_convert_f32_to_i16_clamps() {
        let result = convert_f32_to_i16(&[1.0, -1.0, 2.0, -2.0]);
        assert_eq!(result, vec![i16::MAX, -32767, i16::MAX, i16::MIN]);
    }

    #[test]
    fn test_downmix_to_mono() {
        let mono = downmix_to_mono(&[0.2, 0.4, -1.0, 1.0], 2);
        assert_eq!(mono.len(), 2);
        assert_abs_diff_eq!(mono[0], 0.3, epsilon = 0.0001);
        assert_abs_diff_eq!(mono[1], 0.0, epsilon = 0.0001);
        assert_eq!(downmix_to_mono(&[0.5], 1), vec![0.5]);
    }

    #[test]
    fn test_peak_level() {
        assert_eq!(peak_level(&[]), 0.0);
        assert_abs_diff_eq!(peak_level(&[0.1, -0.6, 0.3]), 0.6, epsilon = 0.0001);
        assert_eq!(peak_level(&[3.0, f32::NAN]), 1.0);
    }

    #[test]
    fn test_stream_resampler_buffers_partial_chunks() {
        let mut resampler = StreamResampler::new(48000, 16000).unwrap();
        let out = resampler.process(&vec![0.0; RESAMPLER_CHUNK_SIZE / 2]).unwrap();
        assert!(out.is_empty());

        let out = resampler.process(&vec![0.0; RESAMPLER_CHUNK_SIZE]).unwrap();
        let expected = RESAMPLER_CHUNK_SIZE as f64 / 3.0;
        assert!((out.len() as f64 - expected).abs() < 16.0, "got {}", out.len());
    }

    #[test]
    fn test_stream_resampler_passthrough() {
        let mut resampler = StreamResampler::new(16000, 16000).unwrap();
        assert_eq!(resampler.process(&[0.25, -0.25]).unwrap(), vec![0.25, -0.25]);
    }
}
