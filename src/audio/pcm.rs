// Resample, quantize, and dual-encode one capture tick's worth of audio.
//
// Everything leaving this stage is 16 kHz mono PCM16, regardless of the
// device-native rate feeding it.

use base64::Engine;

/// Rate every provider session is negotiated at.
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

/// Native rates within this distance of the target skip resampling.
pub const RESAMPLE_TOLERANCE_HZ: u32 = 100;

/// One tick's audio in both wire encodings: raw little-endian PCM16 for the
/// binary-frame path and the `{"audio_data": base64}` envelope for the
/// enveloped path.
#[derive(Debug, Clone)]
pub struct EncodedChunk {
    pub raw: Vec<u8>,
    pub envelope: String,
}

pub fn needs_resample(source_rate: u32, target_rate: u32) -> bool {
    source_rate.abs_diff(target_rate) > RESAMPLE_TOLERANCE_HZ
}

/// Linear-interpolation resampler.
///
/// For target index i the source position is `i * (source/target)`; the
/// output interpolates between the floor and ceil source samples by the
/// fractional weight. The boundary sample is used unchanged when no upper
/// neighbor exists. Identity when the rates already match.
pub fn resample_linear(input: &[f32], source_rate: u32, target_rate: u32) -> Vec<f32> {
    if source_rate == target_rate || input.is_empty() {
        return input.to_vec();
    }

    let ratio = source_rate as f64 / target_rate as f64;
    let out_len = (input.len() as f64 / ratio).round() as usize;
    let mut out = Vec::with_capacity(out_len);

    for i in 0..out_len {
        let src_pos = i as f64 * ratio;
        let index = src_pos.floor() as usize;
        let fraction = (src_pos - index as f64) as f32;

        match (input.get(index), input.get(index + 1)) {
            (Some(&lower), Some(&upper)) => {
                out.push(lower * (1.0 - fraction) + upper * fraction);
            }
            (Some(&lower), None) => out.push(lower),
            (None, _) => break,
        }
    }

    out
}

/// Convert float samples in [-1, 1] to 16-bit signed PCM.
///
/// Negative values scale by 32768 and non-negative by 32767, so -1.0 maps to
/// the full negative range and 1.0 to the full positive range. Out-of-range
/// input is clamped first.
pub fn quantize(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&sample| {
            let clamped = sample.clamp(-1.0, 1.0);
            if clamped < 0.0 {
                (clamped * 32768.0).round() as i16
            } else {
                (clamped * 32767.0).round() as i16
            }
        })
        .collect()
}

/// PCM16 samples as little-endian bytes.
pub fn pcm_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Resample (when the native rate is off-target), quantize, and produce both
/// wire encodings for one capture tick.
///
/// Must stay well inside one tick duration (buffer length / native rate);
/// that deadline is soft, but missing it starves the upstream legs.
pub fn encode_chunk(samples: &[f32], source_rate: u32, target_rate: u32) -> EncodedChunk {
    let resampled;
    let samples = if needs_resample(source_rate, target_rate) {
        resampled = resample_linear(samples, source_rate, target_rate);
        &resampled[..]
    } else {
        samples
    };

    let raw = pcm_bytes(&quantize(samples));
    let encoded = base64::engine::general_purpose::STANDARD.encode(&raw);
    let envelope = serde_json::json!({ "audio_data": encoded }).to_string();

    EncodedChunk { raw, envelope }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resample_is_identity_at_equal_rates() {
        let input = vec![0.5, -0.25, 0.75, 0.0, -1.0];
        let output = resample_linear(&input, 16000, 16000);
        assert_eq!(output, input);
    }

    #[test]
    fn resample_halves_length_at_double_rate() {
        let input: Vec<f32> = (0..8).map(|i| i as f32).collect();
        let output = resample_linear(&input, 32000, 16000);

        assert_eq!(output.len(), 4);
        // Integer source positions: no interpolation error.
        assert_eq!(output, vec![0.0, 2.0, 4.0, 6.0]);
    }

    #[test]
    fn resample_interpolates_between_neighbors() {
        // Ratio 1.5: target index 1 sits at source position 1.5.
        let input = vec![0.0, 1.0, 2.0];
        let output = resample_linear(&input, 48000, 32000);

        assert_eq!(output.len(), 2);
        assert!((output[1] - 1.5).abs() < 1e-6);
    }

    #[test]
    fn resample_uses_boundary_sample_without_upper_neighbor() {
        let input = vec![0.0, 1.0, 2.0, 3.0];
        let output = resample_linear(&input, 24000, 16000);

        // Last target index lands past the final pair; the boundary sample
        // is carried through unchanged.
        assert!((output.last().copied().unwrap() - 3.0).abs() < 1e-6);
    }

    #[test]
    fn quantize_maps_full_scale() {
        let output = quantize(&[1.0, -1.0, 0.0]);
        assert_eq!(output, vec![32767, -32768, 0]);
    }

    #[test]
    fn quantize_clamps_out_of_range_input() {
        let output = quantize(&[1.5, -2.0]);
        assert_eq!(output, vec![32767, -32768]);
    }

    #[test]
    fn quantize_rounds_to_nearest() {
        // 0.5 * 32767 = 16383.5 rounds up; -0.5 * 32768 is exact.
        let output = quantize(&[0.5, -0.5]);
        assert_eq!(output, vec![16384, -16384]);
    }

    #[test]
    fn pcm_bytes_are_little_endian() {
        let bytes = pcm_bytes(&[0x0102, -2]);
        assert_eq!(bytes, vec![0x02, 0x01, 0xFE, 0xFF]);
    }

    #[test]
    fn encode_chunk_produces_both_encodings() {
        let chunk = encode_chunk(&[0.0, 1.0], 16000, 16000);

        assert_eq!(chunk.raw, vec![0x00, 0x00, 0xFF, 0x7F]);

        let value: serde_json::Value = serde_json::from_str(&chunk.envelope).unwrap();
        let b64 = value["audio_data"].as_str().unwrap();
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(b64)
            .unwrap();
        assert_eq!(decoded, chunk.raw);
    }

    #[test]
    fn encode_chunk_skips_resample_within_tolerance() {
        // 16050 Hz is within the 100 Hz tolerance: same sample count out.
        let samples = vec![0.1f32; 300];
        let chunk = encode_chunk(&samples, 16050, 16000);
        assert_eq!(chunk.raw.len(), 600);
    }

    #[test]
    fn encode_chunk_resamples_off_target_rates() {
        let samples = vec![0.1f32; 480];
        let chunk = encode_chunk(&samples, 48000, 16000);
        // 480 samples at 48 kHz become 160 at 16 kHz, two bytes each.
        assert_eq!(chunk.raw.len(), 320);
    }
}
