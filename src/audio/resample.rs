//! Conversion of raw capture chunks into Whisper input (16 kHz mono `f32`).

use crate::audio::capture::AudioChunk;

/// Sample rate Whisper expects.
pub const WHISPER_SAMPLE_RATE: u32 = 16_000;

/// Average interleaved channels down to one. `channels == 0` yields nothing.
///
/// ```rust
/// use kisan_mitra::audio::stereo_to_mono;
///
/// let mono = stereo_to_mono(&[1.0, 0.0, 0.25, 0.75], 2);
/// assert_eq!(mono, vec![0.5, 0.5]);
/// ```
pub fn stereo_to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    match channels as usize {
        0 => Vec::new(),
        1 => samples.to_vec(),
        n => samples
            .chunks_exact(n)
            .map(|frame| frame.iter().sum::<f32>() / n as f32)
            .collect(),
    }
}

/// Linear-interpolation resampler from `source_rate` to 16 kHz.
///
/// ```rust
/// use kisan_mitra::audio::resample_to_16k;
///
/// assert_eq!(resample_to_16k(&[0.5; 480], 48_000).len(), 160);
/// ```
pub fn resample_to_16k(samples: &[f32], source_rate: u32) -> Vec<f32> {
    if source_rate == WHISPER_SAMPLE_RATE || source_rate == 0 {
        return samples.to_vec();
    }
    let Some(&last) = samples.last() else {
        return Vec::new();
    };

    let step = source_rate as f64 / WHISPER_SAMPLE_RATE as f64;
    let out_len = (samples.len() as f64 / step).ceil() as usize;

    (0..out_len)
        .map(|i| {
            let pos = i as f64 * step;
            let idx = pos as usize;
            let frac = (pos - idx as f64) as f32;
            match (samples.get(idx), samples.get(idx + 1)) {
                (Some(&a), Some(&b)) => a + (b - a) * frac,
                (Some(&a), None) => a,
                _ => last,
            }
        })
        .collect()
}

/// Downmix then resample one capture chunk.
pub fn chunk_to_whisper(chunk: &AudioChunk) -> Vec<f32> {
    let mono = stereo_to_mono(&chunk.samples, chunk.channels);
    resample_to_16k(&mono, chunk.sample_rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mono_passthrough() {
        assert_eq!(stereo_to_mono(&[0.1, 0.2, 0.3], 1), vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn four_channels_average() {
        let out = stereo_to_mono(&[0.2, 0.4, 0.6, 0.8], 4);
        assert_eq!(out.len(), 1);
        assert!((out[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn zero_channels_is_empty() {
        assert!(stereo_to_mono(&[1.0, 2.0], 0).is_empty());
    }

    #[test]
    fn same_rate_is_untouched() {
        let input: Vec<f32> = (0..160).map(|i| i as f32 / 160.0).collect();
        assert_eq!(resample_to_16k(&input, 16_000), input);
    }

    #[test]
    fn common_device_rates_scale_length() {
        assert_eq!(resample_to_16k(&[0.0; 480], 48_000).len(), 160);
        assert_eq!(resample_to_16k(&[0.0; 80], 8_000).len(), 160);
        let n = resample_to_16k(&vec![0.0; 44_100], 44_100).len();
        assert!(n.abs_diff(16_000) <= 1, "got {n}");
    }

    #[test]
    fn constant_signal_keeps_amplitude() {
        for s in resample_to_16k(&[0.5; 441], 44_100) {
            assert!((s - 0.5).abs() < 1e-5);
        }
    }

    #[test]
    fn chunk_conversion_downmixes_and_resamples() {
        let chunk = AudioChunk {
            samples: vec![0.5; 960], // 10 ms stereo @ 48 kHz
            sample_rate: 48_000,
            channels: 2,
        };
        let out = chunk_to_whisper(&chunk);
        assert_eq!(out.len(), 160);
        assert!((out[0] - 0.5).abs() < 1e-6);
    }
}
