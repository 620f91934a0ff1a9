//! Channel downmixing and sample-rate conversion.
//!
//! Loopback devices deliver audio at their native configuration (commonly
//! 44.1/48 kHz, 2 channels) while the STT engine consumes **16 kHz mono
//! `f32`**.  The capture callback downmixes with [`downmix_mono`]; the
//! capture worker converts each dequeued chunk with [`resample`] so
//! segmentation and transcription both run at the target rate.

// ---------------------------------------------------------------------------
// downmix_mono
// ---------------------------------------------------------------------------

/// Mix interleaved multi-channel audio down to mono by averaging each frame.
///
/// The output length is `samples.len() / channels`.
///
/// * `channels == 1` returns the input as an owned `Vec` unchanged.
/// * `channels == 0` returns an empty vector.
///
/// # Example
///
/// ```rust
/// use audio_assistant::audio::downmix_mono;
///
/// let stereo = vec![0.8_f32, 0.2, -0.4, -0.6]; // L R L R
/// let mono = downmix_mono(&stereo, 2);
/// assert_eq!(mono.len(), 2);
/// assert!((mono[0] - 0.5).abs() < 1e-6);  // (0.8 + 0.2) / 2
/// assert!((mono[1] + 0.5).abs() < 1e-6);  // (-0.4 + -0.6) / 2
/// ```
pub fn downmix_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    match channels {
        0 => Vec::new(),
        1 => samples.to_vec(),
        n => {
            let n = n as usize;
            samples
                .chunks_exact(n)
                .map(|frame| frame.iter().sum::<f32>() / n as f32)
                .collect()
        }
    }
}

// ---------------------------------------------------------------------------
// resample
// ---------------------------------------------------------------------------

/// Resample mono audio from `from_rate` Hz to `to_rate` Hz using linear
/// interpolation.
///
/// * Equal rates return the input cloned, with no interpolation pass.
/// * An empty input returns an empty vector.
///
/// The output length is `ceil(samples.len() * to_rate / from_rate)`.
///
/// # Example
///
/// ```rust
/// use audio_assistant::audio::resample;
///
/// // 48 kHz → 16 kHz: a 10 ms block shrinks from 480 to 160 samples.
/// let block = vec![0.25_f32; 480];
/// let out = resample(&block, 48_000, 16_000);
/// assert_eq!(out.len(), 160);
/// ```
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate {
        return samples.to_vec();
    }

    if samples.is_empty() {
        return Vec::new();
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let output_len = (samples.len() as f64 * ratio).ceil() as usize;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let src_pos = i as f64 / ratio;
        let idx = src_pos as usize;
        let frac = src_pos - idx as f64;

        let sample = if idx + 1 < samples.len() {
            samples[idx] * (1.0 - frac as f32) + samples[idx + 1] * frac as f32
        } else if idx < samples.len() {
            samples[idx]
        } else {
            0.0
        };

        output.push(sample);
    }

    output
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
