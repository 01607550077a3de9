//! Test helper utilities: synthetic host signals and engine fixtures
#![allow(dead_code)]

use std::f32::consts::PI;

use bladerf_stream::{StreamArgs, StreamEngine, StreamHandle};
use brf_sync::{Direction, SimTransceiver};
use num_complex::Complex;

/// Generate a complex tone
///
/// # Arguments
/// * `frequency` - Frequency in Hz (negative for a clockwise tone)
/// * `sample_rate` - Sample rate in Hz
/// * `num_samples` - Number of samples to generate
/// * `amplitude` - Peak amplitude, 1.0 being full scale
///
/// # Returns
/// Vector of CF32 host samples
pub fn generate_tone_cf32(
    frequency: f32,
    sample_rate: f32,
    num_samples: usize,
    amplitude: f32,
) -> Vec<Complex<f32>> {
    let angular_freq = 2.0 * PI * frequency / sample_rate;
    (0..num_samples)
        .map(|n| {
            let phase = angular_freq * n as f32;
            Complex::new(amplitude * phase.cos(), amplitude * phase.sin())
        })
        .collect()
}

/// Generate a complex tone as CS16 host samples (full scale 2048)
pub fn generate_tone_cs16(
    frequency: f32,
    sample_rate: f32,
    num_samples: usize,
    amplitude: f32,
) -> Vec<Complex<i16>> {
    generate_tone_cf32(frequency, sample_rate, num_samples, amplitude)
        .into_iter()
        .map(|c| Complex::new((c.re * 2048.0) as i16, (c.im * 2048.0) as i16))
        .collect()
}

/// Generate CS16 samples whose value encodes their index
///
/// Sample `n` is `(n, -n)` (wrapping at 2048), which makes misplaced or
/// reordered samples easy to spot.
pub fn generate_index_cs16(num_samples: usize, offset: i16) -> Vec<Complex<i16>> {
    (0..num_samples)
        .map(|n| {
            let v = ((n as i32 + offset as i32) % 2048) as i16;
            Complex::new(v, -v)
        })
        .collect()
}

/// Engine over a fresh simulator with one stream set up
pub fn engine_with_stream(
    direction: Direction,
    host_format: &str,
    channels: &[usize],
    args: &str,
) -> (StreamEngine<SimTransceiver>, StreamHandle) {
    let mut engine = StreamEngine::new(SimTransceiver::new());
    let args: StreamArgs = args.parse().unwrap();
    let handle = engine
        .setup_stream(direction, host_format, channels, &args)
        .expect("stream setup failed");
    (engine, handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_tone_cf32_length() {
        let samples = generate_tone_cf32(1000.0, 96000.0, 100, 0.5);
        assert_eq!(samples.len(), 100);
    }

    #[test]
    fn test_generate_tone_cf32_dc() {
        // 0 Hz is a constant (amplitude, 0)
        let samples = generate_tone_cf32(0.0, 96000.0, 10, 0.5);
        for s in samples {
            assert_eq!(s, Complex::new(0.5, 0.0));
        }
    }

    #[test]
    fn test_generate_tone_cs16_scale() {
        let samples = generate_tone_cs16(0.0, 96000.0, 4, 1.0);
        assert_eq!(samples[0], Complex::new(2048, 0));
    }

    #[test]
    fn test_generate_index_cs16() {
        let samples = generate_index_cs16(3, 10);
        assert_eq!(samples, [Complex::new(10, -10), Complex::new(11, -11), Complex::new(12, -12)]);
    }
}
