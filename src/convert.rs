//! Conversion between wire samples and host samples
//!
//! Host samples are `Complex<f32>` (CF32, unit full scale) or
//! `Complex<i16>` (CS16, full scale 2048). Wire components come from
//! [`SampleFormat::read_iq`] at the wire's own full scale: 2048 for the
//! 16-bit and packed formats, 128 for the 8-bit ones.

use std::fmt;
use std::str::FromStr;

use brf_sync::SampleFormat;
use num_complex::Complex;

use crate::error::Error;

/// Full scale of CS16 host samples.
pub const HOST_CS16_FULL_SCALE: f64 = 2048.0;

/// Host-side sample representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostFormat {
    /// Complex 32-bit float
    Cf32,
    /// Complex signed 16-bit, Q11
    Cs16,
}

impl HostFormat {
    pub fn name(self) -> &'static str {
        match self {
            HostFormat::Cf32 => "CF32",
            HostFormat::Cs16 => "CS16",
        }
    }
}

impl fmt::Display for HostFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HostFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CF32" => Ok(HostFormat::Cf32),
            "CS16" => Ok(HostFormat::Cs16),
            _ => Err(Error::InvalidHostFormat(s.to_string())),
        }
    }
}

/// Host formats accepted by `setup_stream`, preferred first.
pub fn stream_formats() -> Vec<HostFormat> {
    vec![HostFormat::Cs16, HostFormat::Cf32]
}

/// The host format matching the hardware, with its full-scale value.
pub fn native_stream_format() -> (HostFormat, f64) {
    (HostFormat::Cs16, HOST_CS16_FULL_SCALE)
}

/// A sample type the engine can read into and write from.
pub trait HostSample: Copy + Default + Send + 'static {
    const FORMAT: HostFormat;

    /// Build a host sample from wire components of `format`.
    fn from_wire(i: i16, q: i16, format: SampleFormat) -> Self;

    /// Wire components of `format` for this sample, saturated to the wire range.
    fn to_wire(self, format: SampleFormat) -> (i16, i16);
}

fn saturate(v: f32, format: SampleFormat) -> i16 {
    let (lo, hi) = format.component_range();
    // `as` truncates toward zero
    v.clamp(lo as f32, hi as f32) as i16
}

impl HostSample for Complex<f32> {
    const FORMAT: HostFormat = HostFormat::Cf32;

    fn from_wire(i: i16, q: i16, format: SampleFormat) -> Self {
        let scale = format.full_scale();
        Complex::new(i as f32 / scale, q as f32 / scale)
    }

    fn to_wire(self, format: SampleFormat) -> (i16, i16) {
        let scale = format.full_scale();
        (
            saturate(self.re * scale, format),
            saturate(self.im * scale, format),
        )
    }
}

/// Ratio between the CS16 host scale and the wire scale of `format`.
fn cs16_ratio(format: SampleFormat) -> i16 {
    (HOST_CS16_FULL_SCALE / format.full_scale() as f64) as i16
}

impl HostSample for Complex<i16> {
    const FORMAT: HostFormat = HostFormat::Cs16;

    fn from_wire(i: i16, q: i16, format: SampleFormat) -> Self {
        let ratio = cs16_ratio(format);
        Complex::new(i.saturating_mul(ratio), q.saturating_mul(ratio))
    }

    fn to_wire(self, format: SampleFormat) -> (i16, i16) {
        let ratio = cs16_ratio(format);
        let (lo, hi) = format.component_range();
        (
            (self.re / ratio).clamp(lo, hi),
            (self.im / ratio).clamp(lo, hi),
        )
    }
}

/// Decode `count` sample periods from `wire` into one buffer per channel.
///
/// Wire samples are interleaved by channel, so with two channels sample `n`
/// of channel `c` sits at wire index `2n + c`.
pub fn deinterleave<T: HostSample>(
    format: SampleFormat,
    wire: &[u8],
    bufs: &mut [&mut [T]],
    count: usize,
) {
    let channels = bufs.len();
    for (ch, buf) in bufs.iter_mut().enumerate() {
        for (n, out) in buf[..count].iter_mut().enumerate() {
            let (i, q) = format.read_iq(wire, n * channels + ch);
            *out = T::from_wire(i, q, format);
        }
    }
}

/// Encode `count` sample periods from one buffer per channel into `wire`.
pub fn interleave<T: HostSample>(
    format: SampleFormat,
    bufs: &[&[T]],
    wire: &mut [u8],
    count: usize,
) {
    let channels = bufs.len();
    for (ch, buf) in bufs.iter().enumerate() {
        for (n, sample) in buf[..count].iter().enumerate() {
            let (i, q) = sample.to_wire(format);
            format.write_iq(wire, n * channels + ch, i, q);
        }
    }
}
