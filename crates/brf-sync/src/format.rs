//! Wire sample formats and their byte layouts.
//!
//! Every format carries interleaved I/Q components. With two channels the
//! hardware interleaves whole samples, so a sample period reads
//! `I0 Q0 I1 Q1`. The codec here only deals with component layout; channel
//! interleaving is the caller's business.
//!
//! | format        | component | full scale | bytes/sample |
//! |---------------|-----------|------------|--------------|
//! | `sc16`        | i16 LE    | 2048 (Q11) | 4            |
//! | `sc8`         | i8        | 128 (Q7)   | 2            |
//! | `sc16_packed` | 12-bit    | 2048 (Q11) | 3            |
//!
//! The `_meta` variants share the layout of their base format.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Sample format used by the synchronous transfer engine (`bladerf_format`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SampleFormat {
    /// Signed complex 16-bit Q11.
    Sc16Q11,
    /// Signed complex 16-bit Q11 with per-transfer metadata.
    #[default]
    Sc16Q11Meta,
    /// Signed complex 8-bit Q7.
    Sc8Q7,
    /// Signed complex 8-bit Q7 with per-transfer metadata.
    Sc8Q7Meta,
    /// Signed complex 12-bit Q11, packed into 3 bytes per sample.
    Sc16Q11Packed,
}

impl SampleFormat {
    /// All formats, in the order they are advertised to callers.
    pub const ALL: [SampleFormat; 5] = [
        SampleFormat::Sc16Q11,
        SampleFormat::Sc16Q11Meta,
        SampleFormat::Sc8Q7,
        SampleFormat::Sc8Q7Meta,
        SampleFormat::Sc16Q11Packed,
    ];

    /// Short name used in stream arguments (e.g. `sc16_meta`).
    pub fn name(self) -> &'static str {
        match self {
            SampleFormat::Sc16Q11 => "sc16",
            SampleFormat::Sc16Q11Meta => "sc16_meta",
            SampleFormat::Sc8Q7 => "sc8",
            SampleFormat::Sc8Q7Meta => "sc8_meta",
            SampleFormat::Sc16Q11Packed => "sc16_packed",
        }
    }

    /// Human-readable description.
    pub fn display_name(self) -> &'static str {
        match self {
            SampleFormat::Sc16Q11 => "16-bit",
            SampleFormat::Sc16Q11Meta => "16-bit with Metadata",
            SampleFormat::Sc8Q7 => "8-bit",
            SampleFormat::Sc8Q7Meta => "8-bit with Metadata",
            SampleFormat::Sc16Q11Packed => "Packed 16-bit",
        }
    }

    /// Name as printed by libbladeRF's `bladerf_format_to_string`.
    pub fn driver_name(self) -> &'static str {
        match self {
            SampleFormat::Sc16Q11 => "SC16_Q11",
            SampleFormat::Sc16Q11Meta => "SC16_Q11_META",
            SampleFormat::Sc8Q7 => "SC8_Q7",
            SampleFormat::Sc8Q7Meta => "SC8_Q7_META",
            SampleFormat::Sc16Q11Packed => "SC16_Q11_PACKED",
        }
    }

    /// Whether transfers carry timestamps and burst metadata.
    pub fn has_meta(self) -> bool {
        matches!(self, SampleFormat::Sc16Q11Meta | SampleFormat::Sc8Q7Meta)
    }

    /// Whether components are 8-bit.
    pub fn is_8bit(self) -> bool {
        matches!(self, SampleFormat::Sc8Q7 | SampleFormat::Sc8Q7Meta)
    }

    /// Value of a full-scale component (`1.0` in floating point).
    pub fn full_scale(self) -> f32 {
        if self.is_8bit() {
            128.0
        } else {
            2048.0
        }
    }

    /// Inclusive component range representable on the wire.
    pub fn component_range(self) -> (i16, i16) {
        match self {
            SampleFormat::Sc16Q11 | SampleFormat::Sc16Q11Meta => (i16::MIN, i16::MAX),
            SampleFormat::Sc8Q7 | SampleFormat::Sc8Q7Meta => (i8::MIN as i16, i8::MAX as i16),
            SampleFormat::Sc16Q11Packed => (-2048, 2047),
        }
    }

    /// Bytes occupied by one complex sample of one channel.
    pub fn bytes_per_sample(self) -> usize {
        match self {
            SampleFormat::Sc16Q11 | SampleFormat::Sc16Q11Meta => 4,
            SampleFormat::Sc8Q7 | SampleFormat::Sc8Q7Meta => 2,
            SampleFormat::Sc16Q11Packed => 3,
        }
    }

    /// Bytes needed to hold `samples` complex samples.
    pub fn bytes_for(self, samples: usize) -> usize {
        samples * self.bytes_per_sample()
    }

    /// Decode the I/Q components of sample `index` from `bytes`.
    #[inline]
    pub fn read_iq(self, bytes: &[u8], index: usize) -> (i16, i16) {
        let off = index * self.bytes_per_sample();
        match self {
            SampleFormat::Sc16Q11 | SampleFormat::Sc16Q11Meta => (
                i16::from_le_bytes([bytes[off], bytes[off + 1]]),
                i16::from_le_bytes([bytes[off + 2], bytes[off + 3]]),
            ),
            SampleFormat::Sc8Q7 | SampleFormat::Sc8Q7Meta => {
                (bytes[off] as i8 as i16, bytes[off + 1] as i8 as i16)
            }
            SampleFormat::Sc16Q11Packed => {
                let b = &bytes[off..off + 3];
                let i = (b[0] as u16) | ((b[1] as u16 & 0x0f) << 8);
                let q = ((b[1] as u16) >> 4) | ((b[2] as u16) << 4);
                (sign_extend_12(i), sign_extend_12(q))
            }
        }
    }

    /// Encode the I/Q components of sample `index` into `bytes`.
    ///
    /// Components outside [`component_range`](Self::component_range) are
    /// saturated.
    #[inline]
    pub fn write_iq(self, bytes: &mut [u8], index: usize, i: i16, q: i16) {
        let (lo, hi) = self.component_range();
        let (i, q) = (i.clamp(lo, hi), q.clamp(lo, hi));
        let off = index * self.bytes_per_sample();
        match self {
            SampleFormat::Sc16Q11 | SampleFormat::Sc16Q11Meta => {
                bytes[off..off + 2].copy_from_slice(&i.to_le_bytes());
                bytes[off + 2..off + 4].copy_from_slice(&q.to_le_bytes());
            }
            SampleFormat::Sc8Q7 | SampleFormat::Sc8Q7Meta => {
                bytes[off] = i as i8 as u8;
                bytes[off + 1] = q as i8 as u8;
            }
            SampleFormat::Sc16Q11Packed => {
                let i = i as u16 & 0x0fff;
                let q = q as u16 & 0x0fff;
                bytes[off] = i as u8;
                bytes[off + 1] = ((i >> 8) as u8) | ((q as u8 & 0x0f) << 4);
                bytes[off + 2] = (q >> 4) as u8;
            }
        }
    }
}

#[inline]
fn sign_extend_12(v: u16) -> i16 {
    ((v << 4) as i16) >> 4
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SampleFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SampleFormat::ALL
            .into_iter()
            .find(|f| f.name() == s)
            .ok_or_else(|| Error::Invalid(format!("unknown sample format '{}'", s)))
    }
}
