//! Per-stream conversion buffer

use brf_sync::SampleFormat;

use crate::convert::{self, HostSample};

/// Owned scratch space between host buffers and the driver.
///
/// Sized once at setup for `capacity` sample periods of every channel in
/// the stream; every transfer is clipped to `capacity`.
#[derive(Debug)]
pub struct ConvBuffer {
    bytes: Vec<u8>,
    format: SampleFormat,
    capacity: usize,
    channels: usize,
}

impl ConvBuffer {
    pub fn new(format: SampleFormat, capacity: usize, channels: usize) -> Self {
        Self {
            bytes: vec![0; format.bytes_for(capacity * channels)],
            format,
            capacity,
            channels,
        }
    }

    /// Sample periods per channel the buffer holds.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn format(&self) -> SampleFormat {
        self.format
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Decode the first `count` periods into `bufs` (one per channel).
    pub fn read_into<T: HostSample>(&self, bufs: &mut [&mut [T]], count: usize) {
        let count = count.min(self.capacity);
        convert::deinterleave(self.format, &self.bytes, bufs, count);
    }

    /// Encode `count` periods from `bufs` (one per channel).
    pub fn write_from<T: HostSample>(&mut self, bufs: &[&[T]], count: usize) {
        let count = count.min(self.capacity);
        convert::interleave(self.format, bufs, &mut self.bytes, count);
    }

    /// Zero the first `count` periods.
    pub fn clear(&mut self, count: usize) {
        let len = self.format.bytes_for(count.min(self.capacity) * self.channels);
        self.bytes[..len].fill(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex;

    #[test]
    fn test_sizing() {
        let buf = ConvBuffer::new(SampleFormat::Sc16Q11Meta, 4096, 2);
        assert_eq!(buf.as_bytes().len(), 4096 * 2 * 4);
        let buf = ConvBuffer::new(SampleFormat::Sc16Q11Packed, 1024, 1);
        assert_eq!(buf.as_bytes().len(), 1024 * 3);
    }

    #[test]
    fn test_write_then_read_cf32() {
        let mut buf = ConvBuffer::new(SampleFormat::Sc8Q7, 8, 1);
        let input: Vec<Complex<f32>> = (0..8)
            .map(|n| Complex::new(n as f32 / 8.0, -(n as f32) / 8.0))
            .collect();
        buf.write_from(&[&input], 8);

        let mut output = vec![Complex::<f32>::default(); 8];
        buf.read_into(&mut [&mut output], 8);
        assert_eq!(output, input);
    }

    #[test]
    fn test_count_is_clipped() {
        let mut buf = ConvBuffer::new(SampleFormat::Sc16Q11, 4, 1);
        let input = vec![Complex::new(1i16, 1); 4];
        buf.write_from(&[&input], 100);
        let mut output = vec![Complex::<i16>::default(); 6];
        buf.read_into(&mut [&mut output], 6);
        assert_eq!(&output[..4], &input[..]);
        assert_eq!(output[4], Complex::default());
    }

    #[test]
    fn test_clear() {
        let mut buf = ConvBuffer::new(SampleFormat::Sc16Q11, 4, 2);
        buf.as_bytes_mut().fill(0xff);
        buf.clear(1);
        assert!(buf.as_bytes()[..8].iter().all(|&b| b == 0));
        assert_eq!(buf.as_bytes()[8], 0xff);
    }
}
