//! Per-transfer metadata exchanged with the synchronous transfer engine.
//!
//! The bit assignments match libbladeRF's `BLADERF_META_*` definitions.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Metadata flag bits (`bladerf_metadata.flags`).
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MetaFlags(u32);

impl MetaFlags {
    /// Mark the associated buffer as the start of a burst transmission.
    pub const TX_BURST_START: Self = Self(1 << 0);
    /// Mark the associated buffer as the end of a burst transmission.
    pub const TX_BURST_END: Self = Self(1 << 1);
    /// Transmit immediately, ignoring the timestamp field.
    pub const TX_NOW: Self = Self(1 << 2);
    /// Use the timestamp field to insert zero padding within a burst.
    pub const TX_UPDATE_TIMESTAMP: Self = Self(1 << 3);
    /// Hardware flagged an underflow on the RX path.
    pub const RX_HW_UNDERFLOW: Self = Self(1 << 0);
    /// Expansion board mini-exp pin 1 was high during the transfer.
    pub const RX_HW_MINIEXP1: Self = Self(1 << 16);
    /// Expansion board mini-exp pin 2 was high during the transfer.
    pub const RX_HW_MINIEXP2: Self = Self(1 << 17);
    /// Read samples as soon as possible, ignoring the timestamp field.
    pub const RX_NOW: Self = Self(1 << 31);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }
}

impl BitOr for MetaFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for MetaFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for MetaFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MetaFlags({:#010x})", self.0)
    }
}

/// Metadata status bits (`bladerf_metadata.status`).
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MetaStatus(u32);

impl MetaStatus {
    /// Samples were dropped on the RX path before being read.
    pub const OVERRUN: Self = Self(1 << 0);
    /// The TX path ran out of samples mid-burst.
    pub const UNDERRUN: Self = Self(1 << 1);
    /// Mini expansion GPIO 1, reported in the status word on the same bit
    /// as [`MetaFlags::RX_HW_MINIEXP1`].
    pub const HW_MINIEXP1: Self = Self(MetaFlags::RX_HW_MINIEXP1.bits());
    pub const HW_MINIEXP2: Self = Self(MetaFlags::RX_HW_MINIEXP2.bits());

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }
}

impl BitOr for MetaStatus {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Debug for MetaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MetaStatus({:#x})", self.0)
    }
}

/// Transfer metadata, filled in by the caller and updated by the driver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Metadata {
    /// Hardware tick at which the transfer starts.
    pub timestamp: u64,
    /// Directive flags.
    pub flags: MetaFlags,
    /// Status reported by the driver after the transfer.
    pub status: MetaStatus,
    /// Number of samples (summed over all channels) actually transferred.
    pub actual_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_composition() {
        let mut flags = MetaFlags::TX_BURST_START | MetaFlags::TX_NOW;
        assert!(flags.contains(MetaFlags::TX_NOW));
        assert!(!flags.contains(MetaFlags::TX_BURST_END));

        flags |= MetaFlags::TX_BURST_END;
        flags.remove(MetaFlags::TX_NOW);
        assert_eq!(
            flags,
            MetaFlags::TX_BURST_START | MetaFlags::TX_BURST_END
        );
    }

    #[test]
    fn test_rx_now_is_high_bit() {
        assert_eq!(MetaFlags::RX_NOW.bits(), 0x8000_0000);
        assert!(MetaFlags::empty().is_empty());
    }

    #[test]
    fn test_status_bits() {
        let status = MetaStatus::OVERRUN | MetaStatus::UNDERRUN;
        assert!(status.contains(MetaStatus::OVERRUN));
        assert_eq!(status.bits(), 0b11);
    }
}
