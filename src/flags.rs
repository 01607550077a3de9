//! Caller-facing stream flags

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

/// Stream flags, bit-compatible with SoapySDR's `SOAPY_SDR_*` flags.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct StreamFlags(u32);

impl StreamFlags {
    /// Closes the transmit burst after this call
    pub const END_BURST: Self = Self(1 << 1);
    /// The accompanying time is valid
    pub const HAS_TIME: Self = Self(1 << 2);
    pub const END_ABRUPT: Self = Self(1 << 3);
    pub const ONE_PACKET: Self = Self(1 << 4);
    pub const MORE_FRAGMENTS: Self = Self(1 << 5);
    pub const WAIT_TRIGGER: Self = Self(1 << 6);
    /// Mirrors `RX_HW_MINIEXP1`
    pub const USER_FLAG0: Self = Self(1 << 16);
    /// Mirrors `RX_HW_MINIEXP2`
    pub const USER_FLAG1: Self = Self(1 << 17);

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

impl BitOr for StreamFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for StreamFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for StreamFlags {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl fmt::Debug for StreamFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(StreamFlags, &str); 8] = [
            (StreamFlags::END_BURST, "END_BURST"),
            (StreamFlags::HAS_TIME, "HAS_TIME"),
            (StreamFlags::END_ABRUPT, "END_ABRUPT"),
            (StreamFlags::ONE_PACKET, "ONE_PACKET"),
            (StreamFlags::MORE_FRAGMENTS, "MORE_FRAGMENTS"),
            (StreamFlags::WAIT_TRIGGER, "WAIT_TRIGGER"),
            (StreamFlags::USER_FLAG0, "USER_FLAG0"),
            (StreamFlags::USER_FLAG1, "USER_FLAG1"),
        ];

        if self.is_empty() {
            return write!(f, "StreamFlags(empty)");
        }
        let mut rest = self.0;
        let mut names = Vec::new();
        for (flag, name) in NAMES {
            if self.contains(flag) {
                names.push(name.to_string());
                rest &= !flag.0;
            }
        }
        if rest != 0 {
            names.push(format!("{:#x}", rest));
        }
        write!(f, "StreamFlags({})", names.join(" | "))
    }
}
