//! IP address classification
//!
//! Normalizes an address literal into the integer key both backends search
//! by. IPv6 addresses that carry an embedded IPv4 address are folded back
//! into the IPv4 space, in this priority:
//!
//! 1. IPv4-mapped (`::ffff:0:0/96`)
//! 2. 6to4 (`2002::/16`), the IPv4 address sits in bits 80..112
//! 3. Teredo (`2001:0000::/32`), the client address is stored complemented
//!
//! Everything else stays a 128-bit IPv6 key.

use crate::error::{GeoError, Result};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

const V4_MAPPED_FROM: u128 = 0xffff_0000_0000;
const V4_MAPPED_TO: u128 = 0xffff_ffff_ffff;
const SIX_TO_FOUR_FROM: u128 = 0x2002 << 112;
const SIX_TO_FOUR_TO: u128 = SIX_TO_FOUR_FROM | ((1u128 << 112) - 1);
const TEREDO_FROM: u128 = 0x2001_0000 << 96;
const TEREDO_TO: u128 = TEREDO_FROM | ((1u128 << 96) - 1);
const LOW_32_BITS: u128 = 0xffff_ffff;

/// Address family of a classified key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressFamily {
    /// 32-bit key
    V4,
    /// 128-bit key
    V6,
}

impl AddressFamily {
    /// Number of significant bits in a key of this family
    pub fn bit_len(self) -> u32 {
        match self {
            AddressFamily::V4 => 32,
            AddressFamily::V6 => 128,
        }
    }

    /// Largest representable key of this family
    pub fn max_value(self) -> u128 {
        match self {
            AddressFamily::V4 => u32::MAX as u128,
            AddressFamily::V6 => u128::MAX,
        }
    }

    /// Right shift that keeps the prefix used by range index tables
    fn index_shift(self) -> u32 {
        match self {
            AddressFamily::V4 => 16,
            AddressFamily::V6 => 112,
        }
    }
}

/// Normalized search key
///
/// `value` always fits in `family.bit_len()` bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AddressKey {
    /// Numeric value of the address
    pub value: u128,
    /// Which table or trie half to search
    pub family: AddressFamily,
}

impl AddressKey {
    /// Build an IPv4 key
    pub fn v4(value: u32) -> Self {
        Self {
            value: value as u128,
            family: AddressFamily::V4,
        }
    }

    /// Build an IPv6 key (no embedded-IPv4 folding)
    pub fn v6(value: u128) -> Self {
        Self {
            value,
            family: AddressFamily::V6,
        }
    }

    /// Bit `index` counted from the most significant bit of the key
    #[inline]
    pub fn bit(&self, index: u32) -> u8 {
        let width = self.family.bit_len();
        debug_assert!(index < width);
        ((self.value >> (width - 1 - index)) & 1) as u8
    }

    /// Byte offset (1-based, as stored) of this key's entry in a range
    /// index table starting at `index_base`.
    ///
    /// Each entry is a pair of 32-bit row bounds, hence the factor of 8.
    pub fn index_offset(&self, index_base: u32) -> u64 {
        let prefix = (self.value >> self.family.index_shift()) as u64;
        (prefix << 3) + index_base as u64
    }

    /// Render the key back as an address
    pub fn to_ip(&self) -> IpAddr {
        match self.family {
            AddressFamily::V4 => IpAddr::V4(Ipv4Addr::from(self.value as u32)),
            AddressFamily::V6 => IpAddr::V6(Ipv6Addr::from(self.value)),
        }
    }
}

/// Parse and classify an address literal
///
/// The literal must not carry a port; surrounding whitespace is ignored.
pub fn classify(raw: &str) -> Result<AddressKey> {
    let trimmed = raw.trim();
    let addr: IpAddr = trimmed
        .parse()
        .map_err(|_| GeoError::InvalidAddress(raw.to_string()))?;
    Ok(classify_ip(addr))
}

/// Classify an already-parsed address
pub fn classify_ip(addr: IpAddr) -> AddressKey {
    match addr {
        IpAddr::V4(v4) => AddressKey::v4(u32::from(v4)),
        IpAddr::V6(v6) => classify_v6(u128::from(v6)),
    }
}

fn classify_v6(value: u128) -> AddressKey {
    if (V4_MAPPED_FROM..=V4_MAPPED_TO).contains(&value) {
        AddressKey::v4((value - V4_MAPPED_FROM) as u32)
    } else if (SIX_TO_FOUR_FROM..=SIX_TO_FOUR_TO).contains(&value) {
        AddressKey::v4(((value >> 80) & LOW_32_BITS) as u32)
    } else if (TEREDO_FROM..=TEREDO_TO).contains(&value) {
        AddressKey::v4((!value & LOW_32_BITS) as u32)
    } else {
        AddressKey::v6(value)
    }
}
