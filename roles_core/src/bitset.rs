//! 256-bit role sets.
//!
//! Bit `r` corresponds to role `r`; bit 0 is the least significant bit. The
//! external rendering is a big-endian `0x` + 64 hex digit string.

use std::fmt;
use std::ops::{BitAnd, BitOr};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseIdError;
use crate::id::Role;

const LIMBS: usize = 4;
const HEX_DIGITS: usize = 64;

/// A fixed-width 256-bit set of roles.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Bitset256 {
    // limbs[0] holds bits 0..=63
    limbs: [u64; LIMBS],
}

impl Bitset256 {
    pub const EMPTY: Bitset256 = Bitset256 { limbs: [0; LIMBS] };

    pub fn new() -> Self {
        Self::EMPTY
    }

    pub fn from_roles<I: IntoIterator<Item = Role>>(roles: I) -> Self {
        let mut set = Self::EMPTY;
        for role in roles {
            set.set(role);
        }
        set
    }

    fn position(role: Role) -> (usize, u64) {
        let index = role.index();
        (index / 64, 1u64 << (index % 64))
    }

    pub fn set(&mut self, role: Role) {
        let (limb, mask) = Self::position(role);
        self.limbs[limb] |= mask;
    }

    pub fn clear(&mut self, role: Role) {
        let (limb, mask) = Self::position(role);
        self.limbs[limb] &= !mask;
    }

    pub fn test(&self, role: Role) -> bool {
        let (limb, mask) = Self::position(role);
        self.limbs[limb] & mask != 0
    }

    #[must_use]
    pub fn and(&self, other: &Bitset256) -> Bitset256 {
        let mut limbs = [0u64; LIMBS];
        for (i, limb) in limbs.iter_mut().enumerate() {
            *limb = self.limbs[i] & other.limbs[i];
        }
        Bitset256 { limbs }
    }

    #[must_use]
    pub fn or(&self, other: &Bitset256) -> Bitset256 {
        let mut limbs = [0u64; LIMBS];
        for (i, limb) in limbs.iter_mut().enumerate() {
            *limb = self.limbs[i] | other.limbs[i];
        }
        Bitset256 { limbs }
    }

    pub fn is_empty(&self) -> bool {
        self.limbs.iter().all(|limb| *limb == 0)
    }

    /// Number of roles in the set.
    pub fn count(&self) -> u32 {
        self.limbs.iter().map(|limb| limb.count_ones()).sum()
    }

    /// Roles in the set, ascending.
    pub fn roles(&self) -> impl Iterator<Item = Role> + '_ {
        (0..=u8::MAX).map(Role).filter(move |role| self.test(*role))
    }
}

impl BitAnd for Bitset256 {
    type Output = Bitset256;

    fn bitand(self, rhs: Bitset256) -> Bitset256 {
        self.and(&rhs)
    }
}

impl BitOr for Bitset256 {
    type Output = Bitset256;

    fn bitor(self, rhs: Bitset256) -> Bitset256 {
        self.or(&rhs)
    }
}

impl fmt::LowerHex for Bitset256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            f.write_str("0x")?;
        }
        for limb in self.limbs.iter().rev() {
            write!(f, "{limb:016x}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Bitset256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:#x}")
    }
}

impl fmt::Debug for Bitset256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bitset256({self:#x})")
    }
}

impl FromStr for Bitset256 {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        if digits.is_empty() || digits.len() > HEX_DIGITS {
            return Err(ParseIdError::InvalidHex(s.to_string()));
        }
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ParseIdError::InvalidHex(s.to_string()));
        }

        let padded = format!("{digits:0>64}");
        let mut limbs = [0u64; LIMBS];
        for (i, limb) in limbs.iter_mut().enumerate() {
            // limb i is the i-th 16-digit chunk counted from the right
            let end = HEX_DIGITS - i * 16;
            *limb = u64::from_str_radix(&padded[end - 16..end], 16)
                .map_err(|_| ParseIdError::InvalidHex(s.to_string()))?;
        }
        Ok(Bitset256 { limbs })
    }
}

impl TryFrom<String> for Bitset256 {
    type Error = ParseIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Bitset256> for String {
    fn from(set: Bitset256) -> Self {
        set.to_string()
    }
}
