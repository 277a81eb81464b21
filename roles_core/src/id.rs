//! Fixed-width identifiers used by the registry.
//!
//! Principals and targets are 20-byte addresses, operations are 4-byte
//! selectors and roles are bit positions in a [`Bitset256`](crate::Bitset256).
//! All of them render as lower-case `0x` hex and parse back from it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{ParseIdError, RolesError, RolesResult};

/// Strip an optional `0x`/`0X` prefix and decode exactly `N` bytes.
fn decode_fixed<const N: usize>(s: &str) -> Result<[u8; N], ParseIdError> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    let bytes = hex::decode(digits).map_err(|e| ParseIdError::InvalidHex(format!("{s}: {e}")))?;
    let actual = bytes.len();
    bytes
        .try_into()
        .map_err(|_| ParseIdError::InvalidLength { expected: N, actual })
}

/// A 20-byte principal or target identity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address([u8; 20]);

impl Address {
    /// The unset address.
    pub const ZERO: Address = Address([0u8; 20]);

    /// Create an address from raw bytes.
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Create an address whose low eight bytes hold `value` (big-endian).
    pub fn from_low_u64(value: u64) -> Self {
        let mut bytes = [0u8; 20];
        bytes[12..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Whether this is the unset address.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl FromStr for Address {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_fixed::<20>(s).map(Self)
    }
}

impl TryFrom<String> for Address {
    type Error = ParseIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_string()
    }
}

/// A 4-byte tag naming one operation on a target.
///
/// The registry only ever compares selectors for equality.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Selector([u8; 4]);

impl Selector {
    /// Create a selector from raw bytes.
    pub const fn new(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    /// Derive a stable selector from a textual operation signature such as
    /// `addUserRole(address,uint8)`: the first four bytes of its SHA-256 digest.
    ///
    /// These are SHA-256 tags, not Keccak-256 ABI selectors, so they do not
    /// match selectors computed by contract tooling for the same signature.
    pub fn from_signature(signature: &str) -> Self {
        let digest = Sha256::digest(signature.as_bytes());
        Self([digest[0], digest[1], digest[2], digest[3]])
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Selector({self})")
    }
}

impl FromStr for Selector {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_fixed::<4>(s).map(Self)
    }
}

impl TryFrom<String> for Selector {
    type Error = ParseIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Selector> for String {
    fn from(selector: Selector) -> Self {
        selector.to_string()
    }
}

/// One guarded operation on one target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Capability {
    pub target: Address,
    pub selector: Selector,
}

impl Capability {
    pub fn new(target: Address, selector: Selector) -> Self {
        Self { target, selector }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.target, self.selector)
    }
}

impl FromStr for Capability {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (target, selector) = s
            .split_once(':')
            .ok_or_else(|| ParseIdError::InvalidCapability(s.to_string()))?;
        Ok(Self {
            target: target.trim().parse()?,
            selector: selector.trim().parse()?,
        })
    }
}

/// Parse a `target:selector` capability supplied by an outside caller.
///
/// A structurally invalid encoding is an invocation error, not a fault.
pub fn parse_capability(s: &str) -> RolesResult<Capability> {
    s.parse()
        .map_err(|e: ParseIdError| RolesError::InvalidInvocation(e.to_string()))
}

/// A role: one bit position in a 256-bit set.
///
/// Every `u8` is a valid role, so an out-of-range role cannot be built.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(pub u8);

impl Role {
    pub const MIN: Role = Role(u8::MIN);
    pub const MAX: Role = Role(u8::MAX);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<u8> for Role {
    fn from(value: u8) -> Self {
        Role(value)
    }
}

impl From<Role> for u8 {
    fn from(role: Role) -> Self {
        role.0
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Role {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u8>()
            .map(Role)
            .map_err(|_| ParseIdError::RoleOutOfRange(s.to_string()))
    }
}
