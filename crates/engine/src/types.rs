//! Opaque 32-byte identifiers and the privileged-role table.

use core::fmt;
use core::str::FromStr;
use std::collections::BTreeMap;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Failure to parse a 32-byte identifier from its display form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("invalid 32-byte identifier: {0}")]
pub struct ParseIdError(pub &'static str);

fn label_bytes(label: &str) -> [u8; 32] {
    let mut bytes = [0u8; 32];
    let src = label.as_bytes();
    let len = src.len().min(32);
    bytes[..len].copy_from_slice(&src[..len]);
    bytes
}

fn fmt_bytes32(bytes: &[u8; 32], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(32);
    let head = &bytes[..end];
    let printable = end > 0
        && head.iter().all(|b| b.is_ascii_graphic())
        && bytes[end..].iter().all(|&b| b == 0);
    if printable {
        // Labels are zero-padded ASCII; render them back as text.
        for &b in head {
            write!(f, "{}", b as char)?;
        }
        Ok(())
    } else {
        write!(f, "0x")?;
        for b in bytes {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

fn parse_bytes32(s: &str) -> Result<[u8; 32], ParseIdError> {
    if let Some(hex) = s.strip_prefix("0x") {
        if hex.len() != 64 {
            return Err(ParseIdError("hex form must be 64 digits"));
        }
        let mut bytes = [0u8; 32];
        for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
            let hi = (chunk[0] as char)
                .to_digit(16)
                .ok_or(ParseIdError("non-hex digit"))?;
            let lo = (chunk[1] as char)
                .to_digit(16)
                .ok_or(ParseIdError("non-hex digit"))?;
            bytes[i] = (hi * 16 + lo) as u8;
        }
        Ok(bytes)
    } else {
        if s.is_empty() || s.len() > 32 || !s.bytes().all(|b| b.is_ascii_graphic()) {
            return Err(ParseIdError("label must be 1-32 printable ASCII bytes"));
        }
        Ok(label_bytes(s))
    }
}

macro_rules! impl_bytes32_id {
    ($name:ident) => {
        impl $name {
            /// Construct from raw bytes.
            pub const fn new(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            /// Construct from a short ASCII label, zero-padded (and truncated
            /// past 32 bytes).
            pub fn from_label(label: &str) -> Self {
                Self(label_bytes(label))
            }

            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt_bytes32(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                parse_bytes32(s).map(Self)
            }
        }

        impl From<[u8; 32]> for $name {
            fn from(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                struct Visitor;

                impl<'de> de::Visitor<'de> for Visitor {
                    type Value = $name;

                    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                        f.write_str("a label or 0x-prefixed hex string")
                    }

                    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                        v.parse().map_err(E::custom)
                    }
                }

                deserializer.deserialize_str(Visitor)
            }
        }
    };
}

/// Collateral pool identifier (opaque 32-byte key).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct PoolId([u8; 32]);

impl_bytes32_id!(PoolId);

/// Account address (opaque 32-byte key).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Address([u8; 32]);

impl_bytes32_id!(Address);

// ============================================================================
// Roles
// ============================================================================

/// Privileged roles an address may hold on the ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// Pool administration: create/cage pools, ceilings, rates, grants.
    Admin,
    /// May confiscate positions and record bad debt.
    LiquidationEngine,
    /// May accrue stability fees into pool rates.
    FeeCollector,
}

impl Role {
    fn bit(self) -> u8 {
        match self {
            Role::Admin => 1 << 0,
            Role::LiquidationEngine => 1 << 1,
            Role::FeeCollector => 1 << 2,
        }
    }
}

/// Address → role bitmap.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleTable {
    grants: BTreeMap<Address, u8>,
}

impl RoleTable {
    pub fn grant(&mut self, addr: Address, role: Role) {
        *self.grants.entry(addr).or_insert(0) |= role.bit();
    }

    pub fn revoke(&mut self, addr: Address, role: Role) {
        if let Some(bits) = self.grants.get_mut(&addr) {
            *bits &= !role.bit();
            if *bits == 0 {
                self.grants.remove(&addr);
            }
        }
    }

    pub fn has(&self, addr: Address, role: Role) -> bool {
        self.grants
            .get(&addr)
            .map(|bits| bits & role.bit() != 0)
            .unwrap_or(false)
    }
}
