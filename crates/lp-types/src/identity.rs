use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

macro_rules! sequential_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// The raw numeric id. Zero never names a record.
            pub const fn get(self) -> u64 {
                self.0
            }

            /// Returns `true` for the reserved zero id.
            pub const fn is_zero(self) -> bool {
                self.0 == 0
            }

            /// Zero-based position in an arena, or `None` for the zero id.
            pub fn index(self) -> Option<usize> {
                self.0.checked_sub(1).map(|i| i as usize)
            }

            /// The id assigned to the record stored at `index`.
            pub fn from_index(index: usize) -> Self {
                Self(index as u64 + 1)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }
    };
}

sequential_id!(
    /// Identifier of a giver, delegate, or project. Ids start at 1.
    AdminId,
    "admin"
);

sequential_id!(
    /// Identifier of a pledge row. Ids start at 1 and are never reused.
    PledgeId,
    "pledge"
);

sequential_id!(
    /// Identifier of a registered transfer plugin.
    PluginId,
    "plugin"
);

/// Verifiable identity of a caller (a controller key, a wallet, a service).
///
/// Addresses are 20 bytes. `Address::derive` hashes a label with BLAKE3 so
/// tests and scenario files can name actors ("alice", "vault-owner") and get
/// stable, distinct addresses. Serialized as a `0x`-prefixed hex string.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address {
    bytes: [u8; 20],
}

impl Address {
    /// The all-zero address.
    pub const ZERO: Self = Self { bytes: [0; 20] };

    /// Derive an address deterministically from a label.
    pub fn derive(label: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"lp-address-v1:");
        hasher.update(label.as_bytes());
        let digest = hasher.finalize();
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest.as_bytes()[..20]);
        Self { bytes }
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self { bytes }
    }

    /// The raw 20 bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.bytes
    }

    /// Full `0x`-prefixed hex string.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.bytes))
    }

    /// Short identifier (first 4 bytes).
    pub fn short_id(&self) -> String {
        format!("0x{}", hex::encode(&self.bytes[..4]))
    }

    /// Parse from a hex string with or without the `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let raw = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if raw.len() != 20 {
            return Err(TypeError::InvalidLength {
                expected: 20,
                actual: raw.len(),
            });
        }
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&raw);
        Ok(Self { bytes })
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.short_id())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_id())
    }
}

impl Serialize for Address {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Asset identifier. Amounts are always tracked per token.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TokenId(String);

impl TokenId {
    /// Create a token id from a non-empty symbol without whitespace.
    pub fn new(symbol: impl Into<String>) -> Result<Self, TypeError> {
        let symbol = symbol.into();
        if symbol.is_empty() || symbol.chars().any(char::is_whitespace) {
            return Err(TypeError::InvalidToken(symbol));
        }
        Ok(Self(symbol))
    }

    /// The token symbol.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TokenId {
    type Error = TypeError;

    fn try_from(symbol: String) -> Result<Self, Self::Error> {
        Self::new(symbol)
    }
}

impl From<TokenId> for String {
    fn from(token: TokenId) -> Self {
        token.0
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
