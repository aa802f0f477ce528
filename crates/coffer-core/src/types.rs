//! Identifier newtypes.
//!
//! All identifiers are 16 random bytes wrapped in distinct newtypes so a
//! `ChestId` can never be passed where a `UserId` is expected. `UserId`
//! values are minted by the external identity provider; the rest are
//! minted here at record creation.

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ParseError;

/// Number of raw bytes in every identifier.
pub const ID_LEN: usize = 16;

macro_rules! define_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub [u8; ID_LEN]);

        impl $name {
            /// Create from raw bytes.
            pub const fn from_bytes(bytes: [u8; ID_LEN]) -> Self {
                Self(bytes)
            }

            /// Get the raw bytes.
            pub const fn as_bytes(&self) -> &[u8; ID_LEN] {
                &self.0
            }

            /// Mint a fresh identifier from the OS random source.
            pub fn random() -> Self {
                let mut bytes = [0u8; ID_LEN];
                OsRng.fill_bytes(&mut bytes);
                Self(bytes)
            }

            /// Convert to hex string.
            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }

            /// Parse from hex string.
            pub fn from_hex(s: &str) -> Result<Self, ParseError> {
                let bytes = hex::decode(s)?;
                let arr: [u8; ID_LEN] = bytes.as_slice().try_into().map_err(|_| {
                    ParseError::InvalidIdLength {
                        expected: ID_LEN,
                        got: bytes.len(),
                    }
                })?;
                Ok(Self(arr))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), &self.to_hex()[..8])
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.to_hex())
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl TryFrom<&[u8]> for $name {
            type Error = std::array::TryFromSliceError;

            fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
                let arr: [u8; ID_LEN] = slice.try_into()?;
                Ok(Self(arr))
            }
        }
    };
}

define_id! {
    /// Identifier of a chest.
    ChestId
}

define_id! {
    /// Identifier of a user, issued by the external identity provider.
    UserId
}

define_id! {
    /// Identifier of an item within a chest.
    ItemId
}

define_id! {
    /// Identifier of a pending invite.
    InviteId
}

/// An email address as the identity provider reports it.
///
/// Comparison is case-sensitive byte equality; the provider owns
/// normalization, not us.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// Validate and wrap an address.
    ///
    /// Only the coarse shape is checked (`local@domain`); anything
    /// stricter belongs to the identity provider.
    pub fn new(address: impl Into<String>) -> Result<Self, ParseError> {
        let address = address.into();
        match address.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {
                Ok(Self(address))
            }
            _ => Err(ParseError::InvalidEmail(address)),
        }
    }

    /// The address as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Email({})", self.0)
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Email {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_hex_roundtrip() {
        let id = ChestId::from_bytes([0x42; ID_LEN]);
        let hex = id.to_hex();
        let recovered = ChestId::from_hex(&hex).unwrap();
        assert_eq!(id, recovered);
    }

    #[test]
    fn test_id_from_hex_rejects_wrong_length() {
        let err = UserId::from_hex("abcd").unwrap_err();
        assert!(matches!(err, ParseError::InvalidIdLength { got: 2, .. }));
    }

    #[test]
    fn test_id_debug_truncated() {
        let id = ItemId::from_bytes([0xcd; ID_LEN]);
        assert_eq!(format!("{:?}", id), "ItemId(cdcdcdcd)");
    }

    #[test]
    fn test_random_ids_distinct() {
        assert_ne!(InviteId::random(), InviteId::random());
    }

    #[test]
    fn test_email_shape() {
        assert!(Email::new("a@x.com").is_ok());
        assert!(Email::new("no-at-sign").is_err());
        assert!(Email::new("@x.com").is_err());
        assert!(Email::new("a@").is_err());
    }

    #[test]
    fn test_email_case_sensitive() {
        let lower = Email::new("a@x.com").unwrap();
        let upper = Email::new("A@x.com").unwrap();
        assert_ne!(lower, upper);
    }
}
