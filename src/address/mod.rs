use std::fmt;
use std::str::FromStr;

use ed25519_dalek::VerifyingKey;
use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

pub const ADDRESS_LEN: usize = 20;

/// Opaque 20-byte account identifier.
///
/// The all-zero value is reserved ([`Address::ZERO`]) and is never a valid
/// transfer destination or approval party.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address([u8; ADDRESS_LEN]);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("address must be {expected} hex characters, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("address is not valid hex: {0}")]
    InvalidHex(String),
}

impl Address {
    pub const ZERO: Address = Address([0u8; ADDRESS_LEN]);

    pub const fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Builds an address whose last byte is `tag`. Handy for fixtures.
    pub const fn from_low_u8(tag: u8) -> Self {
        let mut bytes = [0u8; ADDRESS_LEN];
        bytes[ADDRESS_LEN - 1] = tag;
        Self(bytes)
    }

    /// Derives an account from an Ed25519 public key: the trailing 20 bytes
    /// of `SHA-256(pk)`.
    pub fn from_verifying_key(key: &VerifyingKey) -> Self {
        Self::from_digest(Sha256::digest(key.as_bytes()).into())
    }

    pub(crate) fn from_digest(digest: [u8; 32]) -> Self {
        let mut bytes = [0u8; ADDRESS_LEN];
        bytes.copy_from_slice(&digest[32 - ADDRESS_LEN..]);
        Self(bytes)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ADDRESS_LEN]
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }
}

impl From<[u8; ADDRESS_LEN]> for Address {
    fn from(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
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
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        if digits.len() != ADDRESS_LEN * 2 {
            return Err(AddressError::InvalidLength {
                expected: ADDRESS_LEN * 2,
                actual: digits.len(),
            });
        }
        let mut bytes = [0u8; ADDRESS_LEN];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|e| AddressError::InvalidHex(e.to_string()))?;
        Ok(Self(bytes))
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        encoded.parse().map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use ed25519_dalek::SigningKey;
    use rand::rngs::OsRng;

    #[test]
    fn parses_with_and_without_prefix() {
        let text = "0x00000000000000000000000000000000000000ff";
        let a: Address = text.parse().unwrap();
        let b: Address = text.trim_start_matches("0x").parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(a, Address::from_low_u8(0xff));
        assert_eq!(a.to_string(), text);
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(
            "0x1234".parse::<Address>(),
            Err(AddressError::InvalidLength {
                expected: 40,
                actual: 4
            })
        );
        let err = "zz00000000000000000000000000000000000000"
            .parse::<Address>()
            .unwrap_err();
        assert!(matches!(err, AddressError::InvalidHex(_)));
    }

    #[test]
    fn zero_address_is_reserved() {
        assert!(Address::ZERO.is_zero());
        assert!(!Address::from_low_u8(1).is_zero());
        assert_eq!(Address::default(), Address::ZERO);
    }

    #[test]
    fn derived_address_is_stable_per_key() {
        let sk = SigningKey::generate(&mut OsRng);
        let pk = sk.verifying_key();
        let a = Address::from_verifying_key(&pk);
        assert_eq!(a, Address::from_verifying_key(&pk));
        assert!(!a.is_zero());
    }

    #[test]
    fn serde_uses_hex_string() {
        let addr = Address::from_low_u8(7);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"0x0000000000000000000000000000000000000007\"");
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }
}
