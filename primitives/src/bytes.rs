use {
  serde::{de, Deserialize, Deserializer, Serialize, Serializer},
  std::{
    fmt::{Debug, Display},
    ops::Deref,
    str::FromStr,
  },
  thiserror::Error,
};

#[derive(Debug, Error, PartialEq)]
pub enum Error {
  #[error("Hex string '{0}' is missing the 0x prefix")]
  MissingPrefix(String),

  #[error("Invalid hex string: {0}")]
  Hex(#[from] hex::FromHexError),

  #[error("Expected {expected} bytes, got {actual}")]
  Length { expected: usize, actual: usize },
}

pub trait ToHexString {
  fn to_hex(&self) -> String;
}

impl ToHexString for [u8] {
  fn to_hex(&self) -> String {
    format!("0x{}", hex::encode(self))
  }
}

impl<const N: usize> ToHexString for [u8; N] {
  fn to_hex(&self) -> String {
    format!("0x{}", hex::encode(self))
  }
}

impl ToHexString for Vec<u8> {
  fn to_hex(&self) -> String {
    format!("0x{}", hex::encode(self))
  }
}

impl ToHexString for multihash::Multihash {
  fn to_hex(&self) -> String {
    format!("0x{}", hex::encode(self.to_bytes()))
  }
}

/// Decodes a `0x`-prefixed hex string, accepting any letter case.
pub fn decode_hex(s: &str) -> Result<Vec<u8>, Error> {
  match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
    Some(digits) => Ok(hex::decode(digits)?),
    None => Err(Error::MissingPrefix(s.to_owned())),
  }
}

/// Decodes a `0x`-prefixed hex string into a fixed size array.
pub fn decode_hex_array<const N: usize>(s: &str) -> Result<[u8; N], Error> {
  let bytes = decode_hex(s)?;
  let actual = bytes.len();
  bytes.try_into().map_err(|_| Error::Length {
    expected: N,
    actual,
  })
}

/// Raw byte string that travels as lowercase `0x`-prefixed hex.
///
/// Used for condition comparison values, where the bytes are opaque to
/// the algebra and only their identity matters.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Bytes(Vec<u8>);

impl Bytes {
  pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
    Self(bytes.into())
  }

  /// Left pads a big-endian integer into a full 32 bytes ABI word.
  pub fn word(value: u128) -> Self {
    let mut word = [0u8; 32];
    word[16..].copy_from_slice(&value.to_be_bytes());
    Self(word.to_vec())
  }
}

impl Deref for Bytes {
  type Target = [u8];

  fn deref(&self) -> &Self::Target {
    &self.0
  }
}

impl AsRef<[u8]> for Bytes {
  fn as_ref(&self) -> &[u8] {
    &self.0
  }
}

impl From<Vec<u8>> for Bytes {
  fn from(bytes: Vec<u8>) -> Self {
    Self(bytes)
  }
}

impl From<&[u8]> for Bytes {
  fn from(bytes: &[u8]) -> Self {
    Self(bytes.to_vec())
  }
}

impl Display for Bytes {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0.to_hex())
  }
}

impl Debug for Bytes {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "bytes({})", self.0.to_hex())
  }
}

impl FromStr for Bytes {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    decode_hex(s).map(Self)
  }
}

impl Serialize for Bytes {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&self.0.to_hex())
  }
}

impl<'de> Deserialize<'de> for Bytes {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let s = String::deserialize(deserializer)?;
    s.parse().map_err(de::Error::custom)
  }
}

/// First four bytes of the keccak hash of a function signature.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Selector([u8; 4]);

impl Selector {
  pub const fn new(bytes: [u8; 4]) -> Self {
    Self(bytes)
  }
}

impl AsRef<[u8]> for Selector {
  fn as_ref(&self) -> &[u8] {
    &self.0
  }
}

impl Display for Selector {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0.to_hex())
  }
}

impl Debug for Selector {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "selector({})", self.0.to_hex())
  }
}

impl FromStr for Selector {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    decode_hex_array(s).map(Self)
  }
}

impl Serialize for Selector {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&self.0.to_hex())
  }
}

impl<'de> Deserialize<'de> for Selector {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let s = String::deserialize(deserializer)?;
    s.parse().map_err(de::Error::custom)
  }
}

#[cfg(test)]
mod tests {
  use {
    super::{decode_hex, decode_hex_array, Error},
    crate::{Bytes, Selector},
  };

  #[test]
  fn bytes_hex_roundtrip_is_lowercase() -> anyhow::Result<()> {
    let bytes: Bytes = "0xDEADbeef".parse()?;
    assert_eq!(&*bytes, &[0xde, 0xad, 0xbe, 0xef]);
    assert_eq!(bytes.to_string(), "0xdeadbeef");

    let json = serde_json::to_string(&bytes)?;
    assert_eq!(json, "\"0xdeadbeef\"");
    assert_eq!(serde_json::from_str::<Bytes>(&json)?, bytes);
    Ok(())
  }

  #[test]
  fn bytes_require_prefix() {
    assert!("deadbeef".parse::<Bytes>().is_err());
    assert!("0xabc".parse::<Bytes>().is_err());
    assert_eq!("0x".parse::<Bytes>().unwrap().len(), 0);
  }

  #[test]
  fn decoding_errors_name_the_cause() {
    assert_eq!(
      decode_hex("0xzz"),
      Err(Error::Hex(hex::FromHexError::InvalidHexCharacter {
        c: 'z',
        index: 0
      }))
    );
    assert_eq!(
      decode_hex("beef"),
      Err(Error::MissingPrefix("beef".to_owned()))
    );
    assert_eq!(
      decode_hex_array::<4>("0xbeef"),
      Err(Error::Length {
        expected: 4,
        actual: 2
      })
    );
  }

  #[test]
  fn word_is_left_padded() {
    let word = Bytes::word(0x0102);
    assert_eq!(word.len(), 32);
    assert_eq!(word[30], 0x01);
    assert_eq!(word[31], 0x02);
    assert!(word[..30].iter().all(|b| *b == 0));
  }

  #[test]
  fn selector_length_is_checked() {
    assert!("0xa9059cbb".parse::<Selector>().is_ok());
    assert!("0xa9059c".parse::<Selector>().is_err());
    assert!("0xa9059cbb00".parse::<Selector>().is_err());
  }
}
