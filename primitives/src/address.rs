use {
  crate::{bytes, flat, flatten, Condition, Encoding, Operator, ToHexString},
  multihash::{Hasher, Keccak256},
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
  #[error("Invalid address: {0}")]
  Invalid(#[from] bytes::Error),

  #[error("Condition does not fit the packed format: {0}")]
  Flatten(#[from] flat::Error),

  #[error("Packed condition of {0} bytes exceeds the init code size limit")]
  TooLarge(usize),
}

/// A 20 bytes EVM account address.
#[derive(
  Copy, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
pub struct Address([u8; 20]);

impl Address {
  pub const fn new(bytes: [u8; 20]) -> Self {
    Self(bytes)
  }

  /// Computes the address of a contract deployed with CREATE2 by `self`.
  ///
  /// The same deployer, salt and init code always produce the same address,
  /// which is what lets independently submitted copies of one condition
  /// share a single deployment.
  pub fn create2(&self, salt: &[u8; 32], init_code: &[u8]) -> Self {
    let code_hash = keccak256(init_code);
    let mut hasher = Keccak256::default();
    hasher.update(&[0xff]);
    hasher.update(&self.0);
    hasher.update(salt);
    hasher.update(&code_hash);
    let digest = hasher.finalize();

    let mut address = [0u8; 20];
    address.copy_from_slice(&digest[12..32]);
    Self(address)
  }
}

pub(crate) fn keccak256(data: &[u8]) -> [u8; 32] {
  let mut hasher = Keccak256::default();
  hasher.update(data);
  let mut output = [0u8; 32];
  output.copy_from_slice(hasher.finalize());
  output
}

impl AsRef<[u8]> for Address {
  fn as_ref(&self) -> &[u8] {
    &self.0
  }
}

impl Deref for Address {
  type Target = [u8];

  fn deref(&self) -> &Self::Target {
    &self.0
  }
}

impl Display for Address {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0.to_hex())
  }
}

impl Debug for Address {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "address({})", self.0.to_hex())
  }
}

impl FromStr for Address {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Ok(Self(bytes::decode_hex_array(s)?))
  }
}

impl Serialize for Address {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&self.0.to_hex())
  }
}

impl<'de> Deserialize<'de> for Address {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let s = String::deserialize(deserializer)?;
    s.parse().map_err(de::Error::custom)
  }
}

/// Deployment parameters for write-once condition storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Create2 {
  /// Contract that performs the CREATE2 deployment.
  pub factory: Address,

  /// Salt mixed into the address derivation.
  pub salt: [u8; 32],
}

impl Default for Create2 {
  fn default() -> Self {
    Self {
      // ERC-2470 singleton factory
      factory: Address([
        0xce, 0x00, 0x42, 0xb8, 0x68, 0x30, 0x00, 0x00, 0xd4, 0x4a, 0x59, 0x00,
        0x4d, 0xa5, 0x4a, 0x00, 0x5f, 0xfd, 0xcf, 0x9f,
      ]),
      salt: [0u8; 32],
    }
  }
}

/// The code returned by this 10 bytes constructor is `0x00 || payload`,
/// the leading STOP keeps the stored payload from ever being executed.
///
/// ```text
/// 61 XXXX   PUSH2 payload.len + 1
/// 80        DUP1
/// 60 0a     PUSH1 10
/// 3d        RETURNDATASIZE
/// 39        CODECOPY
/// 3d        RETURNDATASIZE
/// f3        RETURN
/// ```
const INIT_CODE_TAIL: [u8; 7] = [0x80, 0x60, 0x0a, 0x3d, 0x39, 0x3d, 0xf3];

pub fn init_code(payload: &[u8]) -> Result<Vec<u8>, Error> {
  let code_size = u16::try_from(payload.len() + 1)
    .map_err(|_| Error::TooLarge(payload.len()))?;
  let mut code = Vec::with_capacity(payload.len() + 11);
  code.push(0x61);
  code.extend_from_slice(&code_size.to_be_bytes());
  code.extend_from_slice(&INIT_CODE_TAIL);
  code.push(0x00);
  code.extend_from_slice(payload);
  Ok(code)
}

/// Whether values addressed by this node are laid out inline in the
/// encoded call, so their raw bytes can be compared directly.
fn is_inline(condition: &Condition) -> bool {
  match condition.encoding() {
    Encoding::Static => true,
    Encoding::Tuple => condition.children().iter().all(is_inline),
    Encoding::None if condition.is_logical() => {
      !condition.children().is_empty()
        && condition.children().iter().all(is_inline)
    }
    _ => false,
  }
}

/// Packs a condition tree into the payload stored on chain: all op-words
/// in breadth-first order, then all comparison values in the same order.
///
/// An `EqualTo` value is stored verbatim only when the compared value is
/// inline; otherwise only its keccak256 hash is kept and the evaluator
/// compares hashes.
pub fn pack_condition(condition: &Condition) -> Result<Vec<u8>, Error> {
  let flattened = flatten(condition)?;
  let mut payload = Vec::with_capacity(flattened.len() * 34);
  for node in &flattened {
    payload.extend_from_slice(&node.op_word());
  }
  for node in &flattened {
    let Some(value) = node.comp_value else {
      continue;
    };
    if node.operator == Operator::EqualTo && !is_inline(node.node) {
      payload.extend_from_slice(&keccak256(value));
    } else {
      payload.extend_from_slice(value);
    }
  }
  Ok(payload)
}

/// The address under which the packed bytecode of a condition is expected
/// to be deployed, using the default singleton factory and a zero salt.
pub fn condition_address(condition: &Condition) -> Result<Address, Error> {
  condition_address_with(condition, &Create2::default())
}

pub fn condition_address_with(
  condition: &Condition,
  create2: &Create2,
) -> Result<Address, Error> {
  let code = init_code(&pack_condition(condition)?)?;
  Ok(create2.factory.create2(&create2.salt, &code))
}

#[cfg(test)]
mod tests {
  use {
    super::{init_code, is_inline, keccak256, pack_condition},
    crate::{
      condition_address,
      condition_address_with,
      Address,
      Bytes,
      Condition,
      Create2,
      Encoding,
      Operator,
    },
  };

  #[test]
  fn address_parse_and_display() -> anyhow::Result<()> {
    let address: Address = "0xCE0042B868300000d44A59004Da54A005ffdcf9f".parse()?;
    assert_eq!(address, Create2::default().factory);
    assert_eq!(
      address.to_string(),
      "0xce0042b868300000d44a59004da54a005ffdcf9f"
    );
    assert!("0xce0042b8".parse::<Address>().is_err());
    Ok(())
  }

  #[test]
  fn keccak_of_empty_input() {
    assert_eq!(
      hex::encode(keccak256(&[])),
      "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
    );
  }

  #[test]
  fn create2_known_vector() -> anyhow::Result<()> {
    // EIP-1014 example 0
    let deployer = Address::new([0u8; 20]);
    let address = deployer.create2(&[0u8; 32], &[0x00]);
    assert_eq!(
      address,
      "0x4D1A2e2bB4F88F0250f26Ffff098B0b30B26BF38".parse()?
    );
    Ok(())
  }

  #[test]
  fn init_code_shim() -> anyhow::Result<()> {
    let code = init_code(&[0xaa, 0xbb])?;
    assert_eq!(code, vec![
      0x61, 0x00, 0x03, 0x80, 0x60, 0x0a, 0x3d, 0x39, 0x3d, 0xf3, 0x00, 0xaa,
      0xbb
    ]);
    Ok(())
  }

  #[test]
  fn equal_to_values_are_hashed_unless_inline() -> anyhow::Result<()> {
    let dynamic_value = Bytes::new(b"hello".to_vec());
    let condition = Condition::matches(Encoding::Calldata, vec![
      Condition::equal_to(Encoding::Static, Bytes::word(7)),
      Condition::equal_to(Encoding::Dynamic, dynamic_value.clone()),
    ]);
    let packed = pack_condition(&condition)?;

    // three op-words, then the inline word, then the hash of the dynamic value
    assert_eq!(packed.len(), 6 + 32 + 32);
    assert_eq!(&packed[6..38], &Bytes::word(7)[..]);
    assert_eq!(&packed[38..], &keccak256(&dynamic_value)[..]);
    Ok(())
  }

  #[test]
  fn static_tuples_are_inline() {
    let static_tuple = Condition::new(Encoding::Tuple, Operator::EqualTo)
      .with_children(vec![
        Condition::pass(Encoding::Static),
        Condition::pass(Encoding::Static),
      ]);
    let dynamic_tuple = Condition::new(Encoding::Tuple, Operator::EqualTo)
      .with_children(vec![
        Condition::pass(Encoding::Static),
        Condition::pass(Encoding::Dynamic),
      ]);
    assert!(is_inline(&static_tuple));
    assert!(!is_inline(&dynamic_tuple));
  }

  #[test]
  fn address_is_deterministic_and_salted() -> anyhow::Result<()> {
    let condition = Condition::matches(Encoding::Calldata, vec![
      Condition::equal_to(Encoding::Static, Bytes::word(1)),
    ]);
    let first = condition_address(&condition)?;
    let second = condition_address(&condition.clone())?;
    assert_eq!(first, second);

    let salted = condition_address_with(&condition, &Create2 {
      salt: [1u8; 32],
      ..Default::default()
    })?;
    assert_ne!(first, salted);
    Ok(())
  }
}
