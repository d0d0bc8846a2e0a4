use {
  crate::{Bytes, Condition, Encoding, Operator},
  multihash::{Code, Multihash, MultihashDigest},
  serde::Serialize,
  thiserror::Error,
};

#[derive(Debug, Error)]
pub enum Error {
  #[error("Failed to encode condition for hashing: {0}")]
  Encode(#[from] rmp_serde::encode::Error),
}

/// Mirror of a condition where every optional field has a fixed default,
/// so that absent and empty values serialize to the same bytes.
#[derive(Serialize)]
struct Canonical<'a> {
  encoding: Encoding,
  operator: Operator,
  comp_value: &'a [u8],
  children: Vec<Canonical<'a>>,
}

impl<'a> From<&'a Condition> for Canonical<'a> {
  fn from(condition: &'a Condition) -> Self {
    Self {
      encoding: condition.encoding(),
      operator: condition.operator(),
      comp_value: condition.comp_value().map(Bytes::as_ref).unwrap_or(&[]),
      children: condition.children().iter().map(Canonical::from).collect(),
    }
  }
}

/// Full semantic hash of a condition tree.
///
/// Unlike [`crate::ConditionId`] this digest has a fixed length and no limit
/// on the number of nodes. The input is expected to be normalized, the hash
/// itself does not reorder anything.
pub fn condition_hash(condition: &Condition) -> Result<Multihash, Error> {
  let encoded = rmp_serde::to_vec(&Canonical::from(condition))?;
  Ok(Code::Keccak256.digest(&encoded))
}
