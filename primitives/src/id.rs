use {
  crate::{flat, flatten, Condition, ToHexString},
  serde::{Serialize, Serializer},
  std::fmt::{Debug, Display},
};

/// Compact structural identity of a condition tree.
///
/// This is the breadth-first flattened tree where every node contributes its
/// 16-bit op-word (`parent:8 | encoding:3 | operator:5`) followed by its raw
/// comparison value. Two normalized conditions are equivalent exactly when
/// their ids are equal, and the byte-wise order of ids is the canonical
/// order of sibling branches.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConditionId(Vec<u8>);

impl ConditionId {
  pub fn of(condition: &Condition) -> Result<Self, flat::Error> {
    let flattened = flatten(condition)?;
    let mut packed = Vec::with_capacity(flattened.len() * 2);
    for node in flattened {
      packed.extend_from_slice(&node.op_word());
      if let Some(value) = node.comp_value {
        packed.extend_from_slice(value);
      }
    }
    Ok(Self(packed))
  }

  pub fn as_bytes(&self) -> &[u8] {
    &self.0
  }
}

impl AsRef<[u8]> for ConditionId {
  fn as_ref(&self) -> &[u8] {
    &self.0
  }
}

impl Display for ConditionId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0.to_hex())
  }
}

impl Debug for ConditionId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "id({})", self.0.to_hex())
  }
}

impl Serialize for ConditionId {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&self.0.to_hex())
  }
}
