use {
  crate::{flat, Bytes, ConditionId},
  once_cell::sync::OnceCell,
  serde::{Deserialize, Serialize},
  std::fmt::Debug,
  thiserror::Error,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
  #[error("Unknown encoding value {0}")]
  UnknownEncoding(u8),

  #[error("Unknown operator value {0}")]
  UnknownOperator(u8),
}

/// Describes how the value addressed by a condition node is ABI-shaped.
///
/// This says nothing about what is checked on the value, that is the job
/// of the [`Operator`].
#[derive(
  Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub enum Encoding {
  None = 0,
  Static = 1,
  Dynamic = 2,
  Tuple = 3,
  Array = 4,
  Calldata = 5,
  AbiEncoded = 6,
}

impl Encoding {
  /// Whole-message encodings: a selector-prefixed calldata payload or a
  /// nested abi encoded blob.
  pub fn is_structural(&self) -> bool {
    matches!(self, Self::Calldata | Self::AbiEncoded)
  }
}

impl TryFrom<u8> for Encoding {
  type Error = Error;

  fn try_from(value: u8) -> Result<Self, Self::Error> {
    Ok(match value {
      0 => Self::None,
      1 => Self::Static,
      2 => Self::Dynamic,
      3 => Self::Tuple,
      4 => Self::Array,
      5 => Self::Calldata,
      6 => Self::AbiEncoded,
      other => return Err(Error::UnknownEncoding(other)),
    })
  }
}

impl From<Encoding> for u8 {
  fn from(encoding: Encoding) -> Self {
    encoding as u8
  }
}

/// The predicate kind evaluated at a condition node.
#[derive(
  Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub enum Operator {
  Pass = 0,
  And = 1,
  Or = 2,
  Nor = 3,
  Matches = 5,
  ArraySome = 6,
  ArrayEvery = 7,
  ArrayTailMatches = 8,
  EqualToAvatar = 15,
  EqualTo = 16,
  GreaterThan = 17,
  LessThan = 18,
  SignedIntGreaterThan = 19,
  SignedIntLessThan = 20,
  Bitmask = 21,
  Custom = 22,
  Slice = 23,
  WithinAllowance = 28,
  EtherWithinAllowance = 29,
  CallWithinAllowance = 30,
  Empty = 31,
}

impl Operator {
  pub fn is_logical(&self) -> bool {
    matches!(self, Self::And | Self::Or | Self::Nor)
  }

  pub fn is_structural(&self) -> bool {
    matches!(
      self,
      Self::Matches
        | Self::ArraySome
        | Self::ArrayEvery
        | Self::ArrayTailMatches
    )
  }

  pub fn is_comparison(&self) -> bool {
    matches!(
      self,
      Self::EqualToAvatar
        | Self::EqualTo
        | Self::GreaterThan
        | Self::LessThan
        | Self::SignedIntGreaterThan
        | Self::SignedIntLessThan
        | Self::Bitmask
        | Self::Custom
        | Self::Slice
    )
  }

  pub fn is_allowance(&self) -> bool {
    matches!(
      self,
      Self::WithinAllowance
        | Self::EtherWithinAllowance
        | Self::CallWithinAllowance
    )
  }

  /// Allowance checks that are not bound to a parameter position. They
  /// sit at the tail of a calldata `Matches` and their order is irrelevant.
  pub fn is_marker(&self) -> bool {
    matches!(self, Self::EtherWithinAllowance | Self::CallWithinAllowance)
  }
}

impl TryFrom<u8> for Operator {
  type Error = Error;

  fn try_from(value: u8) -> Result<Self, Self::Error> {
    Ok(match value {
      0 => Self::Pass,
      1 => Self::And,
      2 => Self::Or,
      3 => Self::Nor,
      5 => Self::Matches,
      6 => Self::ArraySome,
      7 => Self::ArrayEvery,
      8 => Self::ArrayTailMatches,
      15 => Self::EqualToAvatar,
      16 => Self::EqualTo,
      17 => Self::GreaterThan,
      18 => Self::LessThan,
      19 => Self::SignedIntGreaterThan,
      20 => Self::SignedIntLessThan,
      21 => Self::Bitmask,
      22 => Self::Custom,
      23 => Self::Slice,
      28 => Self::WithinAllowance,
      29 => Self::EtherWithinAllowance,
      30 => Self::CallWithinAllowance,
      31 => Self::Empty,
      other => return Err(Error::UnknownOperator(other)),
    })
  }
}

impl From<Operator> for u8 {
  fn from(operator: Operator) -> Self {
    operator as u8
  }
}

/// A node in a permission condition tree.
///
/// Conditions are values: every transformation consumes its input
/// and returns a freshly built tree. The content id of a node is computed
/// on first use and then cached alongside it, which is sound only because
/// nodes never change after construction.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
  #[serde(rename = "paramType", alias = "encoding")]
  encoding: Encoding,
  operator: Operator,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  comp_value: Option<Bytes>,

  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  children: Vec<Condition>,

  #[serde(skip)]
  id_cache: OnceCell<ConditionId>,
}

impl Condition {
  pub fn new(encoding: Encoding, operator: Operator) -> Self {
    Self {
      encoding,
      operator,
      comp_value: None,
      children: vec![],
      id_cache: OnceCell::new(),
    }
  }

  pub fn from_parts(
    encoding: Encoding,
    operator: Operator,
    comp_value: Option<Bytes>,
    children: Vec<Condition>,
  ) -> Self {
    Self {
      encoding,
      operator,
      comp_value,
      children,
      id_cache: OnceCell::new(),
    }
  }

  pub fn with_comp_value(self, comp_value: impl Into<Bytes>) -> Self {
    Self::from_parts(
      self.encoding,
      self.operator,
      Some(comp_value.into()),
      self.children,
    )
  }

  pub fn with_children(self, children: Vec<Condition>) -> Self {
    Self::from_parts(self.encoding, self.operator, self.comp_value, children)
  }

  pub fn pass(encoding: Encoding) -> Self {
    Self::new(encoding, Operator::Pass)
  }

  pub fn and(children: Vec<Condition>) -> Self {
    Self::new(Encoding::None, Operator::And).with_children(children)
  }

  pub fn or(children: Vec<Condition>) -> Self {
    Self::new(Encoding::None, Operator::Or).with_children(children)
  }

  pub fn nor(children: Vec<Condition>) -> Self {
    Self::new(Encoding::None, Operator::Nor).with_children(children)
  }

  pub fn matches(encoding: Encoding, children: Vec<Condition>) -> Self {
    Self::new(encoding, Operator::Matches).with_children(children)
  }

  pub fn equal_to(encoding: Encoding, value: impl Into<Bytes>) -> Self {
    Self::new(encoding, Operator::EqualTo).with_comp_value(value)
  }

  pub fn encoding(&self) -> Encoding {
    self.encoding
  }

  pub fn operator(&self) -> Operator {
    self.operator
  }

  pub fn comp_value(&self) -> Option<&Bytes> {
    self.comp_value.as_ref()
  }

  pub fn children(&self) -> &[Condition] {
    &self.children
  }

  /// Takes the node apart so that a transformation can rebuild it.
  pub fn into_parts(self) -> (Encoding, Operator, Option<Bytes>, Vec<Condition>) {
    (self.encoding, self.operator, self.comp_value, self.children)
  }

  pub fn into_children(self) -> Vec<Condition> {
    self.children
  }

  /// Logical connective (`And`, `Or`, `Nor`).
  pub fn is_logical(&self) -> bool {
    self.operator.is_logical()
  }

  /// Total number of nodes in this subtree.
  pub fn size(&self) -> usize {
    1 + self.children.iter().map(Condition::size).sum::<usize>()
  }

  /// Length of the longest root to leaf path, a single node has depth 1.
  pub fn depth(&self) -> usize {
    1 + self.children.iter().map(Condition::depth).max().unwrap_or(0)
  }

  /// The encoding this node effectively addresses once `None`-encoded
  /// logical wrappers are skipped.
  ///
  /// For logical nodes the children are resolved in order, a `Calldata`
  /// or `AbiEncoded` child wins over `Dynamic` siblings. Returns `None`
  /// for logical nodes without children.
  pub fn effective_encoding(&self) -> Option<Encoding> {
    if !(self.is_logical() && self.encoding == Encoding::None) {
      return Some(self.encoding);
    }

    let mut resolved: Option<Encoding> = None;
    for child in &self.children {
      let current = child.effective_encoding()?;
      resolved = match resolved {
        None => Some(current),
        Some(r) if r == current => Some(r),
        Some(r) if r.is_structural() && current == Encoding::Dynamic => {
          Some(r)
        }
        Some(r) if r == Encoding::Dynamic && current.is_structural() => {
          Some(current)
        }
        Some(r) => Some(r),
      };
    }
    resolved
  }

  /// Compact structural identity of this subtree, see [`ConditionId`].
  ///
  /// The id is computed once and memoized, so repeated dedup and sort
  /// passes over the same nodes do not re-flatten them.
  pub fn id(&self) -> Result<&ConditionId, flat::Error> {
    self.id_cache.get_or_try_init(|| ConditionId::of(self))
  }
}

impl PartialEq for Condition {
  fn eq(&self, other: &Self) -> bool {
    self.encoding == other.encoding
      && self.operator == other.operator
      && self.comp_value == other.comp_value
      && self.children == other.children
  }
}

impl Eq for Condition {}

impl Debug for Condition {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let mut s = f.debug_struct("Condition");
    s.field("encoding", &self.encoding);
    s.field("operator", &self.operator);
    if let Some(ref value) = self.comp_value {
      s.field("comp_value", value);
    }
    if !self.children.is_empty() {
      s.field("children", &self.children);
    }
    s.finish()
  }
}
