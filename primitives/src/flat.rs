use {
  crate::{Bytes, Condition, Encoding, Operator},
  std::collections::VecDeque,
  thiserror::Error,
};

/// The packed representation stores the parent index in 8 bits.
pub const MAX_NODES: usize = 256;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
  #[error(
    "Condition tree has {0} nodes, the packed format holds at most {MAX_NODES}"
  )]
  TooManyNodes(usize),
}

/// One entry of a breadth-first flattened condition tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatCondition<'a> {
  pub parent: u8,
  pub encoding: Encoding,
  pub operator: Operator,
  pub comp_value: Option<&'a Bytes>,
  pub node: &'a Condition,
}

impl FlatCondition<'_> {
  /// `parent:8 | encoding:3 | operator:5`, big endian.
  pub fn op_word(&self) -> [u8; 2] {
    let encoding: u8 = self.encoding.into();
    let operator: u8 = self.operator.into();
    [self.parent, (encoding << 5) | (operator & 0x1f)]
  }
}

/// Flattens a condition tree breadth-first into a parent-indexed list.
///
/// The root is its own parent (index 0). Fails instead of truncating when
/// the tree does not fit into the 8-bit parent field.
pub fn flatten(root: &Condition) -> Result<Vec<FlatCondition<'_>>, Error> {
  let size = root.size();
  if size > MAX_NODES {
    return Err(Error::TooManyNodes(size));
  }

  let mut output = Vec::with_capacity(size);
  let mut queue = VecDeque::from([(0u8, root)]);
  while let Some((parent, node)) = queue.pop_front() {
    // size was checked above, so every index fits in a u8
    let index = output.len() as u8;
    output.push(FlatCondition {
      parent,
      encoding: node.encoding(),
      operator: node.operator(),
      comp_value: node.comp_value(),
      node,
    });
    queue.extend(node.children().iter().map(|child| (index, child)));
  }

  Ok(output)
}
