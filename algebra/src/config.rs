use roles_primitives::MAX_NODES;

/// Settings of the normalization pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
  /// Deepest condition tree accepted by the normalizer.
  ///
  /// All transformations recurse along the tree, so this bounds the stack
  /// usage for inputs coming from untrusted sources. Trees that are
  /// deeper than this are rejected before any work is done.
  pub max_depth: usize,

  /// Whether logical nodes over `Matches` branches that differ in a single
  /// position are pushed down into that position.
  ///
  /// This is what keeps packed conditions minimal. Hoisting disables it,
  /// otherwise every hoisted shape would be pushed right back down.
  pub push_down: bool,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      // any tree that fits the packed format
      max_depth: MAX_NODES,
      push_down: true,
    }
  }
}
