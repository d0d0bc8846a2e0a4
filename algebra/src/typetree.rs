use roles_primitives::{Condition, Encoding, Operator};

/// Pure shape of a condition subtree: the encoding of every addressed value
/// and the nested layout of composite values, with operators and comparison
/// values stripped away.
///
/// Type trees are derived on demand to align sibling branches and are never
/// stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeTree {
  pub encoding: Encoding,
  pub children: Vec<TypeTree>,
}

impl TypeTree {
  pub fn leaf(encoding: Encoding) -> Self {
    Self {
      encoding,
      children: vec![],
    }
  }

  /// Derives the shape addressed by a condition.
  ///
  /// Logical nodes take the union of their branches. Arrays have a single
  /// element shape. Allowance markers have no position and are left out.
  /// Returns `None` for nodes that do not address any value.
  pub fn of(condition: &Condition) -> Option<Self> {
    if condition.is_logical() {
      return Self::union(condition.children());
    }

    match condition.encoding() {
      Encoding::None => None,
      Encoding::Static | Encoding::Dynamic => {
        Some(Self::leaf(condition.encoding()))
      }
      Encoding::Array => Some(Self {
        encoding: Encoding::Array,
        children: Self::union(condition.children()).into_iter().collect(),
      }),
      encoding @ (Encoding::Tuple | Encoding::Calldata | Encoding::AbiEncoded) => {
        Some(Self {
          encoding,
          children: condition
            .children()
            .iter()
            .filter(|child| !child.operator().is_marker())
            .map(|child| {
              Self::of(child).unwrap_or_else(|| Self::leaf(Encoding::None))
            })
            .collect(),
        })
      }
    }
  }

  /// Merged shape of a list of sibling conditions.
  pub fn union(conditions: &[Condition]) -> Option<Self> {
    conditions.iter().filter_map(Self::of).reduce(Self::merge)
  }

  /// Combines two shapes so that the result describes everything either of
  /// them describes. A `Calldata`/`AbiEncoded` shape refines `Dynamic`.
  pub fn merge(self, other: Self) -> Self {
    match (self.encoding, other.encoding) {
      (a, b) if a == b => {
        let mut children = Vec::with_capacity(
          self.children.len().max(other.children.len()),
        );
        let mut left = self.children.into_iter();
        let mut right = other.children.into_iter();
        loop {
          match (left.next(), right.next()) {
            (Some(l), Some(r)) => children.push(l.merge(r)),
            (Some(l), None) => children.push(l),
            (None, Some(r)) => children.push(r),
            (None, None) => break,
          }
        }
        Self {
          encoding: a,
          children,
        }
      }
      (Encoding::Dynamic, b) if b.is_structural() => other,
      (Encoding::None, _) => other,
      _ => self,
    }
  }

  /// ABI dynamic types are encoded out of place with a length prefix.
  pub fn is_dynamic(&self) -> bool {
    match self.encoding {
      Encoding::Dynamic
      | Encoding::Array
      | Encoding::Calldata
      | Encoding::AbiEncoded => true,
      Encoding::Tuple => self.children.iter().any(TypeTree::is_dynamic),
      Encoding::None | Encoding::Static => false,
    }
  }

  /// A `Pass` node describing this shape.
  pub fn to_pass(&self) -> Condition {
    let children = match self.encoding {
      Encoding::Tuple | Encoding::Array => {
        self.children.iter().map(TypeTree::to_pass).collect()
      }
      _ => vec![],
    };
    Condition::pass(self.encoding).with_children(children)
  }
}

/// Extends a condition with `Pass` nodes so that it describes `tree`.
///
/// Nothing is ever removed, only missing branches are inserted. Positions
/// are appended only to tuples with a static layout, where every field has
/// to be present to keep word alignment. Tails of dynamic positional
/// structures are pruned by the normalizer and are left alone here.
pub fn pad(condition: Condition, tree: &TypeTree) -> Condition {
  if condition.is_logical() {
    let (encoding, operator, value, children) = condition.into_parts();
    let children = children.into_iter().map(|c| pad(c, tree)).collect();
    return Condition::from_parts(encoding, operator, value, children);
  }

  if condition.encoding() != tree.encoding {
    return condition;
  }

  let (encoding, operator, value, children) = condition.into_parts();
  let children = match encoding {
    Encoding::Array => match tree.children.first() {
      Some(element) => children.into_iter().map(|c| pad(c, element)).collect(),
      None => children,
    },
    Encoding::Tuple | Encoding::Calldata | Encoding::AbiEncoded => {
      pad_positions(encoding, children, tree)
    }
    _ => children,
  };
  Condition::from_parts(encoding, operator, value, children)
}

fn pad_positions(
  encoding: Encoding,
  children: Vec<Condition>,
  tree: &TypeTree,
) -> Vec<Condition> {
  let (markers, positional): (Vec<_>, Vec<_>) = children
    .into_iter()
    .partition(|child| child.operator().is_marker());

  let present = positional.len();
  let mut output: Vec<_> = positional
    .into_iter()
    .zip(tree.children.iter().map(Some).chain(std::iter::repeat(None)))
    .map(|(child, field)| match field {
      Some(field) => pad(child, field),
      None => child,
    })
    .collect();

  if encoding == Encoding::Tuple && !tree.is_dynamic() {
    output.extend(tree.children.iter().skip(present).map(TypeTree::to_pass));
  }

  output.extend(markers);
  output
}

/// Pads every sibling to the union of all their shapes.
pub fn align(siblings: Vec<Condition>) -> Vec<Condition> {
  match TypeTree::union(&siblings) {
    Some(tree) => siblings.into_iter().map(|c| pad(c, &tree)).collect(),
    None => siblings,
  }
}

/// Whether a node is an order-free allowance marker.
pub(crate) fn is_marker(condition: &Condition) -> bool {
  condition.operator().is_marker() && condition.encoding() == Encoding::None
}

/// A `Pass` node whose whole subtree only describes layout.
pub(crate) fn is_vacuous(condition: &Condition) -> bool {
  condition.operator() == Operator::Pass
    && condition.children().iter().all(is_vacuous)
}

#[cfg(test)]
mod tests {
  use {
    super::{align, pad, TypeTree},
    roles_primitives::{Bytes, Condition, Encoding, Operator},
  };

  fn eq(value: u128) -> Condition {
    Condition::equal_to(Encoding::Static, Bytes::word(value))
  }

  #[test]
  fn type_tree_ignores_operators() {
    let a = Condition::matches(Encoding::Tuple, vec![
      eq(1),
      Condition::pass(Encoding::Dynamic),
    ]);
    let b = Condition::new(Encoding::Tuple, Operator::EqualTo)
      .with_comp_value(vec![1u8])
      .with_children(vec![
        Condition::pass(Encoding::Static),
        Condition::pass(Encoding::Dynamic),
      ]);
    assert_eq!(TypeTree::of(&a), TypeTree::of(&b));
    assert!(TypeTree::of(&a).unwrap().is_dynamic());
  }

  #[test]
  fn type_tree_of_logical_is_union() {
    let condition = Condition::or(vec![
      Condition::matches(Encoding::Calldata, vec![eq(1)]),
      Condition::matches(Encoding::Calldata, vec![
        Condition::pass(Encoding::Static),
        Condition::pass(Encoding::Dynamic),
      ]),
    ]);
    let tree = TypeTree::of(&condition).unwrap();
    assert_eq!(tree.encoding, Encoding::Calldata);
    assert_eq!(tree.children, vec![
      TypeTree::leaf(Encoding::Static),
      TypeTree::leaf(Encoding::Dynamic)
    ]);
  }

  #[test]
  fn markers_have_no_position() {
    let condition = Condition::matches(Encoding::Calldata, vec![
      eq(1),
      Condition::new(Encoding::None, Operator::EtherWithinAllowance)
        .with_comp_value(Bytes::word(1)),
    ]);
    assert_eq!(TypeTree::of(&condition).unwrap().children.len(), 1);
  }

  #[test]
  fn static_tuples_are_padded() {
    let short = Condition::matches(Encoding::Tuple, vec![eq(1)]);
    let tree = TypeTree {
      encoding: Encoding::Tuple,
      children: vec![
        TypeTree::leaf(Encoding::Static),
        TypeTree::leaf(Encoding::Static),
      ],
    };
    let padded = pad(short, &tree);
    assert_eq!(
      padded,
      Condition::matches(Encoding::Tuple, vec![
        eq(1),
        Condition::pass(Encoding::Static)
      ])
    );
  }

  #[test]
  fn dynamic_tails_are_not_padded() {
    let short = Condition::matches(Encoding::Calldata, vec![eq(1)]);
    let tree = TypeTree {
      encoding: Encoding::Calldata,
      children: vec![
        TypeTree::leaf(Encoding::Static),
        TypeTree::leaf(Encoding::Static),
      ],
    };
    assert_eq!(pad(short.clone(), &tree), short);
  }

  #[test]
  fn nested_static_tuples_align_across_siblings() {
    let a = Condition::matches(Encoding::Calldata, vec![Condition::matches(
      Encoding::Tuple,
      vec![eq(1)],
    )]);
    let b = Condition::matches(Encoding::Calldata, vec![Condition::matches(
      Encoding::Tuple,
      vec![Condition::pass(Encoding::Static), eq(2)],
    )]);

    let aligned = align(vec![a, b]);
    assert_eq!(
      aligned[0],
      Condition::matches(Encoding::Calldata, vec![Condition::matches(
        Encoding::Tuple,
        vec![eq(1), Condition::pass(Encoding::Static)]
      )])
    );
    assert_eq!(aligned[1].children()[0].children().len(), 2);
  }

  #[test]
  fn pass_of_tuple_carries_layout() {
    let tree = TypeTree {
      encoding: Encoding::Tuple,
      children: vec![
        TypeTree::leaf(Encoding::Static),
        TypeTree {
          encoding: Encoding::Array,
          children: vec![TypeTree::leaf(Encoding::Static)],
        },
      ],
    };
    let pass = tree.to_pass();
    assert_eq!(pass.size(), 4);
    assert_eq!(TypeTree::of(&pass), Some(tree));
  }
}
