use {
  crate::{
    typetree::{is_marker, is_vacuous, pad, TypeTree},
    Config,
  },
  roles_primitives::{
    Condition,
    ConditionId,
    Encoding,
    FlattenError,
    Operator,
  },
  std::collections::{BTreeMap, BTreeSet},
  thiserror::Error,
  tracing::{debug, trace},
};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
  #[error(transparent)]
  Flatten(#[from] FlattenError),

  #[error("Condition is nested {depth} levels deep, the limit is {limit}")]
  TooDeep { depth: usize, limit: usize },
}

/// Rewrites conditions into one canonical representative per equivalence
/// class.
///
/// Processing starts at the leaves and works its way up, so every step at a
/// node can rely on the children of that node being normalized already. A
/// single pass is enough, running the normalizer on its own output gives
/// back the same tree.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
  config: Config,
}

/// Normalizes a condition with the default configuration.
pub fn normalize(condition: Condition) -> Result<Condition, Error> {
  Normalizer::default().normalize(condition)
}

impl Normalizer {
  pub fn new(config: Config) -> Self {
    Self { config }
  }

  pub fn normalize(&self, condition: Condition) -> Result<Condition, Error> {
    let depth = condition.depth();
    if depth > self.config.max_depth {
      return Err(Error::TooDeep {
        depth,
        limit: self.config.max_depth,
      });
    }

    // the canonical form has to fit the packed format
    let normalized = self.normalize_tree(condition)?;
    normalized.id()?;
    Ok(normalized)
  }

  fn normalize_tree(&self, condition: Condition) -> Result<Condition, Error> {
    let (encoding, operator, value, children) = condition.into_parts();
    let children = match (encoding, operator) {
      (Encoding::None, Operator::And | Operator::Or) => {
        splice_branches(operator, children)
      }
      _ => children,
    };
    let children = children
      .into_iter()
      .map(|child| self.normalize_tree(child))
      .collect::<Result<Vec<_>, _>>()?;
    self.normalize_node(Condition::from_parts(
      encoding, operator, value, children,
    ))
  }

  /// Runs the pipeline on a node whose children are already normalized.
  fn normalize_node(&self, condition: Condition) -> Result<Condition, Error> {
    trace!(
      "normalizing {:?} over {:?}",
      condition.operator(),
      condition.encoding()
    );

    let condition = prune_trailing_pass(condition)?;
    let condition = self.align_branches(condition)?;
    let condition = flatten_branches(condition);
    let condition = absorb_vacuous_branches(condition);
    let condition = dedupe_branches(condition)?;
    let condition = unwrap_single_branch(condition);

    if self.config.push_down {
      if let Some(pushed) = self.push_down(&condition)? {
        return Ok(pushed);
      }
    }

    let condition = sort_branches(condition)?;
    Ok(strip_placeholders(condition))
  }

  /// Pads the branches of `And`/`Or` and the elements of an array `Matches`
  /// to their common shape.
  ///
  /// Padding a normalized branch may reorder its own sub-branches, so
  /// every branch that actually changes shape is normalized again.
  fn align_branches(&self, condition: Condition) -> Result<Condition, Error> {
    let aligned = match condition.operator() {
      Operator::And | Operator::Or => true,
      Operator::Matches => condition.encoding() == Encoding::Array,
      _ => false,
    };
    if !aligned || condition.children().len() < 2 {
      return Ok(condition);
    }

    let Some(tree) = TypeTree::union(condition.children()) else {
      return Ok(condition);
    };

    let (encoding, operator, value, children) = condition.into_parts();
    let children = children
      .into_iter()
      .map(|child| match TypeTree::of(&child) {
        Some(ref shape) if shape == &tree => Ok(child),
        _ => self.normalize_tree(pad(child, &tree)),
      })
      .collect::<Result<Vec<_>, _>>()?;

    Ok(Condition::from_parts(encoding, operator, value, children))
  }

  /// Factors `Matches` branches of a logical node that differ in at most
  /// one child position (the hinge):
  ///
  /// ```text
  /// Or(Matches(a, x), Matches(a, y), z) => Or(Matches(a, Or(x, y)), z)
  /// ```
  ///
  /// Hinges are tried from the first position on and every group of
  /// branches sharing all other positions is merged. The result is
  /// normalized again, which repeats this until no two branches share all
  /// but one position. Returns `None` when nothing could be merged.
  fn push_down(&self, condition: &Condition) -> Result<Option<Condition>, Error> {
    let operator = condition.operator();
    if !matches!(operator, Operator::And | Operator::Or) {
      return Ok(None);
    }

    let branches = condition.children();
    let rows = factorable_rows(branches)?;
    let width = rows.iter().map(|row| row.cells.len()).max().unwrap_or(0);

    for hinge in 0..width {
      let mut groups: BTreeMap<_, Vec<&Row>> = BTreeMap::new();
      for row in rows.iter().filter(|row| row.cells.len() > hinge) {
        let mut others = Vec::with_capacity(row.cells.len());
        for (position, cell) in row.cells.iter().enumerate() {
          if position != hinge {
            others.push(cell.id()?.clone());
          }
        }
        groups
          .entry((row.encoding, &row.markers, others))
          .or_default()
          .push(row);
      }

      if groups.values().all(|group| group.len() < 2) {
        continue;
      }

      let mut merged = BTreeSet::new();
      let mut children = Vec::with_capacity(branches.len());
      for group in groups.values().filter(|group| group.len() > 1) {
        merged.extend(group.iter().map(|row| row.index));
        children.push(self.factor(operator, hinge, group, branches)?);
      }
      children.extend(
        branches
          .iter()
          .enumerate()
          .filter(|(index, _)| !merged.contains(index))
          .map(|(_, branch)| branch.clone()),
      );

      debug!(
        "pushing {operator:?} down into position {hinge}, {} of {} branches \
         remain",
        children.len(),
        branches.len()
      );

      return Ok(Some(self.normalize_node(
        Condition::new(Encoding::None, operator).with_children(children),
      )?));
    }

    Ok(None)
  }

  /// Collapses a group of branches that agree everywhere but at `hinge`
  /// into a single `Matches`.
  fn factor(
    &self,
    operator: Operator,
    hinge: usize,
    group: &[&Row],
    branches: &[Condition],
  ) -> Result<Condition, Error> {
    let hinge_node = self.normalize_node(
      Condition::new(Encoding::None, operator)
        .with_children(group.iter().map(|row| row.cells[hinge].clone()).collect()),
    )?;

    let template = group[0];
    let mut children = template.cells.clone();
    children[hinge] = hinge_node;
    children.extend(
      branches[template.index]
        .children()
        .iter()
        .filter(|c| is_marker(c))
        .cloned(),
    );

    self.normalize_node(Condition::matches(template.encoding, children))
  }
}

/// A `Matches` branch as seen by push-down.
struct Row {
  index: usize,
  encoding: Encoding,
  cells: Vec<Condition>,
  markers: Vec<ConditionId>,
}

/// Rows of the `Matches` branches that have at least one sibling of the same
/// encoding, with positional children extended to a common length.
fn factorable_rows(branches: &[Condition]) -> Result<Vec<Row>, Error> {
  let encodings: BTreeSet<_> = branches
    .iter()
    .filter(|b| b.operator() == Operator::Matches)
    .map(Condition::encoding)
    .collect();

  let mut rows = Vec::with_capacity(branches.len());
  for encoding in encodings {
    let members: Vec<_> = branches
      .iter()
      .enumerate()
      .filter(|(_, b)| {
        b.operator() == Operator::Matches && b.encoding() == encoding
      })
      .collect();
    if members.len() < 2 {
      continue;
    }

    let group: Vec<_> = members.iter().map(|(_, b)| (*b).clone()).collect();
    let Some(cells) = positional_rows(&group) else {
      continue;
    };

    for ((index, branch), cells) in members.into_iter().zip(cells) {
      rows.push(Row {
        index,
        encoding,
        cells,
        markers: marker_ids(branch)?,
      });
    }
  }
  Ok(rows)
}

fn marker_ids(condition: &Condition) -> Result<Vec<ConditionId>, Error> {
  condition
    .children()
    .iter()
    .filter(|c| is_marker(c))
    .map(|c| Ok(c.id()?.clone()))
    .collect()
}

/// Positional children of each `Matches` branch, extended to equal length.
///
/// Trailing `Pass` children of dynamic structures are pruned and static
/// tuples under a mixed parent are not aligned, so shorter branches are
/// extended with `Pass` nodes of the missing fields. Arrays of different
/// lengths never match.
fn positional_rows(branches: &[Condition]) -> Option<Vec<Vec<Condition>>> {
  let mut rows: Vec<Vec<Condition>> = branches
    .iter()
    .map(|b| {
      b.children()
        .iter()
        .filter(|c| !is_marker(c))
        .cloned()
        .collect()
    })
    .collect();

  let width = rows.iter().map(Vec::len).max().unwrap_or(0);
  if rows.iter().all(|row| row.len() == width) {
    return Some(rows);
  }

  let tree = TypeTree::union(branches)?;
  if tree.encoding == Encoding::Array {
    return None;
  }

  for row in rows.iter_mut() {
    let present = row.len();
    row.extend(
      tree
        .children
        .iter()
        .take(width)
        .skip(present)
        .map(TypeTree::to_pass),
    );
  }

  rows.iter().all(|row| row.len() == width).then_some(rows)
}

/// `Matches` nodes over dynamically encoded structures do not need trailing
/// `Pass` children: a missing field is not checked either way. Static tuples
/// keep them, removing a field there would shift every following word.
///
/// Allowance markers are collected at the very end, ordered by id.
fn prune_trailing_pass(condition: Condition) -> Result<Condition, Error> {
  if condition.operator() != Operator::Matches {
    return Ok(condition);
  }

  let prunable = match condition.encoding() {
    Encoding::Calldata | Encoding::AbiEncoded => true,
    Encoding::Tuple => TypeTree::of(&condition)
      .map(|tree| tree.is_dynamic())
      .unwrap_or(false),
    _ => false,
  };
  if !prunable {
    return Ok(condition);
  }

  let (encoding, operator, value, children) = condition.into_parts();
  let (mut markers, mut positional): (Vec<_>, Vec<_>) =
    children.into_iter().partition(is_marker);

  let keep = positional
    .iter()
    .rposition(|c| c.operator() != Operator::Pass)
    .map(|last| last + 1)
    .unwrap_or(0);

  // never leave a Matches without any child
  let keep = match (keep, markers.is_empty()) {
    (0, true) => 1.min(positional.len()),
    (keep, _) => keep,
  };
  positional.truncate(keep);

  markers = sort_by_id(markers)?;
  positional.extend(markers);
  Ok(Condition::from_parts(encoding, operator, value, positional))
}

/// Lifts the branches of nested `operator` nodes, and of `And`/`Or` nodes
/// with a single branch, into the parent before anything below it is
/// normalized. Push-down then sees the same branches no matter how the
/// input grouped them.
fn splice_branches(operator: Operator, children: Vec<Condition>) -> Vec<Condition> {
  let mut spliced = Vec::with_capacity(children.len());
  for child in children {
    let nested = child.encoding() == Encoding::None
      && (child.operator() == operator
        || (matches!(child.operator(), Operator::And | Operator::Or)
          && child.children().len() == 1));
    match nested {
      true => spliced.extend(splice_branches(operator, child.into_children())),
      false => spliced.push(child),
    }
  }
  spliced
}

/// `And(And(a, b), c)` is `And(a, b, c)`, same for `Or`.
fn flatten_branches(condition: Condition) -> Condition {
  let operator = condition.operator();
  if !matches!(operator, Operator::And | Operator::Or) {
    return condition;
  }

  let (encoding, operator, value, children) = condition.into_parts();
  let mut flattened = Vec::with_capacity(children.len());
  for child in children {
    if child.operator() == operator && child.encoding() == Encoding::None {
      flattened.extend(child.into_children());
    } else {
      flattened.push(child);
    }
  }
  Condition::from_parts(encoding, operator, value, flattened)
}

/// A branch that accepts everything makes an `Or` accept everything and
/// adds nothing to an `And`.
fn absorb_vacuous_branches(condition: Condition) -> Condition {
  match condition.operator() {
    Operator::Or => match condition.children().iter().position(is_vacuous) {
      Some(index) => condition.into_children().swap_remove(index),
      None => condition,
    },
    Operator::And => {
      if !condition.children().iter().any(is_vacuous) {
        return condition;
      }
      let (encoding, operator, value, children) = condition.into_parts();
      let (vacuous, mut constraining): (Vec<_>, Vec<_>) =
        children.into_iter().partition(is_vacuous);
      if constraining.is_empty() {
        constraining.extend(vacuous.into_iter().take(1));
      }
      Condition::from_parts(encoding, operator, value, constraining)
    }
    _ => condition,
  }
}

/// Removes branches with the same id as an earlier branch.
fn dedupe_branches(condition: Condition) -> Result<Condition, Error> {
  if !condition.is_logical() {
    return Ok(condition);
  }

  let (encoding, operator, value, children) = condition.into_parts();
  let mut seen = BTreeSet::new();
  let mut unique = Vec::with_capacity(children.len());
  for child in children {
    if seen.insert(child.id()?.clone()) {
      unique.push(child);
    }
  }
  Ok(Condition::from_parts(encoding, operator, value, unique))
}

/// `And(a)` and `Or(a)` are just `a`. `Nor(a)` is a negation and stays.
fn unwrap_single_branch(condition: Condition) -> Condition {
  match condition.operator() {
    Operator::And | Operator::Or if condition.children().len() == 1 => {
      condition.into_children().swap_remove(0)
    }
    _ => condition,
  }
}

fn sort_by_id(conditions: Vec<Condition>) -> Result<Vec<Condition>, Error> {
  let mut keyed = conditions
    .into_iter()
    .map(|c| Ok((c.id()?.clone(), c)))
    .collect::<Result<Vec<_>, Error>>()?;
  keyed.sort_by(|(a, _), (b, _)| a.cmp(b));
  Ok(keyed.into_iter().map(|(_, c)| c).collect())
}

/// Orders logical branches by ascending id, then moves branches that
/// address `Calldata`/`AbiEncoded` in front of their `Dynamic` siblings.
fn sort_branches(condition: Condition) -> Result<Condition, Error> {
  if !condition.is_logical() {
    return Ok(condition);
  }

  let (encoding, operator, value, children) = condition.into_parts();
  let (mut structural, rest): (Vec<_>, Vec<_>) = sort_by_id(children)?
    .into_iter()
    .partition(|c| {
      c.effective_encoding()
        .map(|e| e.is_structural())
        .unwrap_or(false)
    });
  structural.extend(rest);
  Ok(Condition::from_parts(encoding, operator, value, structural))
}

/// Drops empty comparison values from operators that take none.
fn strip_placeholders(condition: Condition) -> Condition {
  let operator = condition.operator();
  let takes_value = operator.is_comparison() || operator.is_allowance();
  match condition.comp_value() {
    Some(value) if value.is_empty() && !takes_value => {
      let (encoding, operator, _, children) = condition.into_parts();
      Condition::from_parts(encoding, operator, None, children)
    }
    _ => condition,
  }
}
