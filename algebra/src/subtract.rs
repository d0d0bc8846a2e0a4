use {
  crate::normalize::{normalize, Error},
  roles_primitives::{Condition, ConditionId, Operator},
  std::collections::BTreeSet,
  tracing::trace,
};

/// Outcome of subtracting one condition from another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Difference {
  /// Everything the whole accepts is also accepted by the part.
  Empty,

  /// The subtraction does not apply to this pair of shapes. Carries the
  /// whole as it was given.
  Unchanged(Condition),

  /// What remains of the whole, normalized.
  Remainder(Condition),
}

impl Difference {
  pub fn is_empty(&self) -> bool {
    matches!(self, Self::Empty)
  }

  pub fn is_unchanged(&self) -> bool {
    matches!(self, Self::Unchanged(_))
  }

  /// The remaining condition, `None` when nothing remains.
  pub fn into_condition(self) -> Option<Condition> {
    match self {
      Self::Empty => None,
      Self::Unchanged(c) | Self::Remainder(c) => Some(c),
    }
  }
}

/// Computes `whole` minus `part`: a condition accepting the calls `whole`
/// accepts except those that `part` accepts as well.
///
/// Both sides are normalized first and compared by content id. Pairs whose
/// structure does not allow an exact symbolic difference come back as
/// [`Difference::Unchanged`], this is never an error.
pub fn subtract_condition(
  whole: &Condition,
  part: &Condition,
) -> Result<Difference, Error> {
  let normalized_whole = normalize(whole.clone())?;
  let normalized_part = normalize(part.clone())?;

  Ok(match subtract(normalized_whole, &normalized_part)? {
    Difference::Unchanged(_) => Difference::Unchanged(whole.clone()),
    other => other,
  })
}

/// Subtraction over normalized operands.
fn subtract(whole: Condition, part: &Condition) -> Result<Difference, Error> {
  if whole.id()? == part.id()? {
    return Ok(Difference::Empty);
  }

  trace!(
    "subtracting {:?} from {:?}",
    part.operator(),
    whole.operator()
  );

  match (whole.operator(), part.operator()) {
    (Operator::Or, Operator::Or) => subtract_branches(whole, part),
    (Operator::Or, _) => subtract_from_branches(whole, part),
    (_, Operator::Or) => subtract_disjunction(whole, part),
    (Operator::And, Operator::And) => subtract_conjunction(whole, part),
    (Operator::Matches, Operator::Matches)
      if whole.encoding() == part.encoding()
        && whole.children().len() == part.children().len() =>
    {
      subtract_at_hinge(whole, part)
    }
    _ => Ok(Difference::Unchanged(whole)),
  }
}

fn ids(conditions: &[Condition]) -> Result<BTreeSet<ConditionId>, Error> {
  conditions
    .iter()
    .map(|c| Ok(c.id()?.clone()))
    .collect()
}

/// Packs the remaining branches of a disjunction.
fn disjunction(mut branches: Vec<Condition>) -> Result<Difference, Error> {
  Ok(match branches.len() {
    0 => Difference::Empty,
    1 => Difference::Remainder(branches.swap_remove(0)),
    _ => Difference::Remainder(normalize(Condition::or(branches))?),
  })
}

/// `Or` minus `Or`: drops the whole's branches that the part lists as well.
fn subtract_branches(
  whole: Condition,
  part: &Condition,
) -> Result<Difference, Error> {
  let removed = ids(part.children())?;
  let mut remaining = Vec::with_capacity(whole.children().len());
  for branch in whole.children() {
    if !removed.contains(branch.id()?) {
      remaining.push(branch.clone());
    }
  }

  if remaining.len() == whole.children().len() {
    return Ok(Difference::Unchanged(whole));
  }
  disjunction(remaining)
}

/// `Or` minus anything else: subtracts the part from every branch.
fn subtract_from_branches(
  whole: Condition,
  part: &Condition,
) -> Result<Difference, Error> {
  let mut changed = false;
  let mut remaining = Vec::with_capacity(whole.children().len());
  for branch in whole.children() {
    match subtract(branch.clone(), part)? {
      Difference::Empty => changed = true,
      Difference::Remainder(rest) => {
        changed = true;
        remaining.push(rest);
      }
      Difference::Unchanged(branch) => remaining.push(branch),
    }
  }

  match changed {
    true => disjunction(remaining),
    false => Ok(Difference::Unchanged(whole)),
  }
}

/// Anything but `Or` minus `Or`: nothing remains once a single branch of
/// the part covers the whole.
fn subtract_disjunction(
  whole: Condition,
  part: &Condition,
) -> Result<Difference, Error> {
  for branch in part.children() {
    if subtract(whole.clone(), branch)?.is_empty() {
      return Ok(Difference::Empty);
    }
  }
  Ok(Difference::Unchanged(whole))
}

/// `And` minus `And` with the same number of branches, children are
/// compared as sets.
///
/// If both sides have exactly one branch the other side lacks, the
/// remainder is the common branches and the difference of that single pair.
/// Conjunctions of different sizes are left alone.
fn subtract_conjunction(
  whole: Condition,
  part: &Condition,
) -> Result<Difference, Error> {
  if whole.children().len() != part.children().len() {
    return Ok(Difference::Unchanged(whole));
  }

  let whole_ids = ids(whole.children())?;
  let part_ids = ids(part.children())?;

  let unique_part: Vec<_> = part
    .children()
    .iter()
    .filter(|c| c.id().map(|id| !whole_ids.contains(id)).unwrap_or(true))
    .collect();
  let unique_whole: Vec<_> = whole
    .children()
    .iter()
    .enumerate()
    .filter(|(_, c)| c.id().map(|id| !part_ids.contains(id)).unwrap_or(true))
    .collect();

  let ([(index, hinge)], [other]) =
    (unique_whole.as_slice(), unique_part.as_slice())
  else {
    return Ok(Difference::Unchanged(whole));
  };
  let index = *index;

  match subtract((*hinge).clone(), other)? {
    Difference::Empty => Ok(Difference::Empty),
    Difference::Unchanged(_) => Ok(Difference::Unchanged(whole)),
    Difference::Remainder(rest) => {
      let mut children = whole.children().to_vec();
      children[index] = rest;
      Ok(Difference::Remainder(normalize(Condition::and(children))?))
    }
  }
}

/// `Matches` minus `Matches` of the same shape that differ in exactly one
/// position.
fn subtract_at_hinge(
  whole: Condition,
  part: &Condition,
) -> Result<Difference, Error> {
  let Some(index) = single_difference(whole.children(), part.children())?
  else {
    return Ok(Difference::Unchanged(whole));
  };

  match subtract(whole.children()[index].clone(), &part.children()[index])? {
    Difference::Empty => Ok(Difference::Empty),
    Difference::Unchanged(_) => Ok(Difference::Unchanged(whole)),
    Difference::Remainder(rest) => {
      let (encoding, operator, value, mut children) = whole.into_parts();
      children[index] = rest;
      Ok(Difference::Remainder(normalize(Condition::from_parts(
        encoding, operator, value, children,
      ))?))
    }
  }
}

/// The only position at which two equally long child lists differ.
fn single_difference(
  left: &[Condition],
  right: &[Condition],
) -> Result<Option<usize>, Error> {
  let mut hinge = None;
  for (index, (l, r)) in left.iter().zip(right).enumerate() {
    if l.id()? != r.id()? {
      if hinge.is_some() {
        return Ok(None);
      }
      hinge = Some(index);
    }
  }
  Ok(hinge)
}
