//! Moves logical operators up past `Matches` boundaries.
//!
//! Hoisting is the inverse of the normalizer's push-down step:
//!
//! ```text
//! Matches(a, Or(x, y)) => Or(Matches(a, x), Matches(a, y))
//! ```
//!
//! Both shapes accept the same calls, hoisting is used to search for
//! alternative shapes of a condition.

use {
  crate::{
    normalize::{Error, Normalizer},
    Config,
  },
  roles_primitives::{Condition, Encoding, Operator},
  tracing::debug,
};

fn normalizer() -> Normalizer {
  Normalizer::new(Config {
    push_down: false,
    ..Default::default()
  })
}

/// Performs a single hoist step.
///
/// Candidates are searched from the leaves up, the first `And`/`Or` that is
/// a direct child of a `Matches` node is lifted above it. Returns `None` if
/// there is nothing to hoist.
pub fn hoist_once(condition: &Condition) -> Option<Condition> {
  for (index, child) in condition.children().iter().enumerate() {
    if let Some(hoisted) = hoist_once(child) {
      let mut children = condition.children().to_vec();
      children[index] = hoisted;
      return Some(rebuild(condition, children));
    }
  }

  if condition.operator() != Operator::Matches {
    return None;
  }

  condition
    .children()
    .iter()
    .position(|c| matches!(c.operator(), Operator::And | Operator::Or))
    .map(|index| lift(condition, index))
}

/// Hoists logical operators until none is left directly below a `Matches`.
pub fn hoist_condition(condition: Condition) -> Result<Condition, Error> {
  let normalizer = normalizer();
  let mut current = normalizer.normalize(condition)?;
  let mut steps = 0usize;

  while let Some(hoisted) = hoist_once(&current) {
    steps += 1;
    current = normalizer.normalize(hoisted)?;
  }

  debug!("hoisted condition in {steps} step(s)");
  Ok(current)
}

/// Enumerates the variants of a root `Matches(Calldata)` obtained by hoisting
/// each of its top-level `Or` parameters, one variant per `Or`.
///
/// Returns an empty list for any other root or when no parameter is an
/// `Or`.
pub fn hoist_top_ors(condition: Condition) -> Result<Vec<Condition>, Error> {
  let normalizer = normalizer();
  let root = normalizer.normalize(condition)?;

  if root.operator() != Operator::Matches
    || root.encoding() != Encoding::Calldata
  {
    return Ok(vec![]);
  }

  root
    .children()
    .iter()
    .enumerate()
    .filter(|(_, child)| child.operator() == Operator::Or)
    .map(|(index, _)| normalizer.normalize(lift(&root, index)))
    .collect()
}

/// Replaces `matches` by a logical node over copies of it, one per branch of
/// the logical child at `index`.
fn lift(matches: &Condition, index: usize) -> Condition {
  let logical = &matches.children()[index];
  let branches = logical
    .children()
    .iter()
    .map(|branch| {
      let mut children = matches.children().to_vec();
      children[index] = branch.clone();
      rebuild(matches, children)
    })
    .collect();

  Condition::new(logical.encoding(), logical.operator()).with_children(branches)
}

fn rebuild(condition: &Condition, children: Vec<Condition>) -> Condition {
  Condition::from_parts(
    condition.encoding(),
    condition.operator(),
    condition.comp_value().cloned(),
    children,
  )
}
