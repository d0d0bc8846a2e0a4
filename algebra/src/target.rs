use {
  crate::{
    integrity::{self, check_condition},
    normalize,
    subtract::{subtract_condition, Difference},
  },
  rayon::prelude::*,
  roles_primitives::{
    Address,
    Clearance,
    Condition,
    Encoding,
    Function,
    Selector,
    Target,
  },
  std::collections::BTreeSet,
  thiserror::Error,
  tracing::debug,
};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
  #[error("Function {0} is wildcarded and carries a condition")]
  WildcardWithCondition(Selector),

  #[error("Function {0} is neither wildcarded nor scoped by a condition")]
  MissingCondition(Selector),

  #[error("Condition of function {0} must be rooted at Calldata, got {1:?}")]
  InvalidRootEncoding(Selector, Option<Encoding>),

  #[error("Target {0} is cleared entirely but lists functions")]
  FunctionsOnClearedTarget(Address),

  #[error("Function {1} is listed more than once on target {0}")]
  DuplicateFunction(Address, Selector),

  #[error("Invalid condition: {0}")]
  Integrity(#[from] integrity::Error),

  #[error(transparent)]
  Normalize(#[from] normalize::Error),
}

/// Validates a function permission on its own.
pub fn check_function(function: &Function) -> Result<(), Error> {
  match (function.wildcarded, &function.condition) {
    (true, Some(_)) => Err(Error::WildcardWithCondition(function.selector)),
    (true, None) => Ok(()),
    (false, None) => Err(Error::MissingCondition(function.selector)),
    (false, Some(condition)) => {
      check_condition(condition)?;
      match condition.effective_encoding() {
        Some(Encoding::Calldata) => Ok(()),
        other => Err(Error::InvalidRootEncoding(function.selector, other)),
      }
    }
  }
}

/// Validates a target permission and all of its functions.
pub fn check_target(target: &Target) -> Result<(), Error> {
  if target.clearance == Clearance::Target && !target.functions.is_empty() {
    return Err(Error::FunctionsOnClearedTarget(target.address));
  }

  let mut seen = BTreeSet::new();
  for function in &target.functions {
    if !seen.insert(function.selector) {
      return Err(Error::DuplicateFunction(target.address, function.selector));
    }
    check_function(function)?;
  }
  Ok(())
}

fn scope(function: &Function) -> Result<&Condition, Error> {
  function
    .condition
    .as_ref()
    .ok_or(Error::MissingCondition(function.selector))
}

/// Whether every call `part` allows is already allowed by `whole`.
///
/// Scoped functions are compared through condition subtraction: `whole`
/// includes `part` when nothing of `part` remains after removing `whole`
/// from it. Shapes the subtraction cannot relate are not included.
pub fn function_includes(whole: &Function, part: &Function) -> Result<bool, Error> {
  if whole.selector != part.selector
    || !whole.execution_options.includes(&part.execution_options)
  {
    return Ok(false);
  }

  if whole.wildcarded {
    return Ok(true);
  }

  if part.wildcarded {
    return Ok(false);
  }

  Ok(subtract_condition(scope(part)?, scope(whole)?)?.is_empty())
}

/// Whether every call `part` allows on its address is already allowed by
/// `whole`.
pub fn target_includes(whole: &Target, part: &Target) -> Result<bool, Error> {
  if whole.address != part.address
    || !whole.execution_options.includes(&part.execution_options)
  {
    return Ok(false);
  }

  match (whole.clearance, part.clearance) {
    (Clearance::Target, _) => Ok(true),
    (Clearance::Function, Clearance::Target) => Ok(false),
    (Clearance::Function, Clearance::Function) => {
      for function in &part.functions {
        let included = match whole.function(&function.selector) {
          Some(granted) => function_includes(granted, function)?,
          None => false,
        };
        if !included {
          debug!(
            "function {} on {} is not included",
            function.selector, part.address
          );
          return Ok(false);
        }
      }
      Ok(true)
    }
  }
}

/// Whether the permission set `whole` covers every target of `part`.
pub fn targets_include(whole: &[Target], part: &[Target]) -> Result<bool, Error> {
  part
    .par_iter()
    .map(|target| match whole.iter().find(|t| t.address == target.address) {
      Some(granted) => target_includes(granted, target),
      None => Ok(false),
    })
    .try_fold(|| true, |acc, included| included.map(|i| acc && i))
    .try_reduce(|| true, |a, b| Ok(a && b))
}

/// What remains of `whole` after removing what `part` allows, `None` when
/// nothing remains.
///
/// A function that `part` cannot be precisely removed from comes back
/// unchanged.
pub fn subtract_function(
  whole: &Function,
  part: &Function,
) -> Result<Option<Function>, Error> {
  if whole.selector != part.selector
    || !part.execution_options.includes(&whole.execution_options)
  {
    return Ok(Some(whole.clone()));
  }

  if part.wildcarded {
    return Ok(None);
  }

  if whole.wildcarded {
    return Ok(Some(whole.clone()));
  }

  Ok(match subtract_condition(scope(whole)?, scope(part)?)? {
    Difference::Empty => None,
    Difference::Unchanged(_) => Some(whole.clone()),
    Difference::Remainder(rest) => Some(Function::scoped(
      whole.selector,
      whole.execution_options,
      rest,
    )),
  })
}

/// What remains of a target permission after removing what `part` allows,
/// `None` when nothing remains.
///
/// Functions are subtracted in parallel.
pub fn subtract_target(
  whole: &Target,
  part: &Target,
) -> Result<Option<Target>, Error> {
  if whole.address != part.address
    || !part.execution_options.includes(&whole.execution_options)
  {
    return Ok(Some(whole.clone()));
  }

  match (whole.clearance, part.clearance) {
    (_, Clearance::Target) => return Ok(None),
    (Clearance::Target, Clearance::Function) => {
      return Ok(Some(whole.clone()));
    }
    (Clearance::Function, Clearance::Function) => {}
  }

  let remaining = whole
    .functions
    .par_iter()
    .map(|function| match part.function(&function.selector) {
      Some(removed) => subtract_function(function, removed),
      None => Ok(Some(function.clone())),
    })
    .collect::<Result<Vec<_>, _>>()?
    .into_iter()
    .flatten()
    .collect::<Vec<_>>();

  debug!(
    "{} of {} function(s) on {} remain",
    remaining.len(),
    whole.functions.len(),
    whole.address
  );

  if remaining.is_empty() {
    return Ok(None);
  }

  Ok(Some(Target {
    functions: remaining,
    ..whole.clone()
  }))
}

/// Role level difference: every target of `whole` with the matching target
/// of `part` removed from it. Targets that are gone entirely are dropped.
pub fn subtract_targets(
  whole: &[Target],
  part: &[Target],
) -> Result<Vec<Target>, Error> {
  let remaining = whole
    .par_iter()
    .map(|target| match part.iter().find(|t| t.address == target.address) {
      Some(removed) => subtract_target(target, removed),
      None => Ok(Some(target.clone())),
    })
    .collect::<Result<Vec<_>, _>>()?;

  Ok(remaining.into_iter().flatten().collect())
}
