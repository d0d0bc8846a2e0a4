use {
  roles_primitives::{
    Condition,
    Encoding::{self, AbiEncoded, Array, Calldata, Dynamic, Static, Tuple},
    Operator,
  },
  thiserror::Error,
};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
  #[error("Operator {0:?} cannot be applied to {1:?} encoded values")]
  UnsupportedEncoding(Operator, Encoding),

  #[error("Operator {0:?} on {1:?} requires a compValue")]
  MissingCompValue(Operator, Encoding),

  #[error("Operator {0:?} on {1:?} does not take a compValue")]
  UnexpectedCompValue(Operator, Encoding),

  #[error(
    "Operator {operator:?} on {encoding:?} got a compValue of {actual} bytes, \
     expected {expected}"
  )]
  CompValueLength {
    operator: Operator,
    encoding: Encoding,
    expected: String,
    actual: usize,
  },

  #[error("Operator {0:?} on {1:?} requires child conditions")]
  MissingChildren(Operator, Encoding),

  #[error("Operator {0:?} on {1:?} does not take child conditions")]
  UnexpectedChildren(Operator, Encoding),

  #[error(
    "Operator {operator:?} on {encoding:?} takes exactly {expected} child \
     condition(s), got {actual}"
  )]
  ChildCount {
    operator: Operator,
    encoding: Encoding,
    expected: usize,
    actual: usize,
  },

  #[error(
    "Branches of {operator:?} address mismatching encodings {first:?} and \
     {second:?}"
  )]
  MixedBranchEncodings {
    operator: Operator,
    first: Encoding,
    second: Encoding,
  },

  #[error("Root condition must address AbiEncoded or Calldata, got {0:?}")]
  InvalidRootEncoding(Option<Encoding>),
}

/// Operator to encoding compatibility table.
fn allowed_encodings(operator: Operator) -> &'static [Encoding] {
  match operator {
    Operator::Pass => &[Static, Dynamic, Tuple, Array, Calldata, AbiEncoded],
    Operator::And | Operator::Or | Operator::Nor => &[Encoding::None],
    Operator::Matches => &[Tuple, Array, Calldata, AbiEncoded],
    Operator::ArraySome | Operator::ArrayEvery | Operator::ArrayTailMatches => {
      &[Array]
    }
    Operator::EqualToAvatar => &[Static],
    Operator::EqualTo => &[Static, Dynamic, Tuple, Array],
    Operator::GreaterThan
    | Operator::LessThan
    | Operator::SignedIntGreaterThan
    | Operator::SignedIntLessThan => &[Static],
    Operator::Bitmask => &[Static, Dynamic],
    Operator::Custom => &[Static, Dynamic, Tuple, Array, Calldata, AbiEncoded],
    Operator::Slice => &[Static, Dynamic],
    Operator::WithinAllowance => &[Static],
    Operator::EtherWithinAllowance | Operator::CallWithinAllowance => {
      &[Encoding::None]
    }
    Operator::Empty => &[Encoding::None],
  }
}

enum CompValue {
  Forbidden,
  Any,
  Exactly(usize),
  AtLeast(usize),
  Bitmask,
}

fn comp_value_rule(operator: Operator, encoding: Encoding) -> CompValue {
  match operator {
    Operator::EqualTo if encoding == Static => CompValue::Exactly(32),
    Operator::EqualTo => CompValue::Any,
    Operator::GreaterThan
    | Operator::LessThan
    | Operator::SignedIntGreaterThan
    | Operator::SignedIntLessThan
    | Operator::WithinAllowance
    | Operator::EtherWithinAllowance
    | Operator::CallWithinAllowance => CompValue::Exactly(32),
    Operator::Bitmask => CompValue::Bitmask,
    Operator::Custom => CompValue::AtLeast(20),
    Operator::Slice => CompValue::Exactly(3),
    _ => CompValue::Forbidden,
  }
}

fn check_comp_value(condition: &Condition) -> Result<(), Error> {
  let operator = condition.operator();
  let encoding = condition.encoding();
  let value = condition.comp_value();
  let length_error = |expected, actual| Error::CompValueLength {
    operator,
    encoding,
    expected,
    actual,
  };

  match (comp_value_rule(operator, encoding), value) {
    (CompValue::Forbidden, None) => Ok(()),
    (CompValue::Forbidden, Some(_)) => {
      Err(Error::UnexpectedCompValue(operator, encoding))
    }
    (_, None) => Err(Error::MissingCompValue(operator, encoding)),
    (CompValue::Any, Some(_)) => Ok(()),
    (CompValue::Exactly(n), Some(v)) => match v.len() == n {
      true => Ok(()),
      false => Err(length_error(n.to_string(), v.len())),
    },
    (CompValue::AtLeast(n), Some(v)) => match v.len() >= n {
      true => Ok(()),
      false => Err(length_error(format!("at least {n}"), v.len())),
    },
    // 2 bytes shift, then a mask and an expected value of equal length
    (CompValue::Bitmask, Some(v)) => {
      match v.len() >= 4 && (v.len() - 2) % 2 == 0 {
        true => Ok(()),
        false => Err(length_error("2 + 2n".into(), v.len())),
      }
    }
  }
}

fn check_children(condition: &Condition) -> Result<(), Error> {
  let operator = condition.operator();
  let encoding = condition.encoding();
  let count = condition.children().len();
  let exactly = |expected| match count == expected {
    true => Ok(()),
    false => Err(Error::ChildCount {
      operator,
      encoding,
      expected,
      actual: count,
    }),
  };

  match operator {
    Operator::And
    | Operator::Or
    | Operator::Nor
    | Operator::Matches
    | Operator::ArrayTailMatches => match count {
      0 => Err(Error::MissingChildren(operator, encoding)),
      _ => Ok(()),
    },
    Operator::ArraySome | Operator::ArrayEvery | Operator::Slice => exactly(1),
    _ => match (encoding, count) {
      // composite values always carry their layout
      (Tuple | Array, 0) => Err(Error::MissingChildren(operator, encoding)),
      (Tuple | Array | Calldata | AbiEncoded, _) => Ok(()),
      (_, 0) => Ok(()),
      _ => Err(Error::UnexpectedChildren(operator, encoding)),
    },
  }
}

/// Resolves the encoding addressed by the branches of a logical node.
///
/// A `Dynamic` branch may follow a `Calldata`/`AbiEncoded` branch (the raw
/// bytes of an abi encoded blob), but may not precede it.
fn check_branch_encodings(condition: &Condition) -> Result<(), Error> {
  let operator = condition.operator();
  let mut resolved: Option<Encoding> = None;
  for child in condition.children() {
    let Some(current) = child.effective_encoding() else {
      continue;
    };
    resolved = match resolved {
      None => Some(current),
      Some(first) if first == current => Some(first),
      Some(first) if first.is_structural() && current == Dynamic => {
        Some(first)
      }
      Some(first) => {
        return Err(Error::MixedBranchEncodings {
          operator,
          first,
          second: current,
        })
      }
    };
  }
  Ok(())
}

/// Validates a condition subtree against the operator and encoding rules.
///
/// Children are checked before their parent, so the reported error always
/// points at the deepest offending node.
pub fn check_condition(condition: &Condition) -> Result<(), Error> {
  for child in condition.children() {
    check_condition(child)?;
  }

  let operator = condition.operator();
  let encoding = condition.encoding();
  if !allowed_encodings(operator).contains(&encoding) {
    return Err(Error::UnsupportedEncoding(operator, encoding));
  }

  check_comp_value(condition)?;
  check_children(condition)?;

  if condition.is_logical() {
    check_branch_encodings(condition)?;
  }

  Ok(())
}

/// Validates a condition that scopes a whole function call.
///
/// In addition to [`check_condition`], the root must address the abi encoded
/// call, either directly or through `None`-encoded logical wrappers.
pub fn check_root_condition(condition: &Condition) -> Result<(), Error> {
  check_condition(condition)?;
  match condition.effective_encoding() {
    Some(AbiEncoded | Calldata) => Ok(()),
    other => Err(Error::InvalidRootEncoding(other)),
  }
}
