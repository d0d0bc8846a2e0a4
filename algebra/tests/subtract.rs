use {
  common::{calldata, eq, gt, lt, tuple},
  roles_algebra::{normalize, subtract_condition, Difference},
  roles_primitives::Condition,
};

mod common;

#[test]
fn removing_a_branch_from_a_disjunction() -> anyhow::Result<()> {
  let whole = Condition::or(vec![eq(1), eq(2), eq(3)]);
  assert_eq!(
    subtract_condition(&whole, &eq(2))?,
    Difference::Remainder(Condition::or(vec![eq(1), eq(3)]))
  );
  Ok(())
}

#[test]
fn subtracted_branches_reunite_with_the_part() -> anyhow::Result<()> {
  let branches = vec![
    eq(1),
    eq(2),
    calldata(vec![eq(4), gt(5)]),
    Condition::and(vec![gt(1), lt(9)]),
  ];
  let whole = Condition::or(branches.clone());

  for split in 1..branches.len() {
    let part = Condition::or(branches[..split].to_vec());
    let rest = subtract_condition(&whole, &part)?
      .into_condition()
      .expect("some branches remain");

    let reunited = normalize(Condition::or(vec![rest, part]))?;
    assert_eq!(reunited.id()?, normalize(whole.clone())?.id()?);
  }
  Ok(())
}

#[test]
fn subtracting_everything_leaves_nothing() -> anyhow::Result<()> {
  let whole = calldata(vec![Condition::or(vec![eq(1), eq(2)]), eq(3)]);
  let part = Condition::or(vec![
    calldata(vec![eq(2), eq(3)]),
    calldata(vec![eq(1), eq(3)]),
  ]);
  // both sides normalize to the same tree
  assert_eq!(subtract_condition(&whole, &part)?, Difference::Empty);
  Ok(())
}

#[test]
fn subtraction_follows_nested_hinges() -> anyhow::Result<()> {
  let whole = calldata(vec![
    eq(1),
    tuple(vec![eq(2), Condition::or(vec![eq(3), eq(4)])]),
  ]);
  let part = calldata(vec![eq(1), tuple(vec![eq(2), eq(4)])]);
  assert_eq!(
    subtract_condition(&whole, &part)?,
    Difference::Remainder(calldata(vec![eq(1), tuple(vec![eq(2), eq(3)])]))
  );
  Ok(())
}

#[test]
fn partial_overlap_is_not_applicable() -> anyhow::Result<()> {
  let whole = calldata(vec![gt(10)]);
  let part = calldata(vec![gt(20)]);
  let difference = subtract_condition(&whole, &part)?;
  assert_eq!(difference, Difference::Unchanged(whole));
  Ok(())
}

#[test]
fn unchanged_keeps_the_original_shape() -> anyhow::Result<()> {
  // the whole is returned as given, not in its normalized form
  let whole = Condition::or(vec![eq(2), eq(1)]);
  let difference = subtract_condition(&whole, &eq(7))?;
  assert_eq!(difference, Difference::Unchanged(whole));
  Ok(())
}
