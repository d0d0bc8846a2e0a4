use {
  common::{calldata, eq, pass, tuple},
  roles_algebra::{check_root_condition, hoist_condition, normalize},
  roles_primitives::{condition_address, condition_hash, Condition, Operator},
};

mod common;

fn equivalent_pair() -> (Condition, Condition) {
  let a = Condition::or(vec![
    calldata(vec![eq(1), eq(2), pass()]),
    calldata(vec![eq(1), eq(3)]),
  ]);
  let b = calldata(vec![eq(1), Condition::or(vec![eq(3), eq(2)])]);
  (a, b)
}

#[test]
fn equivalent_conditions_share_their_identity() -> anyhow::Result<()> {
  let (a, b) = equivalent_pair();
  let a = normalize(a)?;
  let b = normalize(b)?;

  assert_eq!(a.id()?, b.id()?);
  assert_eq!(condition_hash(&a)?, condition_hash(&b)?);
  assert_eq!(condition_address(&a)?, condition_address(&b)?);
  Ok(())
}

#[test]
fn different_conditions_get_different_addresses() -> anyhow::Result<()> {
  let a = normalize(calldata(vec![eq(1)]))?;
  let b = normalize(calldata(vec![eq(2)]))?;
  assert_ne!(condition_hash(&a)?, condition_hash(&b)?);
  assert_ne!(condition_address(&a)?, condition_address(&b)?);
  Ok(())
}

#[test]
fn hoisting_and_push_down_are_inverse() -> anyhow::Result<()> {
  let (_, factored) = equivalent_pair();
  let hoisted = hoist_condition(factored.clone())?;
  assert_ne!(hoisted.id()?, normalize(factored.clone())?.id()?);
  assert_eq!(normalize(hoisted)?.id()?, normalize(factored)?.id()?);
  Ok(())
}

#[test]
fn hoisting_two_disjunctions_renormalizes_back() -> anyhow::Result<()> {
  let factored = calldata(vec![
    Condition::or(vec![eq(1), eq(2)]),
    Condition::or(vec![eq(3), eq(4)]),
  ]);
  let hoisted = hoist_condition(factored.clone())?;
  assert_eq!(hoisted.operator(), Operator::Or);
  assert_eq!(hoisted.children().len(), 4);

  let normalized = normalize(factored)?;
  let renormalized = normalize(hoisted)?;
  assert_eq!(renormalized.id()?, normalized.id()?);
  assert_eq!(condition_address(&renormalized)?, condition_address(&normalized)?);
  Ok(())
}

#[test]
fn json_conditions_are_checked_and_normalized() -> anyhow::Result<()> {
  let word = |n: u8| format!("0x{}{:02x}", "00".repeat(31), n);
  let json = format!(
    r#"{{
      "paramType": 5,
      "operator": 5,
      "children": [
        {{
          "paramType": 3,
          "operator": 5,
          "children": [
            {{ "paramType": 1, "operator": 16, "compValue": "{}" }},
            {{ "paramType": 1, "operator": 0 }}
          ]
        }},
        {{ "paramType": 1, "operator": 0 }}
      ]
    }}"#,
    word(7)
  );

  let condition: Condition = serde_json::from_str(&json)?;
  check_root_condition(&condition)?;
  assert_eq!(normalize(condition)?, calldata(vec![tuple(vec![eq(7), pass()])]));
  Ok(())
}
