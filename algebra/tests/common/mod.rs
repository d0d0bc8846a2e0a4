#![allow(dead_code)]

use roles_primitives::{
  Address,
  Bytes,
  Clearance,
  Condition,
  Encoding,
  ExecutionOptions,
  Function,
  Operator,
  Selector,
  Target,
};

pub const TRANSFER: Selector = Selector::new([0xa9, 0x05, 0x9c, 0xbb]);
pub const APPROVE: Selector = Selector::new([0x09, 0x5e, 0xa7, 0xb3]);

/// `EqualTo` on a static word holding `value`.
pub fn eq(value: u128) -> Condition {
  Condition::equal_to(Encoding::Static, Bytes::word(value))
}

pub fn gt(value: u128) -> Condition {
  Condition::new(Encoding::Static, Operator::GreaterThan)
    .with_comp_value(Bytes::word(value))
}

pub fn lt(value: u128) -> Condition {
  Condition::new(Encoding::Static, Operator::LessThan)
    .with_comp_value(Bytes::word(value))
}

pub fn pass() -> Condition {
  Condition::pass(Encoding::Static)
}

pub fn calldata(children: Vec<Condition>) -> Condition {
  Condition::matches(Encoding::Calldata, children)
}

pub fn tuple(children: Vec<Condition>) -> Condition {
  Condition::matches(Encoding::Tuple, children)
}

pub fn ether_allowance(key: u128) -> Condition {
  Condition::new(Encoding::None, Operator::EtherWithinAllowance)
    .with_comp_value(Bytes::word(key))
}

pub fn address(last: u8) -> Address {
  let mut bytes = [0u8; 20];
  bytes[19] = last;
  Address::new(bytes)
}

pub fn scoped(selector: Selector, condition: Condition) -> Function {
  Function::scoped(selector, ExecutionOptions::None, condition)
}

pub fn wildcarded(selector: Selector) -> Function {
  Function::wildcarded(selector, ExecutionOptions::None)
}

pub fn functions_target(address: Address, functions: Vec<Function>) -> Target {
  Target {
    address,
    clearance: Clearance::Function,
    execution_options: ExecutionOptions::None,
    functions,
  }
}

pub fn cleared_target(address: Address) -> Target {
  Target {
    address,
    clearance: Clearance::Target,
    execution_options: ExecutionOptions::None,
    functions: vec![],
  }
}
