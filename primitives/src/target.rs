use {
  crate::{Address, Condition, Selector},
  serde::{Deserialize, Serialize},
  thiserror::Error,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
  #[error("Unknown execution options value {0}")]
  UnknownExecutionOptions(u8),

  #[error("Unknown clearance value {0}")]
  UnknownClearance(u8),
}

/// Which kinds of calls are allowed in addition to plain calls.
#[derive(
  Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub enum ExecutionOptions {
  #[default]
  None = 0,
  Send = 1,
  DelegateCall = 2,
  Both = 3,
}

impl ExecutionOptions {
  fn bits(&self) -> u8 {
    *self as u8
  }

  /// True when every option allowed by `other` is also allowed by `self`.
  pub fn includes(&self, other: &ExecutionOptions) -> bool {
    self.bits() & other.bits() == other.bits()
  }
}

impl TryFrom<u8> for ExecutionOptions {
  type Error = Error;

  fn try_from(value: u8) -> Result<Self, Self::Error> {
    Ok(match value {
      0 => Self::None,
      1 => Self::Send,
      2 => Self::DelegateCall,
      3 => Self::Both,
      other => return Err(Error::UnknownExecutionOptions(other)),
    })
  }
}

impl From<ExecutionOptions> for u8 {
  fn from(options: ExecutionOptions) -> Self {
    options as u8
  }
}

/// Scope of a grant on a target address.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Clearance {
  /// Every call to the address is allowed.
  Target = 1,

  /// Only calls to the listed functions are allowed.
  Function = 2,
}

impl TryFrom<u8> for Clearance {
  type Error = Error;

  fn try_from(value: u8) -> Result<Self, Self::Error> {
    Ok(match value {
      1 => Self::Target,
      2 => Self::Function,
      other => return Err(Error::UnknownClearance(other)),
    })
  }
}

impl From<Clearance> for u8 {
  fn from(clearance: Clearance) -> Self {
    clearance as u8
  }
}

/// Permission to call a single function selector on a target.
///
/// A function is either wildcarded, granting every call to the selector,
/// or scoped by a condition rooted at the calldata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Function {
  pub selector: Selector,

  #[serde(default)]
  pub execution_options: ExecutionOptions,

  #[serde(default)]
  pub wildcarded: bool,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub condition: Option<Condition>,
}

impl Function {
  pub fn wildcarded(selector: Selector, options: ExecutionOptions) -> Self {
    Self {
      selector,
      execution_options: options,
      wildcarded: true,
      condition: None,
    }
  }

  pub fn scoped(
    selector: Selector,
    options: ExecutionOptions,
    condition: Condition,
  ) -> Self {
    Self {
      selector,
      execution_options: options,
      wildcarded: false,
      condition: Some(condition),
    }
  }
}

/// Everything a role may call on one contract address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
  pub address: Address,
  pub clearance: Clearance,

  #[serde(default)]
  pub execution_options: ExecutionOptions,

  #[serde(default)]
  pub functions: Vec<Function>,
}

impl Target {
  /// Finds the function entry for a selector, if listed.
  pub fn function(&self, selector: &Selector) -> Option<&Function> {
    self.functions.iter().find(|f| &f.selector == selector)
  }
}

#[cfg(test)]
mod tests {
  use crate::{Clearance, ExecutionOptions, Target};

  #[test]
  fn execution_options_containment() {
    use ExecutionOptions::*;
    assert!(Both.includes(&Send));
    assert!(Both.includes(&DelegateCall));
    assert!(Send.includes(&None));
    assert!(!Send.includes(&DelegateCall));
    assert!(!DelegateCall.includes(&Both));
    assert!(None.includes(&None));
  }

  #[test]
  fn target_json() -> anyhow::Result<()> {
    let json = r#"{
      "address": "0x1111111111111111111111111111111111111111",
      "clearance": 2,
      "executionOptions": 1,
      "functions": [
        { "selector": "0xa9059cbb", "wildcarded": true },
        {
          "selector": "0x095ea7b3",
          "condition": { "paramType": 5, "operator": 5, "children": [
            { "paramType": 1, "operator": 0 }
          ]}
        }
      ]
    }"#;
    let target: Target = serde_json::from_str(json)?;
    assert_eq!(target.clearance, Clearance::Function);
    assert_eq!(target.execution_options, ExecutionOptions::Send);
    assert_eq!(target.functions.len(), 2);
    assert!(target.functions[0].wildcarded);
    assert!(target.functions[1].condition.is_some());
    assert!(target.function(&"0x095ea7b3".parse()?).is_some());
    assert!(target.function(&"0x00000000".parse()?).is_none());
    Ok(())
  }
}
