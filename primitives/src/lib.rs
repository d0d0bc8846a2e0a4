mod address;
mod bytes;
mod condition;
mod flat;
mod hash;
mod id;
mod target;

pub use {
  address::{
    condition_address,
    condition_address_with,
    init_code,
    pack_condition,
    Address,
    Create2,
    Error as AddressError,
  },
  bytes::{
    decode_hex,
    decode_hex_array,
    Bytes,
    Error as HexError,
    Selector,
    ToHexString,
  },
  condition::{Condition, Encoding, Error as ConditionDecodeError, Operator},
  flat::{flatten, Error as FlattenError, FlatCondition, MAX_NODES},
  hash::{condition_hash, Error as HashError},
  id::ConditionId,
  multihash::Multihash,
  target::{
    Clearance,
    Error as TargetDecodeError,
    ExecutionOptions,
    Function,
    Target,
  },
};
