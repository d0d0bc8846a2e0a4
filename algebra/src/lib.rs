mod config;
mod hoist;
mod integrity;
mod normalize;
mod subtract;
mod target;
mod typetree;

pub use {
  config::Config,
  hoist::{hoist_condition, hoist_once, hoist_top_ors},
  integrity::{check_condition, check_root_condition, Error as IntegrityError},
  normalize::{normalize, Error as NormalizeError, Normalizer},
  subtract::{subtract_condition, Difference},
  target::{
    check_function,
    check_target,
    function_includes,
    subtract_function,
    subtract_target,
    subtract_targets,
    target_includes,
    targets_include,
    Error as TargetError,
  },
  typetree::{align, pad, TypeTree},
};
