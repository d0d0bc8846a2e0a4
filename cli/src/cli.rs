use {
  clap::{Parser, Subcommand},
  roles_primitives::{decode_hex_array, Address, HexError},
  std::path::PathBuf,
};

/// Permission condition algebra
///
/// Reads conditions and target permissions as JSON, use `-` as a file
/// name to read from stdin. Results are written to stdout, diagnostics to
/// stderr.
#[derive(Debug, Parser)]
#[clap(name = "roles", version)]
pub struct CliOptions {
  /// Log filter directives, overrides RUST_LOG
  #[clap(long, global = true, value_name = "FILTER")]
  pub log: Option<String>,

  #[clap(subcommand)]
  pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
  /// Validate the structure of a condition
  Check {
    file: PathBuf,

    /// Also require the condition to address a whole call
    #[clap(long)]
    root: bool,
  },

  /// Print the canonical form of a condition
  Normalize { file: PathBuf },

  /// Print the content id of the canonical form
  Id { file: PathBuf },

  /// Print the semantic hash of the canonical form
  Hash { file: PathBuf },

  /// Print the storage address of the canonical form
  Address {
    file: PathBuf,

    /// CREATE2 factory, defaults to the singleton factory
    #[clap(long, value_name = "ADDRESS")]
    factory: Option<Address>,

    /// CREATE2 salt, defaults to zero
    #[clap(long, value_name = "HEX32", value_parser = parse_salt)]
    salt: Option<[u8; 32]>,
  },

  /// Lift logical operators above Matches nodes
  Hoist {
    file: PathBuf,

    /// Print one variant per top-level Or parameter instead
    #[clap(long)]
    top_ors: bool,
  },

  /// Subtract the part condition from the whole condition
  Subtract { whole: PathBuf, part: PathBuf },

  /// Whether the whole target list covers the part target list
  Includes { whole: PathBuf, part: PathBuf },

  /// Target permissions of the whole list not covered by the part list
  Diff { whole: PathBuf, part: PathBuf },
}

fn parse_salt(value: &str) -> Result<[u8; 32], HexError> {
  decode_hex_array(value)
}

#[cfg(test)]
mod tests {
  use {
    super::{CliOptions, Command},
    clap::Parser,
  };

  #[test]
  fn address_options() {
    let salt = format!("0x{}", "11".repeat(32));
    let opts = CliOptions::try_parse_from([
      "roles",
      "address",
      "condition.json",
      "--factory",
      "0xce0042b868300000d44a59004da54a005ffdcf9f",
      "--salt",
      salt.as_str(),
    ])
    .unwrap();

    match opts.command {
      Command::Address { factory, salt, .. } => {
        assert!(factory.is_some());
        assert_eq!(salt, Some([0x11; 32]));
      }
      other => panic!("unexpected command {other:?}"),
    }
  }

  #[test]
  fn short_salts_are_rejected() {
    assert!(CliOptions::try_parse_from([
      "roles", "address", "-", "--salt", "0x11"
    ])
    .is_err());
  }

  #[test]
  fn log_filter_is_global() {
    let opts =
      CliOptions::try_parse_from(["roles", "id", "-", "--log", "debug"])
        .unwrap();
    assert_eq!(opts.log.as_deref(), Some("debug"));
  }
}
