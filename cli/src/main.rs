use {
  crate::cli::{CliOptions, Command},
  anyhow::Context,
  clap::Parser,
  roles_algebra::{
    check_condition,
    check_root_condition,
    check_target,
    hoist_condition,
    hoist_top_ors,
    normalize,
    subtract_condition,
    subtract_targets,
    targets_include,
    Difference,
  },
  roles_primitives::{
    condition_address_with,
    condition_hash,
    Condition,
    Create2,
    Target,
    ToHexString,
  },
  serde::{de::DeserializeOwned, Serialize},
  std::{
    fs::File,
    io::{stdin, BufReader, Read},
    path::Path,
  },
  tracing::{debug, info, subscriber::set_global_default},
  tracing_subscriber::{EnvFilter, FmtSubscriber},
};

mod cli;

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
  let reader: Box<dyn Read> = match path.to_str() {
    Some("-") => Box::new(stdin().lock()),
    _ => Box::new(BufReader::new(
      File::open(path)
        .with_context(|| format!("opening {}", path.display()))?,
    )),
  };
  serde_json::from_reader(reader)
    .with_context(|| format!("parsing {}", path.display()))
}

fn read_targets(path: &Path) -> anyhow::Result<Vec<Target>> {
  let targets: Vec<Target> = read_json(path)?;
  for target in &targets {
    check_target(target)?;
  }
  Ok(targets)
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

fn run(command: Command) -> anyhow::Result<()> {
  match command {
    Command::Check { file, root } => {
      let condition: Condition = read_json(&file)?;
      match root {
        true => check_root_condition(&condition)?,
        false => check_condition(&condition)?,
      }
      println!("ok");
    }

    Command::Normalize { file } => {
      print_json(&normalize(read_json(&file)?)?)?;
    }

    Command::Id { file } => {
      let condition = normalize(read_json(&file)?)?;
      println!("{}", condition.id()?);
    }

    Command::Hash { file } => {
      let condition = normalize(read_json(&file)?)?;
      println!("{}", condition_hash(&condition)?.to_hex());
    }

    Command::Address {
      file,
      factory,
      salt,
    } => {
      let defaults = Create2::default();
      let create2 = Create2 {
        factory: factory.unwrap_or(defaults.factory),
        salt: salt.unwrap_or(defaults.salt),
      };
      debug!("deploying through {create2:?}");

      let condition = normalize(read_json(&file)?)?;
      println!("{}", condition_address_with(&condition, &create2)?);
    }

    Command::Hoist { file, top_ors } => {
      let condition: Condition = read_json(&file)?;
      match top_ors {
        true => print_json(&hoist_top_ors(condition)?)?,
        false => print_json(&hoist_condition(condition)?)?,
      }
    }

    Command::Subtract { whole, part } => {
      let whole: Condition = read_json(&whole)?;
      let part: Condition = read_json(&part)?;
      match subtract_condition(&whole, &part)? {
        Difference::Empty => {
          info!("nothing remains");
          print_json(&Option::<Condition>::None)?;
        }
        Difference::Unchanged(whole) => {
          info!("subtraction does not apply, whole is unchanged");
          print_json(&whole)?;
        }
        Difference::Remainder(rest) => print_json(&rest)?,
      }
    }

    Command::Includes { whole, part } => {
      let included =
        targets_include(&read_targets(&whole)?, &read_targets(&part)?)?;
      println!("{included}");
    }

    Command::Diff { whole, part } => {
      let remaining =
        subtract_targets(&read_targets(&whole)?, &read_targets(&part)?)?;
      info!("{} target(s) remain", remaining.len());
      print_json(&remaining)?;
    }
  }
  Ok(())
}

fn main() -> anyhow::Result<()> {
  let opts = CliOptions::parse();

  // diagnostics go to stderr, stdout carries the results
  let filter = match opts.log {
    Some(ref directives) => EnvFilter::try_new(directives)?,
    None => EnvFilter::try_from_default_env()
      .unwrap_or_else(|_| EnvFilter::new("warn")),
  };
  set_global_default(
    FmtSubscriber::builder()
      .with_env_filter(filter)
      .with_writer(std::io::stderr)
      .finish(),
  )?;

  debug!("options: {opts:?}");
  run(opts.command)
}
