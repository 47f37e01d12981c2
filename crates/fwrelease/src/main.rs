//! `make-release` - update releases.xml for a firmware drop
//!
//! Usage: `make-release <version> [--beta | --promote-beta]`

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use anyhow::Context;
use clap::Parser;

use fwrelease::cli::Cli;
use fwrelease::{init_logging, Config, ReleasePlan, Updater};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let mut config = Config::load_from(cli.config.clone()).context("loading configuration")?;
    cli.apply_overrides(&mut config);

    let plan = ReleasePlan::resolve(config.root(), &cli.version, cli.mode()?)?;
    let updater = Updater::new(&config, &plan);

    let summary = if cli.dry_run {
        let (manifest, summary) = updater.apply()?;
        print!("{}", manifest.to_xml());
        summary
    } else {
        updater.run()?
    };
    summary.log();

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    Ok(())
}
