use anyhow::Context;
use clap::Parser;

use group_rotation::config::{Args, RunConfig};
use group_rotation::logging;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init(&args.log_level);

    let config = RunConfig::from(args);
    group_rotation::run(&config)
        .with_context(|| format!("session {} from {}", config.session, config.input.display()))?;
    Ok(())
}
