//! hassfest
//!
//! Validates integrations in a core checkout and regenerates the generated
//! config flow files.

mod args;
mod report;

use anyhow::{Context, Result};
use args::Cli;
use clap::Parser;
use ha_hassfest::{
    run_plugins, Config, ConfigFlowPlugin, Integration, RuleTable, COMPONENTS_DIR,
};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn init_tracing(default_level: &str) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_level))?;
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Load integrations and run every plugin, returning the finished run
fn run(cli: &Cli) -> Result<(Config, usize)> {
    let mut config = Config::new(&cli.root, cli.action());
    if cli.is_restricted() {
        config = config.with_specific_integrations(cli.integration_paths.clone());
    }
    info!("Running hassfest on {:?}", config.root());

    let rules = match &cli.rules {
        Some(path) => RuleTable::load(path)
            .with_context(|| format!("Failed to load rules from {}", path.display()))?,
        None => RuleTable::default(),
    };

    let integrations = if cli.is_restricted() {
        Integration::load_paths(&cli.integration_paths, &mut config)
    } else {
        let components_dir = config.root().join(COMPONENTS_DIR);
        Integration::load_dir(&components_dir, &mut config)
    }
    .context("Failed to load integrations")?;

    let config_flow = ConfigFlowPlugin::new(rules);
    run_plugins(&[&config_flow], &integrations, &mut config)?;

    Ok((config, integrations.len()))
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.log_level())?;

    let (config, integration_count) = run(&cli)?;
    print!("{}", report::render(&config, integration_count));

    Ok(if report::succeeded(&config) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
