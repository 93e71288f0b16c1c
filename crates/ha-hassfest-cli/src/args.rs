//! Command line arguments

use clap::{Parser, ValueEnum};
use ha_hassfest::Action;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "hassfest")]
#[command(version)]
#[command(about = "Validate integrations and keep generated config flow files up to date")]
pub struct Cli {
    /// Root of the core checkout
    #[arg(long, env = "HA_CORE_PATH", default_value = ".")]
    pub root: PathBuf,

    /// Only validate these integration directories (repeatable)
    #[arg(long = "integration-path", value_name = "DIR")]
    pub integration_paths: Vec<PathBuf>,

    /// Defaults to generate, or validate when --integration-path is given
    #[arg(long, value_enum)]
    pub action: Option<ActionArg>,

    /// YAML file replacing the built-in config flow rules
    #[arg(long, env = "HASSFEST_RULES", value_name = "FILE")]
    pub rules: Option<PathBuf>,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ActionArg {
    Validate,
    Generate,
}

impl Cli {
    pub fn is_restricted(&self) -> bool {
        !self.integration_paths.is_empty()
    }

    pub fn action(&self) -> Action {
        match self.action {
            Some(ActionArg::Validate) => Action::Validate,
            Some(ActionArg::Generate) => Action::Generate,
            None if self.is_restricted() => Action::Validate,
            None => Action::Generate,
        }
    }

    /// Default log filter when RUST_LOG is unset
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}
