//! Integration validation and generated indexes for Home Assistant
//!
//! This crate checks integrations under `homeassistant/components` and keeps
//! the generated files under `homeassistant/generated` in sync with them.
//! Work is split into plugins, each with a validate phase and an optional
//! generate phase:
//!
//! - [`ConfigFlowPlugin`] - checks that discoverable config flows set a
//!   unique ID and maintains `config_flows.py` and `config_flows_v2.json`
//!
//! # Example
//!
//! ```ignore
//! use ha_hassfest::{Action, Config, ConfigFlowPlugin, Integration, Plugin, COMPONENTS_DIR};
//!
//! let mut config = Config::new("/src/core", Action::Generate);
//! let integrations = Integration::load_dir(&config.root().join(COMPONENTS_DIR), &mut config)?;
//!
//! let plugin = ConfigFlowPlugin::default();
//! plugin.validate(&integrations, &mut config)?;
//! plugin.generate(&integrations, &mut config)?;
//! ```

mod config;
pub mod config_flow;
mod error;
mod model;
pub mod rules;
pub mod serializer;

pub use config::{
    Action, Config, Diagnostic, Severity, BRANDS_DIR, COMPONENTS_DIR, GENERATED_DIR,
};
pub use config_flow::ConfigFlowPlugin;
pub use error::{HassfestError, HassfestResult};
pub use model::{
    Brand, Brands, FlowCategory, Integration, IntegrationManifest, IntegrationType, Integrations,
};
pub use rules::{Rule, RuleTable};

use tracing::{debug, info};

/// A validation step run over the full set of integrations
///
/// `validate` must not write to the repository. `generate` runs only after
/// every plugin validated, and may rely on content cached on [`Config`].
pub trait Plugin {
    /// Name used as the diagnostic category
    fn name(&self) -> &'static str;

    fn validate(&self, integrations: &Integrations, config: &mut Config) -> HassfestResult<()>;

    /// Write generated files
    fn generate(&self, integrations: &Integrations, config: &mut Config) -> HassfestResult<()> {
        let _ = (integrations, config);
        Ok(())
    }
}

/// Run every plugin's validate phase, then their generate phase
///
/// Generation only happens for [`Action::Generate`] and is refused on a run
/// restricted to specific integrations.
pub fn run_plugins(
    plugins: &[&dyn Plugin],
    integrations: &Integrations,
    config: &mut Config,
) -> HassfestResult<()> {
    if config.action() == Action::Generate && config.is_restricted() {
        return Err(HassfestError::GenerateRestricted);
    }

    for plugin in plugins {
        debug!("Validating {}", plugin.name());
        plugin.validate(integrations, config)?;
    }

    if config.action() == Action::Generate {
        for plugin in plugins {
            debug!("Generating {}", plugin.name());
            plugin.generate(integrations, config)?;
        }
    }

    info!(
        "Checked {} integrations: {} errors, {} warnings",
        integrations.len(),
        config.errors().count(),
        config.warnings().count()
    );
    Ok(())
}
