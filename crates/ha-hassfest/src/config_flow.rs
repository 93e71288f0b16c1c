//! Config flow validation and generated config flow indexes
//!
//! Produces `homeassistant/generated/config_flows.py` (domains with a config
//! flow, grouped by category) and `config_flows_v2.json` (the same index with
//! brands folded in), and checks that discoverable config flows set a unique
//! ID.

use crate::config::{Config, Diagnostic, BRANDS_DIR};
use crate::error::{HassfestError, HassfestResult};
use crate::model::{Brand, Brands, FlowCategory, Integration, Integrations};
use crate::rules::RuleTable;
use crate::serializer::{python_module, to_json_string, PyLiteral};
use crate::Plugin;
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

pub const PLUGIN: &str = "config_flow";

/// Cache key of the generated Python index
pub const CACHE_KEY: &str = "config_flow";

/// Cache key of the generated JSON index
pub const CACHE_KEY_V2: &str = "config_flow_v2";

pub const CONFIG_FLOWS_FILE: &str = "config_flows.py";
pub const CONFIG_FLOWS_V2_FILE: &str = "config_flows_v2.json";

const MISSING_CONFIG_FLOW: &str = "Config flows need to be defined in the file config_flow.py";
const REGENERATE_HINT: &str = "Run python3 -m script.hassfest";

/// Metadata for a plain integration in the v2 index
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntegrationEntry {
    pub name: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub translated_name: bool,
}

impl IntegrationEntry {
    fn from_integration(integration: &Integration) -> Self {
        Self {
            name: integration.name().to_string(),
            translated_name: integration.translated_name,
        }
    }
}

/// Metadata for a brand in the v2 index
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrandEntry {
    pub name: String,
    /// Member integrations in the brand's declared order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integrations: Option<IndexMap<String, IntegrationEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iot_standards: Option<Vec<String>>,
}

/// One top-level entry of the v2 index
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FlowEntry {
    Brand(BrandEntry),
    Integration(IntegrationEntry),
}

/// The v2 index
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlowIndex {
    pub integration: BTreeMap<String, FlowEntry>,
    pub helper: BTreeMap<String, FlowEntry>,
}

impl FlowIndex {
    fn category_mut(&mut self, category: FlowCategory) -> &mut BTreeMap<String, FlowEntry> {
        match category {
            FlowCategory::Integration => &mut self.integration,
            FlowCategory::Helper => &mut self.helper,
        }
    }
}

/// Config flow plugin
#[derive(Debug, Clone, Default)]
pub struct ConfigFlowPlugin {
    rules: RuleTable,
}

impl ConfigFlowPlugin {
    pub fn new(rules: RuleTable) -> Self {
        Self { rules }
    }

    /// Check one integration's config flow against the rule table
    ///
    /// Violations are warnings on a restricted run and errors otherwise.
    pub fn validate_integration(&self, integration: &Integration, config: &mut Config) {
        let Some(source) = integration.config_flow_source.as_deref() else {
            if integration.config_flow() {
                config.report(
                    Diagnostic::error(PLUGIN, MISSING_CONFIG_FLOW).for_domain(&integration.domain),
                );
            }
            return;
        };

        for rule in self.rules.violations(&integration.domain, source) {
            debug!(
                "{} violates config flow rule '{}'",
                integration.domain, rule.name
            );
            let diagnostic = if config.is_restricted() {
                Diagnostic::warning(PLUGIN, rule.message.as_str())
            } else {
                Diagnostic::error(PLUGIN, rule.message.as_str())
            };
            config.report(diagnostic.for_domain(&integration.domain));
        }
    }

    /// Validate every config flow and render `config_flows.py`
    pub fn generate_and_validate(&self, integrations: &Integrations, config: &mut Config) -> String {
        let mut integration_domains = Vec::new();
        let mut helper_domains = Vec::new();

        for (domain, integration) in integrations {
            if integration.manifest.is_none() || !integration.config_flow() {
                continue;
            }

            self.validate_integration(integration, config);

            match integration.category() {
                FlowCategory::Integration => integration_domains.push(domain.as_str()),
                FlowCategory::Helper => helper_domains.push(domain.as_str()),
            }
        }

        debug!(
            "Config flows: {} integrations, {} helpers",
            integration_domains.len(),
            helper_domains.len()
        );

        let flows = PyLiteral::Dict(vec![
            (
                PyLiteral::str(FlowCategory::Integration.as_str()),
                PyLiteral::str_list(integration_domains),
            ),
            (
                PyLiteral::str(FlowCategory::Helper.as_str()),
                PyLiteral::str_list(helper_domains),
            ),
        ]);
        python_module("FLOWS", &flows)
    }

    /// Compare freshly generated content with the files on disk
    ///
    /// Skipped beyond the per-integration checks on a restricted run.
    fn validate_generated(
        &self,
        integrations: &Integrations,
        config: &mut Config,
    ) -> HassfestResult<()> {
        let content = self.generate_and_validate(integrations, config);
        config.cache_insert(CACHE_KEY, content);

        if config.is_restricted() {
            return Ok(());
        }

        let brands = Brand::load_dir(&config.root().join(BRANDS_DIR))?;

        let config_flow_path = config.generated_path(CONFIG_FLOWS_FILE);
        let on_disk = read_artifact(&config_flow_path)?;
        if config.cached(CACHE_KEY) != Some(on_disk.as_str()) {
            config.report(stale_artifact(CONFIG_FLOWS_FILE));
        }

        let content = generate_v2(&brands, integrations)?;
        let config_flow_v2_path = config.generated_path(CONFIG_FLOWS_V2_FILE);
        let on_disk = read_artifact(&config_flow_v2_path)?;
        if on_disk.strip_suffix('\n') != Some(content.as_str()) {
            config.report(stale_artifact(CONFIG_FLOWS_V2_FILE));
        }
        config.cache_insert(CACHE_KEY_V2, content);

        Ok(())
    }
}

impl Plugin for ConfigFlowPlugin {
    fn name(&self) -> &'static str {
        PLUGIN
    }

    fn validate(&self, integrations: &Integrations, config: &mut Config) -> HassfestResult<()> {
        self.validate_generated(integrations, config)
    }

    fn generate(&self, _integrations: &Integrations, config: &mut Config) -> HassfestResult<()> {
        let config_flow = cached(config, CACHE_KEY)?;
        let config_flow_v2 = cached(config, CACHE_KEY_V2)?;

        write_artifact(&config.generated_path(CONFIG_FLOWS_FILE), config_flow)?;
        write_artifact(
            &config.generated_path(CONFIG_FLOWS_V2_FILE),
            &format!("{config_flow_v2}\n"),
        )?;

        info!("Wrote {} and {}", CONFIG_FLOWS_FILE, CONFIG_FLOWS_V2_FILE);
        Ok(())
    }
}

/// Build the v2 index
///
/// Integrations listed by a brand are nested under that brand and left out of
/// the top level. Every brand is listed under `integration`.
pub fn build_v2_index(brands: &Brands, integrations: &Integrations) -> FlowIndex {
    let claimed: BTreeSet<&str> = brands
        .values()
        .filter_map(Brand::member_domains)
        .flatten()
        .map(String::as_str)
        .collect();

    let primary: BTreeSet<&str> = integrations
        .iter()
        .filter(|(domain, integration)| {
            integration.manifest.is_some()
                && integration.config_flow()
                && !claimed.contains(domain.as_str())
        })
        .map(|(domain, _)| domain.as_str())
        .chain(brands.keys().map(String::as_str))
        .collect();

    let mut index = FlowIndex::default();
    for domain in primary {
        if let Some(brand) = brands.get(domain) {
            let entry = BrandEntry {
                name: brand.name.clone(),
                integrations: brand
                    .member_domains()
                    .map(|members| brand_members(members, integrations)),
                iot_standards: brand.standards().map(<[String]>::to_vec),
            };
            index
                .integration
                .insert(domain.to_string(), FlowEntry::Brand(entry));
        } else if let Some(integration) = integrations.get(domain) {
            index.category_mut(integration.category()).insert(
                domain.to_string(),
                FlowEntry::Integration(IntegrationEntry::from_integration(integration)),
            );
        }
    }
    index
}

/// Member integrations of a brand, skipping domains that are not loaded
fn brand_members(
    members: &[String],
    integrations: &Integrations,
) -> IndexMap<String, IntegrationEntry> {
    members
        .iter()
        .filter_map(|domain| {
            integrations
                .get(domain)
                .map(|integration| (domain.clone(), IntegrationEntry::from_integration(integration)))
        })
        .collect()
}

/// Render `config_flows_v2.json` without its trailing newline
pub fn generate_v2(brands: &Brands, integrations: &Integrations) -> HassfestResult<String> {
    to_json_string(&build_v2_index(brands, integrations)).map_err(|e| HassfestError::Serialize {
        artifact: CONFIG_FLOWS_V2_FILE,
        source: e,
    })
}

fn stale_artifact(file_name: &str) -> Diagnostic {
    Diagnostic::error(
        PLUGIN,
        format!("File {file_name} is not up to date. {REGENERATE_HINT}"),
    )
    .fixable()
}

fn cached<'a>(config: &'a Config, key: &str) -> HassfestResult<&'a str> {
    config.cached(key).ok_or_else(|| HassfestError::MissingCache {
        key: key.to_string(),
    })
}

/// Read a generated file with line endings normalized to `\n`
fn read_artifact(path: &Path) -> HassfestResult<String> {
    let content = fs::read_to_string(path).map_err(|e| HassfestError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;
    if content.contains('\r') {
        return Ok(content.replace("\r\n", "\n").replace('\r', "\n"));
    }
    Ok(content)
}

fn write_artifact(path: &Path, content: &str) -> HassfestResult<()> {
    fs::write(path, content).map_err(|e| HassfestError::WriteFile {
        path: path.to_path_buf(),
        source: e,
    })
}
