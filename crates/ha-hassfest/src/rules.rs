//! Config flow rule table
//!
//! Each rule pairs trigger markers with the markers that satisfy it. A config
//! flow that contains any trigger must also contain at least one satisfying
//! marker, unless its domain is exempt.
//!
//! Matching is a plain substring search over the source text, so markers in
//! comments or strings count too.

use crate::error::{HassfestError, HassfestResult};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// Steps that make a config flow discoverable
pub const DISCOVERY_STEPS: &[&str] = &[
    "async_step_discovery",
    "async_step_bluetooth",
    "async_step_hassio",
    "async_step_homekit",
    "async_step_mqtt",
    "async_step_ssdp",
    "async_step_zeroconf",
    "async_step_dhcp",
    "async_step_usb",
];

/// Ways a config flow can establish a stable identity
pub const UNIQUE_ID_MECHANISMS: &[&str] = &[
    "self.async_set_unique_id",
    "self._async_handle_discovery_without_unique_id",
    "register_discovery_flow",
    "AbstractOAuth2FlowHandler",
];

/// Domains allowed to be discoverable without a unique ID
pub const UNIQUE_ID_IGNORE: &[&str] = &["huawei_lte", "mqtt", "adguard"];

pub const UNIQUE_ID_MESSAGE: &str = "Config flows that are discoverable need to set a unique ID";

/// A single trigger → requirement rule
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Rule {
    pub name: String,
    pub message: String,
    #[serde(default)]
    pub triggers: Vec<String>,
    #[serde(default)]
    pub satisfied_by: Vec<String>,
    #[serde(default)]
    pub exempt: BTreeSet<String>,
}

impl Rule {
    /// First trigger found in `source`
    pub fn triggered_by<'a>(&'a self, source: &str) -> Option<&'a str> {
        self.triggers
            .iter()
            .map(String::as_str)
            .find(|marker| source.contains(marker))
    }

    pub fn is_satisfied(&self, source: &str) -> bool {
        self.satisfied_by
            .iter()
            .any(|marker| source.contains(marker.as_str()))
    }

    /// True when `domain`'s config flow breaks this rule
    pub fn is_violated(&self, domain: &str, source: &str) -> bool {
        !self.exempt.contains(domain)
            && self.triggered_by(source).is_some()
            && !self.is_satisfied(source)
    }
}

/// Ordered set of rules applied to every config flow
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RuleTable {
    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl Default for RuleTable {
    fn default() -> Self {
        Self {
            rules: vec![Rule {
                name: "unique_id".to_string(),
                message: UNIQUE_ID_MESSAGE.to_string(),
                triggers: DISCOVERY_STEPS.iter().map(|s| s.to_string()).collect(),
                satisfied_by: UNIQUE_ID_MECHANISMS.iter().map(|s| s.to_string()).collect(),
                exempt: UNIQUE_ID_IGNORE.iter().map(|s| s.to_string()).collect(),
            }],
        }
    }
}

impl RuleTable {
    /// Load a table from a YAML file, replacing the built-in rules
    pub fn load(path: &Path) -> HassfestResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| HassfestError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_yaml(&content, path)
    }

    fn from_yaml(content: &str, source_path: &Path) -> HassfestResult<Self> {
        serde_yaml::from_str(content).map_err(|e| HassfestError::ParseYaml {
            path: source_path.to_path_buf(),
            source: e,
        })
    }

    /// Rules broken by `domain`'s config flow source
    pub fn violations<'a>(
        &'a self,
        domain: &'a str,
        source: &'a str,
    ) -> impl Iterator<Item = &'a Rule> {
        self.rules
            .iter()
            .filter(move |rule| rule.is_violated(domain, source))
    }
}
