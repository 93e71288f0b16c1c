//! Integration and brand models
//!
//! Loads integrations from the components directory and brand definitions
//! from the brands directory.

use crate::config::{Config, Diagnostic};
use crate::error::{HassfestError, HassfestResult};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Integrations keyed by domain, iterated in sorted order
pub type Integrations = BTreeMap<String, Integration>;

/// Brands keyed by domain, iterated in sorted order
pub type Brands = BTreeMap<String, Brand>;

/// `integration_type` as declared in manifest.json
///
/// Values this tool does not know deserialize to `Other` and are listed as
/// integrations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationType {
    Device,
    Entity,
    Hardware,
    Helper,
    #[default]
    Hub,
    Integration,
    Service,
    System,
    Virtual,
    #[serde(other)]
    Other,
}

/// Top-level grouping used by the generated config flow indexes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowCategory {
    Integration,
    Helper,
}

impl FlowCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            FlowCategory::Integration => "integration",
            FlowCategory::Helper => "helper",
        }
    }
}

impl IntegrationType {
    /// Index grouping; everything that is not a helper is listed as an integration
    pub fn category(self) -> FlowCategory {
        match self {
            IntegrationType::Helper => FlowCategory::Helper,
            _ => FlowCategory::Integration,
        }
    }
}

/// The subset of manifest.json this tool reads
#[derive(Debug, Clone, Deserialize)]
pub struct IntegrationManifest {
    pub domain: String,
    pub name: String,
    #[serde(default)]
    pub config_flow: bool,
    #[serde(default)]
    pub integration_type: IntegrationType,
}

/// One directory under homeassistant/components
#[derive(Debug, Clone)]
pub struct Integration {
    pub domain: String,
    pub path: PathBuf,
    pub manifest: Option<IntegrationManifest>,
    /// strings.json carries a `title`
    pub translated_name: bool,
    /// Contents of config_flow.py, if the file exists
    pub config_flow_source: Option<String>,
}

impl Integration {
    /// Build an integration in memory
    pub fn new(domain: impl Into<String>, manifest: Option<IntegrationManifest>) -> Self {
        let domain = domain.into();
        Self {
            path: PathBuf::from(&domain),
            domain,
            manifest,
            translated_name: false,
            config_flow_source: None,
        }
    }

    /// Display name from the manifest, falling back to the domain
    pub fn name(&self) -> &str {
        self.manifest
            .as_ref()
            .map(|m| m.name.as_str())
            .unwrap_or(&self.domain)
    }

    /// Manifest declares a config flow
    pub fn config_flow(&self) -> bool {
        self.manifest.as_ref().is_some_and(|m| m.config_flow)
    }

    pub fn integration_type(&self) -> IntegrationType {
        self.manifest
            .as_ref()
            .map(|m| m.integration_type)
            .unwrap_or_default()
    }

    pub fn category(&self) -> FlowCategory {
        self.integration_type().category()
    }

    /// Load a single integration directory
    ///
    /// A missing manifest is reported on `config`; malformed JSON aborts.
    pub fn load(path: &Path, config: &mut Config) -> HassfestResult<Self> {
        let domain = domain_from_path(path)?;

        let manifest_path = path.join("manifest.json");
        let manifest = if manifest_path.is_file() {
            Some(read_json::<IntegrationManifest>(&manifest_path)?)
        } else {
            config.report(
                Diagnostic::error(
                    "model",
                    format!("Manifest file {} not found", manifest_path.display()),
                )
                .for_domain(&domain),
            );
            None
        };

        let strings_path = path.join("strings.json");
        let translated_name = if strings_path.is_file() {
            read_json::<serde_json::Value>(&strings_path)?
                .get("title")
                .is_some()
        } else {
            false
        };

        let config_flow_path = path.join("config_flow.py");
        let config_flow_source = if config_flow_path.is_file() {
            Some(
                fs::read_to_string(&config_flow_path).map_err(|e| HassfestError::ReadFile {
                    path: config_flow_path.clone(),
                    source: e,
                })?,
            )
        } else {
            None
        };

        debug!("Loaded integration {}", domain);

        Ok(Self {
            domain,
            path: path.to_path_buf(),
            manifest,
            translated_name,
            config_flow_source,
        })
    }

    /// Load every integration below `dir`
    pub fn load_dir(dir: &Path, config: &mut Config) -> HassfestResult<Integrations> {
        let mut paths = Vec::new();
        for entry in read_dir(dir)? {
            let path = entry.path();
            if !path.is_dir() || path.file_name().is_some_and(|n| n == "__pycache__") {
                continue;
            }
            if !path.join("__init__.py").exists() && !path.join("manifest.json").exists() {
                warn!(
                    "{:?} has neither __init__.py nor manifest.json, skipping",
                    path
                );
                continue;
            }
            paths.push(path);
        }

        let integrations = Self::load_paths(&paths, config)?;
        info!(
            "Loaded {} integrations from {:?}",
            integrations.len(),
            dir
        );
        Ok(integrations)
    }

    /// Load the given integration directories
    pub fn load_paths(paths: &[PathBuf], config: &mut Config) -> HassfestResult<Integrations> {
        let mut integrations = Integrations::new();
        for path in paths {
            let integration = Self::load(path, config)?;
            if let Some(existing) = integrations.get(&integration.domain) {
                return Err(HassfestError::DuplicateIntegration {
                    domain: integration.domain,
                    first: existing.path.clone(),
                    second: path.clone(),
                });
            }
            integrations.insert(integration.domain.clone(), integration);
        }
        Ok(integrations)
    }
}

/// A vendor grouping from homeassistant/brands/<domain>.json
#[derive(Debug, Clone, Deserialize)]
pub struct Brand {
    pub domain: String,
    pub name: String,
    #[serde(default)]
    pub integrations: Option<Vec<String>>,
    #[serde(default)]
    pub iot_standards: Option<Vec<String>>,
}

impl Brand {
    /// Member integration domains, `None` when absent or empty
    pub fn member_domains(&self) -> Option<&[String]> {
        self.integrations.as_deref().filter(|d| !d.is_empty())
    }

    /// IoT standards, `None` when absent or empty
    pub fn standards(&self) -> Option<&[String]> {
        self.iot_standards.as_deref().filter(|s| !s.is_empty())
    }

    /// Load every `*.json` brand file in `dir`
    pub fn load_dir(dir: &Path) -> HassfestResult<Brands> {
        let mut brands = Brands::new();
        for entry in read_dir(dir)? {
            let path = entry.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let brand: Brand = read_json(&path)?;
            debug!("Loaded brand {}", brand.domain);
            brands.insert(brand.domain.clone(), brand);
        }
        info!("Loaded {} brands from {:?}", brands.len(), dir);
        Ok(brands)
    }
}

/// Domain is the directory name; `.` and `..` are resolved first
fn domain_from_path(path: &Path) -> HassfestResult<String> {
    let resolved;
    let path: &Path = if path.file_name().is_some() {
        path
    } else {
        resolved = path.canonicalize().map_err(|e| HassfestError::ReadDir {
            path: path.to_path_buf(),
            source: e,
        })?;
        resolved.as_path()
    };
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| HassfestError::InvalidIntegrationPath {
            path: path.to_path_buf(),
        })
}

fn read_dir(dir: &Path) -> HassfestResult<Vec<fs::DirEntry>> {
    let map_err = |e| HassfestError::ReadDir {
        path: dir.to_path_buf(),
        source: e,
    };
    let mut entries = fs::read_dir(dir)
        .map_err(map_err)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(map_err)?;
    entries.sort_by_key(|e| e.file_name());
    Ok(entries)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> HassfestResult<T> {
    let content = fs::read_to_string(path).map_err(|e| HassfestError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;
    serde_json::from_str(&content).map_err(|e| HassfestError::ParseJson {
        path: path.to_path_buf(),
        source: e,
    })
}
