//! Run context shared by all plugins
//!
//! A single [`Config`] is created per run and passed by mutable reference
//! through every plugin. It collects diagnostics and caches generated content
//! between the validate and generate phases.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Components directory, relative to the repository root
pub const COMPONENTS_DIR: &str = "homeassistant/components";

/// Brand definitions directory, relative to the repository root
pub const BRANDS_DIR: &str = "homeassistant/brands";

/// Directory holding generated artifacts, relative to the repository root
pub const GENERATED_DIR: &str = "homeassistant/generated";

/// What the run should do once validation is complete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Only validate; never touch generated files
    Validate,
    /// Validate, then rewrite generated files
    Generate,
}

/// Severity of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

/// A single problem found during a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Plugin that reported it (e.g. `config_flow`)
    pub plugin: String,
    pub message: String,
    pub severity: Severity,
    /// Rerunning generation resolves it
    pub fixable: bool,
    /// Integration the diagnostic belongs to, if any
    pub domain: Option<String>,
}

impl Diagnostic {
    /// Create an error diagnostic
    pub fn error(plugin: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            plugin: plugin.into(),
            message: message.into(),
            severity: Severity::Error,
            fixable: false,
            domain: None,
        }
    }

    /// Create a warning diagnostic
    pub fn warning(plugin: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(plugin, message)
        }
    }

    /// Mark as resolvable by regenerating
    pub fn fixable(mut self) -> Self {
        self.fixable = true;
        self
    }

    /// Attach to an integration
    pub fn for_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.plugin.to_uppercase(), self.message)
    }
}

/// Process-wide run context
#[derive(Debug)]
pub struct Config {
    root: PathBuf,
    action: Action,
    specific_integrations: Option<Vec<PathBuf>>,
    diagnostics: Vec<Diagnostic>,
    cache: HashMap<String, String>,
}

impl Config {
    /// Create a context for a run over the whole repository at `root`
    pub fn new(root: impl Into<PathBuf>, action: Action) -> Self {
        Self {
            root: root.into(),
            action,
            specific_integrations: None,
            diagnostics: Vec::new(),
            cache: HashMap::new(),
        }
    }

    /// Restrict the run to the given integration directories
    pub fn with_specific_integrations(mut self, paths: Vec<PathBuf>) -> Self {
        self.specific_integrations = Some(paths);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn specific_integrations(&self) -> Option<&[PathBuf]> {
        self.specific_integrations.as_deref()
    }

    /// True when only a subset of integrations is being validated
    pub fn is_restricted(&self) -> bool {
        self.specific_integrations.is_some()
    }

    /// Path of a generated artifact
    pub fn generated_path(&self, file_name: &str) -> PathBuf {
        self.root.join(GENERATED_DIR).join(file_name)
    }

    /// Record a diagnostic
    pub fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Record a general (non-integration) error
    pub fn add_error(&mut self, plugin: &str, message: impl Into<String>, fixable: bool) {
        let diagnostic = Diagnostic::error(plugin, message);
        self.report(if fixable {
            diagnostic.fixable()
        } else {
            diagnostic
        });
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| !d.is_error())
    }

    /// Store generated content for the generate phase
    pub fn cache_insert(&mut self, key: impl Into<String>, content: String) {
        self.cache.insert(key.into(), content);
    }

    pub fn cached(&self, key: &str) -> Option<&str> {
        self.cache.get(key).map(String::as_str)
    }
}
