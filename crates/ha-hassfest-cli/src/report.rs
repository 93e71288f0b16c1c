//! Diagnostic report printed at the end of a run

use ha_hassfest::{Action, Config, Diagnostic, Severity};
use std::collections::BTreeMap;
use std::fmt::Write as _;

fn line(out: &mut String, diagnostic: &Diagnostic) {
    let severity = match diagnostic.severity {
        Severity::Error => "ERROR",
        Severity::Warning => "WARNING",
    };
    let fixable = if diagnostic.fixable { " (fixable)" } else { "" };
    let _ = writeln!(out, " * [{severity}] {diagnostic}{fixable}");
}

/// Render diagnostics grouped by integration, then general ones
pub fn render(config: &Config, integration_count: usize) -> String {
    let mut by_domain: BTreeMap<&str, Vec<&Diagnostic>> = BTreeMap::new();
    let mut general = Vec::new();
    for diagnostic in config.diagnostics() {
        match diagnostic.domain.as_deref() {
            Some(domain) => by_domain.entry(domain).or_default().push(diagnostic),
            None => general.push(diagnostic),
        }
    }

    let invalid = by_domain
        .values()
        .filter(|diagnostics| diagnostics.iter().any(|d| d.is_error()))
        .count();

    let mut out = String::new();
    let _ = writeln!(out, "Integrations: {integration_count}");
    let _ = writeln!(out, "Invalid integrations: {invalid}");

    for (domain, diagnostics) in &by_domain {
        let _ = writeln!(out, "\nIntegration {domain}:");
        for diagnostic in diagnostics {
            line(&mut out, diagnostic);
        }
    }

    if !general.is_empty() {
        let _ = writeln!(out, "\nGeneral errors:");
        for diagnostic in general {
            line(&mut out, diagnostic);
        }
    }

    out
}

/// True when the run should exit successfully
///
/// Fixable errors do not fail a generate run, since generating fixed them.
pub fn succeeded(config: &Config) -> bool {
    config
        .errors()
        .all(|e| e.fixable && config.action() == Action::Generate)
}
