//! Implementation of the `optpeer check` command.

use crate::component;
use crate::ComponentArgs;
use anyhow::Result;
use optpeer::{Installed, Resolution};
use serde::Serialize;

/// Options for checking dependencies.
#[derive(Debug, Default)]
pub struct CheckOptions {
    /// Dependencies to check; all declared ones when empty.
    pub dependencies: Vec<String>,
    /// Whether missing dependencies are acceptable.
    pub optional: bool,
    /// Print JSON instead of a table.
    pub json: bool,
}

/// Result of a check.
#[derive(Debug, Serialize)]
pub struct CheckReport {
    /// The component's registration name.
    pub component: String,
    /// One resolution per checked dependency.
    pub resolutions: Vec<Resolution>,
    #[serde(skip)]
    optional: bool,
}

impl CheckReport {
    /// Whether a resolution counts as a failure.
    fn is_failure(&self, resolution: &Resolution) -> bool {
        if resolution.valid {
            return false;
        }
        !(self.optional && resolution.installed == Installed::No)
    }

    /// Returns true if no checked dependency failed.
    pub fn passed(&self) -> bool {
        !self.resolutions.iter().any(|r| self.is_failure(r))
    }

    /// Print the report as a table.
    pub fn print_table(&self) {
        println!("{}", self.component);
        if self.resolutions.is_empty() {
            println!("  nothing to check");
            return;
        }

        let width = self
            .resolutions
            .iter()
            .map(|r| r.name.len())
            .max()
            .unwrap_or(0);
        for r in &self.resolutions {
            let range = r
                .supported_range
                .as_ref()
                .map_or_else(|| "*".to_string(), ToString::to_string);
            let status = status_label(r);
            println!(
                "  {name:<width$}  {range:<16} installed: {installed:<8} version: {version:<12} {status}",
                name = r.name,
                installed = r.installed.to_string(),
                version = r.installed_version.to_string(),
            );
            if let Some(error) = &r.error {
                println!("  {:width$}  {error}", "");
            }
        }
    }
}

fn status_label(r: &Resolution) -> &'static str {
    match (r.valid, r.installed, r.declared_by_consumer) {
        (true, _, _) => "ok",
        (false, Installed::No, false) => "not declared by application",
        (false, Installed::No, true) => "not installed",
        (false, Installed::Unknown, _) => "broken install",
        (false, Installed::Yes, _) => "incompatible version",
    }
}

/// Resolve the requested dependencies and print the outcome.
pub fn check_dependencies(args: &ComponentArgs, options: CheckOptions) -> Result<CheckReport> {
    let gateway = component::register(args)?;

    let resolutions = if options.dependencies.is_empty() {
        gateway.resolve_all()
    } else {
        options
            .dependencies
            .iter()
            .map(|dep| gateway.resolve(dep))
            .collect()
    };

    let report = CheckReport {
        component: gateway.name().to_string(),
        resolutions,
        optional: options.optional,
    };

    if options.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        report.print_table();
    }
    Ok(report)
}
