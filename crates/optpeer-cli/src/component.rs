//! Registering the component named on the command line.

use crate::ComponentArgs;
use anyhow::{Context, Result};
use optpeer::{
    Component, FsLoader, FsLoaderConfig, Gateway, ModuleLoader, RegisterOptions, Registry,
};
use std::path::PathBuf;
use std::sync::Arc;

impl ComponentArgs {
    /// Loader configuration for these arguments.
    pub fn loader_config(&self) -> FsLoaderConfig {
        FsLoaderConfig {
            modules_dir: self.modules_dir.clone(),
            manifest_file: self.manifest_file.clone(),
            ..FsLoaderConfig::default()
        }
    }

    /// Registration options for these arguments.
    pub fn register_options(&self) -> RegisterOptions {
        let mut options = RegisterOptions::new()
            .with_identity_check(!self.no_identity_check)
            .with_manifest_file(self.manifest_file.clone());
        if !self.sections.is_empty() {
            options = options.with_sections(self.sections.iter().cloned());
        }
        if let Some(name) = &self.name {
            options = options.with_name(name.clone());
        }
        options
    }
}

/// Register the component and return its gateway.
pub fn register(args: &ComponentArgs) -> Result<Arc<Gateway<FsLoader>>> {
    let registry = Registry::new(FsLoader::with_config(args.loader_config()));
    let module = entry_module(registry.loader(), args)?;
    tracing::debug!(
        component = %args.component.display(),
        module = %module.display(),
        "registering component"
    );

    let mut component = Component::new(module);
    if let Some(parent) = &args.parent {
        component = component.with_parent(parent);
    }

    registry
        .register(&component, &args.register_options())
        .with_context(|| format!("Failed to register component '{}'", args.component.display()))
}

/// A package directory stands for its entry module.
fn entry_module(loader: &FsLoader, args: &ComponentArgs) -> Result<PathBuf> {
    if !args.component.is_dir() {
        return Ok(args.component.clone());
    }
    loader.identify(&args.component).with_context(|| {
        format!(
            "Failed to find the entry module of '{}'",
            args.component.display()
        )
    })
}
