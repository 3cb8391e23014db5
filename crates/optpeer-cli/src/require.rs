//! Implementation of the `optpeer require` command.

use crate::component;
use crate::ComponentArgs;
use anyhow::{Context, Result};
use optpeer::RequireOptions;

/// Load a dependency through the component's gateway and print where it
/// resolved to.
pub fn require_dependency(
    args: &ComponentArgs,
    dependency: &str,
    options: RequireOptions,
) -> Result<()> {
    let gateway = component::register(args)?;

    let loaded = gateway
        .require(dependency, options)
        .with_context(|| format!("Failed to require '{dependency}'"))?;

    match loaded {
        Some(package) => {
            let version = package.manifest.version();
            println!("{} {} -> {}", package.name, version, package.entry.display());
        }
        None => println!("{dependency}: unavailable"),
    }
    Ok(())
}
