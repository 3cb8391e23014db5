//! Implementation of the `optpeer list` command.

use crate::component;
use crate::ComponentArgs;
use anyhow::Result;

/// Print the component's declared optional peer dependencies.
pub fn list_dependencies(args: &ComponentArgs, json: bool) -> Result<()> {
    let gateway = component::register(args)?;
    let declared = gateway.declared();

    if json {
        println!("{}", serde_json::to_string_pretty(declared)?);
        return Ok(());
    }

    if declared.is_empty() {
        println!("{} declares no optional peer dependencies", gateway.name());
        return Ok(());
    }

    println!("{} ({})", gateway.name(), gateway.manifest_path().display());
    let width = declared.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
    for (name, range) in declared.iter() {
        println!("  {name:<width$}  {range}");
    }
    Ok(())
}
