//! optpeer CLI - Inspect a component's optional peer dependencies

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod check;
mod component;
mod list;
mod require;

#[derive(Parser)]
#[command(name = "optpeer")]
#[command(version)]
#[command(about = "Inspect optional peer dependencies", long_about = None)]
struct Cli {
    /// Show debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command that registers a component.
#[derive(Args, Debug, Clone)]
pub struct ComponentArgs {
    /// Component entry module, or its package directory
    pub component: PathBuf,

    /// Manifest section declaring optional peer dependencies (repeatable, later wins)
    #[arg(long = "section")]
    pub sections: Vec<String>,

    /// Register under this name instead of the manifest's `name`
    #[arg(long)]
    pub name: Option<String>,

    /// Accept the nearest manifest without checking it describes the component
    #[arg(long)]
    pub no_identity_check: bool,

    /// Module that loads the component; the application manifest is searched from here
    #[arg(long)]
    pub parent: Option<PathBuf>,

    /// Manifest filename
    #[arg(long, default_value = optpeer::MANIFEST_FILE)]
    pub manifest_file: String,

    /// Directory holding installed packages
    #[arg(long, default_value = "peer_modules")]
    pub modules_dir: String,
}

#[derive(Subcommand)]
enum Commands {
    /// List the optional peer dependencies a component declares
    List {
        #[command(flatten)]
        component: ComponentArgs,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Check whether optional peer dependencies are installed and compatible
    Check {
        #[command(flatten)]
        component: ComponentArgs,

        /// Dependencies to check (defaults to all declared)
        #[arg(long = "dep")]
        dependencies: Vec<String>,

        /// Do not fail for dependencies that are simply not installed
        #[arg(long)]
        optional: bool,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Load a dependency through the component's gateway
    Require {
        #[command(flatten)]
        component: ComponentArgs,

        /// Dependency to load (may include a sub-path)
        dependency: String,

        /// Treat "not installed" as an empty result
        #[arg(long)]
        optional: bool,

        /// Treat every failure as an empty result
        #[arg(long)]
        dont_throw: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::List { component, json } => {
            list::list_dependencies(&component, json)?;
        }

        Commands::Check {
            component,
            dependencies,
            optional,
            json,
        } => {
            let options = check::CheckOptions {
                dependencies,
                optional,
                json,
            };
            let report = check::check_dependencies(&component, options)?;
            if !report.passed() {
                std::process::exit(1);
            }
        }

        Commands::Require {
            component,
            dependency,
            optional,
            dont_throw,
        } => {
            let options = optpeer::RequireOptions::new()
                .with_optional(optional)
                .with_dont_throw(dont_throw);
            require::require_dependency(&component, &dependency, options)?;
        }
    }

    Ok(())
}
