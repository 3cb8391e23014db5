//! Manifest-only resolution of optional peer dependencies.
//!
//! The resolver answers "is this dependency usable?" without loading any of
//! its code:
//! - The consuming application must declare the dependency in one of its own
//!   dependency sections. An undeclared dependency counts as not installed,
//!   whatever happens to be on disk.
//! - The dependency's own manifest must be readable through the loader.
//! - Its version must satisfy the declared range, when there is one.

use crate::extract::DeclaredDependencies;
use crate::loader::{split_request, LoadError, ModuleLoader};
use crate::manifest::{Manifest, VersionMetadata};
use crate::range::VersionRange;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Installation status of a dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Installed {
    /// The dependency's manifest was read.
    Yes,
    /// The dependency is absent or undeclared.
    No,
    /// Something is there but could not be read.
    Unknown,
}

impl std::fmt::Display for Installed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Yes => write!(f, "yes"),
            Self::No => write!(f, "no"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// The outcome of resolving one dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    /// The package name (sub-paths stripped).
    pub name: String,
    /// The declared range, or `None` for no constraint.
    pub supported_range: Option<VersionRange>,
    /// The installed version as found in the dependency's manifest.
    pub installed_version: VersionMetadata,
    /// Whether the dependency is installed.
    pub installed: Installed,
    /// Whether the installed copy is usable.
    pub valid: bool,
    /// Whether the consumer declares the dependency.
    pub declared_by_consumer: bool,
    /// Where the dependency's manifest is expected.
    pub manifest_path: PathBuf,
    /// The loader failure behind `Installed::Unknown`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Resolution {
    /// The installed version, if one was recorded.
    #[must_use]
    pub fn installed_version(&self) -> Option<&semver::Version> {
        self.installed_version.as_version()
    }
}

/// Resolves dependencies for one component against its consumer.
#[derive(Debug)]
pub struct Resolver<'a, L: ?Sized> {
    declared: &'a DeclaredDependencies,
    consumer: &'a Manifest,
    consumer_sections: &'a [String],
    loader: &'a L,
    from: &'a Path,
}

impl<'a, L: ModuleLoader + ?Sized> Resolver<'a, L> {
    /// Create a resolver.
    ///
    /// `from` is the requesting component's module file, used as the
    /// loader's lookup origin.
    #[must_use]
    pub fn new(
        declared: &'a DeclaredDependencies,
        consumer: &'a Manifest,
        consumer_sections: &'a [String],
        loader: &'a L,
        from: &'a Path,
    ) -> Self {
        Self {
            declared,
            consumer,
            consumer_sections,
            loader,
            from,
        }
    }

    /// Resolve a dependency. Never fails; problems are reported in the
    /// returned [`Resolution`].
    pub fn resolve(&self, dependency: &str) -> Resolution {
        let (name, _) = split_request(dependency);
        let mut resolution = Resolution {
            name: name.to_string(),
            supported_range: self.declared.get(name).cloned(),
            installed_version: VersionMetadata::Missing,
            installed: Installed::No,
            valid: false,
            declared_by_consumer: self.consumer.declares(name, self.consumer_sections),
            manifest_path: self.loader.manifest_path(name, self.from),
            error: None,
        };

        if !resolution.declared_by_consumer {
            tracing::debug!(dependency = name, "not declared by consumer");
            return resolution;
        }

        match self.loader.load_manifest(name, self.from) {
            Ok(manifest) => {
                resolution.installed = Installed::Yes;
                resolution.installed_version = manifest.version();
                resolution.valid = match (
                    &resolution.supported_range,
                    &resolution.installed_version,
                ) {
                    (None, _) => true,
                    (Some(range), VersionMetadata::Valid(version)) => range.matches(version),
                    (Some(_), _) => false,
                };
            }
            Err(LoadError::NotFound { .. }) => {}
            Err(e) => {
                resolution.installed = Installed::Unknown;
                resolution.error = Some(e.to_string());
            }
        }

        tracing::debug!(
            dependency = name,
            installed = %resolution.installed,
            version = %resolution.installed_version,
            valid = resolution.valid,
            "resolved optional peer dependency"
        );
        resolution
    }
}
