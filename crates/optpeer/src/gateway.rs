//! Peer-require gateways.
//!
//! A [`Gateway`] is created once per component. Creation locates the
//! component's manifest, extracts its declared optional peer dependencies
//! and locates the consuming application's manifest; any failure there is a
//! misconfiguration and is always reported. Later calls to
//! [`Gateway::require`] check and load one dependency, and the caller's
//! [`RequireOptions`] decide whether a failed check is an error or an empty
//! result.

use crate::extract::{extract, DeclaredDependencies, ExtractError, DEFAULT_SECTION};
use crate::loader::{LoadError, ModuleLoader};
use crate::locate::{LocateError, Located, Locator};
use crate::manifest::{Manifest, VersionMetadata, MANIFEST_FILE};
use crate::range::VersionRange;
use crate::resolve::{Installed, Resolution, Resolver};
use semver::Version;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Consumer sections that count as declaring a dependency.
pub const DEFAULT_CONSUMER_SECTIONS: &[&str] =
    &["dependencies", "dev-dependencies", "optional-dependencies"];

/// Errors raised while creating a gateway. These are never suppressible.
#[derive(Error, Debug)]
pub enum RegisterError {
    #[error("failed to locate the manifest of component '{}': {source}", .module.display())]
    ComponentManifest { module: PathBuf, source: LocateError },

    #[error("failed to locate the application manifest for component '{component}': {source}")]
    ConsumerManifest {
        component: String,
        source: LocateError,
    },

    #[error(
        "component manifest '{}' has no `name` and no explicit name was given",
        .manifest_path.display()
    )]
    MissingName { manifest_path: PathBuf },

    #[error("component '{component}' declares {source}")]
    Extract {
        component: String,
        source: ExtractError,
    },
}

/// Errors raised by [`Gateway::require`].
#[derive(Error, Debug)]
pub enum RequireError {
    #[error(
        "component '{component}' requested optional peer dependency '{dependency}', which the application does not declare; {}",
        install_hint(.dependency, .range.as_ref())
    )]
    NotDeclared {
        dependency: String,
        component: String,
        range: Option<VersionRange>,
    },

    #[error(
        "component '{component}' requested optional peer dependency '{dependency}', which is not installed; {}",
        install_hint(.dependency, .range.as_ref())
    )]
    NotInstalled {
        dependency: String,
        component: String,
        range: Option<VersionRange>,
    },

    #[error("component '{component}' failed to load optional peer dependency '{dependency}': {source}")]
    LoadFailed {
        dependency: String,
        component: String,
        source: LoadError,
    },

    #[error(
        "optional peer dependency '{dependency}' of component '{component}' has no version information in '{}'",
        .manifest_path.display()
    )]
    MissingVersion {
        dependency: String,
        component: String,
        manifest_path: PathBuf,
    },

    #[error(
        "optional peer dependency '{dependency}' of component '{component}' has a non-string version ({found})"
    )]
    NonStringVersion {
        dependency: String,
        component: String,
        found: String,
    },

    #[error(
        "optional peer dependency '{dependency}' of component '{component}' has malformed version '{version}'"
    )]
    MalformedVersion {
        dependency: String,
        component: String,
        version: String,
    },

    #[error(
        "component '{component}' requires optional peer dependency '{dependency}' at '{required}', but version {actual} is installed"
    )]
    Unsatisfied {
        dependency: String,
        component: String,
        required: VersionRange,
        actual: Version,
    },
}

impl RequireError {
    /// Returns true for the conditions `optional` suppresses.
    #[must_use]
    pub fn is_not_installed(&self) -> bool {
        matches!(self, Self::NotDeclared { .. } | Self::NotInstalled { .. })
    }

    /// The dependency the error is about.
    #[must_use]
    pub fn dependency(&self) -> &str {
        match self {
            Self::NotDeclared { dependency, .. }
            | Self::NotInstalled { dependency, .. }
            | Self::LoadFailed { dependency, .. }
            | Self::MissingVersion { dependency, .. }
            | Self::NonStringVersion { dependency, .. }
            | Self::MalformedVersion { dependency, .. }
            | Self::Unsatisfied { dependency, .. } => dependency,
        }
    }
}

fn install_hint(dependency: &str, range: Option<&VersionRange>) -> String {
    match range {
        Some(range) => format!("please install `{dependency}@{range}`"),
        None => format!("please install `{dependency}`"),
    }
}

/// Options for creating a gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct RegisterOptions {
    /// Component manifest sections to read, lowest precedence first.
    pub sections: Vec<String>,
    /// Registration name; defaults to the manifest's `name`.
    pub name: Option<String>,
    /// Require the component's manifest to describe the component module.
    pub identity_check: bool,
    /// Consumer manifest sections that count as declaring a dependency.
    pub consumer_sections: Vec<String>,
    /// Manifest filename to search for.
    pub manifest_file: String,
}

impl Default for RegisterOptions {
    fn default() -> Self {
        Self {
            sections: vec![DEFAULT_SECTION.to_string()],
            name: None,
            identity_check: true,
            consumer_sections: DEFAULT_CONSUMER_SECTIONS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            manifest_file: MANIFEST_FILE.to_string(),
        }
    }
}

impl RegisterOptions {
    /// Create options with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse options from TOML, filling in defaults.
    ///
    /// # Errors
    ///
    /// Returns an error on invalid TOML or unknown keys.
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Register under an explicit name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Read these sections instead of the default one.
    #[must_use]
    pub fn with_sections<I, S>(mut self, sections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sections = sections.into_iter().map(Into::into).collect();
        self
    }

    /// Enable or disable the identity check.
    #[must_use]
    pub fn with_identity_check(mut self, check: bool) -> Self {
        self.identity_check = check;
        self
    }

    /// Search for a different manifest filename.
    #[must_use]
    pub fn with_manifest_file(mut self, file: impl Into<String>) -> Self {
        self.manifest_file = file.into();
        self
    }
}

/// Per-call strictness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequireOptions {
    /// Return `None` instead of failing when the dependency is not installed.
    pub optional: bool,
    /// Return `None` instead of failing for any call-time error.
    pub dont_throw: bool,
}

impl RequireOptions {
    /// Strict options: every problem is an error.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    #[must_use]
    pub fn with_dont_throw(mut self, dont_throw: bool) -> Self {
        self.dont_throw = dont_throw;
        self
    }
}

/// The module registering a gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    /// The component's module file.
    pub path: PathBuf,
    /// The module that loaded the component, when known.
    pub parent: Option<PathBuf>,
}

impl Component {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            parent: None,
        }
    }

    /// Record the module that loaded this component.
    #[must_use]
    pub fn with_parent(mut self, parent: impl Into<PathBuf>) -> Self {
        self.parent = Some(parent.into());
        self
    }
}

/// Checks and loads a component's optional peer dependencies.
#[derive(Debug)]
pub struct Gateway<L: ModuleLoader> {
    name: String,
    component: Component,
    manifest_path: PathBuf,
    declared: DeclaredDependencies,
    consumer: Manifest,
    consumer_manifest_path: PathBuf,
    consumer_sections: Vec<String>,
    loader: Arc<L>,
}

impl<L: ModuleLoader> Gateway<L> {
    /// Create a gateway for `component`.
    ///
    /// # Errors
    ///
    /// Returns an error if either manifest cannot be located, the component
    /// has no name, or a declared range is invalid.
    pub fn new(
        loader: Arc<L>,
        component: &Component,
        options: &RegisterOptions,
    ) -> Result<Self, RegisterError> {
        let (located, name) = locate_component(loader.as_ref(), component, options)?;
        Self::from_located(loader, component, located, name, options)
    }

    /// Finish creation once the component's manifest and name are known.
    pub(crate) fn from_located(
        loader: Arc<L>,
        component: &Component,
        located: Located,
        name: String,
        options: &RegisterOptions,
    ) -> Result<Self, RegisterError> {
        let declared =
            extract(&located.manifest, &options.sections).map_err(|source| RegisterError::Extract {
                component: name.clone(),
                source,
            })?;

        let consumer = locate_consumer(loader.as_ref(), component, &located, options).map_err(
            |source| RegisterError::ConsumerManifest {
                component: name.clone(),
                source,
            },
        )?;

        tracing::debug!(
            component = %name,
            declared = declared.len(),
            consumer = %consumer.path.display(),
            "created gateway"
        );

        Ok(Self {
            name,
            component: component.clone(),
            manifest_path: located.path,
            declared,
            consumer: consumer.manifest,
            consumer_manifest_path: consumer.path,
            consumer_sections: options.consumer_sections.clone(),
            loader,
        })
    }

    /// The registration name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The component's manifest path.
    #[must_use]
    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    /// The consuming application's manifest path.
    #[must_use]
    pub fn consumer_manifest_path(&self) -> &Path {
        &self.consumer_manifest_path
    }

    /// The declared optional peer dependencies.
    #[must_use]
    pub fn declared(&self) -> &DeclaredDependencies {
        &self.declared
    }

    /// Resolve a dependency without loading it.
    pub fn resolve(&self, dependency: &str) -> Resolution {
        Resolver::new(
            &self.declared,
            &self.consumer,
            &self.consumer_sections,
            self.loader.as_ref(),
            &self.component.path,
        )
        .resolve(dependency)
    }

    /// Resolve every declared dependency.
    pub fn resolve_all(&self) -> Vec<Resolution> {
        self.declared
            .iter()
            .map(|(name, _)| self.resolve(name))
            .collect()
    }

    /// Check and load a dependency.
    ///
    /// Returns `Ok(None)` when a problem is suppressed by `options`.
    ///
    /// # Errors
    ///
    /// Returns the first failed check unless `options` suppress it.
    pub fn require(
        &self,
        dependency: &str,
        options: RequireOptions,
    ) -> Result<Option<L::Module>, RequireError> {
        match self.try_require(dependency) {
            Ok(module) => Ok(Some(module)),
            Err(e) if options.optional && e.is_not_installed() => {
                tracing::debug!(
                    component = %self.name,
                    dependency,
                    "optional peer dependency not installed"
                );
                Ok(None)
            }
            Err(e) if options.dont_throw => {
                tracing::warn!(
                    component = %self.name,
                    dependency,
                    error = %e,
                    "optional peer dependency unavailable"
                );
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn try_require(&self, dependency: &str) -> Result<L::Module, RequireError> {
        let resolution = self.resolve(dependency);
        let Resolution {
            name,
            supported_range,
            installed_version,
            installed,
            declared_by_consumer,
            manifest_path,
            ..
        } = resolution;

        if installed == Installed::No {
            return Err(if declared_by_consumer {
                RequireError::NotInstalled {
                    dependency: name,
                    component: self.name.clone(),
                    range: supported_range,
                }
            } else {
                RequireError::NotDeclared {
                    dependency: name,
                    component: self.name.clone(),
                    range: supported_range,
                }
            });
        }

        let module = match self.loader.load(dependency, &self.component.path) {
            Ok(module) => module,
            Err(LoadError::NotFound { .. }) => {
                return Err(RequireError::NotInstalled {
                    dependency: name,
                    component: self.name.clone(),
                    range: supported_range,
                })
            }
            Err(source) => {
                return Err(RequireError::LoadFailed {
                    dependency: name,
                    component: self.name.clone(),
                    source,
                })
            }
        };

        let Some(required) = supported_range else {
            return Ok(module);
        };

        match installed_version {
            VersionMetadata::Valid(actual) if required.matches(&actual) => Ok(module),
            VersionMetadata::Valid(actual) => Err(RequireError::Unsatisfied {
                dependency: name,
                component: self.name.clone(),
                required,
                actual,
            }),
            VersionMetadata::Missing => Err(RequireError::MissingVersion {
                dependency: name,
                component: self.name.clone(),
                manifest_path,
            }),
            VersionMetadata::NotAString(found) => Err(RequireError::NonStringVersion {
                dependency: name,
                component: self.name.clone(),
                found,
            }),
            VersionMetadata::Malformed(version) => Err(RequireError::MalformedVersion {
                dependency: name,
                component: self.name.clone(),
                version,
            }),
        }
    }
}

/// Locate the component's manifest and settle its registration name.
pub(crate) fn locate_component<L: ModuleLoader + ?Sized>(
    loader: &L,
    component: &Component,
    options: &RegisterOptions,
) -> Result<(Located, String), RegisterError> {
    let located = Locator::new(loader, &options.manifest_file)
        .locate(&component.path, options.identity_check)
        .map_err(|source| RegisterError::ComponentManifest {
            module: component.path.clone(),
            source,
        })?;

    let name = match (&options.name, located.manifest.name()) {
        (Some(explicit), _) => explicit.clone(),
        (None, Some(name)) => name.to_string(),
        (None, None) => {
            return Err(RegisterError::MissingName {
                manifest_path: located.path,
            })
        }
    };
    Ok((located, name))
}

/// Locate the consuming application's manifest.
///
/// The search starts at the component's parent module when known, otherwise
/// just above the component's own package.
fn locate_consumer<L: ModuleLoader + ?Sized>(
    loader: &L,
    component: &Component,
    located: &Located,
    options: &RegisterOptions,
) -> Result<Located, LocateError> {
    let locator = Locator::new(loader, &options.manifest_file);
    match (&component.parent, located.root().parent()) {
        (Some(parent), _) => locator.locate(parent, false),
        (None, Some(above)) => locator.locate(above, false),
        (None, None) => Err(LocateError::NotFound {
            start: located.root().to_path_buf(),
            file_name: options.manifest_file.clone(),
        }),
    }
}
