//! The module loader contract and a filesystem implementation.
//!
//! The resolution engine never reads dependency code itself. It asks a
//! [`ModuleLoader`] for a dependency's manifest or its loaded interface, and
//! relies on the loader to tell "not there" apart from "there but broken".

use crate::manifest::{Manifest, ManifestError, DEFAULT_ENTRY, MANIFEST_FILE};
use serde::{Deserialize, Serialize};
use std::path::{Component as PathComponent, Path, PathBuf};
use thiserror::Error;

/// Errors a loader can report.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// Nothing by that name is installed.
    #[error("module '{name}' not found")]
    NotFound { name: String },

    /// Something is installed but could not be loaded.
    #[error("module '{name}' failed to load: {reason}")]
    Failed { name: String, reason: String },
}

impl LoadError {
    /// Returns true for the "module truly missing" condition.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Fetches components and their manifests by name.
///
/// `from` is the file of the module making the request; loaders use it as
/// the starting point of their lookup.
pub trait ModuleLoader {
    /// The loaded interface of a component.
    type Module;

    /// Load a component's interface. `request` may carry a sub-path.
    fn load(&self, request: &str, from: &Path) -> Result<Self::Module, LoadError>;

    /// Read a component's own manifest without loading its code.
    fn load_manifest(&self, name: &str, from: &Path) -> Result<Manifest, LoadError>;

    /// Where the component's manifest is, or would be expected if missing.
    fn manifest_path(&self, name: &str, from: &Path) -> PathBuf;

    /// The module file that the package rooted at `package_root` loads as.
    fn identify(&self, package_root: &Path) -> Result<PathBuf, LoadError>;
}

/// Split a request into its package name and optional sub-path.
///
/// `widgets/render/svg` names the `widgets` package; scoped names keep
/// their scope: `@acme/widgets/svg` names `@acme/widgets`.
#[must_use]
pub fn split_request(request: &str) -> (&str, Option<&str>) {
    let name_end = if request.starts_with('@') {
        request.match_indices('/').nth(1).map(|(i, _)| i)
    } else {
        request.find('/')
    };

    match name_end {
        Some(i) => {
            let rest = &request[i + 1..];
            (&request[..i], (!rest.is_empty()).then_some(rest))
        }
        None => (request, None),
    }
}

/// Configuration for [`FsLoader`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct FsLoaderConfig {
    /// Directory holding installed packages, searched at every level.
    pub modules_dir: String,
    /// Manifest filename inside each package.
    pub manifest_file: String,
    /// Entry point used when a manifest has no `main` key.
    pub default_entry: String,
}

impl Default for FsLoaderConfig {
    fn default() -> Self {
        Self {
            modules_dir: String::from("peer_modules"),
            manifest_file: String::from(MANIFEST_FILE),
            default_entry: String::from(DEFAULT_ENTRY),
        }
    }
}

/// A package loaded from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct Package {
    /// The package name as requested.
    pub name: String,
    /// The package root directory.
    pub root: PathBuf,
    /// The package's own manifest.
    pub manifest: Manifest,
    /// The file the request resolved to.
    pub entry: PathBuf,
}

/// Loads packages from nested `peer_modules` directories.
///
/// A request for `name` made from `/app/peer_modules/ui/src/index` checks
/// `/app/peer_modules/ui/src/peer_modules/name`, then
/// `/app/peer_modules/ui/peer_modules/name`, and so on up to the root.
#[derive(Debug, Clone, Default)]
pub struct FsLoader {
    config: FsLoaderConfig,
}

impl FsLoader {
    /// Create a loader with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a loader with the given configuration.
    #[must_use]
    pub fn with_config(config: FsLoaderConfig) -> Self {
        Self { config }
    }

    /// The loader's configuration.
    #[must_use]
    pub fn config(&self) -> &FsLoaderConfig {
        &self.config
    }

    /// Candidate package directories, nearest first.
    fn candidates<'a>(
        &'a self,
        name: &'a str,
        from: &'a Path,
    ) -> impl Iterator<Item = PathBuf> + 'a {
        let start = if from.is_dir() {
            from
        } else {
            from.parent().unwrap_or(from)
        };
        start
            .ancestors()
            .map(move |dir| dir.join(&self.config.modules_dir).join(name))
    }

    /// The installed package directory for `name`, if any.
    fn find_root(&self, name: &str, from: &Path) -> Option<PathBuf> {
        if !is_plain_name(name) {
            return None;
        }
        self.candidates(name, from).find(|dir| dir.is_dir())
    }

    fn read_manifest(&self, name: &str, root: &Path) -> Result<Manifest, LoadError> {
        let path = root.join(&self.config.manifest_file);
        if !path.is_file() {
            return Err(LoadError::NotFound {
                name: name.to_string(),
            });
        }
        Manifest::from_path(&path).map_err(|e| LoadError::Failed {
            name: name.to_string(),
            reason: match e {
                ManifestError::Io { source, .. } => source.to_string(),
                ManifestError::Parse { source, .. } => source.to_string(),
            },
        })
    }

    fn entry_path(&self, root: &Path, manifest: &Manifest) -> PathBuf {
        root.join(manifest.main().unwrap_or(self.config.default_entry.as_str()))
    }
}

impl ModuleLoader for FsLoader {
    type Module = Package;

    fn load(&self, request: &str, from: &Path) -> Result<Package, LoadError> {
        let (name, subpath) = split_request(request);
        let root = self
            .find_root(name, from)
            .ok_or_else(|| LoadError::NotFound {
                name: name.to_string(),
            })?;
        let manifest = self.read_manifest(name, &root)?;

        let entry = match subpath {
            Some(sub) if !is_plain_name(sub) => {
                return Err(LoadError::NotFound {
                    name: request.to_string(),
                })
            }
            Some(sub) => root.join(sub),
            None => self.entry_path(&root, &manifest),
        };
        if !entry.is_file() {
            // The package is there; what it points at is not.
            return Err(LoadError::Failed {
                name: request.to_string(),
                reason: format!("entry point '{}' does not exist", entry.display()),
            });
        }

        tracing::debug!(request, entry = %entry.display(), "loaded package");
        Ok(Package {
            name: request.to_string(),
            root,
            manifest,
            entry,
        })
    }

    fn load_manifest(&self, name: &str, from: &Path) -> Result<Manifest, LoadError> {
        let root = self
            .find_root(name, from)
            .ok_or_else(|| LoadError::NotFound {
                name: name.to_string(),
            })?;
        self.read_manifest(name, &root)
    }

    fn manifest_path(&self, name: &str, from: &Path) -> PathBuf {
        self.find_root(name, from)
            .or_else(|| self.candidates(name, from).next())
            .unwrap_or_else(|| PathBuf::from(&self.config.modules_dir).join(name))
            .join(&self.config.manifest_file)
    }

    fn identify(&self, package_root: &Path) -> Result<PathBuf, LoadError> {
        let label = package_root.display().to_string();
        let manifest = self.read_manifest(&label, package_root)?;
        let entry = self.entry_path(package_root, &manifest);
        entry.canonicalize().map_err(|e| LoadError::Failed {
            name: label,
            reason: format!("entry point '{}': {e}", entry.display()),
        })
    }
}

/// Reject names that would escape the modules directory.
fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && Path::new(name)
            .components()
            .all(|c| matches!(c, PathComponent::Normal(_)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::Fixture;

    #[test]
    fn test_split_request() {
        assert_eq!(split_request("widgets"), ("widgets", None));
        assert_eq!(split_request("widgets/render/svg"), ("widgets", Some("render/svg")));
        assert_eq!(split_request("widgets/"), ("widgets", None));
        assert_eq!(split_request("@acme/widgets"), ("@acme/widgets", None));
        assert_eq!(
            split_request("@acme/widgets/svg"),
            ("@acme/widgets", Some("svg"))
        );
    }

    #[test]
    fn test_load_nearest_package() {
        let fx = Fixture::new();
        fx.write(
            "app/peer_modules/charts/package.toml",
            "name = \"charts\"\nversion = \"2.1.0\"\n",
        );
        fx.write("app/peer_modules/charts/index", "");
        fx.write("app/src/main", "");

        let loader = FsLoader::new();
        let pkg = loader.load("charts", &fx.path("app/src/main")).unwrap();
        assert_eq!(pkg.name, "charts");
        assert_eq!(pkg.root, fx.path("app/peer_modules/charts"));
        assert_eq!(pkg.entry, fx.path("app/peer_modules/charts/index"));
        assert_eq!(pkg.manifest.name(), Some("charts"));
    }

    #[test]
    fn test_load_missing_is_not_found() {
        let fx = Fixture::new();
        fx.write("app/src/main", "");
        let loader = FsLoader::new();
        let err = loader.load("charts", &fx.path("app/src/main")).unwrap_err();
        assert!(err.is_not_found());

        let err = loader
            .load_manifest("charts", &fx.path("app/src/main"))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_load_broken_package_is_failed() {
        let fx = Fixture::new();
        fx.write(
            "app/peer_modules/charts/package.toml",
            "name = \"charts\"\nmain = \"lib/charts\"\n",
        );
        fx.write("app/main", "");
        let loader = FsLoader::new();

        // Manifest is fine, entry point is missing.
        assert!(loader.load_manifest("charts", &fx.path("app/main")).is_ok());
        let err = loader.load("charts", &fx.path("app/main")).unwrap_err();
        assert!(matches!(err, LoadError::Failed { .. }));

        fx.write("app/peer_modules/charts/package.toml", "name = [");
        let err = loader.load_manifest("charts", &fx.path("app/main")).unwrap_err();
        assert!(matches!(err, LoadError::Failed { .. }));
    }

    #[test]
    fn test_load_subpath() {
        let fx = Fixture::new();
        fx.write("app/peer_modules/charts/package.toml", "name = \"charts\"\n");
        fx.write("app/peer_modules/charts/render/svg", "");
        fx.write("app/main", "");

        let loader = FsLoader::new();
        let pkg = loader.load("charts/render/svg", &fx.path("app/main")).unwrap();
        assert_eq!(pkg.entry, fx.path("app/peer_modules/charts/render/svg"));
        assert!(loader.load("charts/render/png", &fx.path("app/main")).is_err());
    }

    #[test]
    fn test_manifest_path_falls_back_to_nearest_candidate() {
        let fx = Fixture::new();
        fx.write("app/main", "");
        let loader = FsLoader::new();
        assert_eq!(
            loader.manifest_path("charts", &fx.path("app/main")),
            fx.path("app/peer_modules/charts/package.toml")
        );
    }

    #[test]
    fn test_rejects_escaping_names() {
        let fx = Fixture::new();
        fx.write("app/main", "");
        let loader = FsLoader::new();
        assert!(loader.load("../etc", &fx.path("app/main")).unwrap_err().is_not_found());
    }

    #[test]
    fn test_identify_uses_main() {
        let fx = Fixture::new();
        fx.write("lib/package.toml", "name = \"lib\"\nmain = \"src/entry\"\n");
        fx.write("lib/src/entry", "");
        let loader = FsLoader::new();
        let id = loader.identify(&fx.path("lib")).unwrap();
        assert_eq!(id, fx.path("lib/src/entry").canonicalize().unwrap());
    }

    #[test]
    fn test_custom_config() {
        let fx = Fixture::new();
        fx.write("app/vendor/charts/meta.toml", "name = \"charts\"\n");
        fx.write("app/vendor/charts/start", "");
        fx.write("app/main", "");
        let loader = FsLoader::with_config(FsLoaderConfig {
            modules_dir: "vendor".to_string(),
            manifest_file: "meta.toml".to_string(),
            default_entry: "start".to_string(),
        });
        let pkg = loader.load("charts", &fx.path("app/main")).unwrap();
        assert_eq!(pkg.entry, fx.path("app/vendor/charts/start"));
    }
}
