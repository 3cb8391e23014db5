//! Upward manifest discovery.
//!
//! Finds the nearest manifest above a module file. For a component locating
//! its own manifest, the found package must also resolve back to the module
//! that asked, so a manifest sitting above a symlinked or vendored copy is
//! not mistaken for the component's own.

use crate::loader::ModuleLoader;
use crate::manifest::{Manifest, ManifestError};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur when locating a manifest.
#[derive(Error, Debug)]
pub enum LocateError {
    #[error("no {file_name} found in '{}' or any parent directory", .start.display())]
    NotFound { start: PathBuf, file_name: String },

    #[error(
        "manifest '{}' was found but does not describe module '{}': {reason}",
        .manifest_path.display(),
        .module.display()
    )]
    IdentityMismatch {
        manifest_path: PathBuf,
        module: PathBuf,
        reason: String,
    },

    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

/// A manifest together with where it was found.
#[derive(Debug, Clone)]
pub struct Located {
    /// The parsed manifest.
    pub manifest: Manifest,
    /// Path to the manifest file.
    pub path: PathBuf,
}

impl Located {
    /// The directory containing the manifest.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.path.parent().unwrap_or(&self.path)
    }
}

/// Find the nearest manifest file by searching upward from `start`.
///
/// `start` may be a file (the search begins in its directory) or a
/// directory.
#[must_use]
pub fn find_manifest(start: &Path, file_name: &str) -> Option<PathBuf> {
    let mut current = if start.is_dir() {
        start.to_path_buf()
    } else {
        start.parent()?.to_path_buf()
    };

    loop {
        let manifest = current.join(file_name);
        if manifest.is_file() {
            return Some(manifest);
        }

        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => return None,
        }
    }
}

/// Locates manifests on behalf of modules.
#[derive(Debug)]
pub struct Locator<'a, L: ?Sized> {
    loader: &'a L,
    file_name: &'a str,
}

impl<'a, L: ModuleLoader + ?Sized> Locator<'a, L> {
    /// Create a locator searching for `file_name`.
    #[must_use]
    pub fn new(loader: &'a L, file_name: &'a str) -> Self {
        Self { loader, file_name }
    }

    /// Locate the manifest enclosing `module`.
    ///
    /// With `identity_check`, the package rooted at the manifest's directory
    /// must load as `module` itself.
    ///
    /// # Errors
    ///
    /// Returns [`LocateError::NotFound`] when no manifest exists up to the
    /// filesystem root, [`LocateError::IdentityMismatch`] when the identity
    /// check fails, and [`LocateError::Manifest`] when the file is unreadable.
    pub fn locate(&self, module: &Path, identity_check: bool) -> Result<Located, LocateError> {
        let start = absolute(module);
        let path = find_manifest(&start, self.file_name).ok_or_else(|| LocateError::NotFound {
            start: start.clone(),
            file_name: self.file_name.to_string(),
        })?;
        tracing::debug!(module = %module.display(), manifest = %path.display(), "found manifest");

        let manifest = Manifest::from_path(&path)?;
        let located = Located { manifest, path };

        if identity_check {
            self.check_identity(&start, &located)?;
        }
        Ok(located)
    }

    fn check_identity(&self, module: &Path, located: &Located) -> Result<(), LocateError> {
        let mismatch = |reason: String| LocateError::IdentityMismatch {
            manifest_path: located.path.clone(),
            module: module.to_path_buf(),
            reason,
        };

        let resolved = self
            .loader
            .identify(located.root())
            .map_err(|e| mismatch(e.to_string()))?;

        if resolved == module {
            Ok(())
        } else {
            Err(mismatch(format!("package resolves to '{}'", resolved.display())))
        }
    }
}

/// Canonicalize where possible, otherwise anchor relative paths at the
/// working directory.
fn absolute(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::FsLoader;
    use crate::manifest::MANIFEST_FILE;
    use crate::testutil::Fixture;

    #[test]
    fn test_find_nearest_manifest() {
        let fx = Fixture::new();
        fx.write("app/package.toml", "name = \"app\"\n");
        fx.write("app/peer_modules/ui/package.toml", "name = \"ui\"\n");
        let module = fx.write("app/peer_modules/ui/src/widgets/button", "");

        assert_eq!(
            find_manifest(&module, MANIFEST_FILE),
            Some(fx.path("app/peer_modules/ui/package.toml"))
        );
        assert_eq!(
            find_manifest(&fx.path("app/src"), MANIFEST_FILE),
            Some(fx.path("app/package.toml"))
        );
    }

    #[test]
    fn test_locate_without_identity_check() {
        let fx = Fixture::new();
        fx.write("app/package.toml", "name = \"app\"\n");
        let module = fx.write("app/src/main", "");

        let loader = FsLoader::new();
        let located = Locator::new(&loader, MANIFEST_FILE)
            .locate(&module, false)
            .unwrap();
        assert_eq!(located.manifest.name(), Some("app"));
        assert_eq!(located.root(), fx.path("app").canonicalize().unwrap());
    }

    #[test]
    fn test_locate_not_found() {
        let fx = Fixture::new();
        let module = fx.write("orphan/src/main", "");

        let loader = FsLoader::new();
        let err = Locator::new(&loader, "optpeer-test-nonexistent.toml")
            .locate(&module, false)
            .unwrap_err();
        assert!(matches!(err, LocateError::NotFound { .. }));
    }

    #[test]
    fn test_identity_check_accepts_entry_module() {
        let fx = Fixture::new();
        fx.write("ui/package.toml", "name = \"ui\"\nmain = \"src/lib\"\n");
        let module = fx.write("ui/src/lib", "");

        let loader = FsLoader::new();
        let located = Locator::new(&loader, MANIFEST_FILE)
            .locate(&module, true)
            .unwrap();
        assert_eq!(located.manifest.name(), Some("ui"));
    }

    #[test]
    fn test_identity_check_rejects_unrelated_manifest() {
        let fx = Fixture::new();
        // A vendored file sitting under someone else's package.
        fx.write("host/package.toml", "name = \"host\"\n");
        fx.write("host/index", "");
        let module = fx.write("host/vendor/ui/index", "");

        let loader = FsLoader::new();
        let locator = Locator::new(&loader, MANIFEST_FILE);
        let err = locator.locate(&module, true).unwrap_err();
        assert!(matches!(err, LocateError::IdentityMismatch { .. }));

        // Without the check the host manifest is accepted.
        let located = locator.locate(&module, false).unwrap();
        assert_eq!(located.manifest.name(), Some("host"));
    }

    #[test]
    fn test_invalid_manifest_is_reported() {
        let fx = Fixture::new();
        fx.write("app/package.toml", "name = ");
        let module = fx.write("app/main", "");

        let loader = FsLoader::new();
        let err = Locator::new(&loader, MANIFEST_FILE)
            .locate(&module, false)
            .unwrap_err();
        assert!(matches!(err, LocateError::Manifest(ManifestError::Parse { .. })));
    }
}
