//! Test utilities: on-disk package trees.

use std::path::PathBuf;
use tempfile::TempDir;

/// A temporary directory tree of manifests and module files.
pub struct Fixture {
    dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    /// Absolute path of a fixture-relative path.
    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    /// Write a file, creating parent directories.
    pub fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, content).unwrap();
        path
    }

    /// Lay out an application with one component installed under it.
    ///
    /// Returns the path of the component's entry module.
    pub fn app_with_component(&self, app_manifest: &str, component_manifest: &str) -> PathBuf {
        self.write("app/package.toml", app_manifest);
        self.write("app/src/main", "");
        self.write("app/peer_modules/ui/package.toml", component_manifest);
        self.write("app/peer_modules/ui/index", "")
    }

    /// Install a dependency package under the application.
    pub fn install(&self, name: &str, manifest: &str) {
        self.write(&format!("app/peer_modules/{name}/package.toml"), manifest);
        self.write(&format!("app/peer_modules/{name}/index"), "");
    }
}
