//! Package manifest (`package.toml`) reading.
//!
//! Manifests are kept as a plain TOML table: components and applications put
//! arbitrary sections in them, and only a handful of keys are interpreted
//! here.

use semver::Version;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The manifest filename.
pub const MANIFEST_FILE: &str = "package.toml";

/// Entry point used when a manifest has no `main` key.
pub const DEFAULT_ENTRY: &str = "index";

/// Errors that can occur when reading a manifest.
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("failed to read manifest file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse manifest '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// A read-only snapshot of a manifest file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    table: toml::Table,
}

/// The `version` field of a manifest, as found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "kebab-case")]
pub enum VersionMetadata {
    /// No `version` key.
    Missing,
    /// A `version` key holding something other than a string.
    NotAString(String),
    /// A string that is not a semantic version.
    Malformed(String),
    /// A well-formed semantic version.
    Valid(Version),
}

impl VersionMetadata {
    /// Returns the parsed version, if well-formed.
    #[must_use]
    pub fn as_version(&self) -> Option<&Version> {
        match self {
            Self::Valid(v) => Some(v),
            _ => None,
        }
    }

    /// Returns true if a `version` key exists, whatever its shape.
    #[must_use]
    pub fn is_present(&self) -> bool {
        !matches!(self, Self::Missing)
    }
}

impl std::fmt::Display for VersionMetadata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing => write!(f, "none"),
            Self::NotAString(ty) => write!(f, "<{ty}>"),
            Self::Malformed(raw) => write!(f, "{raw} (malformed)"),
            Self::Valid(v) => write!(f, "{v}"),
        }
    }
}

impl Manifest {
    /// Load a manifest from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| ManifestError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse a manifest from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        let table: toml::Table = toml::from_str(content)?;
        Ok(Self { table })
    }

    /// Wrap an already-parsed table.
    #[must_use]
    pub fn from_table(table: toml::Table) -> Self {
        Self { table }
    }

    /// The underlying table.
    #[must_use]
    pub fn as_table(&self) -> &toml::Table {
        &self.table
    }

    /// Raw access to a top-level key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&toml::Value> {
        self.table.get(key)
    }

    /// The package name, if present and a string.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.table.get("name").and_then(toml::Value::as_str)
    }

    /// The package entry point, if present and a string.
    #[must_use]
    pub fn main(&self) -> Option<&str> {
        self.table.get("main").and_then(toml::Value::as_str)
    }

    /// Classify the `version` field.
    #[must_use]
    pub fn version(&self) -> VersionMetadata {
        match self.table.get("version") {
            None => VersionMetadata::Missing,
            Some(toml::Value::String(raw)) => match Version::parse(raw.trim()) {
                Ok(v) => VersionMetadata::Valid(v),
                Err(_) => VersionMetadata::Malformed(raw.clone()),
            },
            Some(other) => VersionMetadata::NotAString(other.type_str().to_string()),
        }
    }

    /// A named section, if present and a table.
    #[must_use]
    pub fn section(&self, key: &str) -> Option<&toml::Table> {
        self.table.get(key).and_then(toml::Value::as_table)
    }

    /// Returns true if `dependency` is a key of any of the given sections.
    pub fn declares<S: AsRef<str>>(&self, dependency: &str, sections: &[S]) -> bool {
        sections
            .iter()
            .filter_map(|s| self.section(s.as_ref()))
            .any(|table| table.contains_key(dependency))
    }
}
