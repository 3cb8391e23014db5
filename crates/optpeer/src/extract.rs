//! Extraction of declared optional peer dependencies.

use crate::manifest::Manifest;
use crate::range::VersionRange;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// The section scanned when no other is configured.
pub const DEFAULT_SECTION: &str = "optional-peer-dependencies";

/// Errors that can occur during extraction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    /// A declared range is not a valid range expression.
    #[error("invalid version range '{range}' for optional peer dependency '{dependency}': {reason}")]
    InvalidRange {
        dependency: String,
        range: String,
        reason: String,
    },
}

/// Validated version ranges by dependency name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DeclaredDependencies {
    ranges: BTreeMap<String, VersionRange>,
}

impl DeclaredDependencies {
    /// The declared range for a dependency.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&VersionRange> {
        self.ranges.get(name)
    }

    /// Returns true if the dependency is declared.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.ranges.contains_key(name)
    }

    /// Returns the number of declared dependencies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Returns true if nothing is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Iterate over declarations in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &VersionRange)> {
        self.ranges.iter()
    }
}

/// Build the declared dependency map from the given manifest sections.
///
/// Sections are merged in order, so a later section overrides an earlier one
/// for the same dependency. Keys that are absent or not tables are skipped.
///
/// # Errors
///
/// Returns an error for the first range that does not validate, including
/// values that are not strings.
pub fn extract<S: AsRef<str>>(
    manifest: &Manifest,
    sections: &[S],
) -> Result<DeclaredDependencies, ExtractError> {
    let mut ranges = BTreeMap::new();

    for section in sections {
        let Some(table) = manifest.section(section.as_ref()) else {
            continue;
        };

        for (name, value) in table {
            let range = match value {
                toml::Value::String(expr) => {
                    VersionRange::parse(expr).map_err(|e| ExtractError::InvalidRange {
                        dependency: name.clone(),
                        range: expr.clone(),
                        reason: e.reason,
                    })?
                }
                other => {
                    return Err(ExtractError::InvalidRange {
                        dependency: name.clone(),
                        range: other.to_string(),
                        reason: format!("expected a string, found {}", other.type_str()),
                    })
                }
            };
            ranges.insert(name.clone(), range);
        }
    }

    tracing::debug!(count = ranges.len(), "extracted optional peer dependencies");
    Ok(DeclaredDependencies { ranges })
}
