//! Version range validation.
//!
//! Ranges use the `semver` requirement grammar (so a bare `1.2.3` means
//! `^1.2.3`), with a few extensions common in peer dependency declarations:
//! - `||` between alternatives
//! - whitespace between comparators: `>=1.0.0 <2.0.0`
//! - hyphen ranges: `1.0.0 - 1.4.0`
//! - an empty string, meaning any version

use semver::{Version, VersionReq};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// An unparseable version range.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid version range '{range}': {reason}")]
pub struct RangeError {
    /// The raw range expression.
    pub range: String,
    /// Why it was rejected.
    pub reason: String,
}

/// A validated version range.
///
/// Keeps the expression as written for display and error messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    raw: String,
    alternatives: Vec<VersionReq>,
}

impl VersionRange {
    /// Parse and validate a range expression.
    ///
    /// # Errors
    ///
    /// Returns an error if any alternative is not a valid requirement.
    pub fn parse(expr: &str) -> Result<Self, RangeError> {
        let alternatives = expr
            .split("||")
            .map(|alt| {
                parse_alternative(alt).map_err(|reason| RangeError {
                    range: expr.to_string(),
                    reason,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            raw: expr.to_string(),
            alternatives,
        })
    }

    /// A range matching every release.
    #[must_use]
    pub fn any() -> Self {
        Self {
            raw: String::from("*"),
            alternatives: vec![VersionReq::STAR],
        }
    }

    /// The expression as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The parsed alternatives; a version matches if any of them does.
    #[must_use]
    pub fn requirements(&self) -> &[VersionReq] {
        &self.alternatives
    }

    /// Check a version against the range.
    #[must_use]
    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives.iter().any(|req| req.matches(version))
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for VersionRange {
    type Err = RangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for VersionRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

/// Validate a range expression.
///
/// Each alternative follows Cargo's rules, so a bare `1.2.3` means `^1.2.3`
/// even between `||`. An exact pin is written `=1.2.3`. Hyphen bounds are
/// inclusive: `1.0.0 - 1.4.0` means `>=1.0.0, <=1.4.0`.
///
/// # Errors
///
/// Returns an error if the expression is not a valid range.
pub fn validate(expr: &str) -> Result<VersionRange, RangeError> {
    VersionRange::parse(expr)
}

/// Check whether a version string satisfies a range.
///
/// A version that is not a valid semantic version satisfies nothing.
#[must_use]
pub fn satisfies(version: &str, range: &VersionRange) -> bool {
    Version::parse(version.trim()).is_ok_and(|v| range.matches(&v))
}

const OPERATORS: &[&str] = &[">=", "<=", ">", "<", "=", "^", "~"];

/// Parse one `||`-separated alternative.
fn parse_alternative(alt: &str) -> Result<VersionReq, String> {
    let alt = alt.trim();
    if alt.is_empty() || alt == "*" {
        return Ok(VersionReq::STAR);
    }

    let normalized = match alt.split_once(" - ") {
        Some((low, high)) => format!(">={}, <={}", low.trim(), high.trim()),
        None => join_comparators(alt),
    };

    VersionReq::parse(&normalized).map_err(|e| e.to_string())
}

/// Rewrite whitespace-separated comparators into the comma form.
fn join_comparators(alt: &str) -> String {
    let mut comparators: Vec<String> = Vec::new();
    let mut pending_op: Option<&str> = None;

    for token in alt.split(|c: char| c == ',' || c.is_whitespace()) {
        if token.is_empty() {
            continue;
        }
        if OPERATORS.contains(&token) {
            // Operator written apart from its version: `>= 1.0`
            pending_op = Some(token);
            continue;
        }
        match pending_op.take() {
            Some(op) => comparators.push(format!("{op}{token}")),
            None => comparators.push(token.to_string()),
        }
    }
    if let Some(op) = pending_op {
        comparators.push(op.to_string());
    }

    comparators.join(", ")
}
