//! Runtime resolution of optional peer dependencies.
//!
//! A component declares dependencies it can use but does not require in a
//! section of its manifest (`package.toml`). At runtime it asks for them
//! through a [`Gateway`], which checks that the consuming application has
//! declared and installed the dependency and that the installed version
//! satisfies the declared range.
//!
//! This crate provides:
//! - Version range validation on top of `semver`
//! - Upward manifest discovery with an identity check
//! - Extraction of declared optional peer dependencies
//! - Manifest-only resolution of installation status
//! - Gateways that load dependencies with caller-selected strictness
//! - A registry memoizing one gateway per component name

mod extract;
mod gateway;
mod loader;
mod locate;
mod manifest;
mod range;
mod registry;
mod resolve;

#[cfg(test)]
mod testutil;

pub use extract::{extract, DeclaredDependencies, ExtractError, DEFAULT_SECTION};
pub use gateway::{
    Component, Gateway, RegisterError, RegisterOptions, RequireError, RequireOptions,
    DEFAULT_CONSUMER_SECTIONS,
};
pub use loader::{split_request, FsLoader, FsLoaderConfig, LoadError, ModuleLoader, Package};
pub use locate::{find_manifest, Located, LocateError, Locator};
pub use manifest::{Manifest, ManifestError, VersionMetadata, DEFAULT_ENTRY, MANIFEST_FILE};
pub use range::{satisfies, validate, RangeError, VersionRange};
pub use registry::Registry;
pub use resolve::{Installed, Resolution, Resolver};
