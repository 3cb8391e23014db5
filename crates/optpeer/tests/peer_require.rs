//! End-to-end tests: an application tree on disk, a component registered
//! through a registry, and dependencies requested through its gateway.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use optpeer::{
    Component, FsLoader, Installed, RegisterError, RegisterOptions, Registry, RequireError,
    RequireOptions,
};

fn write(root: &Path, rel: &str, content: &str) -> PathBuf {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, content).unwrap();
    path
}

/// An application with the `dashboard` component installed and `charts`
/// declared by the application.
fn setup(root: &Path, charts_version: Option<&str>) -> PathBuf {
    write(
        root,
        "shop/package.toml",
        r#"
name = "shop"
version = "0.3.0"

[dependencies]
dashboard = "2"
charts = "1.2"

[optional-dependencies]
export = "0.9"
"#,
    );
    write(root, "shop/src/main", "");
    write(
        root,
        "shop/peer_modules/dashboard/package.toml",
        r#"
name = "dashboard"
version = "2.4.1"
main = "lib/dashboard"

[optional-peer-dependencies]
charts = "~1.2.0"
export = ">=0.9.0 <1.0.0"
telemetry = "^4"
"#,
    );
    let module = write(root, "shop/peer_modules/dashboard/lib/dashboard", "");

    if let Some(version) = charts_version {
        write(
            root,
            "shop/peer_modules/charts/package.toml",
            &format!("name = \"charts\"\nversion = \"{version}\"\n"),
        );
        write(root, "shop/peer_modules/charts/index", "");
    }
    module
}

#[test]
fn compatible_dependency_is_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let module = setup(dir.path(), Some("1.2.5"));
    let registry = Registry::new(FsLoader::new());

    let gateway = registry
        .register(&Component::new(module), &RegisterOptions::new())
        .unwrap();
    assert_eq!(gateway.name(), "dashboard");

    let charts = gateway
        .require("charts", RequireOptions::new())
        .unwrap()
        .expect("charts should load");
    assert_eq!(charts.manifest.name(), Some("charts"));
}

#[test]
fn incompatible_dependency_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let module = setup(dir.path(), Some("2.0.0"));
    let registry = Registry::new(FsLoader::new());
    let gateway = registry
        .register(&Component::new(module), &RegisterOptions::new())
        .unwrap();

    let err = gateway
        .require("charts", RequireOptions::new())
        .unwrap_err();
    assert!(matches!(err, RequireError::Unsatisfied { .. }));

    let lenient = RequireOptions::new().with_dont_throw(true);
    assert!(gateway.require("charts", lenient).unwrap().is_none());

    let resolution = gateway.resolve("charts");
    assert_eq!(resolution.installed, Installed::Yes);
    assert!(!resolution.valid);
}

#[test]
fn undeclared_dependency_is_optional() {
    let dir = tempfile::tempdir().unwrap();
    let module = setup(dir.path(), Some("1.2.0"));
    write(
        dir.path(),
        "shop/peer_modules/telemetry/package.toml",
        "name = \"telemetry\"\nversion = \"4.0.0\"\n",
    );
    write(dir.path(), "shop/peer_modules/telemetry/index", "");

    let registry = Registry::new(FsLoader::new());
    let gateway = registry
        .register(&Component::new(module), &RegisterOptions::new())
        .unwrap();

    let optional = RequireOptions::new().with_optional(true);
    assert!(gateway.require("telemetry", optional).unwrap().is_none());
    assert!(matches!(
        gateway.require("telemetry", RequireOptions::new()),
        Err(RequireError::NotDeclared { .. })
    ));
}

#[test]
fn missing_dependency_names_remediation() {
    let dir = tempfile::tempdir().unwrap();
    let module = setup(dir.path(), None);
    let registry = Registry::new(FsLoader::new());
    let gateway = registry
        .register(&Component::new(module), &RegisterOptions::new())
        .unwrap();

    let err = gateway.require("export", RequireOptions::new()).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("dashboard"));
    assert!(message.contains("please install `export@>=0.9.0 <1.0.0`"));
}

#[test]
fn registry_lookup_and_idempotence() {
    let dir = tempfile::tempdir().unwrap();
    let module = setup(dir.path(), Some("1.2.5"));
    let registry = Registry::new(FsLoader::new());

    let first = registry
        .register(&Component::new(&module), &RegisterOptions::new())
        .unwrap();
    let second = registry
        .register(&Component::new(&module), &RegisterOptions::new())
        .unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    let looked_up = registry.get("dashboard").unwrap();
    assert!(Arc::ptr_eq(&first, &looked_up));
    assert!(registry.get("shop").is_none());
}

#[test]
fn identity_check_rejects_non_entry_module() {
    let dir = tempfile::tempdir().unwrap();
    setup(dir.path(), None);
    let helper = write(dir.path(), "shop/peer_modules/dashboard/lib/helpers", "");
    let registry = Registry::new(FsLoader::new());

    let err = registry
        .register(&Component::new(&helper), &RegisterOptions::new())
        .unwrap_err();
    assert!(matches!(err, RegisterError::ComponentManifest { .. }));

    let unchecked = RegisterOptions::new().with_identity_check(false);
    let gateway = registry.register(&Component::new(&helper), &unchecked).unwrap();
    assert_eq!(gateway.name(), "dashboard");
}
