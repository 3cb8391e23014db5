//! Registry of gateways, one per component name.
//!
//! A host creates one registry at startup and shares it for the rest of the
//! process. Registering a component whose name is already present returns
//! the existing gateway without re-extracting its declarations.

use crate::gateway::{locate_component, Component, Gateway, RegisterError, RegisterOptions};
use crate::loader::ModuleLoader;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Gateways by registration name.
#[derive(Debug)]
pub struct Registry<L: ModuleLoader> {
    loader: Arc<L>,
    gateways: RwLock<HashMap<String, Arc<Gateway<L>>>>,
}

impl<L: ModuleLoader> Registry<L> {
    /// Create an empty registry around a loader.
    #[must_use]
    pub fn new(loader: L) -> Self {
        Self::with_shared_loader(Arc::new(loader))
    }

    /// Create an empty registry around an already-shared loader.
    #[must_use]
    pub fn with_shared_loader(loader: Arc<L>) -> Self {
        Self {
            loader,
            gateways: RwLock::new(HashMap::new()),
        }
    }

    /// The loader gateways are created with.
    #[must_use]
    pub fn loader(&self) -> &Arc<L> {
        &self.loader
    }

    /// Register a component, or return its existing gateway.
    ///
    /// With an explicit name in `options`, a cached gateway is returned
    /// before any manifest is read. Otherwise the component's manifest is
    /// located to learn its name first.
    ///
    /// # Errors
    ///
    /// Returns an error if a new gateway cannot be created.
    pub fn register(
        &self,
        component: &Component,
        options: &RegisterOptions,
    ) -> Result<Arc<Gateway<L>>, RegisterError> {
        if let Some(existing) = options.name.as_deref().and_then(|name| self.get(name)) {
            return Ok(existing);
        }

        let (located, name) = locate_component(self.loader.as_ref(), component, options)?;
        if let Some(existing) = self.get(&name) {
            tracing::debug!(component = %name, "reusing registered gateway");
            return Ok(existing);
        }

        let gateway = Gateway::from_located(
            Arc::clone(&self.loader),
            component,
            located,
            name.clone(),
            options,
        )?;

        let mut gateways = self
            .gateways
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        // A concurrent registration may have won; keep the first.
        let entry = gateways.entry(name).or_insert_with(|| Arc::new(gateway));
        Ok(Arc::clone(entry))
    }

    /// Look up a gateway by registration name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<Gateway<L>>> {
        self.gateways
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .gateways
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Returns the number of registered gateways.
    #[must_use]
    pub fn len(&self) -> usize {
        self.gateways
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
