//! Registry for looking up payment providers by name.

use std::collections::HashMap;
use std::sync::Arc;

use super::{Chargeable, Fundable};
use crate::error::{ClassifiedError, ErrorCatalog, ErrorCode};

/// Providers registered by name, for charging and for funding.
///
/// A provider implementing both traits is usually registered twice, once
/// per capability.
#[derive(Default)]
pub struct ProviderRegistry {
    chargeables: HashMap<String, Arc<dyn Chargeable>>,
    fundables: HashMap<String, Arc<dyn Fundable>>,
    catalog: ErrorCatalog,
}

impl ProviderRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `catalog` to describe lookup failures.
    pub fn with_catalog(mut self, catalog: ErrorCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Registers a charge provider under its name, replacing any previous one.
    pub fn register_chargeable(&mut self, provider: Arc<dyn Chargeable>) {
        self.chargeables.insert(provider.name().to_string(), provider);
    }

    /// Registers a funding provider under its name, replacing any previous one.
    pub fn register_fundable(&mut self, provider: Arc<dyn Fundable>) {
        self.fundables.insert(provider.name().to_string(), provider);
    }

    /// Looks up a charge provider, failing with `RequestNotValid` if unknown.
    pub fn chargeable(&self, name: &str) -> Result<Arc<dyn Chargeable>, ClassifiedError> {
        self.chargeables
            .get(name)
            .cloned()
            .ok_or_else(|| self.unknown_provider("charge", name))
    }

    /// Looks up a funding provider, failing with `RequestNotValid` if unknown.
    pub fn fundable(&self, name: &str) -> Result<Arc<dyn Fundable>, ClassifiedError> {
        self.fundables
            .get(name)
            .cloned()
            .ok_or_else(|| self.unknown_provider("funding", name))
    }

    /// Names of registered charge providers, sorted.
    pub fn chargeable_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.chargeables.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Names of registered funding providers, sorted.
    pub fn fundable_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.fundables.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Whether no provider is registered.
    pub fn is_empty(&self) -> bool {
        self.chargeables.is_empty() && self.fundables.is_empty()
    }

    fn unknown_provider(&self, capability: &str, name: &str) -> ClassifiedError {
        self.catalog
            .error(
                ErrorCode::RequestNotValid,
                format!("No {} provider registered with name: {}", capability, name),
            )
            .with_param("provider", name)
    }
}
