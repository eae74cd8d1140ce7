//! Module exports for `(module, name)` listeners.

use crate::error::EngineError;
use eventbridge_core::Function;
use std::{
    collections::HashMap,
    sync::{PoisonError, RwLock},
};

/// Functions exported by modules, looked up by `(module, name)`.
///
/// Lookups happen on every invocation, so redefining an export takes effect
/// for listeners that were registered before.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    modules: RwLock<HashMap<String, HashMap<String, Function>>>,
}

impl ModuleRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Define (or redefine) `module#name`.
    pub fn define(&self, module: &str, name: &str, function: Function) {
        let mut modules = self.modules.write().unwrap_or_else(PoisonError::into_inner);
        modules
            .entry(module.to_owned())
            .or_default()
            .insert(name.to_owned(), function);
    }

    /// Remove `module#name`, returning the old function.
    pub fn undefine(&self, module: &str, name: &str) -> Option<Function> {
        let mut modules = self.modules.write().unwrap_or_else(PoisonError::into_inner);
        modules.get_mut(module)?.remove(name)
    }

    /// Look up `module#name`.
    pub fn resolve(&self, module: &str, name: &str) -> Result<Function, EngineError> {
        let modules = self.modules.read().unwrap_or_else(PoisonError::into_inner);
        modules
            .get(module)
            .and_then(|exports| exports.get(name))
            .cloned()
            .ok_or_else(|| EngineError::UnresolvedTarget {
                module: module.to_owned(),
                name: name.to_owned(),
            })
    }
}
