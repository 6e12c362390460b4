//! Module system for the extensible IRC bot
//!
//! A module is loaded in three steps: its settings are reset to their
//! defaults, the configuration fragment stored under the module's name is
//! overlaid on top, and finally `load` registers the module's hooks.

use crate::{Client, Error, Result};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Module trait that all modules must implement
pub trait Module: Send + Sync {
    /// Module name, also the key of its configuration fragment
    fn name(&self) -> &str;

    /// One line describing what the module does
    fn help(&self) -> &str;

    /// Reset the module settings to their default values
    fn defaults(&mut self);

    /// Settings the configuration fragment is overlaid onto
    fn settings(&mut self) -> &mut dyn Settings;

    /// Register the module's hooks
    fn load(&mut self, client: &mut Client) -> Result<()>;
}

/// Module state that a configuration fragment can be overlaid onto
pub trait Settings {
    /// Replace the values present in `fragment`, keep all others
    fn overlay(&mut self, fragment: &Value) -> Result<()>;
}

impl<T> Settings for T
where
    T: Serialize + DeserializeOwned,
{
    fn overlay(&mut self, fragment: &Value) -> Result<()> {
        if !fragment.is_object() {
            return Err(Error::Config(format!("Expected a table of settings, found {}", fragment)));
        }

        let mut current = serde_json::to_value(&*self)?;
        merge(&mut current, fragment);
        *self = serde_json::from_value(current)?;
        Ok(())
    }
}

/// Tables are merged key by key, every other value is replaced.
fn merge(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (base, overlay) => *base = overlay.clone(),
    }
}

/// Ordered set of modules together with their raw configuration
pub struct ModuleSet {
    modules: Vec<Box<dyn Module>>,
    config: HashMap<String, Value>,
}

impl ModuleSet {
    /// Create an empty set over the per-module configuration blob
    pub fn new(config: HashMap<String, Value>) -> Self {
        Self {
            modules: Vec::new(),
            config,
        }
    }

    /// Add a module; names must be unique
    pub fn register(&mut self, module: Box<dyn Module>) -> Result<()> {
        if self.modules.iter().any(|m| m.name() == module.name()) {
            return Err(Error::Module(format!("Module {} registered twice", module.name())));
        }
        tracing::debug!("Registered module {}", module.name());
        self.modules.push(module);
        Ok(())
    }

    /// Name and help text of every registered module
    pub fn help_index(&self) -> Vec<(String, String)> {
        self.modules
            .iter()
            .map(|m| (m.name().to_string(), m.help().to_string()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Configure and load every module in registration order
    ///
    /// Stops at the first module that fails. Hooks registered by modules
    /// loaded before it stay in place.
    pub fn load_all(self, client: &mut Client) -> Result<()> {
        for unknown in self.config.keys().filter(|k| !self.modules.iter().any(|m| m.name() == k.as_str())) {
            tracing::warn!("Configuration for unknown module {}", unknown);
        }

        let ModuleSet { modules, config } = self;
        for mut module in modules {
            let name = module.name().to_string();

            module.defaults();
            if let Some(fragment) = config.get(&name) {
                module
                    .settings()
                    .overlay(fragment)
                    .map_err(|e| Error::Module(format!("Failed to configure module {}: {}", name, e)))?;
            }

            module
                .load(client)
                .map_err(|e| Error::Module(format!("Failed to load module {}: {}", name, e)))?;
            tracing::info!("Loaded module {}", name);
        }

        Ok(())
    }
}

impl Default for ModuleSet {
    fn default() -> Self {
        Self::new(HashMap::new())
    }
}
