use super::{
    CloudCommand, CreateAlarm, CreateInstance, CreateTags, DeleteImage, DeleteSnapshot,
    StartContainers,
};
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Registry of available commands, keyed by command name
pub struct CommandRegistry {
    commands: BTreeMap<String, Arc<dyn CloudCommand>>,
}

impl CommandRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            commands: BTreeMap::new(),
        }
    }

    /// Create a registry holding the bundled commands.
    ///
    /// Mapping tables are validated here, so a broken mapping fails at
    /// startup rather than on first use.
    pub fn with_defaults() -> Result<Self> {
        let mut registry = Self::new();
        registry.register(CreateInstance::new().context("Invalid create-instance mapping")?);
        registry.register(StartContainers::new().context("Invalid start-containers mapping")?);
        registry.register(DeleteImage::new().context("Invalid delete-image mapping")?);
        registry.register(DeleteSnapshot::new().context("Invalid delete-snapshot mapping")?);
        registry.register(CreateTags::new().context("Invalid create-tags mapping")?);
        registry.register(CreateAlarm::new().context("Invalid create-alarm mapping")?);
        Ok(registry)
    }

    pub fn register(&mut self, command: impl CloudCommand + 'static) {
        self.commands
            .insert(command.name().to_string(), Arc::new(command));
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn CloudCommand>> {
        self.commands
            .get(name)
            .cloned()
            .with_context(|| format!("Unknown command: {} (known: {})", name, self.list().join(", ")))
    }

    /// Registered command names, sorted
    pub fn list(&self) -> Vec<String> {
        self.commands.keys().cloned().collect()
    }

    pub fn commands(&self) -> impl Iterator<Item = &Arc<dyn CloudCommand>> {
        self.commands.values()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}
