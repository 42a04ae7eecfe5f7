use crate::{Plugin, PluginError, PluginOutput};
use std::sync::Arc;

/// Registry of the tools available to one agent.
///
/// The registry is responsible for:
/// - Registering plugins under unique names
/// - Looking up plugins by exact name
/// - Executing plugins
/// - Rendering the tool list shown to the model
///
/// Registration order is preserved so the prompt lists tools the same way on
/// every turn.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<Arc<dyn Plugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin. Fails if another plugin already uses its name.
    pub fn register(&mut self, plugin: Arc<dyn Plugin>) -> Result<(), PluginError> {
        if self.get(plugin.name()).is_some() {
            return Err(PluginError::DuplicateName(plugin.name().to_string()));
        }

        self.plugins.push(plugin);
        Ok(())
    }

    /// Get a plugin by name (exact match).
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Plugin>> {
        self.plugins.iter().find(|plugin| plugin.name() == name)
    }

    /// Get all registered plugins in registration order.
    pub fn all(&self) -> &[Arc<dyn Plugin>] {
        &self.plugins
    }

    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|plugin| plugin.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Execute a plugin by name.
    pub async fn execute(&self, name: &str, input: &str) -> Result<PluginOutput, PluginError> {
        let plugin = self.get(name).ok_or_else(|| PluginError::UnknownTool {
            name: name.to_string(),
            available: self.names().join(", "),
        })?;

        plugin.execute(input).await
    }
}
