//! Plugin registry and lifecycle management
//!
//! The registry is the single writer over the plugin set. Registration
//! order is preserved and is the dispatch order. A plugin is never exposed
//! half-constructed: `load` registers only after `on_load` has completed
//! without error.

use std::sync::Arc;

use super::VoicePlugin;
use crate::{Error, Result};

/// A registered plugin with its identity and version tag
#[derive(Clone)]
pub struct PluginEntry {
    /// Plugin identity (from [`VoicePlugin::name`])
    pub id: String,
    /// Version tag captured at load time
    pub version: String,
    /// The live instance
    pub plugin: Arc<dyn VoicePlugin>,
}

/// Owns the plugin set and its lifecycle
#[derive(Default)]
pub struct PluginRegistry {
    entries: Vec<PluginEntry>,
}

impl PluginRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a plugin: run its `on_load` hook, then register it
    ///
    /// # Errors
    ///
    /// Returns [`Error::PluginLoad`] if the identity is already registered
    /// or `on_load` fails; a failed plugin is never registered.
    pub async fn load(&mut self, plugin: Arc<dyn VoicePlugin>) -> Result<()> {
        let id = plugin.name().to_string();
        if self.entries.iter().any(|entry| entry.id == id) {
            return Err(Error::PluginLoad(format!("plugin {id} already loaded")));
        }

        plugin
            .on_load()
            .await
            .map_err(|e| Error::PluginLoad(format!("{id}: on_load failed: {e}")))?;

        let version = plugin.version().to_string();
        tracing::info!(plugin_id = %id, version = %version, "plugin loaded");
        self.entries.push(PluginEntry {
            id,
            version,
            plugin,
        });
        Ok(())
    }

    /// Replace a loaded plugin with a fresh instance
    ///
    /// The outgoing instance's `on_unload` hook runs to completion
    /// (best-effort) before the replacement's `on_load` begins. The
    /// replacement keeps the outgoing plugin's dispatch position.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PluginNotFound`] if the identity is not loaded, or
    /// [`Error::PluginLoad`] if the replacement's `on_load` fails — in
    /// which case the identity is no longer registered at all, matching
    /// the two-step unload-then-load contract.
    pub async fn reload(&mut self, replacement: Arc<dyn VoicePlugin>) -> Result<()> {
        let id = replacement.name().to_string();
        let position = self
            .entries
            .iter()
            .position(|entry| entry.id == id)
            .ok_or_else(|| Error::PluginNotFound(id.clone()))?;

        let outgoing = self.entries.remove(position);
        if let Err(e) = outgoing.plugin.on_unload().await {
            tracing::warn!(plugin_id = %id, error = %e, "on_unload failed during reload");
        }

        replacement
            .on_load()
            .await
            .map_err(|e| Error::PluginLoad(format!("{id}: on_load failed: {e}")))?;

        let version = replacement.version().to_string();
        tracing::info!(
            plugin_id = %id,
            old_version = %outgoing.version,
            version = %version,
            "plugin reloaded"
        );
        self.entries.insert(
            position,
            PluginEntry {
                id,
                version,
                plugin: replacement,
            },
        );
        Ok(())
    }

    /// Run every plugin's `on_unload` hook (best-effort) and clear the
    /// registry
    pub async fn unload_all(&mut self) {
        for entry in self.entries.drain(..) {
            if let Err(e) = entry.plugin.on_unload().await {
                tracing::warn!(plugin_id = %entry.id, error = %e, "on_unload failed");
            } else {
                tracing::info!(plugin_id = %entry.id, "plugin unloaded");
            }
        }
    }

    /// Snapshot of the handler set, in registration order
    ///
    /// A dispatch holds this snapshot for its whole pass; unloading a
    /// plugin mid-dispatch does not affect handlers already captured.
    #[must_use]
    pub fn handlers(&self) -> Vec<Arc<dyn VoicePlugin>> {
        self.entries
            .iter()
            .map(|entry| Arc::clone(&entry.plugin))
            .collect()
    }

    /// Look up a registered entry by identity
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&PluginEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// Registered entries in registration order
    #[must_use]
    pub fn entries(&self) -> &[PluginEntry] {
        &self.entries
    }

    /// Number of registered plugins
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no plugins are registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
