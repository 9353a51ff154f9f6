//! Plugin capability contract
//!
//! Plugins are the independently failing consumers of recognition events.
//! Every hook is async and fallible; a failure in one plugin is logged and
//! never disturbs the others.

pub mod keyword;
pub mod registry;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::config::Config;
use crate::context::RecognitionContext;
use crate::{Error, Result};

pub use keyword::KeywordSpotterPlugin;
pub use registry::{PluginEntry, PluginRegistry};

/// The plugin lifecycle and handler contract
///
/// `handle` is required; everything else has a no-op default. Audio and
/// hotword notifications are opt-in via [`wants_audio`](Self::wants_audio)
/// and [`wants_hotword`](Self::wants_hotword) so frame-rate fan-out only
/// reaches plugins that asked for it.
#[async_trait]
pub trait VoicePlugin: Send + Sync {
    /// Stable plugin identity
    fn name(&self) -> &str;

    /// Version tag recorded by the registry
    fn version(&self) -> &str {
        "0.0.0"
    }

    /// Called before the plugin is registered; a failure aborts the load
    ///
    /// # Errors
    ///
    /// Any error prevents registration.
    async fn on_load(&self) -> Result<()> {
        Ok(())
    }

    /// Called when the plugin is unloaded or replaced
    ///
    /// # Errors
    ///
    /// Errors are logged; unload continues regardless.
    async fn on_unload(&self) -> Result<()> {
        Ok(())
    }

    /// Whether this plugin wants per-frame audio notifications
    fn wants_audio(&self) -> bool {
        false
    }

    /// Whether this plugin wants acoustic hotword notifications
    fn wants_hotword(&self) -> bool {
        false
    }

    /// One audio frame, delivered only when [`wants_audio`](Self::wants_audio)
    ///
    /// # Errors
    ///
    /// Errors are isolated to this plugin.
    async fn on_audio_data(&self, _frame: &[i16]) -> Result<()> {
        Ok(())
    }

    /// The acoustic hotword gate fired, delivered only when
    /// [`wants_hotword`](Self::wants_hotword)
    ///
    /// # Errors
    ///
    /// Errors are isolated to this plugin.
    async fn on_hotword_detected(&self) -> Result<()> {
        Ok(())
    }

    /// Handle one recognition event
    ///
    /// # Errors
    ///
    /// Errors are isolated to this plugin; the dispatch pass continues.
    async fn handle(&self, ctx: &RecognitionContext) -> Result<()>;
}

/// Builds plugin instances by identity
///
/// The registry stores live instances; construction by identity lives
/// behind this seam so startup loading and hot reload share one path.
pub trait PluginFactory: Send + Sync {
    /// Build a fresh instance for `identity`
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::PluginNotFound`] for an unknown identity or
    /// [`crate::Error::PluginLoad`] when construction fails.
    fn build(&self, identity: &str) -> Result<Arc<dyn VoicePlugin>>;
}

/// Factory over the built-in plugin set
pub struct StockPluginFactory {
    keyword: String,
}

impl StockPluginFactory {
    /// Build the stock factory from configuration
    ///
    /// The keyword spotter watches the first configured service-side
    /// keyword.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let keyword = config
            .hotwords
            .keys()
            .next()
            .cloned()
            .unwrap_or_default();
        Self { keyword }
    }
}

impl PluginFactory for StockPluginFactory {
    fn build(&self, identity: &str) -> Result<Arc<dyn VoicePlugin>> {
        match identity {
            KeywordSpotterPlugin::ID => {
                Ok(Arc::new(KeywordSpotterPlugin::new(self.keyword.clone())))
            }
            other => Err(Error::PluginNotFound(other.to_string())),
        }
    }
}

/// Source of plugin-change notifications driving hot reload
///
/// Implementations watch whatever backs the plugin definitions (a file
/// watcher, an operator channel) and yield the identity of each changed
/// plugin. Reload stays a controlled two-step operation in the registry;
/// this trait only decides *when* it runs.
#[async_trait]
pub trait ChangeNotifier: Send {
    /// Next changed plugin identity; `None` when the source is exhausted
    async fn next_change(&mut self) -> Option<String>;
}

/// Channel-backed change notifier
///
/// Pair it with an `mpsc::Sender<String>` held by an operator command
/// handler or a filesystem watcher task.
pub struct ChannelNotifier {
    changes: mpsc::Receiver<String>,
}

impl ChannelNotifier {
    /// Create a notifier and the sender that feeds it
    #[must_use]
    pub fn new(depth: usize) -> (mpsc::Sender<String>, Self) {
        let (tx, rx) = mpsc::channel(depth);
        (tx, Self { changes: rx })
    }
}

#[async_trait]
impl ChangeNotifier for ChannelNotifier {
    async fn next_change(&mut self) -> Option<String> {
        self.changes.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        AudioConfig, HotwordScore, ModelConfig, ServerConfig, SessionConfig,
    };
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn config_with_keyword(keyword: &str) -> Config {
        let mut hotwords = BTreeMap::new();
        hotwords.insert(keyword.to_string(), HotwordScore { score: 20.0 });

        Config {
            plugins: vec!["keyword".to_string()],
            mode: "2pass".to_string(),
            itn: true,
            hotwords,
            acoustic_hotwords: BTreeMap::new(),
            server: ServerConfig {
                host: "localhost".to_string(),
                port: 10095,
            },
            audio: AudioConfig {
                sample_rate: 16000,
                channels: 1,
                bit_depth: 16,
                frame_length: 512,
                chunk_size: [5, 10, 5],
                chunk_interval: 10,
            },
            model: ModelConfig {
                language: String::new(),
                path: PathBuf::from("model.pv"),
            },
            session: SessionConfig::default(),
        }
    }

    #[test]
    fn stock_factory_builds_the_keyword_spotter() {
        let factory = StockPluginFactory::from_config(&config_with_keyword("snow leopard"));
        let plugin = factory.build("keyword").unwrap();
        assert_eq!(plugin.name(), "keyword");
        assert_eq!(plugin.version(), "1.0.0");
    }

    #[test]
    fn stock_factory_rejects_unknown_identities() {
        let factory = StockPluginFactory::from_config(&config_with_keyword("snow leopard"));
        let err = factory.build("weather").err().unwrap();
        assert!(matches!(err, Error::PluginNotFound(id) if id == "weather"));
    }

    #[tokio::test]
    async fn channel_notifier_yields_changes_in_order() {
        let (tx, mut notifier) = ChannelNotifier::new(4);
        tx.send("keyword".to_string()).await.unwrap();
        tx.send("weather".to_string()).await.unwrap();

        assert_eq!(notifier.next_change().await.as_deref(), Some("keyword"));
        assert_eq!(notifier.next_change().await.as_deref(), Some("weather"));

        drop(tx);
        assert!(notifier.next_change().await.is_none());
    }
}
