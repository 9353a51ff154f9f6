//! Stock keyword-spotter plugin
//!
//! Watches offline recognition results for a configured keyword and logs
//! both acoustic and text matches. Doubles as the reference implementation
//! of the plugin contract.

use async_trait::async_trait;

use super::VoicePlugin;
use crate::context::RecognitionContext;
use crate::Result;

/// Logs keyword matches in recognition results
pub struct KeywordSpotterPlugin {
    keyword: String,
}

impl KeywordSpotterPlugin {
    /// Plugin identity
    pub const ID: &'static str = "keyword";

    /// Create a spotter for one keyword
    #[must_use]
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
        }
    }
}

#[async_trait]
impl VoicePlugin for KeywordSpotterPlugin {
    fn name(&self) -> &str {
        Self::ID
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn wants_hotword(&self) -> bool {
        true
    }

    async fn on_load(&self) -> Result<()> {
        tracing::info!(keyword = %self.keyword, "keyword plugin loaded");
        Ok(())
    }

    async fn on_unload(&self) -> Result<()> {
        tracing::info!("keyword plugin unloaded");
        Ok(())
    }

    async fn on_hotword_detected(&self) -> Result<()> {
        tracing::info!(keyword = %self.keyword, "acoustic match");
        Ok(())
    }

    async fn handle(&self, ctx: &RecognitionContext) -> Result<()> {
        // Only offline results are accurate enough for text matching.
        if ctx.is_offline() && ctx.text().contains(&self.keyword) {
            tracing::info!(keyword = %self.keyword, "text match");
            tracing::info!(text = %ctx.stripped_text(), "command text");
        }
        Ok(())
    }
}
