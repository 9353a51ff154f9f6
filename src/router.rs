//! Recognition event fan-out
//!
//! One dispatch pass invokes every registered handler in registration
//! order, each wrapped so a failing plugin is logged and skipped without
//! disturbing the rest of the pass. The same isolation policy covers the
//! two narrower fan-outs (hotword detection, per-frame audio).

use std::sync::Arc;

use crate::context::RecognitionContext;
use crate::plugin::VoicePlugin;

/// Fans recognition events out to plugin handlers
#[derive(Debug, Clone, Copy, Default)]
pub struct EventRouter;

impl EventRouter {
    /// Create a router
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Dispatch one recognition event to every handler
    ///
    /// Runs to completion even when individual handlers fail; the context
    /// is dropped by the caller once the pass returns.
    pub async fn dispatch(
        self,
        handlers: &[Arc<dyn VoicePlugin>],
        ctx: &RecognitionContext,
    ) {
        for plugin in handlers {
            if let Err(e) = plugin.handle(ctx).await {
                tracing::error!(
                    plugin_id = %plugin.name(),
                    error = %e,
                    "plugin handler failed"
                );
            }
        }
        tracing::trace!(handlers = handlers.len(), "dispatch pass complete");
    }

    /// Notify opted-in plugins that the acoustic hotword gate fired
    pub async fn notify_hotword_detected(self, handlers: &[Arc<dyn VoicePlugin>]) {
        for plugin in handlers.iter().filter(|p| p.wants_hotword()) {
            if let Err(e) = plugin.on_hotword_detected().await {
                tracing::error!(
                    plugin_id = %plugin.name(),
                    error = %e,
                    "plugin hotword hook failed"
                );
            }
        }
    }

    /// Offer one audio frame to opted-in plugins
    pub async fn notify_audio_data(self, handlers: &[Arc<dyn VoicePlugin>], frame: &[i16]) {
        for plugin in handlers.iter().filter(|p| p.wants_audio()) {
            if let Err(e) = plugin.on_audio_data(frame).await {
                tracing::error!(
                    plugin_id = %plugin.name(),
                    error = %e,
                    "plugin audio hook failed"
                );
            }
        }
    }
}
