//! Pipeline orchestration
//!
//! Wires the streaming path together: raw capture chunks are framed for
//! the hotword gate and forwarded untouched to the recognition session;
//! session notices come back and are dispatched to plugins with a fresh
//! per-event context.

use std::sync::Arc;

use crate::audio::FrameBuffer;
use crate::config::Config;
use crate::context::{KeywordSet, RecognitionContext};
use crate::hotword::{HotwordEngineFactory, HotwordGate};
use crate::plugin::{PluginFactory, PluginRegistry};
use crate::router::EventRouter;
use crate::session::{RecognitionEvent, SessionHandle, SessionNotice};
use crate::{Error, Result};

/// Orchestrates the streaming voice pipeline
pub struct Pipeline {
    frame_buffer: FrameBuffer,
    gate: HotwordGate,
    session: SessionHandle,
    registry: PluginRegistry,
    router: EventRouter,
    keywords: KeywordSet,
    /// Set when the gate fires; consumed by the next dispatch pass
    keyword_triggered: bool,
    results: Vec<RecognitionEvent>,
    recording: bool,
}

impl Pipeline {
    /// Build a pipeline around a running session
    ///
    /// The keyword set is seeded with the configured service-side
    /// keywords.
    #[must_use]
    pub fn new(config: &Config, session: SessionHandle) -> Self {
        Self {
            frame_buffer: FrameBuffer::new(config.audio.frame_length),
            gate: HotwordGate::from_config(config),
            session,
            registry: PluginRegistry::new(),
            router: EventRouter::new(),
            keywords: KeywordSet::new(config.hotwords.keys().cloned()),
            keyword_triggered: false,
            results: Vec::new(),
            recording: false,
        }
    }

    /// Initialize the hotword capability and load the configured plugins
    ///
    /// Hotword initialization failures are fatal; a plugin that fails to
    /// load is logged and skipped, the rest still load.
    ///
    /// # Errors
    ///
    /// Returns the hotword gate's initialization error, if any.
    pub async fn initialize(
        &mut self,
        engines: &dyn HotwordEngineFactory,
        plugins: &dyn PluginFactory,
        plugin_ids: &[String],
    ) -> Result<()> {
        self.gate.initialize(engines)?;

        for identity in plugin_ids {
            match plugins.build(identity) {
                Ok(plugin) => {
                    if let Err(e) = self.registry.load(plugin).await {
                        tracing::error!(plugin_id = %identity, error = %e, "plugin load failed");
                    }
                }
                Err(e) => {
                    tracing::error!(plugin_id = %identity, error = %e, "plugin build failed");
                }
            }
        }

        tracing::info!(plugins = self.registry.len(), "pipeline initialized");
        Ok(())
    }

    /// Admit capture chunks into the pipeline
    pub fn start_recording(&mut self) {
        if !self.recording {
            self.recording = true;
            tracing::info!("recording started");
        }
    }

    /// Stop admitting capture chunks
    ///
    /// The partially accumulated frame backlog is retained, not flushed;
    /// it completes when recording resumes.
    pub fn stop_recording(&mut self) {
        if self.recording {
            self.recording = false;
            tracing::info!("recording stopped");
        }
    }

    /// Whether chunks are currently admitted
    #[must_use]
    pub const fn is_recording(&self) -> bool {
        self.recording
    }

    /// Process one raw capture chunk
    ///
    /// Frames derived from this chunk are offered to the hotword gate and
    /// the audio fan-out in order, then the chunk itself is forwarded to
    /// the session untouched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HotwordNotInitialized`] if the gate was never
    /// initialized; per-plugin failures never surface here.
    pub async fn process_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        if !self.recording {
            return Ok(());
        }

        let handlers = self.registry.handlers();
        for frame in self.frame_buffer.add_chunk(chunk) {
            if let Some(index) = self.gate.process_frame(&frame)? {
                let keyword = self.gate.keyword_name(index).unwrap_or("<unknown>");
                tracing::info!(keyword, "hotword detected");
                self.keyword_triggered = true;
                self.router.notify_hotword_detected(&handlers).await;
            }
            self.router.notify_audio_data(&handlers, &frame).await;
        }

        self.session.send_audio(chunk.to_vec()).await;
        Ok(())
    }

    /// Handle one session notice
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionFailed`] on the terminal failure notice;
    /// everything else is handled internally.
    pub async fn handle_notice(&mut self, notice: SessionNotice) -> Result<()> {
        match notice {
            SessionNotice::Connected => {
                tracing::info!("recognition session connected");
                Ok(())
            }
            SessionNotice::RecognitionComplete(event) => {
                self.results.push(event.clone());
                self.dispatch(event).await;
                Ok(())
            }
            SessionNotice::ConnectionFailed { attempts } => {
                Err(Error::SessionFailed { attempts })
            }
        }
    }

    /// One full dispatch pass with a fresh context
    async fn dispatch(&mut self, event: RecognitionEvent) {
        // The trigger flag is consumed by exactly one pass, even when a
        // handler fails mid-dispatch.
        let triggered = std::mem::take(&mut self.keyword_triggered);
        let ctx = RecognitionContext::new(event, triggered, self.keywords.clone());

        let handlers = self.registry.handlers();
        self.router.dispatch(&handlers, &ctx).await;
        drop(ctx);
    }

    /// Hot-reload one plugin by identity (unload old, load new)
    ///
    /// # Errors
    ///
    /// Returns the factory or registry error.
    pub async fn reload_plugin(
        &mut self,
        plugins: &dyn PluginFactory,
        identity: &str,
    ) -> Result<()> {
        let replacement = plugins.build(identity)?;
        self.registry.reload(replacement).await
    }

    /// Unload every plugin, then load the configured set again
    pub async fn reload_all(&mut self, plugins: &dyn PluginFactory, plugin_ids: &[String]) {
        self.registry.unload_all().await;
        for identity in plugin_ids {
            match plugins.build(identity) {
                Ok(plugin) => {
                    if let Err(e) = self.registry.load(plugin).await {
                        tracing::error!(plugin_id = %identity, error = %e, "plugin reload failed");
                    }
                }
                Err(e) => {
                    tracing::error!(plugin_id = %identity, error = %e, "plugin build failed");
                }
            }
        }
        tracing::info!(plugins = self.registry.len(), "plugins reloaded");
    }

    /// Add a runtime keyword
    pub fn add_keyword(&mut self, keyword: impl Into<String>) {
        self.keywords.add(keyword);
    }

    /// Remove a runtime keyword
    pub fn remove_keyword(&mut self, keyword: &str) {
        self.keywords.remove(keyword);
    }

    /// Every recognition result dispatched so far, in arrival order
    #[must_use]
    pub fn results(&self) -> &[RecognitionEvent] {
        &self.results
    }

    /// The handler snapshot, mainly for diagnostics
    #[must_use]
    pub fn plugins(&self) -> Vec<Arc<dyn crate::plugin::VoicePlugin>> {
        self.registry.handlers()
    }

    /// Samples retained in the frame backlog
    #[must_use]
    pub const fn backlog_len(&self) -> usize {
        self.frame_buffer.backlog_len()
    }

    /// Orderly shutdown: stop intake, release the hotword capability,
    /// close the session, unload plugins
    pub async fn shutdown(&mut self) {
        self.stop_recording();
        self.gate.release();
        self.session.close().await;
        self.registry.unload_all().await;
        tracing::info!("pipeline shut down");
    }
}
