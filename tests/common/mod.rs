//! Shared test doubles: a scripted transport, probe plugins, and a
//! scriptable hotword engine.

#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use voxline::config::{
    AudioConfig, Config, HotwordScore, ModelConfig, ServerConfig, SessionConfig,
};
use voxline::context::RecognitionContext;
use voxline::hotword::{HotwordEngine, HotwordEngineFactory, KeywordAsset};
use voxline::session::{Transport, TransportConn, TransportMessage};
use voxline::{Error, Result, VoicePlugin};

/// Everything the session wrote to a connection, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Text(String),
    Binary(Vec<u8>),
    Close,
}

/// What the test feeds into an established connection
pub enum Inbound {
    Message(TransportMessage),
    Error,
    Close,
}

/// One scripted connect outcome
pub enum ConnectOutcome {
    /// Connect fails outright
    Refuse,
    /// Connect succeeds; the connection reads from this script channel
    Accept(mpsc::UnboundedReceiver<Inbound>),
    /// Connect succeeds but every send on the connection fails
    AcceptBrokenSend,
}

/// Transport that replays a scripted sequence of connect outcomes
///
/// Once the script is exhausted every further connect is refused. All
/// connections share one send log so cross-connection ordering is visible.
pub struct ScriptedTransport {
    outcomes: Mutex<VecDeque<ConnectOutcome>>,
    pub connects: AtomicUsize,
    pub sent: Arc<Mutex<Vec<Sent>>>,
}

impl ScriptedTransport {
    pub fn new(outcomes: Vec<ConnectOutcome>) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(outcomes.into()),
            connects: AtomicUsize::new(0),
            sent: Arc::new(Mutex::new(Vec::new())),
        })
    }

    /// Transport whose every connect fails
    pub fn refusing() -> Arc<Self> {
        Self::new(Vec::new())
    }

    /// Transport that accepts one connection and returns the script feed
    pub fn accepting_once() -> (Arc<Self>, mpsc::UnboundedSender<Inbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(vec![ConnectOutcome::Accept(rx)]), tx)
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn sent_log(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    /// Binary payloads sent, in order
    pub fn sent_binary(&self) -> Vec<Vec<u8>> {
        self.sent_log()
            .into_iter()
            .filter_map(|entry| match entry {
                Sent::Binary(payload) => Some(payload),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn connect(&self, url: &str, _timeout: Duration) -> Result<Box<dyn TransportConn>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        match self.outcomes.lock().unwrap().pop_front() {
            Some(ConnectOutcome::Accept(inbound)) => Ok(Box::new(ScriptedConn {
                inbound,
                fail_sends: false,
                sent: Arc::clone(&self.sent),
            })),
            Some(ConnectOutcome::AcceptBrokenSend) => {
                let (_, inbound) = mpsc::unbounded_channel();
                Ok(Box::new(ScriptedConn {
                    inbound,
                    fail_sends: true,
                    sent: Arc::clone(&self.sent),
                }))
            }
            Some(ConnectOutcome::Refuse) | None => {
                Err(Error::Session(format!("connection refused: {url}")))
            }
        }
    }
}

struct ScriptedConn {
    inbound: mpsc::UnboundedReceiver<Inbound>,
    fail_sends: bool,
    sent: Arc<Mutex<Vec<Sent>>>,
}

#[async_trait]
impl TransportConn for ScriptedConn {
    async fn send_text(&mut self, text: &str) -> Result<()> {
        if self.fail_sends {
            return Err(Error::Session("scripted send failure".to_string()));
        }
        self.sent.lock().unwrap().push(Sent::Text(text.to_string()));
        Ok(())
    }

    async fn send_binary(&mut self, payload: Vec<u8>) -> Result<()> {
        if self.fail_sends {
            return Err(Error::Session("scripted send failure".to_string()));
        }
        self.sent.lock().unwrap().push(Sent::Binary(payload));
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<TransportMessage>> {
        match self.inbound.recv().await {
            Some(Inbound::Message(message)) => Some(Ok(message)),
            Some(Inbound::Error) => {
                Some(Err(Error::Session("scripted transport error".to_string())))
            }
            Some(Inbound::Close) => None,
            // Script sender dropped: hold the connection open quietly.
            None => std::future::pending().await,
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.sent.lock().unwrap().push(Sent::Close);
        Ok(())
    }
}

/// Hotword engine that fires keyword 0 on scripted frame ordinals
pub struct ScriptedEngine {
    frame_length: usize,
    detect_on: Vec<usize>,
    frames_seen: usize,
}

impl HotwordEngine for ScriptedEngine {
    fn frame_length(&self) -> usize {
        self.frame_length
    }

    fn process(&mut self, _frame: &[i16]) -> Option<usize> {
        self.frames_seen += 1;
        self.detect_on.contains(&self.frames_seen).then_some(0)
    }

    fn release(&mut self) {}
}

pub struct ScriptedEngineFactory {
    pub frame_length: usize,
    /// 1-based frame ordinals to fire on
    pub detect_on: Vec<usize>,
}

impl HotwordEngineFactory for ScriptedEngineFactory {
    fn create(&self, _model: &Path, _keywords: &[KeywordAsset]) -> Result<Box<dyn HotwordEngine>> {
        Ok(Box::new(ScriptedEngine {
            frame_length: self.frame_length,
            detect_on: self.detect_on.clone(),
            frames_seen: 0,
        }))
    }
}

/// Plugin that records every hook call into a shared journal
pub struct ProbePlugin {
    pub name: String,
    pub fail_handle: bool,
    pub wants_audio: bool,
    pub wants_hotword: bool,
    pub journal: Arc<Mutex<Vec<String>>>,
}

impl ProbePlugin {
    pub fn new(name: &str, journal: &Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            name: name.to_string(),
            fail_handle: false,
            wants_audio: false,
            wants_hotword: false,
            journal: Arc::clone(journal),
        }
    }

    fn record(&self, entry: String) {
        self.journal.lock().unwrap().push(entry);
    }
}

#[async_trait]
impl VoicePlugin for ProbePlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn wants_audio(&self) -> bool {
        self.wants_audio
    }

    fn wants_hotword(&self) -> bool {
        self.wants_hotword
    }

    async fn on_audio_data(&self, frame: &[i16]) -> Result<()> {
        self.record(format!("{}:audio:{}", self.name, frame.len()));
        Ok(())
    }

    async fn on_hotword_detected(&self) -> Result<()> {
        self.record(format!("{}:hotword", self.name));
        Ok(())
    }

    async fn handle(&self, ctx: &RecognitionContext) -> Result<()> {
        self.record(format!(
            "{}:handle:{}:{}",
            self.name,
            ctx.text(),
            ctx.keyword_triggered()
        ));
        if self.fail_handle {
            return Err(Error::PluginLoad("deliberate".to_string()));
        }
        Ok(())
    }
}

/// Minimal valid configuration with a present model asset
///
/// Keeps the returned tempdir alive so the model path stays valid.
pub fn test_config(frame_length: usize) -> (Config, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let model = dir.path().join("model.pv");
    std::fs::write(&model, b"model").unwrap();

    let mut hotwords = BTreeMap::new();
    hotwords.insert("snowleopard".to_string(), HotwordScore { score: 20.0 });

    let config = Config {
        plugins: Vec::new(),
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
            frame_length,
            chunk_size: [5, 10, 5],
            chunk_interval: 10,
        },
        model: ModelConfig {
            language: String::new(),
            path: model,
        },
        session: SessionConfig::default(),
    };
    (config, dir)
}

/// JSON for a recognition result in the given mode
pub fn result_json(mode: &str, text: &str) -> String {
    serde_json::json!({
        "is_final": mode.contains("offline"),
        "mode": mode,
        "text": text,
        "wav_name": "realtime_recognition",
    })
    .to_string()
}
