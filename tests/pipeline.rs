//! End-to-end pipeline behavior: framing, gate and fan-out ordering,
//! trigger-flag consumption, plugin isolation, result history.

mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;

use common::{ProbePlugin, ScriptedEngineFactory, ScriptedTransport};
use voxline::plugin::PluginFactory;
use voxline::session::{
    ConnectionState, Handshake, RecognitionSession, NOTICE_QUEUE_DEPTH,
};
use voxline::{
    Error, Pipeline, RecognitionEvent, Result, SessionHandle, SessionNotice, VoicePlugin,
};

/// Builds probe plugins from per-identity shapes
struct ProbeFactory {
    journal: Arc<Mutex<Vec<String>>>,
    shapes: Vec<ProbeShape>,
}

#[derive(Clone)]
struct ProbeShape {
    name: &'static str,
    fail_handle: bool,
    wants_audio: bool,
    wants_hotword: bool,
}

impl ProbeShape {
    const fn named(name: &'static str) -> Self {
        Self {
            name,
            fail_handle: false,
            wants_audio: false,
            wants_hotword: false,
        }
    }
}

impl PluginFactory for ProbeFactory {
    fn build(&self, identity: &str) -> Result<Arc<dyn VoicePlugin>> {
        let shape = self
            .shapes
            .iter()
            .find(|shape| shape.name == identity)
            .ok_or_else(|| Error::PluginNotFound(identity.to_string()))?;
        Ok(Arc::new(ProbePlugin {
            fail_handle: shape.fail_handle,
            wants_audio: shape.wants_audio,
            wants_hotword: shape.wants_hotword,
            ..ProbePlugin::new(shape.name, &self.journal)
        }))
    }
}

/// Session pair whose actor never runs; sends are dropped at the handle
fn idle_session() -> SessionHandle {
    let (config, _dir) = common::test_config(4);
    let handshake = Handshake::from_config(&config).unwrap();
    let (notice_tx, _notice_rx) = mpsc::channel(NOTICE_QUEUE_DEPTH);
    let (_session, handle) = RecognitionSession::new(
        "ws://localhost:10095".to_string(),
        handshake,
        config.session,
        ScriptedTransport::refusing(),
        notice_tx,
    );
    handle
}

fn offline_event(text: &str) -> RecognitionEvent {
    RecognitionEvent {
        is_final: true,
        mode: "2pass-offline".to_string(),
        text: text.to_string(),
        wav_name: "realtime_recognition".to_string(),
        stamp_sents: None,
        timestamp: None,
    }
}

/// Little-endian bytes for `samples` i16 samples of value 1
fn chunk_of(samples: usize) -> Vec<u8> {
    std::iter::repeat(1i16.to_le_bytes())
        .take(samples)
        .flatten()
        .collect()
}

#[tokio::test(start_paused = true)]
async fn frames_reach_the_gate_and_the_chunk_reaches_the_session() {
    let (config, _dir) = common::test_config(4);
    let handshake = Handshake::from_config(&config).unwrap();
    let (transport, _feed) = ScriptedTransport::accepting_once();
    let (notice_tx, _notice_rx) = mpsc::channel(NOTICE_QUEUE_DEPTH);
    let (handle, task) = RecognitionSession::spawn(
        "ws://localhost:10095".to_string(),
        handshake,
        config.session,
        Arc::clone(&transport) as Arc<dyn voxline::session::Transport>,
        notice_tx,
    );
    handle
        .state_watch()
        .wait_for(|state| *state == ConnectionState::Open)
        .await
        .unwrap();

    let journal = Arc::new(Mutex::new(Vec::new()));
    let factory = ProbeFactory {
        journal: Arc::clone(&journal),
        shapes: vec![ProbeShape {
            wants_audio: true,
            wants_hotword: true,
            ..ProbeShape::named("probe")
        }],
    };

    let mut pipeline = Pipeline::new(&config, handle.clone());
    pipeline
        .initialize(
            &ScriptedEngineFactory {
                frame_length: 4,
                detect_on: vec![2],
            },
            &factory,
            &["probe".to_string()],
        )
        .await
        .unwrap();

    pipeline.start_recording();
    let chunk = chunk_of(8);
    pipeline.process_chunk(&chunk).await.unwrap();

    // Frame order: plain audio, then hotword-before-audio on detection.
    let entries = journal.lock().unwrap().clone();
    assert_eq!(
        entries,
        vec!["probe:audio:4", "probe:hotword", "probe:audio:4"]
    );

    // The raw chunk is forwarded to the session untouched.
    for _ in 0..200 {
        if !transport.sent_binary().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(transport.sent_binary(), vec![chunk]);

    handle.close().await;
    task.await.unwrap();
}

#[tokio::test]
async fn chunks_are_ignored_while_not_recording() {
    let (config, _dir) = common::test_config(4);
    let journal = Arc::new(Mutex::new(Vec::new()));
    let factory = ProbeFactory {
        journal: Arc::clone(&journal),
        shapes: vec![ProbeShape {
            wants_audio: true,
            ..ProbeShape::named("probe")
        }],
    };

    let mut pipeline = Pipeline::new(&config, idle_session());
    pipeline
        .initialize(
            &ScriptedEngineFactory {
                frame_length: 4,
                detect_on: Vec::new(),
            },
            &factory,
            &["probe".to_string()],
        )
        .await
        .unwrap();

    pipeline.process_chunk(&chunk_of(8)).await.unwrap();
    assert!(journal.lock().unwrap().is_empty());
    assert_eq!(pipeline.backlog_len(), 0);

    pipeline.start_recording();
    pipeline.stop_recording();
    pipeline.process_chunk(&chunk_of(8)).await.unwrap();
    assert!(journal.lock().unwrap().is_empty());
}

#[tokio::test]
async fn trigger_flag_is_consumed_by_exactly_one_dispatch() {
    let (config, _dir) = common::test_config(4);
    let journal = Arc::new(Mutex::new(Vec::new()));
    let factory = ProbeFactory {
        journal: Arc::clone(&journal),
        shapes: vec![ProbeShape::named("probe")],
    };

    let mut pipeline = Pipeline::new(&config, idle_session());
    pipeline
        .initialize(
            &ScriptedEngineFactory {
                frame_length: 4,
                detect_on: vec![1],
            },
            &factory,
            &["probe".to_string()],
        )
        .await
        .unwrap();

    pipeline.start_recording();
    pipeline.process_chunk(&chunk_of(4)).await.unwrap();

    pipeline
        .handle_notice(SessionNotice::RecognitionComplete(offline_event("first")))
        .await
        .unwrap();
    pipeline
        .handle_notice(SessionNotice::RecognitionComplete(offline_event("second")))
        .await
        .unwrap();

    let entries = journal.lock().unwrap().clone();
    assert_eq!(
        entries,
        vec!["probe:handle:first:true", "probe:handle:second:false"]
    );
}

#[tokio::test]
async fn one_failing_plugin_does_not_disturb_the_rest() {
    let (config, _dir) = common::test_config(4);
    let journal = Arc::new(Mutex::new(Vec::new()));
    let factory = ProbeFactory {
        journal: Arc::clone(&journal),
        shapes: vec![
            ProbeShape::named("first"),
            ProbeShape {
                fail_handle: true,
                ..ProbeShape::named("second")
            },
            ProbeShape::named("third"),
        ],
    };

    let mut pipeline = Pipeline::new(&config, idle_session());
    pipeline
        .initialize(
            &ScriptedEngineFactory {
                frame_length: 4,
                detect_on: Vec::new(),
            },
            &factory,
            &[
                "first".to_string(),
                "second".to_string(),
                "third".to_string(),
            ],
        )
        .await
        .unwrap();

    pipeline
        .handle_notice(SessionNotice::RecognitionComplete(offline_event("hello")))
        .await
        .unwrap();

    let entries = journal.lock().unwrap().clone();
    assert_eq!(
        entries,
        vec![
            "first:handle:hello:false",
            "second:handle:hello:false",
            "third:handle:hello:false"
        ]
    );
}

#[tokio::test]
async fn results_accumulate_in_arrival_order() {
    let (config, _dir) = common::test_config(4);
    let factory = ProbeFactory {
        journal: Arc::new(Mutex::new(Vec::new())),
        shapes: Vec::new(),
    };

    let mut pipeline = Pipeline::new(&config, idle_session());
    pipeline
        .initialize(
            &ScriptedEngineFactory {
                frame_length: 4,
                detect_on: Vec::new(),
            },
            &factory,
            &[],
        )
        .await
        .unwrap();

    for text in ["one", "two", "three"] {
        pipeline
            .handle_notice(SessionNotice::RecognitionComplete(offline_event(text)))
            .await
            .unwrap();
    }

    let texts: Vec<&str> = pipeline.results().iter().map(|e| e.text.as_str()).collect();
    assert_eq!(texts, vec!["one", "two", "three"]);
}

#[tokio::test]
async fn terminal_session_failure_surfaces_as_an_error() {
    let (config, _dir) = common::test_config(4);
    let factory = ProbeFactory {
        journal: Arc::new(Mutex::new(Vec::new())),
        shapes: Vec::new(),
    };

    let mut pipeline = Pipeline::new(&config, idle_session());
    pipeline
        .initialize(
            &ScriptedEngineFactory {
                frame_length: 4,
                detect_on: Vec::new(),
            },
            &factory,
            &[],
        )
        .await
        .unwrap();

    let err = pipeline
        .handle_notice(SessionNotice::ConnectionFailed { attempts: 5 })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::SessionFailed { attempts: 5 }));
}

#[tokio::test]
async fn partial_frames_carry_over_between_chunks() {
    let (config, _dir) = common::test_config(4);
    let journal = Arc::new(Mutex::new(Vec::new()));
    let factory = ProbeFactory {
        journal: Arc::clone(&journal),
        shapes: vec![ProbeShape {
            wants_audio: true,
            ..ProbeShape::named("probe")
        }],
    };

    let mut pipeline = Pipeline::new(&config, idle_session());
    pipeline
        .initialize(
            &ScriptedEngineFactory {
                frame_length: 4,
                detect_on: Vec::new(),
            },
            &factory,
            &["probe".to_string()],
        )
        .await
        .unwrap();

    pipeline.start_recording();
    // Six samples: one frame emitted, two samples retained.
    pipeline.process_chunk(&chunk_of(6)).await.unwrap();
    assert_eq!(pipeline.backlog_len(), 2);
    // Two more samples complete the second frame.
    pipeline.process_chunk(&chunk_of(2)).await.unwrap();
    assert_eq!(pipeline.backlog_len(), 0);

    let entries = journal.lock().unwrap().clone();
    assert_eq!(entries, vec!["probe:audio:4", "probe:audio:4"]);
}
