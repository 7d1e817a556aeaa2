// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Scripted media engine for driving sessions without GStreamer.

#![allow(dead_code)]

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use streamview::{
    EngineInstance, EngineMessage, GraphDescription, MediaEngine, PullSink, Result, Sample,
    StreamError,
};

/// Bytes the fake muxer writes while playing.
pub const MUX_PAYLOAD: &[u8] = b"ftyp-mdat-payload";
/// Bytes the fake muxer appends once end-of-stream reaches it.
pub const MUX_INDEX: &[u8] = b"moov-index";

/// Engine lifecycle events, in the order they happened.
pub type EventLog = Arc<Mutex<Vec<&'static str>>>;

#[derive(Debug, Clone, Default)]
pub struct FakeBehaviour {
    pub reject_instantiate: bool,
    pub fail_play: bool,
    /// Reply to end-of-stream requests with `EndOfStream`.
    pub confirm_eos: bool,
    /// Emulate a muxing file sink at this path.
    pub output_file: Option<PathBuf>,
    /// Confirm end-of-stream from another thread after this long.
    pub eos_delay: Option<Duration>,
}

impl FakeBehaviour {
    pub fn cooperative() -> Self {
        Self {
            confirm_eos: true,
            ..Self::default()
        }
    }
}

pub struct FakeEngine {
    behaviour: FakeBehaviour,
    sink: Option<Arc<FakeSink>>,
    events: EventLog,
    launches: Mutex<Vec<String>>,
    sender: Mutex<Option<Sender<EngineMessage>>>,
}

impl FakeEngine {
    pub fn new(behaviour: FakeBehaviour) -> Arc<Self> {
        Self::build(behaviour, None)
    }

    pub fn with_sink(behaviour: FakeBehaviour, sink: Arc<FakeSink>) -> Arc<Self> {
        Self::build(behaviour, Some(sink))
    }

    fn build(behaviour: FakeBehaviour, sink: Option<Arc<FakeSink>>) -> Arc<Self> {
        Arc::new(Self {
            behaviour,
            sink,
            events: Arc::new(Mutex::new(Vec::new())),
            launches: Mutex::new(Vec::new()),
            sender: Mutex::new(None),
        })
    }

    pub fn events(&self) -> Vec<&'static str> {
        self.events.lock().clone()
    }

    pub fn launches(&self) -> Vec<String> {
        self.launches.lock().clone()
    }

    /// Post a message as if the engine's bus delivered it.
    pub fn post(&self, message: EngineMessage) {
        let sender = self.sender.lock().clone();
        sender
            .expect("no instantiation to post to")
            .send(message)
            .expect("session dropped its message channel");
    }
}

impl MediaEngine for FakeEngine {
    fn instantiate(&self, graph: &GraphDescription) -> Result<Box<dyn EngineInstance>> {
        self.launches.lock().push(graph.to_launch_string());
        if self.behaviour.reject_instantiate {
            return Err(StreamError::GraphInstantiation(
                "no element \"bogus\"".to_string(),
            ));
        }
        self.events.lock().push("instantiate");

        let (tx, rx) = crossbeam_channel::unbounded();
        *self.sender.lock() = Some(tx.clone());

        let has_appsink = graph.contains("appsink");
        Ok(Box::new(FakeInstance {
            behaviour: self.behaviour.clone(),
            events: Arc::clone(&self.events),
            tx,
            rx,
            sink: self.sink.clone().filter(|_| has_appsink),
            released: false,
        }))
    }
}

struct FakeInstance {
    behaviour: FakeBehaviour,
    events: EventLog,
    tx: Sender<EngineMessage>,
    rx: Receiver<EngineMessage>,
    sink: Option<Arc<FakeSink>>,
    released: bool,
}

impl EngineInstance for FakeInstance {
    fn play(&mut self) -> Result<()> {
        if self.behaviour.fail_play {
            return Err(StreamError::GraphInstantiation(
                "state change failed".to_string(),
            ));
        }
        self.events.lock().push("play");
        if let Some(path) = &self.behaviour.output_file {
            std::fs::write(path, MUX_PAYLOAD)?;
        }
        Ok(())
    }

    fn send_end_of_stream(&mut self) -> Result<()> {
        self.events.lock().push("eos");
        if let Some(sink) = &self.sink {
            sink.eos_sent.store(true, Ordering::SeqCst);
        }
        if !self.behaviour.confirm_eos {
            return Ok(());
        }
        let output_file = self.behaviour.output_file.clone();
        match self.behaviour.eos_delay {
            Some(delay) => {
                let tx = self.tx.clone();
                std::thread::spawn(move || {
                    std::thread::sleep(delay);
                    if finalize(output_file.as_ref()).is_ok() {
                        let _ = tx.send(EngineMessage::EndOfStream);
                    }
                });
            }
            None => {
                finalize(output_file.as_ref())?;
                let _ = self.tx.send(EngineMessage::EndOfStream);
            }
        }
        Ok(())
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.events.lock().push("release");
        }
    }

    fn messages(&self) -> Receiver<EngineMessage> {
        self.rx.clone()
    }

    fn pull_sink(&self, name: &str) -> Option<Arc<dyn PullSink>> {
        if name != "appsink" {
            return None;
        }
        self.sink.clone().map(|sink| sink as Arc<dyn PullSink>)
    }
}

/// Append the container index, as a muxer does on end-of-stream.
fn finalize(output_file: Option<&PathBuf>) -> Result<()> {
    if let Some(path) = output_file {
        let mut data = std::fs::read(path)?;
        data.extend_from_slice(MUX_INDEX);
        std::fs::write(path, data)?;
    }
    Ok(())
}

impl Drop for FakeInstance {
    fn drop(&mut self) {
        self.release();
    }
}

/// One scripted pull result.
pub enum PullStep {
    Sample(Sample),
    Fail,
}

/// Pull sink that replays a script, then optionally repeats a sample.
pub struct FakeSink {
    script: Mutex<VecDeque<PullStep>>,
    repeat: Option<Sample>,
    pulls: AtomicUsize,
    eos_sent: AtomicBool,
    pulled_after_eos: AtomicBool,
}

impl FakeSink {
    pub fn scripted(steps: Vec<PullStep>) -> Arc<Self> {
        Self::build(steps, None)
    }

    pub fn repeating(sample: Sample) -> Arc<Self> {
        Self::build(Vec::new(), Some(sample))
    }

    fn build(steps: Vec<PullStep>, repeat: Option<Sample>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(steps.into()),
            repeat,
            pulls: AtomicUsize::new(0),
            eos_sent: AtomicBool::new(false),
            pulled_after_eos: AtomicBool::new(false),
        })
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().len()
    }

    pub fn pulls(&self) -> usize {
        self.pulls.load(Ordering::SeqCst)
    }

    /// A pull happened after end-of-stream was sent to the instance.
    pub fn pulled_after_eos(&self) -> bool {
        self.pulled_after_eos.load(Ordering::SeqCst)
    }
}

impl PullSink for FakeSink {
    fn try_pull(&self, timeout: Duration) -> Result<Option<Sample>> {
        self.pulls.fetch_add(1, Ordering::SeqCst);
        if self.eos_sent.load(Ordering::SeqCst) {
            self.pulled_after_eos.store(true, Ordering::SeqCst);
        }
        let step = self.script.lock().pop_front();
        match step {
            Some(PullStep::Sample(sample)) => Ok(Some(sample)),
            Some(PullStep::Fail) => Err(StreamError::CaptureTransient("map failed".into())),
            None => {
                std::thread::sleep(timeout.min(Duration::from_millis(5)));
                Ok(self.repeat.clone())
            }
        }
    }
}

/// Poll `condition` until it holds or `timeout` passes.
pub fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    condition()
}

/// Packed BGR raster of `width`×`height`, every byte set to `fill`.
pub fn bgr_sample(width: u32, height: u32, fill: u8) -> Sample {
    Sample::new(vec![fill; (width * height * 3) as usize])
}
