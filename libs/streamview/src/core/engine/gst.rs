// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! GStreamer implementation of the engine boundary.

use bytes::Bytes;
use crossbeam_channel::{Receiver, Sender};
use gstreamer as gst;
use gstreamer::prelude::*;
use gstreamer_app as gst_app;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use super::{EngineInstance, EngineMessage, MediaEngine, PullSink, Sample};
use crate::core::{GraphDescription, PendingLink, Result, StreamError};

const BUS_POLL_INTERVAL_MS: u64 = 100;

/// Runs graph descriptions through `gst::parse::launch`.
#[derive(Debug, Clone, Copy)]
pub struct GstEngine {
    _initialized: (),
}

impl GstEngine {
    /// Initialise GStreamer. Safe to call more than once.
    pub fn new() -> Result<Self> {
        gst::init().map_err(|e| {
            StreamError::GraphInstantiation(format!("GStreamer initialisation failed: {}", e))
        })?;
        tracing::debug!("GStreamer {}", gst::version_string());
        Ok(Self { _initialized: () })
    }
}

impl MediaEngine for GstEngine {
    fn instantiate(&self, graph: &GraphDescription) -> Result<Box<dyn EngineInstance>> {
        let launch = graph.to_launch_string();
        tracing::debug!("gst launch: {}", launch);

        let element = gst::parse::launch(&launch)
            .map_err(|e| StreamError::GraphInstantiation(format!("{} ({})", e, launch)))?;
        let pipeline = element.downcast::<gst::Pipeline>().map_err(|_| {
            StreamError::GraphInstantiation(format!("'{}' did not produce a pipeline", launch))
        })?;

        let (sender, receiver) = crossbeam_channel::unbounded();
        if let Some(link) = graph.pending_link() {
            connect_pending_link(&pipeline, link, sender.clone())?;
        }

        Ok(Box::new(GstInstance {
            pipeline,
            sender,
            receiver,
            watcher_running: Arc::new(AtomicBool::new(false)),
            watcher: None,
            released: false,
        }))
    }
}

/// Link the late-binding source's first video pad to the target stage.
fn connect_pending_link(
    pipeline: &gst::Pipeline,
    link: &PendingLink,
    messages: Sender<EngineMessage>,
) -> Result<()> {
    let source = pipeline.by_name(&link.source).ok_or_else(|| {
        StreamError::GraphInstantiation(format!("No stage named '{}'", link.source))
    })?;
    let target = pipeline.by_name(&link.target).ok_or_else(|| {
        StreamError::GraphInstantiation(format!("No stage named '{}'", link.target))
    })?;
    let target = target.downgrade();
    let source_name = link.source.clone();

    source.connect_pad_added(move |_, pad| {
        let Some(target) = target.upgrade() else {
            return;
        };
        let Some(sink_pad) = target.static_pad("sink") else {
            return;
        };
        if sink_pad.is_linked() {
            return;
        }
        let is_video = pad
            .current_caps()
            .and_then(|caps| {
                caps.structure(0)
                    .and_then(|s| s.get::<&str>("media").ok().map(|media| media == "video"))
            })
            .unwrap_or(true);
        if !is_video {
            tracing::debug!("[{}] Ignoring non-video pad {}", source_name, pad.name());
            return;
        }
        match pad.link(&sink_pad) {
            Ok(_) => {
                tracing::info!("[{}] Linked pad {}", source_name, pad.name());
                let _ = messages.send(EngineMessage::SourceLinked {
                    pad: pad.name().to_string(),
                });
            }
            Err(e) => {
                tracing::warn!("[{}] Failed to link pad {}: {:?}", source_name, pad.name(), e);
            }
        }
    });
    Ok(())
}

struct GstInstance {
    pipeline: gst::Pipeline,
    sender: Sender<EngineMessage>,
    receiver: Receiver<EngineMessage>,
    watcher_running: Arc<AtomicBool>,
    watcher: Option<JoinHandle<()>>,
    released: bool,
}

impl GstInstance {
    fn spawn_bus_watcher(&mut self) -> Result<()> {
        if self.watcher.is_some() {
            return Ok(());
        }
        let bus = self
            .pipeline
            .bus()
            .ok_or_else(|| StreamError::GraphInstantiation("Pipeline has no bus".into()))?;
        let sender = self.sender.clone();
        let running = Arc::clone(&self.watcher_running);
        running.store(true, Ordering::SeqCst);

        let handle = std::thread::Builder::new()
            .name("streamview-bus".into())
            .spawn(move || {
                while running.load(Ordering::SeqCst) {
                    let timeout = gst::ClockTime::from_mseconds(BUS_POLL_INTERVAL_MS);
                    let Some(msg) = bus.timed_pop(timeout) else {
                        continue;
                    };
                    let translated = match msg.view() {
                        gst::MessageView::Eos(..) => Some(EngineMessage::EndOfStream),
                        gst::MessageView::Error(err) => Some(EngineMessage::Error {
                            message: err.error().to_string(),
                            debug: err.debug().map(|d| d.to_string()),
                        }),
                        gst::MessageView::Warning(warn) => Some(EngineMessage::Warning {
                            message: warn.error().to_string(),
                            debug: warn.debug().map(|d| d.to_string()),
                        }),
                        _ => None,
                    };
                    if let Some(message) = translated {
                        if sender.send(message).is_err() {
                            break;
                        }
                    }
                }
            })?;
        self.watcher = Some(handle);
        Ok(())
    }
}

impl EngineInstance for GstInstance {
    fn play(&mut self) -> Result<()> {
        self.spawn_bus_watcher()?;
        self.pipeline
            .set_state(gst::State::Playing)
            .map_err(|e| {
                StreamError::GraphInstantiation(format!("Failed to start pipeline: {}", e))
            })?;
        Ok(())
    }

    fn send_end_of_stream(&mut self) -> Result<()> {
        if !self.pipeline.send_event(gst::event::Eos::new()) {
            return Err(StreamError::EngineRuntime {
                message: "Pipeline rejected end-of-stream".into(),
                debug: None,
            });
        }
        Ok(())
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.watcher_running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.watcher.take() {
            let _ = handle.join();
        }
        if let Err(e) = self.pipeline.set_state(gst::State::Null) {
            tracing::warn!("Failed to stop pipeline: {}", e);
        }
    }

    fn messages(&self) -> Receiver<EngineMessage> {
        self.receiver.clone()
    }

    fn pull_sink(&self, name: &str) -> Option<Arc<dyn PullSink>> {
        let appsink = self
            .pipeline
            .by_name(name)?
            .downcast::<gst_app::AppSink>()
            .ok()?;
        Some(Arc::new(GstPullSink { appsink }))
    }
}

impl Drop for GstInstance {
    fn drop(&mut self) {
        self.release();
    }
}

struct GstPullSink {
    appsink: gst_app::AppSink,
}

impl PullSink for GstPullSink {
    fn try_pull(&self, timeout: Duration) -> Result<Option<Sample>> {
        let timeout = gst::ClockTime::from_mseconds(timeout.as_millis() as u64);
        let Some(sample) = self.appsink.try_pull_sample(timeout) else {
            return Ok(None);
        };
        let buffer = sample
            .buffer()
            .ok_or_else(|| StreamError::CaptureTransient("Sample carried no buffer".into()))?;
        let map = buffer
            .map_readable()
            .map_err(|e| StreamError::CaptureTransient(format!("Buffer map failed: {}", e)))?;

        let mut out = Sample::new(Bytes::copy_from_slice(map.as_slice()));
        out.pts_ns = buffer.pts().map(|t| t.nseconds());
        if let Some(s) = sample.caps().and_then(|caps| caps.structure(0)) {
            out.width = s.get::<i32>("width").ok().and_then(|w| u32::try_from(w).ok());
            out.height = s.get::<i32>("height").ok().and_then(|h| u32::try_from(h).ok());
            out.format = s.get::<&str>("format").ok().map(str::to_string);
        }
        Ok(Some(out))
    }

    fn is_end_of_stream(&self) -> bool {
        self.appsink.is_eos()
    }
}
