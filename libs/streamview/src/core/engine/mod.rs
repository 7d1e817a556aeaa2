// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Boundary to the media engine that executes graph descriptions.
//!
//! The session only ever talks to these traits. [`GstEngine`] implements
//! them on GStreamer when the `gstreamer` feature is enabled; tests drive
//! the session with scripted implementations.

#[cfg(feature = "gstreamer")]
pub mod gst;

#[cfg(feature = "gstreamer")]
pub use gst::GstEngine;

use bytes::Bytes;
use crossbeam_channel::Receiver;
use std::sync::Arc;
use std::time::Duration;

use crate::core::{GraphDescription, Result};

/// Asynchronous notification from a running instantiation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineMessage {
    /// All sinks have consumed end-of-stream. Containers are finalized.
    EndOfStream,
    Error {
        message: String,
        debug: Option<String>,
    },
    Warning {
        message: String,
        debug: Option<String>,
    },
    /// A late-binding source announced its stream and was linked.
    SourceLinked { pad: String },
}

/// One sample pulled from a pull-style sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub data: Bytes,
    /// Negotiated frame size, when the engine reports one.
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Raw video `format` field (e.g. "BGR"), when present.
    pub format: Option<String>,
    pub pts_ns: Option<u64>,
}

impl Sample {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            width: None,
            height: None,
            format: None,
            pts_ns: None,
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn with_pts_ns(mut self, pts_ns: u64) -> Self {
        self.pts_ns = Some(pts_ns);
        self
    }
}

/// Pull-style sink inside a running instantiation.
pub trait PullSink: Send + Sync {
    /// Wait up to `timeout` for the next sample.
    ///
    /// `Ok(None)` means nothing was ready. A failed pull or buffer map is
    /// reported as [`StreamError::CaptureTransient`](crate::StreamError::CaptureTransient).
    fn try_pull(&self, timeout: Duration) -> Result<Option<Sample>>;

    /// The sink has received end-of-stream and will produce nothing more.
    fn is_end_of_stream(&self) -> bool {
        false
    }
}

/// Live form of a graph description, holding OS-level resources.
pub trait EngineInstance: Send {
    /// Transition to playing.
    fn play(&mut self) -> Result<()>;

    /// Ask sources to finish so muxers can write their trailers.
    fn send_end_of_stream(&mut self) -> Result<()>;

    /// Stop and free everything. Idempotent.
    fn release(&mut self);

    /// Message channel for this instantiation.
    fn messages(&self) -> Receiver<EngineMessage>;

    /// Pull sink by instance name.
    fn pull_sink(&self, name: &str) -> Option<Arc<dyn PullSink>>;
}

/// Turns graph descriptions into running instantiations.
pub trait MediaEngine: Send + Sync {
    /// Fails with [`StreamError::GraphInstantiation`](crate::StreamError::GraphInstantiation)
    /// when the engine rejects the description.
    fn instantiate(&self, graph: &GraphDescription) -> Result<Box<dyn EngineInstance>>;
}
