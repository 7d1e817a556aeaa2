// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Live video session control.
//!
//! A session is described by two URIs (where frames come from, where they
//! go) plus an [`EncodingConfig`]. The crate resolves those into a linear
//! media graph suited to the host platform, hands it to a [`MediaEngine`],
//! and owns the running instantiation until it drains or fails.
//!
//! ```no_run
//! # fn engine() -> std::sync::Arc<dyn streamview::MediaEngine> { unimplemented!() }
//! use streamview::{Session, SessionConfig};
//!
//! let config = SessionConfig::new("/dev/video0", "save://out.mp4");
//! let mut session = Session::new(config, engine());
//! let reason = session.run()?;
//! # Ok::<(), streamview::StreamError>(())
//! ```

// Suppress pedantic clippy warnings that are intentional design choices
#![allow(clippy::module_inception)] // core::session::session mirrors the component name

pub mod core;

pub use core::{
    // Media engine boundary
    EngineInstance,
    EngineMessage,
    MediaEngine,
    PullSink,
    Sample,
    // URI resolution
    parse_input,
    parse_output,
    parse_resolution,
    InputSpec,
    OutputSpec,
    Resolution,
    // Encoder selection
    select_encoder,
    select_encoder_named,
    EncoderStage,
    EncodingConfig,
    VideoCodec,
    // Graph building
    BuildOutcome,
    ExternalMode,
    GraphBuilder,
    GraphDescription,
    APPSINK_NAME,
    PendingLink,
    Stage,
    // Frames
    CaptureFormat,
    CapturedFrame,
    FrameBuffer,
    interpret_sample,
    FrameCaptureBridge,
    FrameMemory,
    FrameReader,
    PixelLayout,
    // HTTP relay
    multipart_chunk,
    HttpRelayConfig,
    HttpRelayHandle,
    HttpRelaySession,
    INDEX_HTML,
    MULTIPART_BOUNDARY,
    // Session
    Session,
    SessionCancel,
    SessionConfig,
    SessionMode,
    SessionPlan,
    SessionState,
    SessionStateWatch,
    SourcePhase,
    TerminationReason,
    // Platform
    PlatformKind,
    // Errors
    Result,
    StreamError,
};

#[cfg(feature = "gstreamer")]
pub use core::GstEngine;
