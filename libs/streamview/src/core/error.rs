// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StreamError {
    /// Malformed or unsupported input/output address. Raised before any
    /// hardware is touched.
    #[error("Invalid URI: {0}")]
    InvalidUri(String),

    #[error("Unsupported codec: {0}")]
    UnsupportedCodec(String),

    /// The media engine rejected the composed graph description.
    #[error("Graph instantiation failed: {0}")]
    GraphInstantiation(String),

    /// Asynchronous error reported by the engine while the session was running.
    #[error("Engine error: {message}")]
    EngineRuntime {
        message: String,
        debug: Option<String>,
    },

    /// A single failed frame pull or map. Retried by the capture loop, never
    /// surfaced to frame readers.
    #[error("Capture error: {0}")]
    CaptureTransient(String),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Operation not supported: {0}")]
    NotSupported(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StreamError {
    /// Configuration-time errors are returned before any engine resource
    /// exists, so there is nothing to unwind.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidUri(_) | Self::UnsupportedCodec(_) | Self::Configuration(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, StreamError>;
