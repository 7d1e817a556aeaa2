// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Session configuration via `streamview.yaml`.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::core::{
    parse_resolution, EncodingConfig, HttpRelayConfig, PlatformKind, Result, StreamError,
    VideoCodec,
};

/// Everything needed to run one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub input_uri: String,

    /// Defaults to `local`.
    pub output_uri: String,

    pub input_codec: VideoCodec,
    pub output_codec: VideoCodec,

    /// Use the platform's hardware H.264 encoder if it has one.
    pub hw_encoder: bool,

    /// `WxH` or a preset (`1080`, `720`, `480`). Unrecognised values are
    /// ignored.
    pub resolution: Option<String>,

    pub fps: Option<u32>,

    /// Skip detection and treat the host as this platform.
    pub platform: Option<PlatformKind>,

    /// How long a user stop waits for the engine to confirm end-of-stream.
    pub drain_timeout_ms: u64,

    pub http: HttpRelayConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            input_uri: String::new(),
            output_uri: "local".to_string(),
            input_codec: VideoCodec::H264,
            output_codec: VideoCodec::H264,
            hw_encoder: false,
            resolution: None,
            fps: None,
            platform: None,
            drain_timeout_ms: Self::DEFAULT_DRAIN_TIMEOUT_MS,
            http: HttpRelayConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Configuration file name.
    pub const FILE_NAME: &'static str = "streamview.yaml";

    pub const DEFAULT_DRAIN_TIMEOUT_MS: u64 = 5000;

    pub fn new(input_uri: impl Into<String>, output_uri: impl Into<String>) -> Self {
        Self {
            input_uri: input_uri.into(),
            output_uri: output_uri.into(),
            ..Self::default()
        }
    }

    pub fn with_output_codec(mut self, codec: VideoCodec) -> Self {
        self.output_codec = codec;
        self
    }

    pub fn with_input_codec(mut self, codec: VideoCodec) -> Self {
        self.input_codec = codec;
        self
    }

    pub fn with_platform(mut self, platform: PlatformKind) -> Self {
        self.platform = Some(platform);
        self
    }

    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_http(mut self, http: HttpRelayConfig) -> Self {
        self.http = http;
        self
    }

    /// Load from an explicit file. Missing or malformed files are errors.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            StreamError::Configuration(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| {
            StreamError::Configuration(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        tracing::info!("Loaded session config from {}", path.display());
        Ok(config)
    }

    /// Load `streamview.yaml` from a directory, falling back to defaults
    /// when it is missing or unreadable.
    pub fn load_or_default(dir: &Path) -> Self {
        let config_path = dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            tracing::debug!("No {} found in {}, using defaults", Self::FILE_NAME, dir.display());
            return Self::default();
        }

        match Self::load(&config_path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("{}, using defaults", e);
                Self::default()
            }
        }
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }

    /// Codec and format settings, with the resolution hint resolved.
    pub fn encoding_config(&self) -> EncodingConfig {
        EncodingConfig::default()
            .with_input_codec(self.input_codec)
            .with_output_codec(self.output_codec)
            .with_hardware_encoder(self.hw_encoder)
            .with_resolution(self.resolution.as_deref().and_then(parse_resolution))
            .with_frame_rate(self.fps)
    }

    /// The override if set, otherwise the detected platform.
    pub fn resolve_platform(&self) -> PlatformKind {
        self.platform.unwrap_or_else(PlatformKind::current)
    }
}
