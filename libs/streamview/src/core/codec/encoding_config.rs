// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use serde::{Deserialize, Serialize};

use super::{select_encoder, EncoderStage, VideoCodec};
use crate::core::{PlatformKind, Resolution};

/// Codec and format choices for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodingConfig {
    /// Codec of network inputs, selects the depayloader.
    pub input_codec: VideoCodec,
    /// Codec written to save/rtp/multicast outputs.
    pub output_codec: VideoCodec,
    pub use_hardware_encoder: bool,
    pub resolution: Option<Resolution>,
    pub frame_rate: Option<u32>,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            input_codec: VideoCodec::H264,
            output_codec: VideoCodec::H264,
            use_hardware_encoder: false,
            resolution: None,
            frame_rate: None,
        }
    }
}

impl EncodingConfig {
    pub fn with_input_codec(mut self, codec: VideoCodec) -> Self {
        self.input_codec = codec;
        self
    }

    pub fn with_output_codec(mut self, codec: VideoCodec) -> Self {
        self.output_codec = codec;
        self
    }

    pub fn with_hardware_encoder(mut self, enabled: bool) -> Self {
        self.use_hardware_encoder = enabled;
        self
    }

    pub fn with_resolution(mut self, resolution: Option<Resolution>) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_frame_rate(mut self, frame_rate: Option<u32>) -> Self {
        self.frame_rate = frame_rate.filter(|fps| *fps > 0);
        self
    }

    /// Encoder for the output codec on `platform`.
    pub fn output_encoder(&self, platform: PlatformKind) -> EncoderStage {
        select_encoder(self.output_codec, platform, self.use_hardware_encoder)
    }
}
