// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Encoder decision table.
//!
//! This is the only place platform-specific encoder knowledge lives. The
//! match in [`select_encoder`] is exhaustive over codec, platform and the
//! hardware flag, so adding a platform or codec fails to compile until the
//! table covers it.

use std::fmt;

use super::VideoCodec;
use crate::core::graph::Stage;
use crate::core::{PlatformKind, Result};

/// One concrete encoder element choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncoderStage {
    /// `jpegenc`, available everywhere.
    SoftwareJpeg,
    /// NVIDIA hardware H.264 (Jetson).
    JetsonH264,
    /// V4L2 M2M hardware H.264 (Raspberry Pi).
    V4l2H264,
    /// `x264enc` tuned for latency.
    SoftwareH264,
}

impl EncoderStage {
    pub fn factory(&self) -> &'static str {
        match self {
            Self::SoftwareJpeg => "jpegenc",
            Self::JetsonH264 => "nvh264enc",
            Self::V4l2H264 => "v4l2h264enc",
            Self::SoftwareH264 => "x264enc",
        }
    }

    pub fn stage(&self) -> Stage {
        let stage = Stage::new(self.factory());
        match self {
            Self::SoftwareJpeg | Self::V4l2H264 => stage,
            Self::JetsonH264 => stage.property("insert-sps-pps", true),
            Self::SoftwareH264 => stage
                .property("tune", "zerolatency")
                .property("byte-stream", true)
                .property("key-int-max", 30),
        }
    }

    pub fn codec(&self) -> VideoCodec {
        match self {
            Self::SoftwareJpeg => VideoCodec::Mjpeg,
            Self::JetsonH264 | Self::V4l2H264 | Self::SoftwareH264 => VideoCodec::H264,
        }
    }

    pub fn is_hardware(&self) -> bool {
        matches!(self, Self::JetsonH264 | Self::V4l2H264)
    }
}

impl fmt::Display for EncoderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.factory())
    }
}

/// Pick the encoder for `codec` on `platform`.
///
/// Hardware is used only where the platform has it; otherwise H.264 falls
/// back to software. MJPEG is always software.
pub fn select_encoder(
    codec: VideoCodec,
    platform: PlatformKind,
    use_hardware: bool,
) -> EncoderStage {
    match (codec, use_hardware, platform) {
        (VideoCodec::Mjpeg, _, _) => EncoderStage::SoftwareJpeg,
        (VideoCodec::H264, true, PlatformKind::Jetson) => EncoderStage::JetsonH264,
        (VideoCodec::H264, true, PlatformKind::RaspberryPi) => EncoderStage::V4l2H264,
        (VideoCodec::H264, true, PlatformKind::Generic) | (VideoCodec::H264, false, _) => {
            EncoderStage::SoftwareH264
        }
    }
}

/// [`select_encoder`] for an untyped codec name, e.g. from the command line.
pub fn select_encoder_named(
    codec: &str,
    platform: PlatformKind,
    use_hardware: bool,
) -> Result<EncoderStage> {
    let codec: VideoCodec = codec.parse()?;
    Ok(select_encoder(codec, platform, use_hardware))
}

/// RTP payloader for network outputs.
pub fn payloader_stage(codec: VideoCodec) -> Stage {
    match codec {
        VideoCodec::H264 => Stage::new("rtph264pay")
            .property("config-interval", 1)
            .property("pt", codec.rtp_payload_type()),
        VideoCodec::Mjpeg => Stage::new("rtpjpegpay").property("pt", codec.rtp_payload_type()),
    }
}
