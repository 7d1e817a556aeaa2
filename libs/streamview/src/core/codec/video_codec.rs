// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Video codec identifiers and their RTP parameters.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::{Result, StreamError};

/// Codec of an encoded stream, on the wire or in a container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoCodec {
    /// H.264/AVC.
    #[default]
    H264,
    /// Motion JPEG.
    Mjpeg,
}

impl VideoCodec {
    pub const ALL: [VideoCodec; 2] = [Self::H264, Self::Mjpeg];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::H264 => "h264",
            Self::Mjpeg => "mjpeg",
        }
    }

    /// RTP payload type. JPEG has a static assignment (RFC 3551); H.264 uses
    /// the first dynamic slot.
    pub fn rtp_payload_type(&self) -> u8 {
        match self {
            Self::H264 => 96,
            Self::Mjpeg => 26,
        }
    }

    /// `encoding-name` as it appears in RTP caps and SDP.
    pub fn rtp_encoding_name(&self) -> &'static str {
        match self {
            Self::H264 => "H264",
            Self::Mjpeg => "JPEG",
        }
    }

    /// Caps a UDP receiver must advertise so the depayloader can negotiate.
    pub fn rtp_caps(&self) -> String {
        format!(
            "application/x-rtp,media=video,encoding-name={},payload={}",
            self.rtp_encoding_name(),
            self.rtp_payload_type()
        )
    }
}

impl fmt::Display for VideoCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VideoCodec {
    type Err = StreamError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "h264" => Ok(Self::H264),
            "mjpeg" => Ok(Self::Mjpeg),
            other => Err(StreamError::UnsupportedCodec(format!(
                "'{}' (supported: h264, mjpeg)",
                other
            ))),
        }
    }
}
