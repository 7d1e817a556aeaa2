// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::{Result, StreamError};

/// Frame size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const HD_1080: Resolution = Resolution::new(1920, 1080);
    pub const HD_720: Resolution = Resolution::new(1280, 720);
    pub const VGA: Resolution = Resolution::new(640, 480);

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Preset table keyed by line count.
    pub fn from_preset(name: &str) -> Option<Self> {
        match name {
            "1080" => Some(Self::HD_1080),
            "720" => Some(Self::HD_720),
            "480" => Some(Self::VGA),
            _ => None,
        }
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Resolution {
    type Err = StreamError;

    /// Strict form: a preset or `WxH` with non-zero dimensions.
    fn from_str(s: &str) -> Result<Self> {
        let text = s.trim();
        if let Some(preset) = Self::from_preset(text) {
            return Ok(preset);
        }
        let (w, h) = text
            .split_once(['x', 'X'])
            .ok_or_else(|| StreamError::Configuration(format!("Unknown resolution '{}'", text)))?;
        match (w.parse::<u32>(), h.parse::<u32>()) {
            (Ok(width), Ok(height)) if width > 0 && height > 0 => Ok(Self::new(width, height)),
            _ => Err(StreamError::Configuration(format!(
                "Malformed resolution '{}' (expected WxH)",
                text
            ))),
        }
    }
}

/// Resolve a resolution hint.
///
/// Resolution is optional, so anything unrecognised means "no constraint"
/// rather than an error.
pub fn parse_resolution(text: &str) -> Option<Resolution> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    match text.parse::<Resolution>() {
        Ok(resolution) => Some(resolution),
        Err(e) => {
            tracing::warn!("Ignoring resolution hint: {}", e);
            None
        }
    }
}
