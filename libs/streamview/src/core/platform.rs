// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Host hardware classification.
//!
//! The platform decides which hardware encoders exist and how captured frames
//! are laid out. It is resolved once per process and treated as read-only
//! configuration afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::core::{Result, StreamError};

/// Device-tree model string (e.g. "Raspberry Pi 4 Model B Rev 1.4").
pub const DEVICE_TREE_MODEL_PATH: &str = "/sys/firmware/devicetree/base/model";

/// NUL-separated device-tree compatibility list (e.g. "nvidia,p3450-0000").
pub const DEVICE_TREE_COMPATIBLE_PATH: &str = "/proc/device-tree/compatible";

static CURRENT_PLATFORM: OnceLock<PlatformKind> = OnceLock::new();

/// Hardware class of the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformKind {
    #[serde(alias = "rpi")]
    RaspberryPi,
    Jetson,
    #[default]
    Generic,
}

impl PlatformKind {
    pub const ALL: [PlatformKind; 3] = [Self::RaspberryPi, Self::Jetson, Self::Generic];

    /// Classify the host from its device-tree identification.
    ///
    /// Never fails: missing or unreadable identification data means
    /// [`PlatformKind::Generic`].
    pub fn detect() -> Self {
        Self::detect_from_paths(&[
            Path::new(DEVICE_TREE_MODEL_PATH),
            Path::new(DEVICE_TREE_COMPATIBLE_PATH),
        ])
    }

    /// Detect once and memoise for the rest of the process.
    pub fn current() -> Self {
        *CURRENT_PLATFORM.get_or_init(|| {
            let platform = Self::detect();
            tracing::info!("Platform: {}", platform);
            platform
        })
    }

    /// Try each identification file in order; the first one that classifies
    /// as something other than Generic wins.
    pub fn detect_from_paths(paths: &[&Path]) -> Self {
        for path in paths {
            match std::fs::read(path) {
                Ok(raw) => {
                    let text = String::from_utf8_lossy(&raw);
                    let platform = Self::classify(&text);
                    if platform != Self::Generic {
                        return platform;
                    }
                }
                Err(e) => {
                    tracing::debug!("Platform file {} unreadable: {}", path.display(), e);
                }
            }
        }
        Self::Generic
    }

    /// Case-insensitive substring classification of an identification string.
    pub fn classify(identification: &str) -> Self {
        let text = identification.replace('\0', " ").to_lowercase();
        if text.contains("raspberry pi") || text.contains("raspberrypi") {
            Self::RaspberryPi
        } else if text.contains("jetson") || text.contains("nvidia") {
            Self::Jetson
        } else {
            Self::Generic
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RaspberryPi => "rpi",
            Self::Jetson => "jetson",
            Self::Generic => "generic",
        }
    }
}

impl fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::RaspberryPi => "Raspberry Pi",
            Self::Jetson => "Jetson",
            Self::Generic => "Generic Linux",
        };
        f.write_str(name)
    }
}

impl FromStr for PlatformKind {
    type Err = StreamError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "rpi" | "raspberrypi" | "raspberry-pi" => Ok(Self::RaspberryPi),
            "jetson" => Ok(Self::Jetson),
            "generic" => Ok(Self::Generic),
            other => Err(StreamError::Configuration(format!(
                "Unknown platform '{}' (expected rpi, jetson or generic)",
                other
            ))),
        }
    }
}
