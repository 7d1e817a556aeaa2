// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Raw frame capture for in-process consumers.

pub mod bridge;

pub use bridge::{interpret_sample, FrameCaptureBridge};

use crate::core::{FrameMemory, PixelLayout, PlatformKind, Resolution};

/// What the capture topology delivers on a given platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureFormat {
    pub resolution: Resolution,
    pub frame_rate: u32,
    pub layout: PixelLayout,
    pub memory: FrameMemory,
}

impl CaptureFormat {
    /// Jetson converts in NVMM and hands out RGBA for GPU consumers;
    /// everything else gets host BGR.
    pub fn for_platform(platform: PlatformKind, resolution: Resolution, frame_rate: u32) -> Self {
        let (layout, memory) = match platform {
            PlatformKind::Jetson => (PixelLayout::Rgba, FrameMemory::DeviceAccessible),
            PlatformKind::RaspberryPi | PlatformKind::Generic => {
                (PixelLayout::Bgr, FrameMemory::Host)
            }
        };
        Self {
            resolution,
            frame_rate,
            layout,
            memory,
        }
    }

    /// Byte length of one packed frame.
    pub fn frame_len(&self) -> usize {
        self.resolution.pixel_count() * self.layout.bytes_per_pixel()
    }
}
