// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Raw frames handed to in-process consumers.

use bytes::Bytes;

/// Byte order of pixels in a captured raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelLayout {
    /// Packed 8-bit blue/green/red, the layout OpenCV-style consumers expect.
    Bgr,
    /// Packed 8-bit red/green/blue/alpha, what `nvvidconv` emits on Jetson.
    Rgba,
}

impl PixelLayout {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelLayout::Bgr => 3,
            PixelLayout::Rgba => 4,
        }
    }

    /// `format=` value in raw video caps.
    pub fn caps_format(&self) -> &'static str {
        match self {
            PixelLayout::Bgr => "BGR",
            PixelLayout::Rgba => "RGBA",
        }
    }
}

/// Where a consumer should expect to find the frame's pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameMemory {
    /// Plain host memory.
    Host,
    /// Host-visible copy of a buffer that GPU-aware consumers can upload
    /// without conversion.
    DeviceAccessible,
}

/// One captured frame. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedFrame {
    data: Bytes,
    width: u32,
    height: u32,
    layout: PixelLayout,
    memory: FrameMemory,
    sequence: u64,
    pts_ns: Option<u64>,
}

impl CapturedFrame {
    pub fn new(
        data: Bytes,
        width: u32,
        height: u32,
        layout: PixelLayout,
        memory: FrameMemory,
        sequence: u64,
    ) -> Self {
        Self {
            data,
            width,
            height,
            layout,
            memory,
            sequence,
            pts_ns: None,
        }
    }

    pub fn with_pts_ns(mut self, pts_ns: Option<u64>) -> Self {
        self.pts_ns = pts_ns;
        self
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Shared handle to the pixel bytes, no copy.
    pub fn bytes(&self) -> Bytes {
        self.data.clone()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn layout(&self) -> PixelLayout {
        self.layout
    }

    pub fn memory(&self) -> FrameMemory {
        self.memory
    }

    /// Monotonic capture counter, starting at 1 for the first frame.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn pts_ns(&self) -> Option<u64> {
        self.pts_ns
    }

    /// Row stride in bytes for packed layouts.
    pub fn stride(&self) -> usize {
        self.width as usize * self.layout.bytes_per_pixel()
    }

    /// Pixel at (x, y) as a slice of `bytes_per_pixel` bytes.
    pub fn pixel(&self, x: u32, y: u32) -> Option<&[u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let bpp = self.layout.bytes_per_pixel();
        let offset = y as usize * self.stride() + x as usize * bpp;
        self.data.get(offset..offset + bpp)
    }
}
