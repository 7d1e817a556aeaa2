// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Latest-wins frame slot.
//!
//! One writer (the capture bridge) swaps whole frames in; any number of
//! readers load the current pointer. A reader either sees the previous
//! frame or the new one, never a mix. There is no queue: a frame nobody
//! read before the next store is simply dropped.

use arc_swap::ArcSwapOption;
use std::sync::Arc;

use super::{CapturedFrame, FrameMemory};

/// Writable handle to the slot. Owned by the session, cloned into the
/// capture bridge.
#[derive(Debug, Clone, Default)]
pub struct FrameBuffer {
    slot: Arc<ArcSwapOption<CapturedFrame>>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored frame.
    pub fn store(&self, frame: CapturedFrame) {
        self.slot.store(Some(Arc::new(frame)));
    }

    pub fn latest(&self) -> Option<Arc<CapturedFrame>> {
        self.slot.load_full()
    }

    pub fn clear(&self) {
        self.slot.store(None);
    }

    /// Read-only view for consumers.
    pub fn reader(&self) -> FrameReader {
        FrameReader {
            slot: Arc::clone(&self.slot),
        }
    }
}

/// Read-only, lock-free view of a [`FrameBuffer`].
#[derive(Debug, Clone)]
pub struct FrameReader {
    slot: Arc<ArcSwapOption<CapturedFrame>>,
}

impl FrameReader {
    /// Whatever frame is currently stored. `None` before the first capture.
    pub fn latest(&self) -> Option<Arc<CapturedFrame>> {
        self.slot.load_full()
    }

    /// Latest frame, only if it was captured in device-accessible memory.
    pub fn latest_device_accessible(&self) -> Option<Arc<CapturedFrame>> {
        self.latest()
            .filter(|frame| frame.memory() == FrameMemory::DeviceAccessible)
    }

    /// Sequence number of the stored frame, 0 when empty.
    pub fn sequence(&self) -> u64 {
        self.slot.load().as_ref().map_or(0, |frame| frame.sequence())
    }
}
