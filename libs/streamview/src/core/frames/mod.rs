// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

pub mod captured_frame;
pub mod frame_buffer;

pub use captured_frame::{CapturedFrame, FrameMemory, PixelLayout};
pub use frame_buffer::{FrameBuffer, FrameReader};
