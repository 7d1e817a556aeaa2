// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Capture thread feeding the latest-wins frame slot.
//!
//! The bridge is the only writer of its [`FrameBuffer`]. It polls the pull
//! sink with a short timeout, copies each sample out of engine memory, and
//! swaps it into the slot. Failed pulls are counted and retried; only
//! [`FrameCaptureBridge::stop`] ends the loop.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use bytes::{Bytes, BytesMut};

use super::CaptureFormat;
use crate::core::{
    CapturedFrame, FrameBuffer, FrameMemory, PullSink, Result, Sample, StreamError,
};

const PULL_TIMEOUT: Duration = Duration::from_millis(10);
const IDLE_BACKOFF: Duration = Duration::from_millis(1);
const ERROR_BACKOFF: Duration = Duration::from_millis(10);

#[derive(Debug, Default)]
struct CaptureCounters {
    frames_captured: AtomicU64,
    transient_failures: AtomicU64,
}

/// Owned capture thread with a cooperative stop flag.
pub struct FrameCaptureBridge {
    running: Arc<AtomicBool>,
    counters: Arc<CaptureCounters>,
    handle: Option<JoinHandle<()>>,
}

impl FrameCaptureBridge {
    pub fn spawn(
        sink: Arc<dyn PullSink>,
        format: CaptureFormat,
        buffer: FrameBuffer,
    ) -> Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let counters = Arc::new(CaptureCounters::default());

        let thread_running = Arc::clone(&running);
        let thread_counters = Arc::clone(&counters);
        let handle = std::thread::Builder::new()
            .name("streamview-capture".into())
            .spawn(move || capture_loop(sink, format, buffer, thread_running, thread_counters))?;

        tracing::info!(
            "Capture started ({} {:?}, {:?})",
            format.resolution,
            format.layout,
            format.memory
        );
        Ok(Self {
            running,
            counters,
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire) && self.handle.is_some()
    }

    pub fn frames_captured(&self) -> u64 {
        self.counters.frames_captured.load(Ordering::Relaxed)
    }

    pub fn transient_failures(&self) -> u64 {
        self.counters.transient_failures.load(Ordering::Relaxed)
    }

    /// Clear the running flag and join the thread. The current pull
    /// finishes first, so the engine is never interrupted mid-sample.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("Capture thread panicked");
            }
            tracing::info!(
                "Capture stopped ({} frames, {} transient failures)",
                self.frames_captured(),
                self.transient_failures()
            );
        }
    }
}

impl Drop for FrameCaptureBridge {
    fn drop(&mut self) {
        self.stop();
    }
}

fn capture_loop(
    sink: Arc<dyn PullSink>,
    format: CaptureFormat,
    buffer: FrameBuffer,
    running: Arc<AtomicBool>,
    counters: Arc<CaptureCounters>,
) {
    let mut sequence = 0u64;
    while running.load(Ordering::Acquire) {
        let result = sink.try_pull(PULL_TIMEOUT).and_then(|sample| {
            sample
                .map(|s| interpret_sample(s, &format, sequence + 1))
                .transpose()
        });
        match result {
            Ok(Some(frame)) => {
                sequence = frame.sequence();
                if sequence == 1 {
                    tracing::info!("First frame: {} bytes", frame.data().len());
                }
                buffer.store(frame);
                counters.frames_captured.fetch_add(1, Ordering::Relaxed);
            }
            Ok(None) => std::thread::sleep(IDLE_BACKOFF),
            Err(e) => {
                tracing::debug!("Capture transient: {}", e);
                counters.transient_failures.fetch_add(1, Ordering::Relaxed);
                std::thread::sleep(ERROR_BACKOFF);
            }
        }
    }
}

/// Turn a pulled sample into a frame in the platform's layout.
///
/// Device-accessible frames are exposed as delivered. Host frames come out
/// as a tightly packed raster: rows padded to a wider stride are repacked,
/// and a buffer that is neither packed nor evenly padded is a transient
/// failure. Sizes reported by the engine win over the configured size.
pub fn interpret_sample(
    sample: Sample,
    format: &CaptureFormat,
    sequence: u64,
) -> Result<CapturedFrame> {
    let width = sample.width.unwrap_or(format.resolution.width);
    let height = sample.height.unwrap_or(format.resolution.height);

    let data = match format.memory {
        FrameMemory::Host => {
            let row = width as usize * format.layout.bytes_per_pixel();
            let received = sample.data.len();
            pack_rows(sample.data, row, height as usize).ok_or_else(|| {
                StreamError::CaptureTransient(format!(
                    "Expected {} bytes for {}x{} {:?}, got {}",
                    row * height as usize,
                    width,
                    height,
                    format.layout,
                    received
                ))
            })?
        }
        FrameMemory::DeviceAccessible => sample.data,
    };

    Ok(
        CapturedFrame::new(data, width, height, format.layout, format.memory, sequence)
            .with_pts_ns(sample.pts_ns),
    )
}

/// Packed raster of `rows` rows of `row` bytes. A buffer whose length
/// splits evenly into rows of at least `row` bytes has its padding dropped.
fn pack_rows(data: Bytes, row: usize, rows: usize) -> Option<Bytes> {
    let packed = row * rows;
    if data.len() == packed {
        return Some(data);
    }
    if rows == 0 || row == 0 || data.len() % rows != 0 {
        return None;
    }
    let stride = data.len() / rows;
    if stride < row {
        return None;
    }
    let mut out = BytesMut::with_capacity(packed);
    for line in data.chunks_exact(stride) {
        out.extend_from_slice(&line[..row]);
    }
    Some(out.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{PixelLayout, PlatformKind, Resolution};

    fn small_bgr() -> CaptureFormat {
        CaptureFormat::for_platform(PlatformKind::Generic, Resolution::new(4, 2), 30)
    }

    #[test]
    fn test_interpret_host_bgr() {
        let frame = interpret_sample(Sample::new(vec![7u8; 24]), &small_bgr(), 3).unwrap();
        assert_eq!((frame.width(), frame.height()), (4, 2));
        assert_eq!(frame.layout(), PixelLayout::Bgr);
        assert_eq!(frame.sequence(), 3);
    }

    #[test]
    fn test_interpret_rejects_partial_raster() {
        let err = interpret_sample(Sample::new(vec![0u8; 23]), &small_bgr(), 1).unwrap_err();
        assert!(matches!(err, StreamError::CaptureTransient(_)));
    }

    #[test]
    fn test_interpret_repacks_padded_rows() {
        // 4x2 BGR rows of 12 bytes padded to a 16 byte stride
        let mut data = Vec::new();
        for fill in [1u8, 2] {
            data.extend_from_slice(&[fill; 12]);
            data.extend_from_slice(&[0xEE; 4]);
        }
        let frame = interpret_sample(Sample::new(data), &small_bgr(), 1).unwrap();
        assert_eq!(frame.data().len(), 24);
        assert!(frame.data()[..12].iter().all(|&b| b == 1));
        assert!(frame.data()[12..].iter().all(|&b| b == 2));
        assert_eq!(frame.pixel(3, 1), Some(&[2u8, 2, 2][..]));
    }

    #[test]
    fn test_interpret_rejects_uneven_padding() {
        // 26 bytes do not split into two rows
        let err = interpret_sample(Sample::new(vec![0u8; 26]), &small_bgr(), 1).unwrap_err();
        assert!(matches!(err, StreamError::CaptureTransient(_)));
    }

    #[test]
    fn test_interpret_prefers_reported_size() {
        let sample = Sample::new(vec![0u8; 2 * 2 * 3]).with_size(2, 2);
        let frame = interpret_sample(sample, &small_bgr(), 1).unwrap();
        assert_eq!((frame.width(), frame.height()), (2, 2));
    }

    #[test]
    fn test_interpret_device_accessible_as_is() {
        let format = CaptureFormat::for_platform(PlatformKind::Jetson, Resolution::new(4, 2), 30);
        // Pitch-padded buffer is passed through untouched
        let sample = Sample::new(vec![1u8; 40]).with_pts_ns(99);
        let frame = interpret_sample(sample, &format, 1).unwrap();
        assert_eq!(frame.memory(), FrameMemory::DeviceAccessible);
        assert_eq!(frame.data().len(), 40);
        assert_eq!(frame.pts_ns(), Some(99));
    }
}
