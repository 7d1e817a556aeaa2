// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! MJPEG relay over HTTP multipart.

pub mod relay;

pub use relay::{
    multipart_chunk, HttpRelayConfig, HttpRelayHandle, HttpRelaySession, INDEX_HTML,
    MULTIPART_BOUNDARY,
};
