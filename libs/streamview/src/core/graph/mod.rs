// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Linear media graph descriptions and the builder that composes them.

pub mod builder;
pub mod description;
pub mod stage;

pub use builder::{
    BuildOutcome, ExternalMode, GraphBuilder, APPSINK_NAME, RTSP_ENTRY_NAME, RTSP_SOURCE_NAME,
};
pub use description::{GraphDescription, PendingLink};
pub use stage::Stage;
