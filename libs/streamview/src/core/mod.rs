// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

pub mod capture;
pub mod codec;
pub mod engine;
pub mod error;
pub mod frames;
pub mod graph;
pub mod http;
pub mod platform;
pub mod session;
pub mod signals;
pub mod uri;

pub use capture::*;
pub use codec::*;
pub use engine::*;
pub use error::*;
pub use frames::*;
pub use graph::*;
pub use http::*;
pub use platform::PlatformKind;
pub use session::*;
pub use uri::*;
