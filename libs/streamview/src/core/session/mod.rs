// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

pub mod cancel;
pub mod config;
pub mod plan;
pub mod session;
pub mod state;

pub use cancel::SessionCancel;
pub use config::SessionConfig;
pub use plan::{SessionMode, SessionPlan};
pub use session::Session;
pub use state::{SessionState, SessionStateWatch, SourcePhase, TerminationReason};
