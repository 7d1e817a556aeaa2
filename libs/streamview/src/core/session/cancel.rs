// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use crossbeam_channel::{Receiver, Sender, TrySendError};

/// Cloneable request to drain a running session.
///
/// Safe to call from any thread, including signal handlers' helper threads.
/// Repeated requests before the session reacts collapse into one.
#[derive(Debug, Clone)]
pub struct SessionCancel {
    tx: Sender<()>,
}

impl SessionCancel {
    pub(crate) fn pair() -> (Self, Receiver<()>) {
        let (tx, rx) = crossbeam_channel::bounded(1);
        (Self { tx }, rx)
    }

    pub fn cancel(&self) {
        match self.tx.try_send(()) {
            Ok(()) | Err(TrySendError::Full(())) => {}
            Err(TrySendError::Disconnected(())) => {
                tracing::debug!("Cancel requested for a session that no longer exists");
            }
        }
    }
}
