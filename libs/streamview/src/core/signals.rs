// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Interrupt handling
//!
//! Routes SIGINT / SIGTERM (Ctrl+C) to the cancel handle of the session
//! currently running, so the session drains instead of dying mid-write.

use parking_lot::{const_mutex, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::core::{Result, SessionCancel, StreamError};

static HANDLER_INSTALLED: AtomicBool = AtomicBool::new(false);
static CANCEL_TARGET: Mutex<Option<SessionCancel>> = const_mutex(None);

/// Make interrupts cancel `cancel`.
///
/// The OS handler is installed on the first call only; later calls just
/// retarget it, so a process can run sessions back to back.
pub fn install_interrupt_handler(cancel: SessionCancel) -> Result<()> {
    *CANCEL_TARGET.lock() = Some(cancel);

    if HANDLER_INSTALLED.swap(true, Ordering::SeqCst) {
        tracing::debug!("Interrupt handler already installed, retargeted");
        return Ok(());
    }

    ctrlc::set_handler(|| {
        tracing::info!("Interrupt received, stopping session");
        deliver_interrupt();
    })
    .map_err(|e| {
        HANDLER_INSTALLED.store(false, Ordering::SeqCst);
        StreamError::Configuration(format!("Failed to install interrupt handler: {}", e))
    })?;

    Ok(())
}

/// Stop routing interrupts to any session.
pub fn clear_interrupt_target() {
    *CANCEL_TARGET.lock() = None;
}

/// Forward an interrupt to the current target. Returns whether one was set.
pub fn deliver_interrupt() -> bool {
    match CANCEL_TARGET.lock().as_ref() {
        Some(cancel) => {
            cancel.cancel();
            true
        }
        None => false,
    }
}
