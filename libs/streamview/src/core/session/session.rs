// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Session controller.
//!
//! A [`Session`] owns at most one running instantiation and is the single
//! place that decides what an engine message means for the session:
//! warnings are logged, end-of-stream drains, errors are always fatal.
//! Capture failures never reach it; the capture bridge absorbs them.
//!
//! Shutdown order is fixed: stop capture → end-of-stream → bounded wait →
//! release.

use crossbeam_channel::{select, Receiver, RecvTimeoutError};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use super::{
    SessionCancel, SessionConfig, SessionMode, SessionPlan, SessionState, SessionStateWatch,
    SourcePhase, TerminationReason,
};
use crate::core::{
    CapturedFrame, EngineInstance, EngineMessage, FrameBuffer, FrameCaptureBridge, FrameReader,
    HttpRelayHandle, HttpRelaySession, MediaEngine, Result, StreamError, APPSINK_NAME,
};

pub struct Session {
    config: SessionConfig,
    engine: Arc<dyn MediaEngine>,
    state: SessionState,
    state_watch: SessionStateWatch,
    reason: Option<TerminationReason>,
    source_phase: SourcePhase,
    plan: Option<SessionPlan>,
    instance: Option<Box<dyn EngineInstance>>,
    messages: Option<Receiver<EngineMessage>>,
    capture: Option<FrameCaptureBridge>,
    relay: Option<HttpRelayHandle>,
    frames: FrameBuffer,
    cancel: SessionCancel,
    cancel_rx: Receiver<()>,
}

impl Session {
    pub fn new(config: SessionConfig, engine: Arc<dyn MediaEngine>) -> Self {
        let (cancel, cancel_rx) = SessionCancel::pair();
        Self {
            config,
            engine,
            state: SessionState::Idle,
            state_watch: SessionStateWatch::default(),
            reason: None,
            source_phase: SourcePhase::Static,
            plan: None,
            instance: None,
            messages: None,
            capture: None,
            relay: None,
            frames: FrameBuffer::new(),
            cancel,
            cancel_rx,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Resolve the configuration without starting anything.
    pub fn plan(&self) -> Result<SessionPlan> {
        SessionPlan::resolve(&self.config)
    }

    /// Plan of the current or last instantiation.
    pub fn active_plan(&self) -> Option<&SessionPlan> {
        self.plan.as_ref()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// State observable from other threads, e.g. while `stop()` blocks.
    pub fn state_watch(&self) -> SessionStateWatch {
        self.state_watch.clone()
    }

    /// Set once the session is terminal.
    pub fn termination_reason(&self) -> Option<&TerminationReason> {
        self.reason.as_ref()
    }

    pub fn source_phase(&self) -> SourcePhase {
        self.source_phase
    }

    /// Handle that makes [`Session::run`] drain and return.
    pub fn cancel_handle(&self) -> SessionCancel {
        self.cancel.clone()
    }

    /// Latest captured frame, `None` before the first one arrives.
    pub fn get_frame(&self) -> Option<Arc<CapturedFrame>> {
        self.frames.latest()
    }

    /// Latest frame if it lives in device-accessible memory (Jetson).
    pub fn get_cuda_frame(&self) -> Option<Arc<CapturedFrame>> {
        self.frames.reader().latest_device_accessible()
    }

    /// Reader that can outlive borrows of the session, e.g. for another thread.
    pub fn frame_reader(&self) -> FrameReader {
        self.frames.reader()
    }

    /// Address the HTTP relay is bound to while it runs.
    pub fn http_addr(&self) -> Option<SocketAddr> {
        self.relay.as_ref().map(HttpRelayHandle::local_addr)
    }

    pub fn frames_captured(&self) -> u64 {
        self.capture.as_ref().map_or(0, FrameCaptureBridge::frames_captured)
    }

    /// Resolve, instantiate and play.
    ///
    /// URI and codec errors are returned with the session still `Idle`.
    /// Anything the engine rejects leaves it `Failed`.
    pub fn start(&mut self) -> Result<()> {
        if self.state != SessionState::Idle {
            return Err(StreamError::NotSupported(format!(
                "start() on a {} session",
                self.state
            )));
        }

        let plan = SessionPlan::resolve(&self.config)?;
        tracing::info!("Input: {}", plan.input);
        tracing::info!("Output: {}", plan.output);
        tracing::info!("Platform: {}", plan.platform);
        tracing::debug!("Launching: {}", plan.launch_string());

        let mut instance = match self.engine.instantiate(&plan.graph) {
            Ok(instance) => instance,
            Err(e) => {
                let err = as_instantiation_error(e);
                self.plan = Some(plan);
                self.fail(err.to_string());
                return Err(err);
            }
        };
        self.messages = Some(instance.messages());

        if let Err(e) = instance.play() {
            instance.release();
            let err = as_instantiation_error(e);
            self.plan = Some(plan);
            self.fail(err.to_string());
            return Err(err);
        }
        self.instance = Some(instance);
        self.source_phase = if plan.is_late_binding() {
            SourcePhase::Pending
        } else {
            SourcePhase::Static
        };

        let mode = plan.mode;
        self.plan = Some(plan);
        if let Err(e) = self.attach_consumer(mode) {
            self.fail(e.to_string());
            return Err(e);
        }

        self.set_state(SessionState::Running);
        Ok(())
    }

    fn attach_consumer(&mut self, mode: SessionMode) -> Result<()> {
        let pull_sink = |instance: &Option<Box<dyn EngineInstance>>| {
            instance
                .as_ref()
                .and_then(|i| i.pull_sink(APPSINK_NAME))
                .ok_or_else(|| {
                    StreamError::GraphInstantiation(format!(
                        "Graph has no pull sink named '{}'",
                        APPSINK_NAME
                    ))
                })
        };
        match mode {
            SessionMode::Graph => {}
            SessionMode::Capture(format) => {
                let sink = pull_sink(&self.instance)?;
                self.capture = Some(FrameCaptureBridge::spawn(sink, format, self.frames.clone())?);
            }
            SessionMode::HttpRelay => {
                let sink = pull_sink(&self.instance)?;
                self.relay = Some(HttpRelaySession::start(sink, &self.config.http)?);
            }
        }
        Ok(())
    }

    /// Start if needed, then block until the session ends.
    ///
    /// Returns on end-of-stream, after a cancel-triggered drain, or with
    /// [`StreamError::EngineRuntime`] when the engine reports an error.
    pub fn run(&mut self) -> Result<TerminationReason> {
        if self.state == SessionState::Idle {
            self.start()?;
        }
        if self.state.is_terminal() {
            return Ok(self.reason.clone().unwrap_or(TerminationReason::UserStop));
        }
        if self.state == SessionState::Draining {
            return self.drain();
        }

        let messages = self
            .messages
            .clone()
            .ok_or_else(|| StreamError::EngineRuntime {
                message: "Running session has no message channel".into(),
                debug: None,
            })?;
        let cancel = self.cancel_rx.clone();

        loop {
            select! {
                recv(messages) -> msg => {
                    let Ok(msg) = msg else {
                        let message = "Engine message channel closed".to_string();
                        self.fail(message.clone());
                        return Err(StreamError::EngineRuntime { message, debug: None });
                    };
                    if let Some(reason) = self.handle_message(msg)? {
                        return Ok(reason);
                    }
                }
                recv(cancel) -> _ => {
                    tracing::info!("Stop requested, draining");
                    return self.drain();
                }
            }
        }
    }

    fn handle_message(&mut self, msg: EngineMessage) -> Result<Option<TerminationReason>> {
        match msg {
            EngineMessage::Warning {
                message,
                debug: detail,
            } => {
                tracing::warn!(
                    "Engine warning: {} ({})",
                    message,
                    detail.as_deref().unwrap_or("-")
                );
                Ok(None)
            }
            EngineMessage::SourceLinked { pad } => {
                tracing::info!("Source linked on pad {}", pad);
                self.source_phase = SourcePhase::Linked;
                Ok(None)
            }
            EngineMessage::EndOfStream => {
                tracing::info!("End of stream");
                self.set_state(SessionState::Draining);
                self.teardown();
                self.finish(TerminationReason::EndOfStream);
                Ok(Some(TerminationReason::EndOfStream))
            }
            EngineMessage::Error {
                message,
                debug: detail,
            } => Err(self.engine_error(message, detail)),
        }
    }

    fn engine_error(&mut self, message: String, detail: Option<String>) -> StreamError {
        tracing::error!("Engine error: {} ({})", message, detail.as_deref().unwrap_or("-"));
        self.fail(message.clone());
        StreamError::EngineRuntime {
            message,
            debug: detail,
        }
    }

    /// Finalize outputs and release the instantiation.
    ///
    /// Waits up to the configured drain timeout for the engine to confirm
    /// end-of-stream so containers get their index written.
    pub fn drain(&mut self) -> Result<TerminationReason> {
        match self.state {
            SessionState::Idle => {
                self.set_state(SessionState::Stopped);
                self.reason = Some(TerminationReason::UserStop);
                return Ok(TerminationReason::UserStop);
            }
            SessionState::Stopped | SessionState::Failed => {
                return Ok(self.reason.clone().unwrap_or(TerminationReason::UserStop));
            }
            SessionState::Running => self.set_state(SessionState::Draining),
            SessionState::Draining => {}
        }

        self.stop_consumers();

        let timeout = self.config.drain_timeout();
        let mut reason = TerminationReason::DrainTimeout;
        let eos_sent = match self.instance.as_mut().map(|i| i.send_end_of_stream()) {
            Some(Ok(())) => true,
            Some(Err(e)) => {
                tracing::warn!("Could not send end-of-stream: {}", e);
                false
            }
            None => false,
        };

        if let (true, Some(messages)) = (eos_sent, self.messages.clone()) {
            let deadline = Instant::now() + timeout;
            loop {
                match messages.recv_deadline(deadline) {
                    Ok(EngineMessage::EndOfStream) => {
                        tracing::info!("Drain complete");
                        reason = TerminationReason::UserStop;
                        break;
                    }
                    Ok(EngineMessage::Error {
                        message,
                        debug: detail,
                    }) => {
                        return Err(self.engine_error(message, detail));
                    }
                    Ok(EngineMessage::Warning { message, .. }) => {
                        tracing::warn!("Engine warning while draining: {}", message);
                    }
                    Ok(EngineMessage::SourceLinked { .. }) => {}
                    Err(RecvTimeoutError::Timeout) => {
                        tracing::warn!("Drain timed out after {:?}, releasing anyway", timeout);
                        break;
                    }
                    Err(RecvTimeoutError::Disconnected) => {
                        tracing::warn!("Engine message channel closed while draining");
                        break;
                    }
                }
            }
        }

        self.teardown();
        self.finish(reason.clone());
        Ok(reason)
    }

    /// Stop from any state. A no-op once terminal.
    pub fn stop(&mut self) -> Result<()> {
        match self.state {
            SessionState::Stopped | SessionState::Failed => Ok(()),
            SessionState::Idle | SessionState::Running | SessionState::Draining => {
                self.drain().map(|_| ())
            }
        }
    }

    fn stop_consumers(&mut self) {
        if let Some(mut capture) = self.capture.take() {
            capture.stop();
        }
        if let Some(mut relay) = self.relay.take() {
            relay.stop();
        }
    }

    fn teardown(&mut self) {
        self.stop_consumers();
        if let Some(mut instance) = self.instance.take() {
            instance.release();
            tracing::debug!("Instantiation released");
        }
        self.messages = None;
    }

    fn fail(&mut self, message: String) {
        self.teardown();
        self.set_state(SessionState::Failed);
        self.reason = Some(TerminationReason::Failed { message });
    }

    fn finish(&mut self, reason: TerminationReason) {
        self.set_state(SessionState::Stopped);
        tracing::info!("Session stopped: {}", reason);
        self.reason = Some(reason);
    }

    fn set_state(&mut self, next: SessionState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        tracing::debug!("Session {} -> {}", self.state, next);
        self.state = next;
        self.state_watch.publish(next);
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.state.is_active() {
            tracing::warn!("Session dropped while {}, releasing", self.state);
            self.teardown();
        }
    }
}

fn as_instantiation_error(err: StreamError) -> StreamError {
    match err {
        StreamError::GraphInstantiation(_) => err,
        other => StreamError::GraphInstantiation(other.to_string()),
    }
}
