/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 *
 * Unless you explicitly state otherwise, any contribution intentionally
 * submitted for inclusion in the work by you, as defined in the Apache-2.0
 * license, shall be dual licensed as above, without any additional terms or
 * conditions.
 */

//! The call lifecycle state machine.
//!
//! Every input is handled to completion before the next one is looked at.
//! Inputs that make no sense in the current state are logged and dropped:
//! brokers race, and duplicate or late events are normal.

use std::mem;

use futures::future::LocalBoxFuture;
use log::{debug, error, info, warn};
use peercall_types::{
    CallError, CallPhase, LocalIdentity, MediaKind, RemoteIdentity, ToggleFlags,
};

use super::snapshot::{CaptureIntent, SessionSnapshot};
use crate::broker::{BrokerError, BrokerErrorKind, BrokerEvent, MediaConnection, PeerBroker, StreamOf};
use crate::media::{MediaCapture, MediaGateway};
use crate::platform::now_ms;

/// Session state. Resources live inside the variant that needs them, so a
/// local stream exists exactly while a call is being set up or held.
pub enum SessionState<C: MediaConnection> {
    Idle,
    AwaitingIncoming {
        conn: C,
        local: C::Stream,
    },
    Dialing {
        conn: C,
        local: C::Stream,
    },
    /// `remote` is `None` after a local accept until the peer's stream arrives.
    Active {
        conn: C,
        local: C::Stream,
        remote: Option<C::Stream>,
    },
    TornDown,
}

impl<C: MediaConnection> SessionState<C> {
    pub fn phase(&self) -> CallPhase {
        match self {
            Self::Idle => CallPhase::Idle,
            Self::AwaitingIncoming { .. } => CallPhase::AwaitingIncoming,
            Self::Dialing { .. } => CallPhase::Dialing,
            Self::Active { remote, .. } => CallPhase::Active {
                remote_attached: remote.is_some(),
            },
            Self::TornDown => CallPhase::TornDown,
        }
    }

    pub fn connection(&self) -> Option<&C> {
        match self {
            Self::AwaitingIncoming { conn, .. }
            | Self::Dialing { conn, .. }
            | Self::Active { conn, .. } => Some(conn),
            Self::Idle | Self::TornDown => None,
        }
    }

    pub fn local_stream(&self) -> Option<&C::Stream> {
        match self {
            Self::AwaitingIncoming { local, .. }
            | Self::Dialing { local, .. }
            | Self::Active { local, .. } => Some(local),
            Self::Idle | Self::TornDown => None,
        }
    }

    pub fn remote_stream(&self) -> Option<&C::Stream> {
        match self {
            Self::Active { remote, .. } => remote.as_ref(),
            _ => None,
        }
    }
}

pub(crate) enum Input<C: MediaConnection> {
    Broker(BrokerEvent<C>),
    CaptureResolved {
        ticket: u64,
        result: Result<C::Stream, CallError>,
    },
    Dial(String),
    Accept,
    HangUp,
    Toggle(MediaKind),
    Reset,
    Shutdown,
}

/// A capture the session wants started. The result must come back as
/// `Input::CaptureResolved` with the same ticket.
pub(crate) struct CaptureRequest<S> {
    pub ticket: u64,
    pub future: LocalBoxFuture<'static, Result<S, CallError>>,
}

enum Purpose<C> {
    Dial(RemoteIdentity),
    Answer(C),
}

struct PendingCapture<C> {
    ticket: u64,
    purpose: Purpose<C>,
}

pub(crate) struct Machine<B, C>
where
    B: PeerBroker,
    C: MediaCapture<Stream = StreamOf<B>>,
{
    broker: B,
    gateway: MediaGateway<C>,
    state: SessionState<B::Connection>,
    local_identity: Option<LocalIdentity>,
    flags: ToggleFlags,
    pending: Option<PendingCapture<B::Connection>>,
    next_ticket: u64,
    last_error: Option<CallError>,
    active_since_ms: Option<f64>,
    disconnected: bool,
}

impl<B, C> Machine<B, C>
where
    B: PeerBroker,
    C: MediaCapture<Stream = StreamOf<B>>,
{
    pub fn new(broker: B, gateway: MediaGateway<C>) -> Self {
        Self {
            broker,
            gateway,
            state: SessionState::Idle,
            local_identity: None,
            flags: ToggleFlags::default(),
            pending: None,
            next_ticket: 0,
            last_error: None,
            active_since_ms: None,
            disconnected: false,
        }
    }

    pub fn handle(
        &mut self,
        input: Input<B::Connection>,
    ) -> Option<CaptureRequest<StreamOf<B>>> {
        match input {
            Input::Broker(BrokerEvent::Open(id)) => self.broker_open(id),
            Input::Broker(BrokerEvent::Incoming(conn)) => return self.incoming_call(conn),
            Input::Broker(BrokerEvent::Stream {
                connection_id,
                stream,
            }) => self.remote_stream(&connection_id, stream),
            Input::Broker(BrokerEvent::Closed { connection_id }) => {
                self.connection_closed(&connection_id)
            }
            Input::Broker(BrokerEvent::Error(err)) => self.broker_error(err),
            Input::CaptureResolved { ticket, result } => self.capture_resolved(ticket, result),
            Input::Dial(remote) => return self.dial(&remote),
            Input::Accept => self.accept(),
            Input::HangUp => self.hang_up(),
            Input::Toggle(kind) => self.toggle(kind),
            Input::Reset => self.reset(),
            Input::Shutdown => self.shutdown(),
        }
        None
    }

    fn broker_open(&mut self, id: String) {
        if self.disconnected {
            debug!("ignoring broker open after shutdown");
            return;
        }
        if let Some(existing) = &self.local_identity {
            warn!("broker re-announced identity {id}; keeping {existing}");
            return;
        }
        info!("peer broker open, local identity is {id}");
        self.local_identity = Some(LocalIdentity::new(id));
        if matches!(self.last_error, Some(CallError::BrokerUnavailable(_))) {
            self.last_error = None;
        }
    }

    fn incoming_call(
        &mut self,
        conn: B::Connection,
    ) -> Option<CaptureRequest<StreamOf<B>>> {
        if self.disconnected || self.pending.is_some() || !matches!(self.state, SessionState::Idle)
        {
            info!(
                "ignoring incoming call {} from {} while {}",
                conn.connection_id(),
                conn.peer(),
                self.describe()
            );
            return None;
        }
        info!("incoming call from {}", conn.peer());
        Some(self.start_capture(Purpose::Answer(conn)))
    }

    fn dial(&mut self, remote: &str) -> Option<CaptureRequest<StreamOf<B>>> {
        if self.disconnected || self.pending.is_some() || !matches!(self.state, SessionState::Idle)
        {
            debug!("ignoring dial while {}", self.describe());
            return None;
        }
        if self.local_identity.is_none() {
            self.fail(CallError::BrokerUnavailable(
                "no identity has been assigned yet".to_string(),
            ));
            return None;
        }
        let remote = match RemoteIdentity::parse(remote) {
            Ok(remote) => remote,
            Err(e) => {
                self.fail(e);
                return None;
            }
        };
        info!("dialling {remote}");
        Some(self.start_capture(Purpose::Dial(remote)))
    }

    fn start_capture(&mut self, purpose: Purpose<B::Connection>) -> CaptureRequest<StreamOf<B>> {
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        self.last_error = None;
        self.pending = Some(PendingCapture { ticket, purpose });
        CaptureRequest {
            ticket,
            future: self.gateway.acquire(),
        }
    }

    fn capture_resolved(&mut self, ticket: u64, result: Result<StreamOf<B>, CallError>) {
        let pending = match self.pending.take() {
            Some(pending) if pending.ticket == ticket => pending,
            other => {
                self.pending = other;
                if let Ok(stream) = result {
                    info!("capture {ticket} finished after it was cancelled, releasing it");
                    MediaGateway::<C>::release(&stream);
                }
                return;
            }
        };

        match (pending.purpose, result) {
            (Purpose::Dial(remote), Ok(local)) => match self.broker.call(&remote, &local) {
                Ok(conn) => {
                    info!("calling {remote} on {}", conn.connection_id());
                    self.flags = ToggleFlags::default();
                    self.state = SessionState::Dialing { conn, local };
                }
                Err(e) => {
                    MediaGateway::<C>::release(&local);
                    self.fail(e);
                }
            },
            (Purpose::Answer(conn), Ok(local)) => {
                info!("local media ready, call from {} can be accepted", conn.peer());
                self.flags = ToggleFlags::default();
                self.state = SessionState::AwaitingIncoming { conn, local };
            }
            (Purpose::Dial(remote), Err(e)) => {
                warn!("not calling {remote}");
                self.fail(e);
            }
            (Purpose::Answer(conn), Err(e)) => {
                warn!("leaving call from {} unanswered", conn.peer());
                self.fail(e);
            }
        }
    }

    fn accept(&mut self) {
        match mem::replace(&mut self.state, SessionState::TornDown) {
            SessionState::AwaitingIncoming { conn, local } => match conn.answer(&local) {
                Ok(()) => {
                    info!("answered call from {}", conn.peer());
                    self.active_since_ms = Some(now_ms());
                    self.state = SessionState::Active {
                        conn,
                        local,
                        remote: None,
                    };
                }
                Err(e) => {
                    error!("failed to answer call from {}: {e:#}", conn.peer());
                    self.state = SessionState::AwaitingIncoming { conn, local };
                    self.tear_down(true);
                    self.last_error = Some(CallError::ConnectionLost(e.to_string()));
                }
            },
            other => {
                debug!("ignoring accept while {}", other.phase());
                self.state = other;
            }
        }
    }

    fn remote_stream(&mut self, connection_id: &str, stream: StreamOf<B>) {
        let held = self.state.connection().map(|conn| conn.connection_id());
        if held.as_deref() != Some(connection_id) {
            debug!("ignoring stream for connection {connection_id} that is no longer held");
            return;
        }
        match mem::replace(&mut self.state, SessionState::TornDown) {
            SessionState::Dialing { conn, local } => {
                info!("{} answered, call is active", conn.peer());
                self.active_since_ms = Some(now_ms());
                self.state = SessionState::Active {
                    conn,
                    local,
                    remote: Some(stream),
                };
            }
            SessionState::Active {
                conn,
                local,
                remote: None,
            } => {
                info!("receiving media from {}", conn.peer());
                self.state = SessionState::Active {
                    conn,
                    local,
                    remote: Some(stream),
                };
            }
            other => {
                debug!("ignoring remote stream while {}", other.phase());
                self.state = other;
            }
        }
    }

    fn connection_closed(&mut self, connection_id: &str) {
        let peer = match (&self.state, &self.pending) {
            (state, _) if state.connection().is_some() => {
                state.connection().filter(|c| c.connection_id() == connection_id)
            }
            (
                _,
                Some(PendingCapture {
                    purpose: Purpose::Answer(conn),
                    ..
                }),
            ) => Some(conn).filter(|c| c.connection_id() == connection_id),
            _ => None,
        }
        .map(|conn| conn.peer());

        let Some(peer) = peer else {
            debug!("ignoring close of connection {connection_id} that is no longer held");
            return;
        };
        warn!("connection {connection_id} with {peer} closed remotely");
        self.tear_down(false);
        self.last_error = Some(CallError::ConnectionLost(format!("{peer} ended the call")));
    }

    fn broker_error(&mut self, err: BrokerError) {
        if err.kind == BrokerErrorKind::PeerUnavailable {
            if let SessionState::Dialing { conn, .. } = &self.state {
                let peer = conn.peer();
                warn!("{peer} is not reachable: {err}");
                self.tear_down(true);
                self.last_error = Some(CallError::PeerUnavailable(peer));
                return;
            }
        }
        if self.local_identity.is_none() {
            error!("peer broker unavailable: {err}");
            self.last_error = Some(CallError::BrokerUnavailable(err.to_string()));
        } else {
            warn!("peer broker error: {err}");
        }
    }

    fn hang_up(&mut self) {
        match (&self.state, &self.pending) {
            (SessionState::Idle, None) | (SessionState::TornDown, _) => {
                debug!("ignoring hang-up while {}", self.describe());
            }
            _ => {
                info!("hanging up while {}", self.describe());
                self.tear_down(true);
            }
        }
    }

    fn toggle(&mut self, kind: MediaKind) {
        let SessionState::Active { local, .. } = &self.state else {
            debug!("ignoring {kind} toggle while {}", self.describe());
            return;
        };
        let off = match MediaGateway::<C>::toggle_kind(local, kind) {
            Some(enabled) => !enabled,
            None => !self.flags.is_off(kind),
        };
        self.flags.set_off(kind, off);
        info!("local {kind} {}", if off { "off" } else { "on" });
    }

    fn reset(&mut self) {
        if !matches!(self.state, SessionState::TornDown)
            || self.disconnected
            || self.local_identity.is_none()
        {
            debug!("ignoring reset while {}", self.describe());
            return;
        }
        info!("ready for a new call");
        self.state = SessionState::Idle;
        self.flags = ToggleFlags::default();
        self.last_error = None;
    }

    pub fn shutdown(&mut self) {
        if self.disconnected {
            return;
        }
        info!("shutting down session");
        self.tear_down(true);
        self.broker.disconnect();
        self.disconnected = true;
    }

    /// Moves to `TornDown`, releasing every stream and cancelling any pending
    /// capture. `close` is false when the connection already closed itself.
    fn tear_down(&mut self, close: bool) {
        if let Some(PendingCapture {
            purpose: Purpose::Answer(conn),
            ..
        }) = self.pending.take()
        {
            if close {
                conn.close();
            }
        }
        match mem::replace(&mut self.state, SessionState::TornDown) {
            SessionState::AwaitingIncoming { conn, local } | SessionState::Dialing { conn, local } => {
                if close {
                    conn.close();
                }
                MediaGateway::<C>::release(&local);
            }
            SessionState::Active {
                conn,
                local,
                remote,
            } => {
                if close {
                    conn.close();
                }
                MediaGateway::<C>::release(&local);
                if let Some(remote) = remote {
                    MediaGateway::<C>::release(&remote);
                }
            }
            SessionState::Idle | SessionState::TornDown => {}
        }
        self.flags = ToggleFlags::default();
        self.active_since_ms = None;
    }

    fn fail(&mut self, e: CallError) {
        warn!("{e}");
        self.last_error = Some(e);
    }

    fn describe(&self) -> String {
        match &self.pending {
            Some(PendingCapture {
                purpose: Purpose::Dial(remote),
                ..
            }) => format!("{} (acquiring media to call {remote})", self.state.phase()),
            Some(PendingCapture {
                purpose: Purpose::Answer(conn),
                ..
            }) => format!("{} (acquiring media to answer {})", self.state.phase(), conn.peer()),
            None => self.state.phase().to_string(),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot<StreamOf<B>> {
        let (pending_conn, pending_remote, capture) = match &self.pending {
            Some(PendingCapture {
                purpose: Purpose::Answer(conn),
                ..
            }) => (Some(conn), Some(conn.peer()), Some(CaptureIntent::Answer)),
            Some(PendingCapture {
                purpose: Purpose::Dial(remote),
                ..
            }) => (None, Some(remote.to_string()), Some(CaptureIntent::Dial)),
            None => (None, None, None),
        };
        let conn = self.state.connection().or(pending_conn);
        SessionSnapshot {
            local_identity: self.local_identity.clone(),
            phase: self.state.phase(),
            flags: self.flags,
            local_stream: self.state.local_stream().cloned(),
            remote_stream: self.state.remote_stream().cloned(),
            connection_id: conn.map(|conn| conn.connection_id()),
            remote_peer: self.state.connection().map(|c| c.peer()).or(pending_remote),
            capture,
            last_error: self.last_error.clone(),
            active_since_ms: self.active_since_ms,
            broker_disconnected: self.disconnected,
        }
    }
}

impl<B, C> Drop for Machine<B, C>
where
    B: PeerBroker,
    C: MediaCapture<Stream = StreamOf<B>>,
{
    fn drop(&mut self) {
        self.shutdown();
    }
}
