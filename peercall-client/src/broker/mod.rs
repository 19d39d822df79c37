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

//! The seam to the peer broker (signalling and identity allocation).
//!
//! A broker is built with a [`Callback`](peercall_types::Callback) that it
//! feeds with [`BrokerEvent`]s for the lifetime of the process. Connection
//! events carry the connection id so the session can tell a late event for an
//! old connection from one for the call in progress.

pub mod loopback;

use std::fmt;

use peercall_types::{CallError, RemoteIdentity};
use thiserror::Error;

use crate::media::MediaStream;

/// A duplex media binding with one remote peer.
pub trait MediaConnection: Clone + 'static {
    type Stream: MediaStream;

    /// Identifier shared by both ends of the connection.
    fn connection_id(&self) -> String;

    /// The remote peer's identifier.
    fn peer(&self) -> String;

    /// Sends our stream on an incoming connection. Valid once, before any
    /// other use of the connection.
    fn answer(&self, local: &Self::Stream) -> anyhow::Result<()>;

    /// Closes the connection. Safe to call repeatedly.
    fn close(&self);
}

/// Stream type carried by a broker's connections.
pub type StreamOf<B> = <<B as PeerBroker>::Connection as MediaConnection>::Stream;

pub trait PeerBroker: 'static {
    type Connection: MediaConnection;

    /// Dials `remote`, offering `local`. The connection's remote stream
    /// arrives later as [`BrokerEvent::Stream`].
    fn call(
        &self,
        remote: &RemoteIdentity,
        local: &<Self::Connection as MediaConnection>::Stream,
    ) -> Result<Self::Connection, CallError>;

    /// Severs the link to the broker. Established connections stay usable
    /// until they close on their own.
    fn disconnect(&self);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BrokerErrorKind {
    /// The dialled peer is not registered with the broker.
    PeerUnavailable,
    /// The requested identity is taken.
    UnavailableId,
    /// Signalling server unreachable or lost.
    Network,
    Other,
}

impl BrokerErrorKind {
    /// Maps the `type` field of a PeerJS error.
    pub fn from_peerjs(kind: &str) -> Self {
        match kind {
            "peer-unavailable" => Self::PeerUnavailable,
            "unavailable-id" => Self::UnavailableId,
            "network" | "server-error" | "socket-error" | "socket-closed" | "disconnected" => {
                Self::Network
            }
            _ => Self::Other,
        }
    }
}

impl fmt::Display for BrokerErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::PeerUnavailable => write!(f, "peer-unavailable"),
            Self::UnavailableId => write!(f, "unavailable-id"),
            Self::Network => write!(f, "network"),
            Self::Other => write!(f, "other"),
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct BrokerError {
    pub kind: BrokerErrorKind,
    pub message: String,
}

impl BrokerError {
    pub fn new(kind: BrokerErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

pub enum BrokerEvent<C: MediaConnection> {
    /// The broker assigned our identity.
    Open(String),
    /// A remote peer is dialling us.
    Incoming(C),
    /// The remote stream of a connection arrived.
    Stream {
        connection_id: String,
        stream: C::Stream,
    },
    /// A connection ended, from either side.
    Closed { connection_id: String },
    Error(BrokerError),
}

impl<C: MediaConnection> fmt::Debug for BrokerEvent<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open(id) => write!(f, "Open({id})"),
            Self::Incoming(conn) => write!(
                f,
                "Incoming({} from {})",
                conn.connection_id(),
                conn.peer()
            ),
            Self::Stream {
                connection_id,
                stream,
            } => write!(f, "Stream({connection_id}, {})", stream.id()),
            Self::Closed { connection_id } => write!(f, "Closed({connection_id})"),
            Self::Error(e) => write!(f, "Error({e})"),
        }
    }
}
