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

//! Error kinds surfaced by the call session.

use serde::Serialize;
use thiserror::Error;

/// Everything that can go wrong during a call.
///
/// None of these escape the session as a failure of the caller's intent; they
/// are logged, kept as the session's last error, and shown by the view.
#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail")]
pub enum CallError {
    /// The user refused camera/microphone access or no device was available.
    #[error("Camera or microphone unavailable: {0}")]
    CaptureDenied(String),

    /// The peer broker never published an identity or reported a failure.
    #[error("Peer broker unavailable: {0}")]
    BrokerUnavailable(String),

    /// The media connection closed without a local hang-up.
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// The broker does not know the dialled peer.
    #[error("Peer {0} is not reachable")]
    PeerUnavailable(String),

    /// A dial was requested with an empty remote identity.
    #[error("Enter the identifier of the peer to call")]
    InvalidRemoteIdentity,
}
