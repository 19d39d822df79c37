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

use peercall_types::{CallError, CallPhase, LocalIdentity, ToggleFlags};

/// Why a capture request is outstanding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureIntent {
    /// The user dialled; the connection is opened once media is available.
    Dial,
    /// A peer is calling; the Accept control appears once media is available.
    Answer,
}

/// Everything an observer may know about a session at one point in time.
///
/// Streams are handles to the live media; holding a snapshot does not keep
/// tracks alive after the session releases them.
#[derive(Clone, Debug)]
pub struct SessionSnapshot<S> {
    pub local_identity: Option<LocalIdentity>,
    pub phase: CallPhase,
    pub flags: ToggleFlags,
    pub local_stream: Option<S>,
    pub remote_stream: Option<S>,
    /// Id of the connection held in the current state, or awaiting capture.
    pub connection_id: Option<String>,
    pub remote_peer: Option<String>,
    pub capture: Option<CaptureIntent>,
    pub last_error: Option<CallError>,
    pub active_since_ms: Option<f64>,
    pub broker_disconnected: bool,
}

/// The parts of a snapshot that trigger change notification.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Observed {
    pub local_identity: Option<LocalIdentity>,
    pub phase: CallPhase,
    pub flags: ToggleFlags,
    pub capture: Option<CaptureIntent>,
    pub last_error: Option<CallError>,
    pub broker_disconnected: bool,
}

impl<S> SessionSnapshot<S> {
    pub(crate) fn observed(&self) -> Observed {
        Observed {
            local_identity: self.local_identity.clone(),
            phase: self.phase,
            flags: self.flags,
            capture: self.capture,
            last_error: self.last_error.clone(),
            broker_disconnected: self.broker_disconnected,
        }
    }
}
