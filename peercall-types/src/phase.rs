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

use std::fmt;

use serde::Serialize;

/// Resource-free view of the session state tag.
///
/// The session keeps the connection and streams inside its own state; this is
/// what observers and the view get to see.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "camelCase")]
pub enum CallPhase {
    Idle,
    AwaitingIncoming,
    Dialing,
    /// `remote_attached` is false between a local accept and the first remote stream.
    #[serde(rename_all = "camelCase")]
    Active { remote_attached: bool },
    TornDown,
}

impl CallPhase {
    /// True for every phase in which a local stream is held.
    pub fn holds_local_stream(&self) -> bool {
        matches!(
            self,
            CallPhase::AwaitingIncoming | CallPhase::Dialing | CallPhase::Active { .. }
        )
    }

    pub fn is_active(&self) -> bool {
        matches!(self, CallPhase::Active { .. })
    }
}

impl fmt::Display for CallPhase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CallPhase::Idle => write!(f, "idle"),
            CallPhase::AwaitingIncoming => write!(f, "awaiting-incoming"),
            CallPhase::Dialing => write!(f, "dialing"),
            CallPhase::Active {
                remote_attached: true,
            } => write!(f, "active"),
            CallPhase::Active {
                remote_attached: false,
            } => write!(f, "active (waiting for remote)"),
            CallPhase::TornDown => write!(f, "torn-down"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_call_phases_hold_local_media() {
        assert!(!CallPhase::Idle.holds_local_stream());
        assert!(!CallPhase::TornDown.holds_local_stream());
        assert!(CallPhase::Dialing.holds_local_stream());
        assert!(CallPhase::AwaitingIncoming.holds_local_stream());
        assert!(CallPhase::Active {
            remote_attached: false
        }
        .holds_local_stream());
    }

    #[test]
    fn serializes_with_phase_tag() {
        let json = serde_json::to_value(CallPhase::Active {
            remote_attached: true,
        })
        .unwrap();
        assert_eq!(json["phase"], "active");
        assert_eq!(json["remoteAttached"], true);
    }
}
