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

//! Framework-agnostic session events.
//!
//! Emitted on the event bus so any front-end (or a test) can follow a call
//! without holding a session handle.

use peercall_types::{CallError, CallPhase, ToggleFlags};

#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    /// The broker published our identity.
    IdentityAssigned(String),

    /// The session entered a new phase.
    PhaseChanged(CallPhase),

    /// Local audio or video was switched on or off.
    TogglesChanged(ToggleFlags),

    /// Something went wrong; the session has already recovered.
    Error(CallError),
}
