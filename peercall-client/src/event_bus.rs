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

//! Global event bus for session events.
//!
//! A MPMC broadcast channel: every subscriber gets every event emitted after it
//! subscribed.
//!
//! # Example
//!
//! ```ignore
//! use peercall_client::{subscribe_session_events, SessionEvent};
//!
//! let mut rx = subscribe_session_events();
//! wasm_bindgen_futures::spawn_local(async move {
//!     while let Ok(event) = rx.recv().await {
//!         if let SessionEvent::PhaseChanged(phase) = event {
//!             log::info!("call is now {phase}");
//!         }
//!     }
//! });
//! ```

use crate::events::SessionEvent;
use async_broadcast::{broadcast, InactiveReceiver, Receiver, Sender};
use once_cell::sync::Lazy;

/// Capacity of the event bus channel
pub const EVENT_BUS_CAPACITY: usize = 256;

struct Bus {
    sender: Sender<SessionEvent>,
    // Keeps the channel open while nobody is subscribed.
    _keepalive: InactiveReceiver<SessionEvent>,
}

static BUS: Lazy<Bus> = Lazy::new(|| {
    let (mut sender, receiver) = broadcast(EVENT_BUS_CAPACITY);
    // Slow subscribers lose the oldest events instead of blocking the session.
    sender.set_overflow(true);
    Bus {
        sender,
        _keepalive: receiver.deactivate(),
    }
});

/// Get a sender for emitting session events.
pub fn global_session_sender() -> Sender<SessionEvent> {
    BUS.sender.clone()
}

/// Subscribe to session events.
///
/// Returns a receiver that will receive all future events.
pub fn subscribe_session_events() -> Receiver<SessionEvent> {
    BUS.sender.new_receiver()
}

/// Emit a session event to all subscribers. Never blocks and never fails.
pub fn emit_session_event(event: SessionEvent) {
    if BUS.sender.receiver_count() == 0 {
        return;
    }
    let _ = BUS.sender.try_broadcast(event);
}

#[cfg(test)]
mod tests {
    use super::*;
    use peercall_types::CallPhase;

    #[test]
    fn subscriber_receives_events_emitted_after_subscribing() {
        let mut rx = subscribe_session_events();
        emit_session_event(SessionEvent::PhaseChanged(CallPhase::Dialing));

        // Other tests share the bus; look for ours among whatever arrived.
        let mut seen = Vec::new();
        while let Ok(event) = rx.try_recv() {
            seen.push(event);
        }
        assert!(seen.contains(&SessionEvent::PhaseChanged(CallPhase::Dialing)));
    }

    #[test]
    fn emitting_without_subscribers_does_not_panic() {
        emit_session_event(SessionEvent::IdentityAssigned("A".to_string()));
    }

    #[test]
    fn senders_share_one_channel() {
        assert_eq!(global_session_sender().capacity(), EVENT_BUS_CAPACITY);
        assert_eq!(subscribe_session_events().capacity(), EVENT_BUS_CAPACITY);
    }
}
