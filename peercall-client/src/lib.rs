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

//! This crate provides the client side of a two-party video call. A peer
//! broker (PeerJS in the browser) hands out identities and media connections;
//! this crate owns the call lifecycle around them.
//!
//! It makes no assumptions about the UI beyond two places to show video and a
//! handful of controls. Browser apps get a ready-made binding through the
//! `wasm` feature; everything else is plain Rust and runs natively, which is
//! how the lifecycle is tested.
//!
//! # Outline of usage
//!
//! ## Session creation:
//! ```ignore
//! let options = SessionOptions::new(spawner); // set media constraints and on_change
//! let session = PeerSession::new(|events| make_broker(events), capture, options);
//! ```
//!
//! ## Calling and answering:
//! ```ignore
//! session.dial("remote-peer-id");
//! session.accept();
//! session.toggle_audio();
//! session.toggle_video();
//! session.hang_up();
//! session.reset();
//! ```
//!
//! ## Binding a view:
//! ```ignore
//! let view = ViewBinding::new(session, local_sink, remote_sink);
//! view.set_on_render(...); // callback with the new ControlState
//! view.set_remote_input("remote-peer-id");
//! view.click_call();
//! ```
//!
//! Session changes are also broadcast on a global bus, see
//! [`subscribe_session_events`].

pub mod broker;
pub mod config;
pub mod event_bus;
pub mod events;
pub mod media;
pub mod platform;
pub mod session;
pub mod view;

#[cfg(all(target_arch = "wasm32", feature = "wasm"))]
pub mod web;

pub use broker::loopback::{LoopbackBroker, LoopbackConnection, LoopbackHub};
pub use broker::{BrokerError, BrokerErrorKind, BrokerEvent, MediaConnection, PeerBroker};
pub use config::{BrokerConfig, ClientConfig, MediaConstraints};
pub use event_bus::{global_session_sender, subscribe_session_events};
pub use events::SessionEvent;
pub use media::synthetic::{SyntheticCapture, SyntheticStream, SyntheticTrack};
pub use media::{MediaCapture, MediaGateway, MediaStream, MediaTrack};
pub use peercall_types::{
    CallError, CallPhase, Callback, LocalIdentity, MediaKind, RemoteIdentity, ToggleFlags,
};
pub use platform::{now_ms, Spawner};
pub use session::{CaptureIntent, PeerSession, SessionOptions, SessionSnapshot, SessionState};
pub use view::{project, ControlState, VideoSink, ViewBinding, ViewModel};
