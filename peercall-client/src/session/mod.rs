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

//! Peer Session: the owner of at most one media connection and its streams.
//!
//! A [`PeerSession`] is a cheap, cloneable handle. Broker events, capture
//! completions and user intents are all queued as inputs and run to completion
//! one at a time, so a broker that fires events synchronously from inside
//! `call`, `answer` or `close` never re-enters a transition.
//!
//! ```ignore
//! let hub = LoopbackHub::new();
//! let session = PeerSession::new(
//!     |events| LoopbackBroker::connect(&hub, events),
//!     SyntheticCapture::new(),
//!     SessionOptions::new(spawner),
//! );
//! session.dial("the-other-peer");
//! ```

mod snapshot;
mod state;

pub use snapshot::{CaptureIntent, SessionSnapshot};
pub use state::SessionState;

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use futures::FutureExt;
use peercall_types::{CallPhase, Callback, LocalIdentity, MediaKind, ToggleFlags};

use crate::broker::{BrokerEvent, PeerBroker, StreamOf};
use crate::config::MediaConstraints;
use crate::event_bus::emit_session_event;
use crate::events::SessionEvent;
use crate::media::{MediaCapture, MediaGateway};
use crate::platform::Spawner;
use snapshot::Observed;
use state::{CaptureRequest, Input, Machine};

/// Options struct for constructing a session via [PeerSession::new].
pub struct SessionOptions {
    /// What to request from the capture subsystem for every call.
    pub media: MediaConstraints,

    /// Runs capture futures on the current thread's executor.
    pub spawner: Spawner,

    /// Called as `callback(())` after inputs changed what observers can see.
    pub on_change: Callback<()>,
}

impl SessionOptions {
    pub fn new(spawner: Spawner) -> Self {
        Self {
            media: MediaConstraints::default(),
            spawner,
            on_change: Callback::noop(),
        }
    }
}

type Queue<C> = Rc<RefCell<VecDeque<Input<C>>>>;

struct Shared<B, C>
where
    B: PeerBroker,
    C: MediaCapture<Stream = StreamOf<B>>,
{
    machine: RefCell<Machine<B, C>>,
    queue: Queue<B::Connection>,
    spawner: Spawner,
    on_change: Callback<()>,
    observed: RefCell<Option<Observed>>,
}

pub struct PeerSession<B, C>
where
    B: PeerBroker,
    C: MediaCapture<Stream = StreamOf<B>>,
{
    shared: Rc<Shared<B, C>>,
}

impl<B, C> Clone for PeerSession<B, C>
where
    B: PeerBroker,
    C: MediaCapture<Stream = StreamOf<B>>,
{
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<B, C> PartialEq for PeerSession<B, C>
where
    B: PeerBroker,
    C: MediaCapture<Stream = StreamOf<B>>,
{
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.shared, &other.shared)
    }
}

impl<B, C> PeerSession<B, C>
where
    B: PeerBroker,
    C: MediaCapture<Stream = StreamOf<B>>,
{
    /// Builds the session and its broker.
    ///
    /// `make_broker` receives the callback the broker must feed with events.
    /// Events it emits before this function returns (an immediate `Open`, for
    /// instance) are queued and handled before `new` returns.
    pub fn new<F>(make_broker: F, capture: C, options: SessionOptions) -> Self
    where
        F: FnOnce(Callback<BrokerEvent<B::Connection>>) -> B,
    {
        let SessionOptions {
            media,
            spawner,
            on_change,
        } = options;
        let queue: Queue<B::Connection> = Rc::default();
        let shared = Rc::new_cyclic(|weak: &Weak<Shared<B, C>>| {
            let events = {
                let queue = Rc::clone(&queue);
                let weak = weak.clone();
                Callback::from(move |event: BrokerEvent<B::Connection>| {
                    queue.borrow_mut().push_back(Input::Broker(event));
                    if let Some(shared) = weak.upgrade() {
                        shared.drain();
                    }
                })
            };
            let broker = make_broker(events);
            Shared {
                machine: RefCell::new(Machine::new(broker, MediaGateway::new(capture, media))),
                queue,
                spawner,
                on_change,
                observed: RefCell::new(None),
            }
        });
        shared.drain();
        Self { shared }
    }

    /// Calls the peer named by `remote` (as typed by the user).
    pub fn dial(&self, remote: &str) {
        self.shared.dispatch(Input::Dial(remote.to_string()));
    }

    /// Answers the incoming call offered in `AwaitingIncoming`.
    pub fn accept(&self) {
        self.shared.dispatch(Input::Accept);
    }

    /// Ends, declines or cancels whatever call is in progress.
    pub fn hang_up(&self) {
        self.shared.dispatch(Input::HangUp);
    }

    pub fn toggle_audio(&self) {
        self.shared.dispatch(Input::Toggle(MediaKind::Audio));
    }

    pub fn toggle_video(&self) {
        self.shared.dispatch(Input::Toggle(MediaKind::Video));
    }

    /// Leaves `TornDown` for `Idle` so another call can be made.
    pub fn reset(&self) {
        self.shared.dispatch(Input::Reset);
    }

    /// Ends any call, releases all media and disconnects the broker. Idempotent;
    /// also performed when the last handle is dropped.
    pub fn shutdown(&self) {
        self.shared.dispatch(Input::Shutdown);
    }

    pub fn snapshot(&self) -> SessionSnapshot<StreamOf<B>> {
        self.shared.machine.borrow().snapshot()
    }

    pub fn phase(&self) -> CallPhase {
        self.snapshot().phase
    }

    pub fn local_identity(&self) -> Option<LocalIdentity> {
        self.snapshot().local_identity
    }

    pub fn flags(&self) -> ToggleFlags {
        self.snapshot().flags
    }
}

impl<B, C> Shared<B, C>
where
    B: PeerBroker,
    C: MediaCapture<Stream = StreamOf<B>>,
{
    fn dispatch(self: &Rc<Self>, input: Input<B::Connection>) {
        self.queue.borrow_mut().push_back(input);
        self.drain();
    }

    /// Runs queued inputs until the queue is empty. Returns immediately if a
    /// transition is already running further up the stack; that caller picks
    /// up whatever was queued.
    fn drain(self: &Rc<Self>) {
        loop {
            let Ok(mut machine) = self.machine.try_borrow_mut() else {
                return;
            };
            let Some(input) = self.queue.borrow_mut().pop_front() else {
                break;
            };
            let request = machine.handle(input);
            drop(machine);
            if let Some(request) = request {
                self.start_capture(request);
            }
        }
        self.publish();
    }

    fn start_capture(self: &Rc<Self>, request: CaptureRequest<StreamOf<B>>) {
        let CaptureRequest { ticket, future } = request;
        let weak = Rc::downgrade(self);
        self.spawner.emit(
            async move {
                let result = future.await;
                match weak.upgrade() {
                    Some(shared) => shared.dispatch(Input::CaptureResolved { ticket, result }),
                    None => {
                        if let Ok(stream) = result {
                            MediaGateway::<C>::release(&stream);
                        }
                    }
                }
            }
            .boxed_local(),
        );
    }

    fn publish(&self) {
        let current = match self.machine.try_borrow() {
            Ok(machine) => machine.snapshot().observed(),
            Err(_) => return,
        };
        let previous = self.observed.replace(Some(current.clone()));
        if previous.as_ref() == Some(&current) {
            return;
        }

        if let Some(id) = &current.local_identity {
            if previous.as_ref().map_or(true, |p| p.local_identity.is_none()) {
                emit_session_event(SessionEvent::IdentityAssigned(id.to_string()));
            }
        }
        if previous.as_ref().map(|p| p.phase) != Some(current.phase) {
            emit_session_event(SessionEvent::PhaseChanged(current.phase));
        }
        if previous.as_ref().map(|p| p.flags) != Some(current.flags) {
            emit_session_event(SessionEvent::TogglesChanged(current.flags));
        }
        if let Some(e) = &current.last_error {
            if previous.as_ref().and_then(|p| p.last_error.as_ref()) != Some(e) {
                emit_session_event(SessionEvent::Error(e.clone()));
            }
        }
        self.on_change.emit(());
    }
}
