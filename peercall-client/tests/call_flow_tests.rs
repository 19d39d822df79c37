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
 */

//! End-to-end call flows between two sessions joined by the loopback broker,
//! each driven through its view binding.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use futures::executor::LocalPool;
use futures::future::LocalBoxFuture;
use futures::task::LocalSpawnExt;
use peercall_client::{
    BrokerEvent, CallError, CallPhase, Callback, LoopbackBroker, LoopbackConnection, LoopbackHub,
    MediaKind, MediaStream, MediaTrack, PeerSession, SessionOptions, Spawner, SyntheticCapture,
    SyntheticStream, VideoSink, ViewBinding,
};

type View = ViewBinding<LoopbackBroker, SyntheticCapture>;

/// Remembers every stream id it was asked to show.
#[derive(Clone, Default)]
struct RecordingSink {
    shown: Rc<RefCell<Vec<Option<String>>>>,
}

impl RecordingSink {
    fn current(&self) -> Option<String> {
        self.shown.borrow().last().cloned().flatten()
    }

    fn attachments(&self) -> usize {
        self.shown.borrow().iter().filter(|s| s.is_some()).count()
    }
}

impl VideoSink<SyntheticStream> for RecordingSink {
    fn show(&self, stream: Option<&SyntheticStream>) {
        self.shown.borrow_mut().push(stream.map(|s| s.id()));
    }
}

struct Peer {
    view: Rc<View>,
    capture: SyntheticCapture,
    local_sink: RecordingSink,
    remote_sink: RecordingSink,
}

impl Peer {
    fn join(hub: &LoopbackHub, id: &str, spawner: Spawner) -> Self {
        let capture = SyntheticCapture::new();
        let local_sink = RecordingSink::default();
        let remote_sink = RecordingSink::default();

        let slot: Rc<RefCell<Weak<View>>> = Rc::default();
        let on_change = {
            let slot = slot.clone();
            Callback::from(move |_: ()| {
                let view = slot.borrow().upgrade();
                if let Some(view) = view {
                    view.render();
                }
            })
        };
        let hub = hub.clone();
        let id = id.to_string();
        let session = PeerSession::new(
            move |events: Callback<BrokerEvent<LoopbackConnection>>| {
                LoopbackBroker::connect_as(&hub, &id, events)
            },
            capture.clone(),
            SessionOptions {
                on_change,
                ..SessionOptions::new(spawner)
            },
        );
        let view = Rc::new(ViewBinding::new(
            session,
            Box::new(local_sink.clone()),
            Box::new(remote_sink.clone()),
        ));
        *slot.borrow_mut() = Rc::downgrade(&view);
        view.render();

        Self {
            view,
            capture,
            local_sink,
            remote_sink,
        }
    }

    fn session(&self) -> &PeerSession<LoopbackBroker, SyntheticCapture> {
        self.view.session()
    }

    fn phase(&self) -> CallPhase {
        self.session().phase()
    }

    fn dial(&self, remote: &str) {
        self.view.set_remote_input(remote);
        self.view.click_call();
    }
}

struct World {
    pool: LocalPool,
    hub: LoopbackHub,
}

impl World {
    fn new() -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        Self {
            pool: LocalPool::new(),
            hub: LoopbackHub::new(),
        }
    }

    fn join(&self, id: &str) -> Peer {
        let spawner = self.pool.spawner();
        let spawner = Callback::from(move |future: LocalBoxFuture<'static, ()>| {
            spawner.spawn_local(future).expect("local pool is alive");
        });
        Peer::join(&self.hub, id, spawner)
    }

    fn settle(&mut self) {
        self.pool.run_until_stalled();
    }
}

const ACTIVE: CallPhase = CallPhase::Active {
    remote_attached: true,
};

/// Alice calls Bob and Bob accepts.
fn connected(world: &mut World) -> (Peer, Peer) {
    let alice = world.join("alice");
    let bob = world.join("bob");
    alice.dial("bob");
    world.settle();
    bob.view.click_accept();
    world.settle();
    (alice, bob)
}

#[test]
fn identities_are_shown_once_the_broker_opens() {
    let world = World::new();
    let alice = world.join("alice");
    let controls = alice.view.controls();
    assert_eq!(controls.local_identity, "alice");
    assert_eq!(controls.phase, CallPhase::Idle);
    assert!(!controls.call_enabled, "nobody to call yet");

    alice.view.set_remote_input("bob");
    assert!(alice.view.controls().call_enabled);
}

#[test]
fn dial_accept_and_hang_up() {
    let mut world = World::new();
    let alice = world.join("alice");
    let bob = world.join("bob");

    alice.dial("bob");
    world.settle();
    assert_eq!(alice.phase(), CallPhase::Dialing);
    assert_eq!(bob.phase(), CallPhase::AwaitingIncoming);
    let ringing = bob.view.controls();
    assert!(ringing.accept_visible && ringing.decline_visible);
    assert_eq!(bob.session().snapshot().remote_peer.as_deref(), Some("alice"));
    assert!(bob.local_sink.current().is_some(), "preview shows before answering");

    bob.view.click_accept();
    world.settle();
    assert_eq!(alice.phase(), ACTIVE);
    assert_eq!(bob.phase(), ACTIVE);

    let alice_local = alice.capture.acquired()[0].clone();
    let bob_local = bob.capture.acquired()[0].clone();
    assert_eq!(alice.local_sink.current(), Some(alice_local.id()));
    assert!(alice.remote_sink.current().is_some());
    assert!(bob.remote_sink.current().is_some());
    assert_eq!(alice.remote_sink.attachments(), 1);

    let controls = alice.view.controls();
    assert!(controls.toggles_enabled && controls.end_call_enabled);
    assert!(controls.call_duration.is_some());

    alice.view.click_end_call();
    world.settle();
    assert_eq!(alice.phase(), CallPhase::TornDown);
    assert_eq!(bob.phase(), CallPhase::TornDown);
    assert!(alice_local.all_stopped());
    assert!(bob_local.all_stopped());
    assert_eq!(alice.local_sink.current(), None);
    assert_eq!(bob.remote_sink.current(), None);
    assert_eq!(
        bob.session().snapshot().last_error,
        Some(CallError::ConnectionLost("alice ended the call".to_string()))
    );
    assert_eq!(alice.session().snapshot().last_error, None);
}

#[test]
fn new_call_after_teardown() {
    let mut world = World::new();
    let (alice, bob) = connected(&mut world);
    bob.view.click_end_call();
    world.settle();

    assert!(alice.view.controls().new_call_visible);
    alice.view.click_new_call();
    bob.view.click_new_call();
    assert_eq!(alice.phase(), CallPhase::Idle);
    assert_eq!(alice.view.remote_input(), "bob");

    alice.view.click_call();
    world.settle();
    bob.view.click_accept();
    world.settle();
    assert_eq!(alice.phase(), ACTIVE);
    assert_eq!(alice.capture.acquired().len(), 2);
    assert!(alice.capture.acquired()[0].all_stopped());
}

#[test]
fn mute_and_stop_video_relabel_the_controls() {
    let mut world = World::new();
    let (alice, _bob) = connected(&mut world);

    alice.view.click_mute();
    alice.view.click_video();
    let controls = alice.view.controls();
    assert_eq!(controls.mute_label, "Unmute");
    assert_eq!(controls.video_label, "Start Video");

    let local = alice.capture.acquired()[0].clone();
    assert!(local.tracks_of(MediaKind::Audio).iter().all(|t| !t.is_enabled()));
    assert!(local.tracks_of(MediaKind::Video).iter().all(|t| !t.is_enabled()));

    alice.view.click_mute();
    assert_eq!(alice.view.controls().mute_label, "Mute");
    assert!(local.tracks_of(MediaKind::Audio).iter().all(|t| t.is_enabled()));
}

#[test]
fn decline_ends_the_call_for_both() {
    let mut world = World::new();
    let alice = world.join("alice");
    let bob = world.join("bob");
    alice.dial("bob");
    world.settle();

    bob.view.click_decline();
    world.settle();
    assert_eq!(bob.phase(), CallPhase::TornDown);
    assert_eq!(alice.phase(), CallPhase::TornDown);
    assert!(bob.capture.acquired()[0].all_stopped());
    assert!(alice.capture.acquired()[0].all_stopped());
    assert_eq!(
        alice.session().snapshot().last_error,
        Some(CallError::ConnectionLost("bob ended the call".to_string()))
    );
}

#[test]
fn calling_an_unknown_peer_reports_it() {
    let mut world = World::new();
    let alice = world.join("alice");
    alice.dial("carol");
    world.settle();

    assert_eq!(alice.phase(), CallPhase::Idle);
    let controls = alice.view.controls();
    assert!(controls.status.is_some());
    assert!(controls.call_enabled);
    assert!(alice.capture.acquired()[0].all_stopped());
}

#[test]
fn callee_without_camera_leaves_caller_dialing() {
    let mut world = World::new();
    let alice = world.join("alice");
    let bob = world.join("bob");
    bob.capture.deny("NotAllowedError: Permission denied");

    alice.dial("bob");
    world.settle();
    assert_eq!(bob.phase(), CallPhase::Idle);
    assert!(matches!(
        bob.session().snapshot().last_error,
        Some(CallError::CaptureDenied(_))
    ));
    assert_eq!(alice.phase(), CallPhase::Dialing);

    alice.view.click_end_call();
    world.settle();
    assert_eq!(alice.phase(), CallPhase::TornDown);
    assert_eq!(bob.phase(), CallPhase::Idle);
}

#[test]
fn busy_peer_ignores_a_second_caller() {
    let mut world = World::new();
    let (alice, bob) = connected(&mut world);
    let carol = world.join("carol");

    carol.dial("bob");
    world.settle();
    assert_eq!(carol.phase(), CallPhase::Dialing);
    assert_eq!(bob.phase(), ACTIVE);
    assert_eq!(bob.capture.requests(), 1);
    assert_eq!(bob.session().snapshot().remote_peer.as_deref(), Some("alice"));
    assert_eq!(alice.phase(), ACTIVE);
}

#[test]
fn hang_up_while_the_camera_is_still_starting() {
    let mut world = World::new();
    let alice = world.join("alice");
    let bob = world.join("bob");
    alice.capture.hold();

    alice.dial("bob");
    world.settle();
    assert!(alice.view.controls().end_call_enabled);
    alice.view.click_end_call();
    alice.capture.resume();
    world.settle();

    assert_eq!(alice.phase(), CallPhase::TornDown);
    assert!(alice.capture.acquired()[0].all_stopped());
    assert_eq!(bob.phase(), CallPhase::Idle, "bob was never called");
    assert_eq!(alice.local_sink.attachments(), 0);
}

#[test]
fn dropping_a_peer_ends_its_call() {
    let mut world = World::new();
    let (alice, bob) = connected(&mut world);
    let bob_local = bob.capture.acquired()[0].clone();

    drop(bob);
    world.settle();
    assert!(bob_local.all_stopped());
    assert_eq!(alice.phase(), CallPhase::TornDown);
    assert!(!world.hub.is_registered("bob"));
}

#[test]
fn taken_identity_never_opens() {
    let world = World::new();
    let _first = world.join("alice");
    let second = world.join("alice");

    let snapshot = second.session().snapshot();
    assert!(snapshot.local_identity.is_none());
    assert!(!second.view.controls().call_enabled);
}
