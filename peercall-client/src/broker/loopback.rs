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

//! In-process broker.
//!
//! A [`LoopbackHub`] plays the signalling server for any number of sessions in
//! the same thread. Dialling routes an `Incoming` event to the callee, answering
//! delivers a mirrored stream to each side, and closing notifies both ends, just
//! as PeerJS does across the network.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use anyhow::{anyhow, Result};
use log::{debug, info, warn};
use peercall_types::{CallError, Callback, RemoteIdentity};
use uuid::Uuid;

use super::{BrokerError, BrokerErrorKind, BrokerEvent, MediaConnection, PeerBroker};
use crate::media::synthetic::SyntheticStream;

pub type LoopbackEvents = Callback<BrokerEvent<LoopbackConnection>>;

#[derive(Default)]
struct HubState {
    peers: HashMap<String, LoopbackEvents>,
    next_connection: u64,
}

/// Registry of the peers currently reachable through the loopback broker.
#[derive(Clone, Default)]
pub struct LoopbackHub {
    state: Rc<RefCell<HubState>>,
}

impl LoopbackHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_registered(&self, id: &str) -> bool {
        self.state.borrow().peers.contains_key(id)
    }

    fn register(&self, id: &str, events: &LoopbackEvents) -> bool {
        let mut state = self.state.borrow_mut();
        if state.peers.contains_key(id) {
            return false;
        }
        state.peers.insert(id.to_string(), events.clone());
        true
    }

    fn unregister(&self, id: &str) {
        self.state.borrow_mut().peers.remove(id);
    }

    fn lookup(&self, id: &str) -> Option<LoopbackEvents> {
        self.state.borrow().peers.get(id).cloned()
    }

    fn next_connection_id(&self) -> String {
        let mut state = self.state.borrow_mut();
        state.next_connection += 1;
        format!("mc_loopback_{}", state.next_connection)
    }
}

pub struct LoopbackBroker {
    hub: LoopbackHub,
    id: String,
    events: LoopbackEvents,
    registered: Cell<bool>,
}

impl LoopbackBroker {
    /// Joins the hub under a fresh random identity.
    pub fn connect(hub: &LoopbackHub, events: LoopbackEvents) -> Self {
        Self::connect_as(hub, &Uuid::new_v4().to_string(), events)
    }

    /// Joins the hub under a chosen identity. If the identity is taken the
    /// broker reports `unavailable-id` and never opens.
    pub fn connect_as(hub: &LoopbackHub, id: &str, events: LoopbackEvents) -> Self {
        let registered = hub.register(id, &events);
        if registered {
            info!("loopback broker opened as {id}");
            events.emit(BrokerEvent::Open(id.to_string()));
        } else {
            warn!("loopback identity {id} is already taken");
            events.emit(BrokerEvent::Error(BrokerError::new(
                BrokerErrorKind::UnavailableId,
                format!("ID \"{id}\" is taken"),
            )));
        }
        Self {
            hub: hub.clone(),
            id: id.to_string(),
            events,
            registered: Cell::new(registered),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl PeerBroker for LoopbackBroker {
    type Connection = LoopbackConnection;

    fn call(
        &self,
        remote: &RemoteIdentity,
        local: &SyntheticStream,
    ) -> Result<LoopbackConnection, CallError> {
        if !self.registered.get() {
            return Err(CallError::BrokerUnavailable(
                "not connected to the loopback hub".to_string(),
            ));
        }
        let callee_events = self
            .hub
            .lookup(remote.as_str())
            .ok_or_else(|| CallError::PeerUnavailable(remote.to_string()))?;

        let link = Rc::new(Link {
            id: self.hub.next_connection_id(),
            caller: self.id.clone(),
            callee: remote.to_string(),
            offer: local.clone(),
            caller_events: self.events.clone(),
            callee_events,
            stage: Cell::new(LinkStage::Ringing),
        });
        debug!("{} dialling {} on {}", link.caller, link.callee, link.id);

        link.callee_events
            .emit(BrokerEvent::Incoming(LoopbackConnection {
                link: Rc::clone(&link),
                side: Side::Callee,
            }));
        Ok(LoopbackConnection {
            link,
            side: Side::Caller,
        })
    }

    fn disconnect(&self) {
        if self.registered.replace(false) {
            info!("loopback broker {} disconnected", self.id);
            self.hub.unregister(&self.id);
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LinkStage {
    Ringing,
    Answered,
    Closed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
    Caller,
    Callee,
}

struct Link {
    id: String,
    caller: String,
    callee: String,
    offer: SyntheticStream,
    caller_events: LoopbackEvents,
    callee_events: LoopbackEvents,
    stage: Cell<LinkStage>,
}

/// One end of a loopback call.
#[derive(Clone)]
pub struct LoopbackConnection {
    link: Rc<Link>,
    side: Side,
}

impl LoopbackConnection {
    pub fn is_closed(&self) -> bool {
        self.link.stage.get() == LinkStage::Closed
    }

    pub fn is_answered(&self) -> bool {
        self.link.stage.get() == LinkStage::Answered
    }
}

impl MediaConnection for LoopbackConnection {
    type Stream = SyntheticStream;

    fn connection_id(&self) -> String {
        self.link.id.clone()
    }

    fn peer(&self) -> String {
        match self.side {
            Side::Caller => self.link.callee.clone(),
            Side::Callee => self.link.caller.clone(),
        }
    }

    fn answer(&self, local: &SyntheticStream) -> Result<()> {
        if self.side != Side::Callee {
            return Err(anyhow!("only the called peer can answer {}", self.link.id));
        }
        match self.link.stage.get() {
            LinkStage::Ringing => {}
            LinkStage::Answered => return Err(anyhow!("{} was already answered", self.link.id)),
            LinkStage::Closed => return Err(anyhow!("{} is closed", self.link.id)),
        }
        self.link.stage.set(LinkStage::Answered);
        debug!("{} answered {}", self.link.callee, self.link.id);

        self.link.callee_events.emit(BrokerEvent::Stream {
            connection_id: self.link.id.clone(),
            stream: self.link.offer.mirror(),
        });
        self.link.caller_events.emit(BrokerEvent::Stream {
            connection_id: self.link.id.clone(),
            stream: local.mirror(),
        });
        Ok(())
    }

    fn close(&self) {
        if self.link.stage.replace(LinkStage::Closed) == LinkStage::Closed {
            return;
        }
        debug!("{} closed", self.link.id);
        for events in [&self.link.caller_events, &self.link.callee_events] {
            events.emit(BrokerEvent::Closed {
                connection_id: self.link.id.clone(),
            });
        }
    }
}
