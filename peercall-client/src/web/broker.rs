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

use log::{debug, error, info, warn};
use serde::Serialize;
use wasm_bindgen::prelude::*;

use peercall_types::{CallError, Callback, RemoteIdentity};

use super::peerjs::{self, Peer, PeerMediaConnection};
use crate::broker::{BrokerError, BrokerErrorKind, BrokerEvent, MediaConnection, PeerBroker};
use crate::config::BrokerConfig;

type Events = Callback<BrokerEvent<PeerJsConnection>>;

/// A PeerJS media connection plus the ids read from it once.
#[derive(Clone, Debug)]
pub struct PeerJsConnection {
    inner: PeerMediaConnection,
    id: String,
    peer: String,
}

impl PeerJsConnection {
    /// Wraps a connection handed out by PeerJS and forwards its events.
    fn wrap(inner: PeerMediaConnection, events: &Events) -> Self {
        let id = inner.connection_id();
        let peer = inner.peer();

        let on_stream = {
            let events = events.clone();
            let id = id.clone();
            Closure::<dyn FnMut(JsValue)>::new(move |stream: JsValue| {
                events.emit(BrokerEvent::Stream {
                    connection_id: id.clone(),
                    stream: stream.unchecked_into(),
                });
            })
        };
        inner.on("stream", &on_stream.into_js_value());

        let on_close = {
            let events = events.clone();
            let id = id.clone();
            Closure::<dyn FnMut()>::new(move || {
                events.emit(BrokerEvent::Closed {
                    connection_id: id.clone(),
                });
            })
        };
        inner.on("close", &on_close.into_js_value());

        let on_error = {
            let id = id.clone();
            Closure::<dyn FnMut(JsValue)>::new(move |err: JsValue| {
                warn!("media connection {id} error: {}", peerjs::describe(&err));
            })
        };
        inner.on("error", &on_error.into_js_value());

        Self { inner, id, peer }
    }
}

impl MediaConnection for PeerJsConnection {
    type Stream = web_sys::MediaStream;

    fn connection_id(&self) -> String {
        self.id.clone()
    }

    fn peer(&self) -> String {
        self.peer.clone()
    }

    fn answer(&self, local: &web_sys::MediaStream) -> anyhow::Result<()> {
        self.inner
            .answer(local)
            .map_err(|e| anyhow::anyhow!("answer failed: {}", peerjs::describe(&e)))
    }

    fn close(&self) {
        self.inner.close();
    }
}

/// Peer broker backed by a PeerJS `Peer`.
///
/// Construction never fails: if PeerJS cannot be reached the failure is
/// reported as a broker error event and every call is refused.
pub struct PeerJsBroker {
    peer: Option<Peer>,
    events: Events,
}

impl PeerJsBroker {
    pub fn connect(config: &BrokerConfig, events: Events) -> Self {
        match Self::create_peer(config, &events) {
            Ok(peer) => Self {
                peer: Some(peer),
                events,
            },
            Err(e) => {
                error!("failed to create PeerJS peer: {}", peerjs::describe(&e));
                events.emit(BrokerEvent::Error(BrokerError::new(
                    BrokerErrorKind::Network,
                    format!("PeerJS unavailable: {}", peerjs::describe(&e)),
                )));
                Self { peer: None, events }
            }
        }
    }

    fn create_peer(config: &BrokerConfig, events: &Events) -> Result<Peer, JsValue> {
        let options = config
            .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
            .map_err(JsValue::from)?;
        let peer = Peer::new(&options)?;
        debug!("PeerJS peer created with {config:?}");

        let on_open = {
            let events = events.clone();
            Closure::<dyn FnMut(String)>::new(move |id: String| {
                events.emit(BrokerEvent::Open(id));
            })
        };
        peer.on("open", &on_open.into_js_value());

        let on_call = {
            let events = events.clone();
            Closure::<dyn FnMut(JsValue)>::new(move |conn: JsValue| {
                let conn = PeerJsConnection::wrap(conn.unchecked_into(), &events);
                events.emit(BrokerEvent::Incoming(conn));
            })
        };
        peer.on("call", &on_call.into_js_value());

        let on_error = {
            let events = events.clone();
            Closure::<dyn FnMut(JsValue)>::new(move |err: JsValue| {
                let kind = peerjs::string_field(&err, "type").unwrap_or_default();
                events.emit(BrokerEvent::Error(BrokerError::new(
                    BrokerErrorKind::from_peerjs(&kind),
                    peerjs::describe(&err),
                )));
            })
        };
        peer.on("error", &on_error.into_js_value());

        let on_disconnected = Closure::<dyn FnMut()>::new(move || {
            warn!("PeerJS lost its signalling server connection");
        });
        peer.on("disconnected", &on_disconnected.into_js_value());

        Ok(peer)
    }
}

impl PeerBroker for PeerJsBroker {
    type Connection = PeerJsConnection;

    fn call(
        &self,
        remote: &RemoteIdentity,
        local: &web_sys::MediaStream,
    ) -> Result<PeerJsConnection, CallError> {
        let peer = self
            .peer
            .as_ref()
            .filter(|peer| !peer.destroyed())
            .ok_or_else(|| CallError::BrokerUnavailable("PeerJS is not connected".to_string()))?;
        let conn = peer
            .call(remote.as_str(), local)
            .map_err(|e| CallError::BrokerUnavailable(peerjs::describe(&e)))?;
        if conn.is_undefined() || conn.is_null() {
            return Err(CallError::BrokerUnavailable(format!(
                "PeerJS refused to call {remote}"
            )));
        }
        Ok(PeerJsConnection::wrap(conn.unchecked_into(), &self.events))
    }

    fn disconnect(&self) {
        if let Some(peer) = &self.peer {
            if !peer.destroyed() {
                info!("destroying PeerJS peer");
                peer.destroy();
            }
        }
    }
}
