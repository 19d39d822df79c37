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

//! Bindings for the PeerJS global `Peer` class and the media connections it
//! hands out. The page must load PeerJS before the wasm module.

use wasm_bindgen::prelude::*;

#[wasm_bindgen]
extern "C" {
    #[derive(Clone, Debug)]
    pub type Peer;

    #[wasm_bindgen(constructor, catch)]
    pub fn new(options: &JsValue) -> Result<Peer, JsValue>;

    #[wasm_bindgen(method)]
    pub fn on(this: &Peer, event: &str, callback: &JsValue);

    /// Returns `undefined` instead of a connection when the peer is already
    /// destroyed or disconnected.
    #[wasm_bindgen(method, catch)]
    pub fn call(this: &Peer, id: &str, stream: &web_sys::MediaStream) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(method)]
    pub fn destroy(this: &Peer);

    #[wasm_bindgen(method, getter)]
    pub fn destroyed(this: &Peer) -> bool;

    #[derive(Clone, Debug)]
    pub type PeerMediaConnection;

    #[wasm_bindgen(method, getter, js_name = connectionId)]
    pub fn connection_id(this: &PeerMediaConnection) -> String;

    #[wasm_bindgen(method, getter)]
    pub fn peer(this: &PeerMediaConnection) -> String;

    #[wasm_bindgen(method, catch)]
    pub fn answer(this: &PeerMediaConnection, stream: &web_sys::MediaStream) -> Result<(), JsValue>;

    #[wasm_bindgen(method)]
    pub fn close(this: &PeerMediaConnection);

    #[wasm_bindgen(method)]
    pub fn on(this: &PeerMediaConnection, event: &str, callback: &JsValue);
}

/// Reads a string property, if present, from an arbitrary JS value.
pub fn string_field(value: &JsValue, name: &str) -> Option<String> {
    js_sys::Reflect::get(value, &JsValue::from_str(name))
        .ok()
        .and_then(|field| field.as_string())
}

/// Best-effort human readable form of a thrown JS value.
pub fn describe(value: &JsValue) -> String {
    string_field(value, "message")
        .or_else(|| value.as_string())
        .unwrap_or_else(|| format!("{value:?}"))
}
