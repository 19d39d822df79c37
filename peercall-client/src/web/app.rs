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

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use gloo_timers::callback::Interval;
use log::{error, info};
use wasm_bindgen::prelude::*;

use peercall_types::Callback;

use super::{init_logging, PeerJsBroker, PeerJsConnection, VideoElementSink, WebMediaCapture};
use crate::broker::BrokerEvent;
use crate::config::ClientConfig;
use crate::platform::local_spawner;
use crate::session::{PeerSession, SessionOptions};
use crate::view::{ControlState, ViewBinding};

type WebView = ViewBinding<PeerJsBroker, WebMediaCapture>;

/// Milliseconds between re-renders, so the call timer keeps ticking.
const TICK_MS: u32 = 1000;

/// A complete call page: one PeerJS identity, two `<video>` elements and the
/// controls, driven from JavaScript.
///
/// ```js
/// const app = new WebCallApp({ logLevel: "debug" }, "local-video", "remote-video");
/// app.set_on_render((controls) => render(controls));
/// app.set_remote_id(input.value);
/// app.call();
/// ```
#[wasm_bindgen]
pub struct WebCallApp {
    view: Rc<WebView>,
    timer: Option<Interval>,
}

#[wasm_bindgen]
impl WebCallApp {
    /// `config` is a [`ClientConfig`] as a plain object, or `undefined` for
    /// the defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(
        config: JsValue,
        local_video_id: &str,
        remote_video_id: &str,
    ) -> Result<WebCallApp, JsValue> {
        let config: ClientConfig = if config.is_undefined() || config.is_null() {
            ClientConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config)?
        };
        config.validate().map_err(to_js_error)?;
        init_logging(config.level().map_err(to_js_error)?);

        let local_sink = VideoElementSink::by_id(local_video_id, true)?;
        let remote_sink = VideoElementSink::by_id(remote_video_id, false)?;

        // Weak: the view owns the session.
        let slot: Rc<RefCell<Weak<WebView>>> = Rc::default();
        let on_change = {
            let slot = Rc::clone(&slot);
            Callback::from(move |_: ()| {
                let view = slot.borrow().upgrade();
                if let Some(view) = view {
                    view.render();
                }
            })
        };
        let options = SessionOptions {
            media: config.media,
            spawner: local_spawner(),
            on_change,
        };
        let broker_config = config.broker.clone();
        let session = PeerSession::new(
            move |events: Callback<BrokerEvent<PeerJsConnection>>| {
                PeerJsBroker::connect(&broker_config, events)
            },
            WebMediaCapture,
            options,
        );

        let view = Rc::new(ViewBinding::new(
            session,
            Box::new(local_sink),
            Box::new(remote_sink),
        ));
        *slot.borrow_mut() = Rc::downgrade(&view);
        view.render();

        let timer = {
            let view = Rc::downgrade(&view);
            Interval::new(TICK_MS, move || {
                if let Some(view) = view.upgrade() {
                    view.render();
                }
            })
        };

        info!("call page ready");
        Ok(Self {
            view,
            timer: Some(timer),
        })
    }

    /// Our identity, once the broker has assigned one.
    pub fn local_id(&self) -> Option<String> {
        self.view
            .session()
            .local_identity()
            .map(|id| id.as_str().to_string())
    }

    /// Called with the controls (see [`ControlState`]) now and on every change.
    pub fn set_on_render(&self, callback: js_sys::Function) {
        let on_render = Callback::from(move |controls: ControlState| {
            match serde_wasm_bindgen::to_value(&controls) {
                Ok(value) => {
                    if let Err(e) = callback.call1(&JsValue::NULL, &value) {
                        error!("render callback failed: {e:?}");
                    }
                }
                Err(e) => error!("failed to convert controls: {e}"),
            }
        });
        self.view.set_on_render(on_render.clone());
        on_render.emit(self.view.controls());
    }

    pub fn set_remote_id(&self, text: &str) {
        self.view.set_remote_input(text);
    }

    pub fn call(&self) {
        self.view.click_call();
    }

    pub fn accept(&self) {
        self.view.click_accept();
    }

    pub fn decline(&self) {
        self.view.click_decline();
    }

    pub fn end_call(&self) {
        self.view.click_end_call();
    }

    pub fn toggle_audio(&self) {
        self.view.click_mute();
    }

    pub fn toggle_video(&self) {
        self.view.click_video();
    }

    pub fn new_call(&self) {
        self.view.click_new_call();
    }

    pub fn controls(&self) -> Result<JsValue, JsValue> {
        Ok(serde_wasm_bindgen::to_value(&self.view.controls())?)
    }

    /// Ends any call, stops the camera and leaves the broker. Call it on page
    /// unload; the app is unusable afterwards.
    pub fn shutdown(&mut self) {
        self.timer.take();
        self.view.session().shutdown();
        self.view.render();
    }
}

fn to_js_error(e: anyhow::Error) -> JsValue {
    JsValue::from_str(&format!("{e:#}"))
}
