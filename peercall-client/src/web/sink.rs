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

use log::{debug, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::HtmlVideoElement;

use crate::view::VideoSink;

/// A `<video>` element that shows whichever stream it is given.
pub struct VideoElementSink {
    element: HtmlVideoElement,
}

impl VideoElementSink {
    /// Looks up the element by id. The local preview should be `muted` so the
    /// user does not hear their own microphone.
    pub fn by_id(id: &str, muted: bool) -> Result<Self, JsValue> {
        let element = gloo_utils::document()
            .get_element_by_id(id)
            .ok_or_else(|| JsValue::from_str(&format!("no element with id {id}")))?
            .dyn_into::<HtmlVideoElement>()
            .map_err(|_| JsValue::from_str(&format!("element {id} is not a <video>")))?;
        Ok(Self::new(element, muted))
    }

    pub fn new(element: HtmlVideoElement, muted: bool) -> Self {
        element.set_muted(muted);
        element.set_autoplay(true);
        Self { element }
    }
}

impl VideoSink<web_sys::MediaStream> for VideoElementSink {
    fn show(&self, stream: Option<&web_sys::MediaStream>) {
        self.element.set_src_object(stream);
        let Some(stream) = stream else {
            debug!("detached video from #{}", self.element.id());
            return;
        };
        debug!("showing stream {} in #{}", stream.id(), self.element.id());
        match self.element.play() {
            Ok(promise) => wasm_bindgen_futures::spawn_local(async move {
                if let Err(e) = JsFuture::from(promise).await {
                    warn!("video playback did not start: {e:?}");
                }
            }),
            Err(e) => warn!("video playback did not start: {e:?}"),
        }
    }
}
