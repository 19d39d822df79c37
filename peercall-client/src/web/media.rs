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

use futures::future::LocalBoxFuture;
use futures::FutureExt;
use gloo_utils::window;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{DomException, MediaStreamConstraints, MediaStreamTrackState};

use peercall_types::{CallError, MediaKind};

use crate::config::MediaConstraints;
use crate::media::{MediaCapture, MediaStream, MediaTrack};

impl MediaTrack for web_sys::MediaStreamTrack {
    fn kind(&self) -> Option<MediaKind> {
        match web_sys::MediaStreamTrack::kind(self).as_str() {
            "audio" => Some(MediaKind::Audio),
            "video" => Some(MediaKind::Video),
            _ => None,
        }
    }

    fn is_enabled(&self) -> bool {
        self.enabled()
    }

    fn set_enabled(&self, enabled: bool) {
        web_sys::MediaStreamTrack::set_enabled(self, enabled);
    }

    fn stop(&self) {
        web_sys::MediaStreamTrack::stop(self);
    }

    fn is_stopped(&self) -> bool {
        self.ready_state() == MediaStreamTrackState::Ended
    }
}

impl MediaStream for web_sys::MediaStream {
    type Track = web_sys::MediaStreamTrack;

    fn id(&self) -> String {
        web_sys::MediaStream::id(self)
    }

    fn tracks(&self) -> Vec<web_sys::MediaStreamTrack> {
        self.get_tracks()
            .iter()
            .map(|track| track.unchecked_into())
            .collect()
    }
}

/// Capture through `navigator.mediaDevices.getUserMedia`.
#[derive(Clone, Copy, Debug, Default)]
pub struct WebMediaCapture;

impl WebMediaCapture {
    fn request(constraints: &MediaConstraints) -> Result<js_sys::Promise, JsValue> {
        let media_devices = window().navigator().media_devices()?;
        let options = MediaStreamConstraints::new();
        options.set_audio(&JsValue::from_bool(constraints.audio));
        options.set_video(&JsValue::from_bool(constraints.video));
        media_devices.get_user_media_with_constraints(&options)
    }
}

impl MediaCapture for WebMediaCapture {
    type Stream = web_sys::MediaStream;

    fn get_user_media(
        &self,
        constraints: &MediaConstraints,
    ) -> LocalBoxFuture<'static, Result<web_sys::MediaStream, CallError>> {
        let promise = Self::request(constraints);
        async move {
            let stream = JsFuture::from(promise.map_err(denied)?)
                .await
                .map_err(denied)?;
            Ok(stream.unchecked_into::<web_sys::MediaStream>())
        }
        .boxed_local()
    }
}

/// `NotAllowedError`, `NotFoundError` and friends all mean no media.
fn denied(e: JsValue) -> CallError {
    let reason = match e.dyn_ref::<DomException>() {
        Some(exception) => format!("{}: {}", exception.name(), exception.message()),
        None => super::peerjs::describe(&e),
    };
    CallError::CaptureDenied(reason)
}
