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

//! View Binding: projects session state onto two video sinks and the call
//! controls, and turns control clicks back into session intents.
//!
//! [`project`] is a pure function and carries all the enable/disable rules.
//! [`ViewBinding`] adds the one piece of state the view owns (the remote id
//! text field) and pushes projections into the sinks.

use std::cell::RefCell;

use log::debug;
use serde::Serialize;

use peercall_types::{CallPhase, Callback};

use crate::broker::{PeerBroker, StreamOf};
use crate::media::{MediaCapture, MediaStream};
use crate::platform::now_ms;
use crate::session::{CaptureIntent, PeerSession, SessionSnapshot};

/// Somewhere a stream can be shown (a `<video>` element in the browser).
pub trait VideoSink<S> {
    /// `None` detaches whatever is shown.
    fn show(&self, stream: Option<&S>);
}

/// Everything the controls need, in a form any UI (or JS) can render.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlState {
    /// Blank until the broker publishes an identity.
    pub local_identity: String,
    pub remote_identity: String,
    pub phase: CallPhase,
    pub call_enabled: bool,
    pub end_call_enabled: bool,
    pub toggles_enabled: bool,
    pub accept_visible: bool,
    pub decline_visible: bool,
    pub new_call_visible: bool,
    pub mute_label: &'static str,
    pub video_label: &'static str,
    /// Elapsed `mm:ss` (or `hh:mm:ss`) while a call is active.
    pub call_duration: Option<String>,
    /// Human-readable description of the last error, if any.
    pub status: Option<String>,
}

pub struct ViewModel<S> {
    pub controls: ControlState,
    pub local_video: Option<S>,
    pub remote_video: Option<S>,
}

/// Derives the view from a session snapshot and the remote id text field.
pub fn project<S: Clone>(
    snapshot: &SessionSnapshot<S>,
    remote_input: &str,
    now_ms: f64,
) -> ViewModel<S> {
    let phase = snapshot.phase;
    let dial_pending = snapshot.capture == Some(CaptureIntent::Dial);
    let has_identity = snapshot.local_identity.is_some();

    let controls = ControlState {
        local_identity: snapshot
            .local_identity
            .as_ref()
            .map(|id| id.to_string())
            .unwrap_or_default(),
        remote_identity: remote_input.to_string(),
        phase,
        call_enabled: phase == CallPhase::Idle
            && snapshot.capture.is_none()
            && has_identity
            && !remote_input.trim().is_empty(),
        end_call_enabled: matches!(phase, CallPhase::Dialing | CallPhase::Active { .. })
            || (phase == CallPhase::Idle && dial_pending),
        toggles_enabled: phase.is_active(),
        accept_visible: phase == CallPhase::AwaitingIncoming,
        decline_visible: phase == CallPhase::AwaitingIncoming,
        new_call_visible: phase == CallPhase::TornDown
            && has_identity
            && !snapshot.broker_disconnected,
        mute_label: if snapshot.flags.audio_muted {
            "Unmute"
        } else {
            "Mute"
        },
        video_label: if snapshot.flags.video_stopped {
            "Start Video"
        } else {
            "Stop Video"
        },
        call_duration: snapshot
            .active_since_ms
            .filter(|_| phase.is_active())
            .map(|since| format_duration(now_ms - since)),
        status: snapshot.last_error.as_ref().map(|e| e.to_string()),
    };

    ViewModel {
        controls,
        local_video: snapshot.local_stream.clone(),
        remote_video: snapshot.remote_stream.clone(),
    }
}

fn format_duration(elapsed_ms: f64) -> String {
    let secs = (elapsed_ms.max(0.0) / 1000.0) as u64;
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if hours > 0 {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}

/// Connects a session to two sinks and a set of controls.
///
/// All methods take `&self`: the session may ask for a render while a click
/// handler is still on the stack.
pub struct ViewBinding<B, C>
where
    B: PeerBroker,
    C: MediaCapture<Stream = StreamOf<B>>,
{
    session: PeerSession<B, C>,
    remote_input: RefCell<String>,
    local_sink: Box<dyn VideoSink<StreamOf<B>>>,
    remote_sink: Box<dyn VideoSink<StreamOf<B>>>,
    attached: RefCell<(Option<String>, Option<String>)>,
    last_controls: RefCell<Option<ControlState>>,
    on_render: RefCell<Callback<ControlState>>,
}

impl<B, C> ViewBinding<B, C>
where
    B: PeerBroker,
    C: MediaCapture<Stream = StreamOf<B>>,
{
    pub fn new(
        session: PeerSession<B, C>,
        local_sink: Box<dyn VideoSink<StreamOf<B>>>,
        remote_sink: Box<dyn VideoSink<StreamOf<B>>>,
    ) -> Self {
        Self {
            session,
            remote_input: RefCell::new(String::new()),
            local_sink,
            remote_sink,
            attached: RefCell::new((None, None)),
            last_controls: RefCell::new(None),
            on_render: RefCell::new(Callback::noop()),
        }
    }

    pub fn session(&self) -> &PeerSession<B, C> {
        &self.session
    }

    /// Called with the new controls whenever they change.
    pub fn set_on_render(&self, on_render: Callback<ControlState>) {
        *self.on_render.borrow_mut() = on_render;
    }

    pub fn set_remote_input(&self, text: &str) {
        *self.remote_input.borrow_mut() = text.to_string();
        self.render();
    }

    pub fn remote_input(&self) -> String {
        self.remote_input.borrow().clone()
    }

    /// Dials whoever is named in the remote id field.
    pub fn click_call(&self) {
        if !self.controls().call_enabled {
            debug!("call clicked while disabled");
            return;
        }
        let remote = self.remote_input();
        self.session.dial(&remote);
    }

    pub fn click_accept(&self) {
        self.session.accept();
    }

    pub fn click_decline(&self) {
        if self.controls().decline_visible {
            self.session.hang_up();
        }
    }

    pub fn click_end_call(&self) {
        self.session.hang_up();
    }

    pub fn click_mute(&self) {
        self.session.toggle_audio();
    }

    pub fn click_video(&self) {
        self.session.toggle_video();
    }

    pub fn click_new_call(&self) {
        self.session.reset();
    }

    /// Current control state, without touching the sinks.
    pub fn controls(&self) -> ControlState {
        let remote = self.remote_input.borrow();
        project(&self.session.snapshot(), &remote, now_ms()).controls
    }

    /// Re-projects the session: attaches or detaches streams whose identity
    /// changed and reports new controls.
    pub fn render(&self) -> ControlState {
        let model = {
            let remote = self.remote_input.borrow();
            project(&self.session.snapshot(), &remote, now_ms())
        };

        {
            let mut attached = self.attached.borrow_mut();
            let local_id = model.local_video.as_ref().map(|s| s.id());
            if attached.0 != local_id {
                self.local_sink.show(model.local_video.as_ref());
                attached.0 = local_id;
            }
            let remote_id = model.remote_video.as_ref().map(|s| s.id());
            if attached.1 != remote_id {
                self.remote_sink.show(model.remote_video.as_ref());
                attached.1 = remote_id;
            }
        }

        let changed = self.last_controls.borrow().as_ref() != Some(&model.controls);
        if changed {
            *self.last_controls.borrow_mut() = Some(model.controls.clone());
            let on_render = self.on_render.borrow().clone();
            on_render.emit(model.controls.clone());
        }
        model.controls
    }
}
