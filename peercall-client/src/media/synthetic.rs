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

//! In-memory media for native runs and tests.
//!
//! Synthetic tracks behave like browser tracks as far as the session can
//! tell: they carry an `enabled` flag, stop exactly once, and count how often
//! they were asked to stop so tests can prove nothing is released twice.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use futures::channel::oneshot;
use futures::future::LocalBoxFuture;
use futures::FutureExt;
use peercall_types::{CallError, MediaKind};
use uuid::Uuid;

use super::{MediaCapture, MediaStream, MediaTrack};
use crate::config::MediaConstraints;

struct TrackState {
    id: String,
    kind: MediaKind,
    enabled: Cell<bool>,
    stopped: Cell<bool>,
    stop_requests: Cell<u32>,
}

#[derive(Clone)]
pub struct SyntheticTrack {
    state: Rc<TrackState>,
}

impl SyntheticTrack {
    pub fn new(kind: MediaKind) -> Self {
        Self {
            state: Rc::new(TrackState {
                id: Uuid::new_v4().to_string(),
                kind,
                enabled: Cell::new(true),
                stopped: Cell::new(false),
                stop_requests: Cell::new(0),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.state.id
    }

    /// How many times `stop` was called, including no-op repeats.
    pub fn stop_requests(&self) -> u32 {
        self.state.stop_requests.get()
    }

    /// How many `stop` calls actually ended the track (0 or 1).
    pub fn stops_applied(&self) -> u32 {
        u32::from(self.state.stopped.get())
    }
}

impl fmt::Debug for SyntheticTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyntheticTrack")
            .field("id", &self.state.id)
            .field("kind", &self.state.kind)
            .field("enabled", &self.state.enabled.get())
            .field("stopped", &self.state.stopped.get())
            .finish()
    }
}

impl MediaTrack for SyntheticTrack {
    fn kind(&self) -> Option<MediaKind> {
        Some(self.state.kind)
    }

    fn is_enabled(&self) -> bool {
        self.state.enabled.get()
    }

    fn set_enabled(&self, enabled: bool) {
        self.state.enabled.set(enabled);
    }

    fn stop(&self) {
        self.state
            .stop_requests
            .set(self.state.stop_requests.get() + 1);
        self.state.stopped.set(true);
    }

    fn is_stopped(&self) -> bool {
        self.state.stopped.get()
    }
}

#[derive(Clone, Debug)]
pub struct SyntheticStream {
    id: String,
    tracks: Rc<Vec<SyntheticTrack>>,
}

impl SyntheticStream {
    pub fn new(audio: usize, video: usize) -> Self {
        let tracks = std::iter::repeat_with(|| SyntheticTrack::new(MediaKind::Audio))
            .take(audio)
            .chain(std::iter::repeat_with(|| SyntheticTrack::new(MediaKind::Video)).take(video))
            .collect();
        Self {
            id: Uuid::new_v4().to_string(),
            tracks: Rc::new(tracks),
        }
    }

    /// One microphone track and one camera track.
    pub fn camera() -> Self {
        Self::new(1, 1)
    }

    /// A new stream with the same track layout, as the far end of a peer
    /// connection would see it.
    pub fn mirror(&self) -> Self {
        let count = |kind| self.tracks.iter().filter(|t| t.state.kind == kind).count();
        Self::new(count(MediaKind::Audio), count(MediaKind::Video))
    }

    pub fn all_stopped(&self) -> bool {
        self.tracks.iter().all(|track| track.is_stopped())
    }
}

impl PartialEq for SyntheticStream {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl MediaStream for SyntheticStream {
    type Track = SyntheticTrack;

    fn id(&self) -> String {
        self.id.clone()
    }

    fn tracks(&self) -> Vec<SyntheticTrack> {
        self.tracks.as_ref().clone()
    }
}

#[derive(Default)]
struct CaptureState {
    denial: Option<String>,
    held: bool,
    waiting: VecDeque<oneshot::Sender<()>>,
    acquired: Vec<SyntheticStream>,
    requests: u32,
}

/// Capture that grants (or denies) synthetic camera streams.
///
/// Clones share state, so a test can keep one handle while the session owns
/// another.
#[derive(Clone, Default)]
pub struct SyntheticCapture {
    state: Rc<RefCell<CaptureState>>,
}

impl SyntheticCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following request fail with `reason`.
    pub fn deny(&self, reason: &str) {
        self.state.borrow_mut().denial = Some(reason.to_string());
    }

    pub fn grant(&self) {
        self.state.borrow_mut().denial = None;
    }

    /// Keeps following requests pending until [`resume`](Self::resume).
    pub fn hold(&self) {
        self.state.borrow_mut().held = true;
    }

    /// Lets every held request complete and stops holding new ones.
    pub fn resume(&self) {
        let waiting: Vec<_> = {
            let mut state = self.state.borrow_mut();
            state.held = false;
            state.waiting.drain(..).collect()
        };
        for gate in waiting {
            let _ = gate.send(());
        }
    }

    /// Every stream handed out so far, oldest first.
    pub fn acquired(&self) -> Vec<SyntheticStream> {
        self.state.borrow().acquired.clone()
    }

    pub fn requests(&self) -> u32 {
        self.state.borrow().requests
    }
}

impl MediaCapture for SyntheticCapture {
    type Stream = SyntheticStream;

    fn get_user_media(
        &self,
        constraints: &MediaConstraints,
    ) -> LocalBoxFuture<'static, Result<SyntheticStream, CallError>> {
        let gate = {
            let mut state = self.state.borrow_mut();
            state.requests += 1;
            if state.held {
                let (tx, rx) = oneshot::channel();
                state.waiting.push_back(tx);
                Some(rx)
            } else {
                None
            }
        };
        let state = Rc::clone(&self.state);
        let constraints = *constraints;
        async move {
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            let mut state = state.borrow_mut();
            if let Some(reason) = &state.denial {
                return Err(CallError::CaptureDenied(reason.clone()));
            }
            let stream = SyntheticStream::new(
                usize::from(constraints.audio),
                usize::from(constraints.video),
            );
            state.acquired.push(stream.clone());
            Ok(stream)
        }
        .boxed_local()
    }
}
