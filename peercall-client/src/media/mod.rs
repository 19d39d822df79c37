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

//! Media Gateway: local capture, per-kind mute and release.
//!
//! The gateway never caches anything. Every [`MediaGateway::acquire`] asks the
//! capture subsystem for a fresh stream, and the caller owns the result until it
//! hands it back to [`MediaGateway::release`].

pub mod synthetic;

use std::fmt;

use futures::future::LocalBoxFuture;
use futures::FutureExt;
use log::{debug, info, warn};
use peercall_types::{CallError, MediaKind};

use crate::config::MediaConstraints;

/// A single audio or video track.
///
/// Handles are cheap clones of the same underlying track.
pub trait MediaTrack: Clone + 'static {
    /// `None` for kinds the session does not manage.
    fn kind(&self) -> Option<MediaKind>;
    fn is_enabled(&self) -> bool;
    fn set_enabled(&self, enabled: bool);
    /// Permanently ends the track. Calling it again has no effect.
    fn stop(&self);
    fn is_stopped(&self) -> bool;
}

/// A bundle of zero or more audio and video tracks.
pub trait MediaStream: Clone + fmt::Debug + 'static {
    type Track: MediaTrack;

    fn id(&self) -> String;
    fn tracks(&self) -> Vec<Self::Track>;

    fn tracks_of(&self, kind: MediaKind) -> Vec<Self::Track> {
        self.tracks()
            .into_iter()
            .filter(|track| track.kind() == Some(kind))
            .collect()
    }
}

/// The capture subsystem (`getUserMedia` in the browser).
pub trait MediaCapture: 'static {
    type Stream: MediaStream;

    /// Requests a new stream. Refusal or a missing device resolves to
    /// [`CallError::CaptureDenied`].
    fn get_user_media(
        &self,
        constraints: &MediaConstraints,
    ) -> LocalBoxFuture<'static, Result<Self::Stream, CallError>>;
}

pub struct MediaGateway<C> {
    capture: C,
    constraints: MediaConstraints,
}

impl<C: MediaCapture> MediaGateway<C> {
    pub fn new(capture: C, constraints: MediaConstraints) -> Self {
        Self {
            capture,
            constraints,
        }
    }

    pub fn capture(&self) -> &C {
        &self.capture
    }

    /// Starts a capture request. The returned future is independent of the
    /// gateway and may outlive it.
    pub fn acquire(&self) -> LocalBoxFuture<'static, Result<C::Stream, CallError>> {
        let constraints = self.constraints;
        debug!("requesting local media: {constraints:?}");
        self.capture
            .get_user_media(&constraints)
            .map(move |result| {
                match &result {
                    Ok(stream) => info!(
                        "acquired local stream {} ({} tracks)",
                        stream.id(),
                        stream.tracks().len()
                    ),
                    Err(e) => warn!("local media request failed: {e}"),
                }
                result
            })
            .boxed_local()
    }

    /// Flips every track of `kind` in `stream` and returns the new `enabled`
    /// value for that kind.
    ///
    /// All tracks of the kind end up in lockstep: if they had diverged, the
    /// majority decides which way the flip goes (ties count as enabled).
    /// Returns `None` when the stream has no track of that kind.
    pub fn toggle_kind<S: MediaStream>(stream: &S, kind: MediaKind) -> Option<bool> {
        let tracks = stream.tracks_of(kind);
        if tracks.is_empty() {
            return None;
        }
        let enabled = tracks.iter().filter(|track| track.is_enabled()).count();
        let target = enabled * 2 < tracks.len();
        for track in &tracks {
            track.set_enabled(target);
        }
        debug!(
            "{kind} on stream {} is now {}",
            stream.id(),
            if target { "enabled" } else { "disabled" }
        );
        Some(target)
    }

    /// Stops every track of `stream`. Safe to call on an already released stream.
    pub fn release<S: MediaStream>(stream: &S) {
        let tracks = stream.tracks();
        let live = tracks.iter().filter(|track| !track.is_stopped()).count();
        for track in &tracks {
            track.stop();
        }
        if live > 0 {
            debug!("released stream {} ({live} live tracks stopped)", stream.id());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::synthetic::{SyntheticCapture, SyntheticStream};
    use super::*;
    use futures::executor::block_on;

    type Gateway = MediaGateway<SyntheticCapture>;

    #[test]
    fn acquire_yields_a_fresh_stream_each_time() {
        let gateway = Gateway::new(SyntheticCapture::new(), MediaConstraints::default());
        let first = block_on(gateway.acquire()).unwrap();
        let second = block_on(gateway.acquire()).unwrap();
        assert_ne!(first.id(), second.id());
        assert_eq!(first.tracks_of(MediaKind::Audio).len(), 1);
        assert_eq!(first.tracks_of(MediaKind::Video).len(), 1);
    }

    #[test]
    fn acquire_honours_constraints() {
        let gateway = Gateway::new(
            SyntheticCapture::new(),
            MediaConstraints {
                audio: true,
                video: false,
            },
        );
        let stream = block_on(gateway.acquire()).unwrap();
        assert!(stream.tracks_of(MediaKind::Video).is_empty());
    }

    #[test]
    fn acquire_reports_denial() {
        let capture = SyntheticCapture::new();
        capture.deny("NotAllowedError: Permission denied");
        let gateway = Gateway::new(capture, MediaConstraints::default());
        let err = block_on(gateway.acquire()).unwrap_err();
        assert!(matches!(err, CallError::CaptureDenied(_)));
    }

    #[test]
    fn toggle_kind_flips_only_the_requested_kind() {
        let stream = SyntheticStream::new(1, 1);
        assert_eq!(Gateway::toggle_kind(&stream, MediaKind::Audio), Some(false));
        assert!(!stream.tracks_of(MediaKind::Audio)[0].is_enabled());
        assert!(stream.tracks_of(MediaKind::Video)[0].is_enabled());
        assert_eq!(Gateway::toggle_kind(&stream, MediaKind::Audio), Some(true));
        assert!(stream.tracks_of(MediaKind::Audio)[0].is_enabled());
    }

    #[test]
    fn toggle_kind_resyncs_diverged_tracks_by_majority() {
        let stream = SyntheticStream::new(3, 0);
        let audio = stream.tracks_of(MediaKind::Audio);
        audio[2].set_enabled(false);

        // Two of three enabled: the kind counts as on, so everything turns off.
        assert_eq!(Gateway::toggle_kind(&stream, MediaKind::Audio), Some(false));
        assert!(audio.iter().all(|track| !track.is_enabled()));
    }

    #[test]
    fn toggle_kind_without_tracks_reports_none() {
        let stream = SyntheticStream::new(1, 0);
        assert_eq!(Gateway::toggle_kind(&stream, MediaKind::Video), None);
    }

    #[test]
    fn release_is_idempotent() {
        let stream = SyntheticStream::new(1, 1);
        Gateway::release(&stream);
        Gateway::release(&stream);
        assert!(stream.tracks().iter().all(|track| track.is_stopped()));
        assert!(stream.tracks().iter().all(|track| track.stops_applied() == 1));
    }
}
