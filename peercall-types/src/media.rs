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

use std::fmt;

use serde::{Deserialize, Serialize};

/// The two kinds of track a local capture yields.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MediaKind::Audio => write!(f, "audio"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

/// Local mute state of the stream being sent.
///
/// Both flags are false whenever a fresh local stream is acquired and they
/// survive the move into `Active`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleFlags {
    pub audio_muted: bool,
    pub video_stopped: bool,
}

impl ToggleFlags {
    /// Returns true when the given kind is switched off.
    pub fn is_off(&self, kind: MediaKind) -> bool {
        match kind {
            MediaKind::Audio => self.audio_muted,
            MediaKind::Video => self.video_stopped,
        }
    }

    pub fn set_off(&mut self, kind: MediaKind, off: bool) {
        match kind {
            MediaKind::Audio => self.audio_muted = off,
            MediaKind::Video => self.video_stopped = off,
        }
    }
}
