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

//! Browser bindings: PeerJS as the broker, `getUserMedia` as the capture
//! subsystem and `<video>` elements as sinks.
//!
//! JS hosts only need [`WebCallApp`]; the pieces are public for Rust UIs that
//! bring their own rendering.

mod app;
mod broker;
mod media;
mod peerjs;
mod sink;

pub use app::WebCallApp;
pub use broker::{PeerJsBroker, PeerJsConnection};
pub use media::WebMediaCapture;
pub use sink::VideoElementSink;

/// Routes `log` output to the browser console and panics to `console.error`.
///
/// Safe to call more than once; only the first level sticks.
pub fn init_logging(level: log::Level) {
    console_error_panic_hook::set_once();
    if let Err(e) = console_log::init_with_level(level) {
        log::debug!("console logger already installed: {e}");
    }
}
