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

//! Platform abstraction layer.
//!
//! - **`now_ms()`**: current time in milliseconds since the Unix epoch
//! - **`Spawner`**: how the session starts its capture futures
//! - **`local_spawner()`**: the platform's single-threaded executor, when one is compiled in
//!
//! The session never spawns directly; it is handed a [`Spawner`] so tests can
//! drive every suspension point from a `futures::executor::LocalPool`.

use futures::future::LocalBoxFuture;
use peercall_types::Callback;

#[cfg(all(not(target_arch = "wasm32"), feature = "native"))]
mod native;
#[cfg(all(target_arch = "wasm32", feature = "wasm"))]
mod web;

#[cfg(all(not(target_arch = "wasm32"), feature = "native"))]
pub use native::*;
#[cfg(all(target_arch = "wasm32", feature = "wasm"))]
pub use web::*;

/// Starts a `!Send` future on the current thread's executor.
pub type Spawner = Callback<LocalBoxFuture<'static, ()>>;

/// Returns the current time in milliseconds since the Unix epoch.
///
/// `web_time` maps to `Date.now()` in the browser and `SystemTime` elsewhere.
pub fn now_ms() -> f64 {
    web_time::SystemTime::now()
        .duration_since(web_time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as f64
}
