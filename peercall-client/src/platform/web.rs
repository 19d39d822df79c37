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

//! WASM (browser) platform primitives.

use super::Spawner;
use peercall_types::Callback;

/// Spawns onto the browser's microtask queue.
///
/// Wraps `wasm_bindgen_futures::spawn_local`; nothing needs to be `Send`
/// because WASM is single-threaded.
pub fn local_spawner() -> Spawner {
    Callback::from(|future| {
        wasm_bindgen_futures::spawn_local(future);
    })
}
