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

//! Native platform primitives.
//!
//! Session handles are `Rc`-based, so capture futures run on a tokio
//! `LocalSet` rather than the multi-threaded scheduler.

use super::Spawner;
use peercall_types::Callback;

/// Spawns onto the tokio `LocalSet` that is current when the future is started.
///
/// **Important:** every session operation that may start a capture must run
/// inside `LocalSet::run_until` (or `block_on`), otherwise tokio panics.
pub fn local_spawner() -> Spawner {
    Callback::from(|future| {
        tokio::task::spawn_local(future);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::cell::Cell;
    use std::rc::Rc;

    #[tokio::test]
    async fn local_spawner_runs_non_send_futures() {
        let flag = Rc::new(Cell::new(false));
        let local = tokio::task::LocalSet::new();
        let seen = flag.clone();
        local
            .run_until(async move {
                local_spawner().emit(async move { seen.set(true) }.boxed_local());
                tokio::task::yield_now().await;
            })
            .await;
        local.await;
        assert!(flag.get(), "spawned future should have run");
    }
}
