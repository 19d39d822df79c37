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

//! Value types shared between the peercall client core and its front-ends.
//!
//! Nothing in this crate touches the browser; it can be used from native code,
//! from tests, and from any UI framework that renders a call.

pub mod callback;
pub mod error;
pub mod identity;
pub mod media;
pub mod phase;

pub use callback::Callback;
pub use error::CallError;
pub use identity::{LocalIdentity, RemoteIdentity};
pub use media::{MediaKind, ToggleFlags};
pub use phase::CallPhase;
