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

use serde::Serialize;

use crate::error::CallError;

/// The identifier the broker assigned to this process.
///
/// Created once when the broker opens and never changed afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct LocalIdentity(String);

impl LocalIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocalIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The identifier of the peer to dial, as typed by the user.
///
/// The only validation is that it is not blank; surrounding whitespace from
/// the text field is dropped.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RemoteIdentity(String);

impl RemoteIdentity {
    pub fn parse(input: &str) -> Result<Self, CallError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(CallError::InvalidRemoteIdentity);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RemoteIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_identity_rejects_blank_input() {
        assert_eq!(RemoteIdentity::parse(""), Err(CallError::InvalidRemoteIdentity));
        assert_eq!(RemoteIdentity::parse("   \t"), Err(CallError::InvalidRemoteIdentity));
    }

    #[test]
    fn remote_identity_keeps_opaque_content() {
        let id = RemoteIdentity::parse("  3f2a-Peer_B ").unwrap();
        assert_eq!(id.as_str(), "3f2a-Peer_B");
        assert_eq!(id.to_string(), "3f2a-Peer_B");
    }

    #[test]
    fn local_identity_serializes_as_plain_string() {
        let json = serde_json::to_string(&LocalIdentity::new("A")).unwrap();
        assert_eq!(json, "\"A\"");
    }
}
