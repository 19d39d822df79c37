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

//! Client configuration.
//!
//! There are no environment variables and nothing is persisted; the host page
//! (or a native caller) builds a [`ClientConfig`] and hands it to the session.
//! In the browser the config arrives as a plain JS object.

use std::str::FromStr;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// What to ask the capture subsystem for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConstraints {
    pub audio: bool,
    pub video: bool,
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self {
            audio: true,
            video: true,
        }
    }
}

/// Options forwarded to the PeerJS `Peer` constructor.
///
/// Every field is optional; unset fields fall back to the PeerJS cloud
/// signalling server defaults.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BrokerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// PeerJS log verbosity, 0 (none) to 3 (all).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<u8>,
}

/// Top-level configuration of a call client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientConfig {
    pub media: MediaConstraints,
    pub broker: BrokerConfig,
    /// Minimum level written to the browser console.
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            media: MediaConstraints::default(),
            broker: BrokerConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl ClientConfig {
    /// Parses a JSON document, filling in defaults for anything missing.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.media.audio && !self.media.video {
            return Err(anyhow!("at least one of audio or video must be requested"));
        }
        if let Some(debug) = self.broker.debug {
            if debug > 3 {
                return Err(anyhow!("broker debug level must be 0..=3, got {debug}"));
            }
        }
        self.level()?;
        Ok(())
    }

    pub fn level(&self) -> Result<log::Level> {
        log::Level::from_str(&self.log_level)
            .map_err(|_| anyhow!("unknown log level {:?}", self.log_level))
    }
}
