// Copyright (c) SimpleStaking and Tezedge Contributors
// SPDX-License-Identifier: MIT

use serde::Deserialize;
use std::path::Path;

/// What to do with a direction whose contact exchange was never
/// captured. The leading byte of a legacy data segment can alias a
/// transport-security record type, so the order of checks is left to
/// the operator.
#[derive(Deserialize, Clone, Copy, Debug, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryMode {
    Disabled,
    V3First,
    V4First,
    V3Only,
    V4Only,
}

impl Default for RecoveryMode {
    fn default() -> Self {
        RecoveryMode::Disabled
    }
}

/// Dissection preferences, loaded by the host and consumed here
/// as plain values.
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct Preferences {
    #[serde(default)]
    pub recovery: RecoveryMode,
    /// Switches off transfer bookkeeping and negotiation tracking,
    /// message framing alone remains.
    #[serde(default = "enabled")]
    pub analyze_sequence: bool,
    #[serde(default = "enabled")]
    pub reassemble: bool,
}

fn enabled() -> bool {
    true
}

impl Default for Preferences {
    fn default() -> Self {
        Preferences {
            recovery: RecoveryMode::default(),
            analyze_sequence: true,
            reassemble: true,
        }
    }
}

impl Preferences {
    /// Read and deserialize the preferences from a json file using serde.
    pub fn from_path<P>(path: P) -> Result<Self, failure::Error>
    where
        P: AsRef<Path>,
    {
        let content = std::fs::read_to_string(path.as_ref())?;
        serde_json::from_str(&content).map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::{Preferences, RecoveryMode};

    #[test]
    fn defaults_are_conservative() {
        let p = Preferences::default();
        assert_eq!(p.recovery, RecoveryMode::Disabled);
        assert!(p.analyze_sequence);
        assert!(p.reassemble);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let p: Preferences = serde_json::from_str(r#"{"recovery": "v4_first"}"#).unwrap();
        assert_eq!(p.recovery, RecoveryMode::V4First);
        assert!(p.reassemble);
    }
}
