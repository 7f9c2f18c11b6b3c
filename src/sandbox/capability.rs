//! Host capabilities a plugin may be granted.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Sleep and timeout helpers.
    Timers,
    /// Structured logging through the plugin logger.
    Logging,
    /// Read-only process metadata.
    Process,
    /// Sending and subscribing on the message bus.
    Messaging,
    /// Registering and executing hook chains.
    Hooks,
}

impl Capability {
    pub const ALL: [Capability; 5] = [
        Capability::Timers,
        Capability::Logging,
        Capability::Process,
        Capability::Messaging,
        Capability::Hooks,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Timers => "timers",
            Capability::Logging => "logging",
            Capability::Process => "process",
            Capability::Messaging => "messaging",
            Capability::Hooks => "hooks",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Capability::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown capability: {}", s))
    }
}
