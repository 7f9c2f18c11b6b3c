//! Sandbox configuration.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::Capability;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SandboxConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Host-wide allow-list. A plugin receives the intersection of this set
    /// and the permissions it declares.
    #[serde(default = "default_allowed")]
    pub allowed: BTreeSet<Capability>,
}

fn default_allowed() -> BTreeSet<Capability> {
    Capability::ALL.into_iter().collect()
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            allowed: default_allowed(),
        }
    }
}

impl SandboxConfig {
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }

    pub fn allow_only(mut self, capabilities: impl IntoIterator<Item = Capability>) -> Self {
        self.allowed = capabilities.into_iter().collect();
        self
    }

    pub fn allows(&self, capability: Capability) -> bool {
        self.allowed.contains(&capability)
    }
}
