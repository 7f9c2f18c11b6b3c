//! Per-registration lifecycle state.

use std::fmt;

use serde::{Deserialize, Serialize};

/// `Registered` is the initial state. Activation moves through `Activating`
/// to `Activated`; deactivation through `Deactivating` to `Inactive`, from
/// which the plugin may be activated again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginState {
    Registered,
    Activating,
    Activated,
    Deactivating,
    Inactive,
}

impl PluginState {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Activated)
    }

    /// Whether an activation may start from this state.
    pub fn can_activate(&self) -> bool {
        matches!(self, Self::Registered | Self::Inactive)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registered => "registered",
            Self::Activating => "activating",
            Self::Activated => "activated",
            Self::Deactivating => "deactivating",
            Self::Inactive => "inactive",
        }
    }
}

impl fmt::Display for PluginState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_predicates() {
        assert!(PluginState::Registered.can_activate());
        assert!(PluginState::Inactive.can_activate());
        assert!(!PluginState::Activating.can_activate());
        assert!(PluginState::Activated.is_active());
        assert_eq!(PluginState::Deactivating.to_string(), "deactivating");
        assert_eq!(
            serde_json::to_string(&PluginState::Inactive).unwrap(),
            "\"inactive\""
        );
    }
}
