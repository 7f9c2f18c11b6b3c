//! Sandbox error types.

use thiserror::Error;

use super::Capability;

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("plugin '{plugin}' was not granted the {capability} capability")]
    CapabilityDenied {
        plugin: String,
        capability: Capability,
    },

    #[error("failed to construct plugin '{plugin}': {reason}")]
    Construction { plugin: String, reason: String },
}

pub type SandboxResult<T> = Result<T, SandboxError>;
