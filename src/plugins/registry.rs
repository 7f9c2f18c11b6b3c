//! In-memory catalog of plugin registrations keyed by name.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use dashmap::DashMap;

use super::{BoxFactory, PluginError, PluginOptions, PluginRegistration, RegisterOutcome};
use crate::lifecycle::PluginState;

struct Entry {
    registration: PluginRegistration,
    factory: BoxFactory,
    seq: u64,
}

#[derive(Default)]
pub struct PluginRegistry {
    entries: DashMap<String, Entry>,
    seq: AtomicU64,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or overwrite a registration.
    ///
    /// Overwriting keeps the runtime fields (state, activation count,
    /// timestamps) of the previous record and replaces everything else.
    pub fn register(
        &self,
        name: &str,
        factory: BoxFactory,
        options: PluginOptions,
    ) -> Result<RegisterOutcome, PluginError> {
        validate(name, &options)?;
        let mut registration = PluginRegistration::new(name, options);

        match self.entries.get_mut(name) {
            Some(mut existing) => {
                let previous = &existing.registration;
                let previous_version = previous.version.clone();
                registration.state = previous.state;
                registration.activated = previous.activated;
                registration.activation_count = previous.activation_count;
                registration.registered_at = previous.registered_at;
                registration.last_activated_at = previous.last_activated_at;
                registration.last_deactivated_at = previous.last_deactivated_at;

                tracing::warn!(
                    plugin = %name,
                    previous_version = %previous_version,
                    version = %registration.version,
                    "Duplicate registration, overwriting"
                );
                existing.registration = registration;
                existing.factory = factory;
                Ok(RegisterOutcome::Replaced { previous_version })
            }
            None => {
                tracing::debug!(plugin = %name, version = %registration.version, "Plugin registered");
                let seq = self.seq.fetch_add(1, Ordering::Relaxed);
                self.entries.insert(
                    name.to_string(),
                    Entry {
                        registration,
                        factory,
                        seq,
                    },
                );
                Ok(RegisterOutcome::Registered)
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get_info(&self, name: &str) -> Option<PluginRegistration> {
        self.entries.get(name).map(|e| e.registration.clone())
    }

    /// Snapshots of every registration, in registration order.
    pub fn list_all(&self) -> Vec<PluginRegistration> {
        let mut all: Vec<(u64, PluginRegistration)> = self
            .entries
            .iter()
            .map(|e| (e.seq, e.registration.clone()))
            .collect();
        all.sort_by_key(|(seq, _)| *seq);
        all.into_iter().map(|(_, r)| r).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.list_all().into_iter().map(|r| r.name).collect()
    }

    pub fn factory(&self, name: &str) -> Option<BoxFactory> {
        self.entries.get(name).map(|e| e.factory.clone())
    }

    pub fn state(&self, name: &str) -> Option<PluginState> {
        self.entries.get(name).map(|e| e.registration.state)
    }

    /// Required dependency edges of every registration.
    pub fn dependency_graph(&self) -> HashMap<String, Vec<String>> {
        self.entries
            .iter()
            .map(|e| (e.key().clone(), e.registration.dependencies.clone()))
            .collect()
    }

    pub fn set_state(&self, name: &str, state: PluginState) -> bool {
        self.update(name, |r| {
            r.state = state;
            r.activated = state == PluginState::Activated;
        })
    }

    pub fn mark_activated(&self, name: &str) -> bool {
        self.update(name, |r| {
            r.state = PluginState::Activated;
            r.activated = true;
            r.activation_count += 1;
            r.last_activated_at = Some(Utc::now());
        })
    }

    pub fn mark_deactivated(&self, name: &str) -> bool {
        self.update(name, |r| {
            r.state = PluginState::Inactive;
            r.activated = false;
            r.last_deactivated_at = Some(Utc::now());
        })
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    fn update(&self, name: &str, f: impl FnOnce(&mut PluginRegistration)) -> bool {
        match self.entries.get_mut(name) {
            Some(mut entry) => {
                f(&mut entry.registration);
                true
            }
            None => false,
        }
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugins", &self.names())
            .finish()
    }
}

fn validate(name: &str, options: &PluginOptions) -> Result<(), PluginError> {
    let invalid = |reason: String| {
        Err(PluginError::InvalidPlugin {
            name: name.to_string(),
            reason,
        })
    };

    if name.is_empty() {
        return invalid("name must not be empty".into());
    }
    if name.contains(':') || name.chars().any(char::is_whitespace) {
        return invalid("name must not contain ':' or whitespace".into());
    }
    if options.dependencies.iter().any(|d| d == name)
        || options.optional_dependencies.iter().any(|d| d == name)
    {
        return invalid("a plugin cannot depend on itself".into());
    }
    if let Some(both) = options
        .dependencies
        .iter()
        .find(|d| options.optional_dependencies.contains(d))
    {
        return invalid(format!("'{}' is both a required and an optional dependency", both));
    }
    Ok(())
}
