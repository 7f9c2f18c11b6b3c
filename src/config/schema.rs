//! Declarative configuration schema carried by a plugin registration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::validator::{ConfigValidator, ValueType};
use super::ConfigResult;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSchema {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub types: BTreeMap<String, ValueType>,
}

impl ConfigSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require(mut self, key: impl Into<String>) -> Self {
        self.required.push(key.into());
        self
    }

    pub fn field(mut self, key: impl Into<String>, value_type: ValueType) -> Self {
        self.types.insert(key.into(), value_type);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.required.is_empty() && self.types.is_empty()
    }

    pub fn validator(&self) -> ConfigValidator {
        self.types.iter().fold(
            ConfigValidator::new().require_many(self.required.iter().cloned()),
            |v, (key, ty)| v.expect_type(key.clone(), *ty),
        )
    }

    pub fn validate(&self, config: &Value) -> ConfigResult<()> {
        self.validator().validate(config)
    }
}
