//! Rule-based validation of JSON configuration objects.
//!
//! Keys may be dotted paths (`storage.ttl`) that descend into nested objects.
//! All rules run; every violation is collected into one error.

use std::fmt;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ConfigError, ConfigResult, ValidationErrors};

pub type ValidationFn = Box<dyn Fn(&Value) -> Result<(), String> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Number,
    Boolean,
    Array,
    Object,
}

impl ValueType {
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
        }
    }

    pub fn of(value: &Value) -> &'static str {
        match value {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        };
        f.write_str(name)
    }
}

enum Rule {
    Required,
    Type(ValueType),
    Range(RangeInclusive<i64>),
    Pattern(regex::Regex),
    Custom(ValidationFn),
}

impl Rule {
    fn check(&self, key: &str, value: Option<&Value>) -> Option<ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        match (self, value) {
            (Rule::Required, None) => Some(ConfigError::NotFound {
                key: key.to_string(),
            }),
            (_, None) | (Rule::Required, Some(_)) => None,
            (Rule::Type(expected), Some(v)) if !expected.matches(v) => Some(invalid(format!(
                "expected {}, got {}",
                expected,
                ValueType::of(v)
            ))),
            (Rule::Range(range), Some(v)) => match v.as_i64() {
                Some(n) if !range.contains(&n) => Some(invalid(format!(
                    "value {} not in range {}..={}",
                    n,
                    range.start(),
                    range.end()
                ))),
                _ => None,
            },
            (Rule::Pattern(pattern), Some(v)) => match v.as_str() {
                Some(s) if !pattern.is_match(s) => Some(invalid(format!(
                    "'{}' does not match {}",
                    s,
                    pattern.as_str()
                ))),
                _ => None,
            },
            (Rule::Custom(f), Some(v)) => f(v).err().map(invalid),
            _ => None,
        }
    }
}

/// Accumulates rules per key and checks a configuration object against them.
#[derive(Default)]
pub struct ConfigValidator {
    rules: Vec<(String, Rule)>,
}

impl ConfigValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require(mut self, key: impl Into<String>) -> Self {
        self.rules.push((key.into(), Rule::Required));
        self
    }

    pub fn require_many(mut self, keys: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.rules
            .extend(keys.into_iter().map(|k| (k.into(), Rule::Required)));
        self
    }

    pub fn expect_type(mut self, key: impl Into<String>, value_type: ValueType) -> Self {
        self.rules.push((key.into(), Rule::Type(value_type)));
        self
    }

    pub fn expect_range(mut self, key: impl Into<String>, range: RangeInclusive<i64>) -> Self {
        self.rules.push((key.into(), Rule::Range(range)));
        self
    }

    pub fn expect_pattern(mut self, key: impl Into<String>, pattern: &str) -> ConfigResult<Self> {
        let key = key.into();
        let regex = regex::Regex::new(pattern).map_err(|e| ConfigError::InvalidValue {
            key: key.clone(),
            message: format!("invalid pattern: {}", e),
        })?;
        self.rules.push((key, Rule::Pattern(regex)));
        Ok(self)
    }

    pub fn custom<F>(mut self, key: impl Into<String>, check: F) -> Self
    where
        F: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    {
        self.rules.push((key.into(), Rule::Custom(Box::new(check))));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn validate(&self, config: &Value) -> ConfigResult<()> {
        let errors = self.violations(config);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::ValidationErrors(ValidationErrors(errors)))
        }
    }

    /// Every violated rule, in the order the rules were added.
    pub fn violations(&self, config: &Value) -> Vec<ConfigError> {
        self.rules
            .iter()
            .filter_map(|(key, rule)| rule.check(key, lookup(config, key)))
            .collect()
    }
}

impl fmt::Debug for ConfigValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigValidator")
            .field("rules", &self.rules.len())
            .finish()
    }
}

/// Resolve a dotted key inside nested objects.
pub fn lookup<'a>(config: &'a Value, key: &str) -> Option<&'a Value> {
    key.split('.').try_fold(config, |current, part| current.get(part))
}
