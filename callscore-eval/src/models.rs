//! Persona KPI configuration
//!
//! A persona's KPI list is stored next to its prompt as
//! `<persona>__config.json`, in one of two shapes:
//! - a JSON array of KPI names (`["greeting", "closing"]`)
//! - a JSON object of KPI name to display description
//!   (`{"greeting": "Agent greeted the caller"}`)
//!
//! Both shapes are read; edits preserve whichever shape the file already had.

use callscore_common::{Error, Result};
use serde_json::{Map, Value};

/// KPI configuration of one persona
#[derive(Debug, Clone, PartialEq)]
pub enum KpiConfig {
    /// Ordered KPI names
    List(Vec<String>),
    /// KPI name to description, in insertion order
    Described(Map<String, Value>),
}

impl Default for KpiConfig {
    fn default() -> Self {
        KpiConfig::List(Vec::new())
    }
}

impl KpiConfig {
    /// Parse a stored config value
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(name) => Ok(name),
                    other => Err(Error::InvalidInput(format!(
                        "KPI names must be strings, got {}",
                        other
                    ))),
                })
                .collect::<Result<Vec<_>>>()
                .map(KpiConfig::List),
            Value::Object(fields) => Ok(KpiConfig::Described(fields)),
            other => Err(Error::InvalidInput(format!(
                "KPI config must be an array or an object, got {}",
                other
            ))),
        }
    }

    /// Value to store
    pub fn to_value(&self) -> Value {
        match self {
            KpiConfig::List(names) => Value::from(names.clone()),
            KpiConfig::Described(fields) => Value::Object(fields.clone()),
        }
    }

    /// KPI names in configured order
    pub fn names(&self) -> Vec<String> {
        match self {
            KpiConfig::List(names) => names.clone(),
            KpiConfig::Described(fields) => fields.keys().cloned().collect(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        match self {
            KpiConfig::List(names) => names.iter().any(|n| n == name),
            KpiConfig::Described(fields) => fields.contains_key(name),
        }
    }

    /// Add a KPI; returns false if it was already present
    pub fn add(&mut self, name: &str) -> bool {
        if self.contains(name) {
            return false;
        }
        match self {
            KpiConfig::List(names) => names.push(name.to_string()),
            KpiConfig::Described(fields) => {
                fields.insert(name.to_string(), Value::String(String::new()));
            }
        }
        true
    }

    /// Remove a KPI; returns false if it was not present
    pub fn remove(&mut self, name: &str) -> bool {
        match self {
            KpiConfig::List(names) => {
                let before = names.len();
                names.retain(|n| n != name);
                names.len() != before
            }
            KpiConfig::Described(fields) => fields.shift_remove(name).is_some(),
        }
    }
}
