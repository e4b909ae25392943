//! Free-form pass-through flag values.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Free-form flags forwarded verbatim to the external tool, keyed by flag
/// name.
///
/// Iteration follows the sorted key order; the argument derivation engine
/// relies on this for deterministic output.
pub type OtherFlags = BTreeMap<String, FlagValue>;

/// A single free-form flag value: a scalar or a list of strings.
///
/// A boolean `true` is either a bare flag or, for a few well-known names
/// (`path`, `tag`, `host`), a sentinel meaning "derive the value
/// automatically" which the resolution pass substitutes later.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Single(String),
    List(Vec<String>),
}

impl FlagValue {
    /// True only for the literal boolean `true`.
    pub fn is_true(&self) -> bool {
        matches!(self, FlagValue::Bool(true))
    }

    /// The string values carried by this flag, in order. Booleans carry
    /// none.
    pub fn values(&self) -> Vec<String> {
        match self {
            FlagValue::Bool(_) => Vec::new(),
            FlagValue::Int(value) => vec![value.to_string()],
            FlagValue::Float(value) => vec![value.to_string()],
            FlagValue::Single(value) => vec![value.clone()],
            FlagValue::List(values) => values.clone(),
        }
    }
}

impl From<bool> for FlagValue {
    fn from(value: bool) -> Self {
        FlagValue::Bool(value)
    }
}

impl From<i64> for FlagValue {
    fn from(value: i64) -> Self {
        FlagValue::Int(value)
    }
}

impl From<&str> for FlagValue {
    fn from(value: &str) -> Self {
        FlagValue::Single(value.to_string())
    }
}

impl From<Vec<String>> for FlagValue {
    fn from(values: Vec<String>) -> Self {
        FlagValue::List(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_untagged_scalars_and_lists() {
        let value: FlagValue = serde_json::from_value(serde_json::json!(true)).unwrap();
        assert_eq!(value, FlagValue::Bool(true));
        let value: FlagValue = serde_json::from_value(serde_json::json!(7)).unwrap();
        assert_eq!(value, FlagValue::Int(7));
        let value: FlagValue = serde_json::from_value(serde_json::json!(1.5)).unwrap();
        assert_eq!(value, FlagValue::Float(1.5));
        let value: FlagValue = serde_json::from_value(serde_json::json!("weekly")).unwrap();
        assert_eq!(value, FlagValue::Single("weekly".to_string()));
        let value: FlagValue = serde_json::from_value(serde_json::json!(["a", "b"])).unwrap();
        assert_eq!(value, FlagValue::List(vec!["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn values_stringify_scalars() {
        assert!(FlagValue::Bool(true).values().is_empty());
        assert_eq!(FlagValue::Int(30).values(), vec!["30".to_string()]);
        assert_eq!(
            FlagValue::Single("daily".to_string()).values(),
            vec!["daily".to_string()]
        );
    }

    #[test]
    fn other_flags_iterate_in_sorted_key_order() {
        let mut flags = OtherFlags::new();
        flags.insert("tag".to_string(), FlagValue::from("prod"));
        flags.insert("exclude-caches".to_string(), FlagValue::from(true));
        let keys: Vec<&str> = flags.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["exclude-caches", "tag"]);
    }
}
