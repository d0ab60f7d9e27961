//! Workflow State
//!
//! The record threaded through a single run. Steps never mutate a state
//! they were handed; they return a new one, so every transition can be
//! logged and replayed.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StepError;

/// String-keyed state record passed between steps.
///
/// The executor never looks inside; only steps and routers do.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(transparent)]
pub struct WorkflowState {
    values: BTreeMap<String, Value>,
}

impl WorkflowState {
    /// Creates a new empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of this state with `key` set to `value`.
    ///
    /// # Example
    ///
    /// ```
    /// use gatedflow::workflow::WorkflowState;
    ///
    /// let state = WorkflowState::new().with("approved", true);
    /// assert_eq!(state.get_bool("approved"), Some(true));
    /// ```
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Gets the raw value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Gets a boolean value; `None` if missing or not a bool.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.values.get(key).and_then(Value::as_bool)
    }

    /// Gets a string value; `None` if missing or not a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    /// Gets an unsigned integer value; `None` if missing or not a number.
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.values.get(key).and_then(Value::as_u64)
    }

    /// Gets a value a step cannot proceed without.
    pub fn require(&self, key: &str) -> Result<&Value, StepError> {
        self.values
            .get(key)
            .ok_or_else(|| StepError::invalid_state(key, "missing"))
    }

    /// Gets a string a step cannot proceed without.
    pub fn require_str(&self, key: &str) -> Result<&str, StepError> {
        self.require(key)?
            .as_str()
            .ok_or_else(|| StepError::invalid_state(key, "expected a string"))
    }

    /// Returns true if `key` is present.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Iterates over the keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the state has no entries.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Renders the state as pretty-printed JSON.
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(&self.values).unwrap_or_else(|_| format!("{:?}", self.values))
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<&str> = self.keys().collect();
        write!(f, "{{{}}}", keys.join(", "))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for WorkflowState {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_state_creation() {
        let state = WorkflowState::new();
        assert!(state.is_empty());
        assert_eq!(state.len(), 0);
    }

    #[test]
    fn test_with_returns_new_state() {
        let original = WorkflowState::new().with("count", 1);
        let updated = original.clone().with("count", 2);

        assert_eq!(original.get_u64("count"), Some(1));
        assert_eq!(updated.get_u64("count"), Some(2));
    }

    #[test]
    fn test_typed_getters() {
        let state = WorkflowState::new()
            .with("flag", true)
            .with("name", "webapp")
            .with("plan", json!({"creates": []}));

        assert_eq!(state.get_bool("flag"), Some(true));
        assert_eq!(state.get_str("name"), Some("webapp"));
        assert_eq!(state.get_bool("name"), None);
        assert!(state.get("plan").unwrap().is_object());
        assert!(state.get("missing").is_none());
    }

    #[test]
    fn test_require_missing_key() {
        let state = WorkflowState::new();
        let err = state.require("plan").unwrap_err();
        assert!(err.to_string().contains("plan"));
    }

    #[test]
    fn test_require_str_wrong_type() {
        let state = WorkflowState::new().with("project", 3);
        assert!(state.require_str("project").is_err());
    }

    #[test]
    fn test_keys_sorted() {
        let state = WorkflowState::new().with("b", 1).with("a", 2);
        let keys: Vec<&str> = state.keys().collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(state.to_string(), "{a, b}");
    }

    #[test]
    fn test_from_iterator() {
        let state: WorkflowState = vec![("x", json!(1)), ("y", json!("z"))].into_iter().collect();
        assert_eq!(state.len(), 2);
        assert_eq!(state.get_str("y"), Some("z"));
    }

    #[test]
    fn test_serializes_as_plain_map() {
        let state = WorkflowState::new().with("approved", false);
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json, json!({"approved": false}));
    }
}
