use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::AppError;

/// Integer-or-float scalar for fields whose numeric type depends on the metric.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Scalar {
    Int(i64),
    Float(f64),
}

/// A typed group of metrics that flattens into top-level report keys.
pub trait MetricGroup: Serialize {
    /// Group name, used in collision errors.
    const NAME: &'static str;

    fn to_entries(&self) -> Result<Map<String, Value>, AppError> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(AppError::new(
                "METRICS_SERIALIZE_FAILED",
                "Metric group did not serialize to an object",
            )
            .with_details(format!("group={}; kind={}", Self::NAME, value_kind(&other)))),
            Err(e) => Err(AppError::new(
                "METRICS_SERIALIZE_FAILED",
                "Failed to serialize metric group",
            )
            .with_details(format!("group={}; err={e}", Self::NAME))),
        }
    }
}

fn value_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Open mapping of metric name to value, built by key-disjoint union of groups.
///
/// Consumers read the keys they know; new groups add keys without breaking them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct MetricsResult(Map<String, Value>);

impl MetricsResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge_group<G: MetricGroup>(&mut self, group: &G) -> Result<(), AppError> {
        let entries = group.to_entries()?;
        self.merge_entries(G::NAME, entries)
    }

    /// Union `entries` into the result. Any key already present is a collision.
    pub fn merge_entries(
        &mut self,
        source: &str,
        entries: Map<String, Value>,
    ) -> Result<(), AppError> {
        let mut collisions = entries
            .keys()
            .filter(|k| self.0.contains_key(*k))
            .cloned()
            .collect::<Vec<_>>();
        if !collisions.is_empty() {
            collisions.sort();
            return Err(AppError::new(
                "METRICS_KEY_COLLISION",
                "Metric keys emitted by more than one group",
            )
            .with_details(format!("source={source}; keys={}", collisions.join(", "))));
        }
        self.0.extend(entries);
        Ok(())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.0.get(key).and_then(Value::as_i64)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.0.get(key).and_then(Value::as_f64)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.0.get(key).and_then(Value::as_bool)
    }

    pub fn get_array(&self, key: &str) -> &[Value] {
        self.0
            .get(key)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}
