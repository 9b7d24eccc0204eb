//! Canonical cache keys.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::Result;

/// Structural identity of a set of query parameters.
///
/// Built from the JSON form of the parameters with object fields sorted by
/// name at every level, so two parameter sets holding the same fields
/// always produce the same key regardless of construction order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn from_params<P>(params: &P) -> Result<Self>
    where
        P: Serialize + ?Sized,
    {
        let value = canonicalize(serde_json::to_value(params)?);
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(fields) => {
            let mut sorted: Vec<(String, Value)> = fields.into_iter().collect();
            sorted.sort_by(|a, b| a.0.cmp(&b.0));
            let mut map = Map::with_capacity(sorted.len());
            for (name, field) in sorted {
                map.insert(name, canonicalize(field));
            }
            Value::Object(map)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        scalar => scalar,
    }
}
