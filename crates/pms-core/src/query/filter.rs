//! Store-neutral filter expressions over JSON documents.
//!
//! Store adapters translate a [`Filter`] into their own query language; the
//! in-memory store evaluates it directly with [`Filter::matches`].

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "op")]
pub enum Filter {
    All,
    /// Value at `path` equals `value` (`null` also matches a missing path)
    Eq { path: String, value: Value },
    /// Array at `path` contains `value`
    HasTag { path: String, value: Value },
    /// Case-insensitive substring match on a string field
    Contains { path: String, term: String },
    And { filters: Vec<Filter> },
    Or { filters: Vec<Filter> },
}

impl Filter {
    pub fn eq(path: &str, value: impl Into<Value>) -> Self {
        Filter::Eq {
            path: path.to_string(),
            value: value.into(),
        }
    }

    /// Conjunction that drops `All` members and collapses singletons
    pub fn and(filters: Vec<Filter>) -> Self {
        let mut filters: Vec<Filter> = filters
            .into_iter()
            .filter(|f| *f != Filter::All)
            .collect();
        match filters.len() {
            0 => Filter::All,
            1 => filters.remove(0),
            _ => Filter::And { filters },
        }
    }

    pub fn matches(&self, doc: &Value) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq { path, value } => match lookup(doc, path) {
                Some(found) => values_equal(found, value),
                None => value.is_null(),
            },
            Filter::HasTag { path, value } => lookup(doc, path)
                .and_then(Value::as_array)
                .map(|items| items.iter().any(|item| values_equal(item, value)))
                .unwrap_or(false),
            Filter::Contains { path, term } => lookup(doc, path)
                .and_then(Value::as_str)
                .map(|s| s.to_lowercase().contains(&term.to_lowercase()))
                .unwrap_or(false),
            Filter::And { filters } => filters.iter().all(|f| f.matches(doc)),
            Filter::Or { filters } => filters.iter().any(|f| f.matches(doc)),
        }
    }
}

/// Resolve a dotted path (`address.city`) inside a document
pub fn lookup<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(doc, |current, segment| current.get(segment))
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Total order used for sorting: missing/null first, then bools, numbers,
/// strings (RFC 3339 timestamps compared chronologically).
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(Value::Array(_)) => 4,
            Some(Value::Object(_)) => 5,
        }
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => {
            match (x.parse::<DateTime<Utc>>(), y.parse::<DateTime<Utc>>()) {
                (Ok(x), Ok(y)) => x.cmp(&y),
                _ => x.cmp(y),
            }
        }
        _ => rank(a).cmp(&rank(b)),
    }
}
