//! EmailBison endpoint operations, grouped by resource.
//!
//! Everything here is an `impl Client` block returning schemaless
//! `serde_json::Value` records; the upstream API is not consistent enough
//! across endpoints (or versions) to commit to typed models.

mod campaigns;
mod leads;
mod replies;
mod warmup;

pub use replies::ReplyStatus;

use serde_json::Value;

/// Loose truthiness for record flags.
///
/// Upstream marks flags inconsistently as `0`/`1`, booleans or null, so
/// null, `false`, zero, `""` and empty containers all count as unset.
pub(crate) fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(map)) => !map.is_empty(),
    }
}

/// Expands top-level arrays into indexed keys (`ids[0]`, `ids[1]`),
/// leaving scalar entries alone. The events-stats and sender-email
/// endpoints want their array params in this form rather than as repeated
/// keys.
pub(crate) fn indexed_params(params: &Value) -> Value {
    let mut out = serde_json::Map::new();
    if let Value::Object(map) = params {
        for (key, value) in map {
            match value {
                Value::Array(items) => {
                    for (i, item) in items.iter().enumerate() {
                        out.insert(format!("{key}[{i}]"), item.clone());
                    }
                }
                other => {
                    out.insert(key.clone(), other.clone());
                }
            }
        }
    }
    Value::Object(out)
}
