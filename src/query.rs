//! Query-string encoding for the EmailBison API.
//!
//! The API reads PHP-style bracketed keys for nested filter structures, so
//! `{"filters": {"campaign_id": {"value": 7}}}` goes out as
//! `filters[campaign_id][value]=7`. Top-level arrays are the exception:
//! those become plain repeated keys (`tag_ids=3&tag_ids=5`), which is what
//! the campaign listing endpoint expects.

use serde_json::Value;

/// Encodes a JSON object as query pairs. Nulls are dropped; non-object
/// input yields no pairs.
pub(crate) fn to_query_pairs(params: &Value) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let Value::Object(map) = params else {
        return pairs;
    };

    for (key, value) in map {
        match value {
            Value::Array(items) if items.iter().all(|v| !v.is_object() && !v.is_array()) => {
                for item in items {
                    if let Some(rendered) = scalar_to_string(item) {
                        pairs.push((key.clone(), rendered));
                    }
                }
            }
            other => flatten_into(&mut pairs, key, other),
        }
    }
    pairs
}

fn flatten_into(pairs: &mut Vec<(String, String)>, key: &str, value: &Value) {
    match value {
        Value::Object(map) => {
            for (sub, v) in map {
                flatten_into(pairs, &format!("{key}[{sub}]"), v);
            }
        }
        Value::Array(items) => {
            for (i, v) in items.iter().enumerate() {
                flatten_into(pairs, &format!("{key}[{i}]"), v);
            }
        }
        other => {
            if let Some(rendered) = scalar_to_string(other) {
                pairs.push((key.to_owned(), rendered));
            }
        }
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalars_pass_through() {
        let pairs = to_query_pairs(&json!({"page": 2, "status": "active"}));
        assert_eq!(
            pairs,
            vec![
                ("page".to_owned(), "2".to_owned()),
                ("status".to_owned(), "active".to_owned()),
            ]
        );
    }

    #[test]
    fn test_nested_filters_use_brackets() {
        let pairs = to_query_pairs(&json!({
            "filters": {
                "campaign_id": {"value": 7},
                "folder": {"value": "Inbox"},
            }
        }));
        assert_eq!(
            pairs,
            vec![
                ("filters[campaign_id][value]".to_owned(), "7".to_owned()),
                ("filters[folder][value]".to_owned(), "Inbox".to_owned()),
            ]
        );
    }

    #[test]
    fn test_nested_arrays_are_indexed() {
        let pairs = to_query_pairs(&json!({"filters": {"campaign_ids": [7, 9]}}));
        assert_eq!(
            pairs,
            vec![
                ("filters[campaign_ids][0]".to_owned(), "7".to_owned()),
                ("filters[campaign_ids][1]".to_owned(), "9".to_owned()),
            ]
        );
    }

    #[test]
    fn test_top_level_arrays_repeat_the_key() {
        let pairs = to_query_pairs(&json!({"tag_ids": [3, 5]}));
        assert_eq!(
            pairs,
            vec![
                ("tag_ids".to_owned(), "3".to_owned()),
                ("tag_ids".to_owned(), "5".to_owned()),
            ]
        );
    }

    #[test]
    fn test_nulls_are_dropped() {
        let pairs = to_query_pairs(&json!({"a": null, "b": {"c": null}, "d": 1}));
        assert_eq!(pairs, vec![("d".to_owned(), "1".to_owned())]);
    }

    #[test]
    fn test_bools_render_lowercase() {
        let pairs = to_query_pairs(&json!({"flag": true}));
        assert_eq!(pairs, vec![("flag".to_owned(), "true".to_owned())]);
    }

    #[test]
    fn test_non_object_input_yields_nothing() {
        assert!(to_query_pairs(&json!([1, 2, 3])).is_empty());
        assert!(to_query_pairs(&json!("plain")).is_empty());
    }
}
