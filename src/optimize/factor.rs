//! Factoring of fields repeated across every item of a `list` payload

use serde_json::{Map, Value};

/// Field holding the repeated items
pub const LIST_KEY: &str = "list";

/// Field that receives the factored values
pub const COMMON_KEY: &str = "common";

/// Moves fields shared by every `list` item into a sibling `common` object
///
/// Only acts on a top-level object whose `list` holds at least two objects. A
/// field is common when every item has it with a value deeply equal to the
/// first item's. Any other shape, or a list with no common fields, is returned
/// unchanged.
pub fn factor_common_fields(value: Value) -> Value {
    let common = match common_fields(&value) {
        Some(common) if !common.is_empty() => common,
        _ => return value,
    };

    let mut data = match value {
        Value::Object(map) => map,
        other => return other,
    };
    if let Some(Value::Array(items)) = data.get_mut(LIST_KEY) {
        for item in items.iter_mut() {
            if let Value::Object(fields) = item {
                for key in common.keys() {
                    fields.remove(key);
                }
            }
        }
    }
    data.insert(COMMON_KEY.to_string(), Value::Object(common));
    Value::Object(data)
}

fn common_fields(value: &Value) -> Option<Map<String, Value>> {
    let items = value.get(LIST_KEY)?.as_array()?;
    if items.len() < 2 {
        return None;
    }
    let (first, rest) = items.split_first()?;
    let first = first.as_object()?;

    let common = first
        .iter()
        .filter(|(key, expected)| {
            rest.iter()
                .all(|item| item.get(key.as_str()) == Some(*expected))
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    Some(common)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_factors_fields_common_to_all_items() {
        let input = json!({
            "list": [
                {"corp_code": "123", "bsns_year": "2023", "value": "A"},
                {"corp_code": "123", "bsns_year": "2023", "value": "B"}
            ]
        });

        assert_eq!(
            factor_common_fields(input),
            json!({
                "common": {"corp_code": "123", "bsns_year": "2023"},
                "list": [{"value": "A"}, {"value": "B"}]
            })
        );
    }

    #[test]
    fn test_mixed_value_types() {
        let input = json!({"list": [{"a": "x", "b": 1}, {"a": "x", "b": 2}]});

        assert_eq!(
            factor_common_fields(input),
            json!({"common": {"a": "x"}, "list": [{"b": 1}, {"b": 2}]})
        );
    }

    #[test]
    fn test_no_common_fields_returns_input() {
        let input = json!({"list": [{"a": "x"}, {"a": "y"}]});

        assert_eq!(factor_common_fields(input.clone()), input);
    }

    #[test]
    fn test_single_item_returns_input() {
        let input = json!({"list": [{"corp_code": "123", "value": "A"}]});

        assert_eq!(factor_common_fields(input.clone()), input);
    }

    #[test]
    fn test_field_missing_from_one_item_is_not_common() {
        let input = json!({"list": [{"a": "x", "b": 1}, {"b": 1}]});

        assert_eq!(
            factor_common_fields(input),
            json!({"common": {"b": 1}, "list": [{"a": "x"}, {}]})
        );
    }

    #[test]
    fn test_nested_values_compare_structurally() {
        let input = json!({
            "list": [
                {"meta": {"unit": "KRW", "tags": [1, 2]}, "v": 1},
                {"meta": {"unit": "KRW", "tags": [1, 2]}, "v": 2},
                {"meta": {"unit": "KRW", "tags": [2, 1]}, "v": 3}
            ]
        });

        assert_eq!(factor_common_fields(input.clone()), input);
    }

    #[test]
    fn test_other_fields_are_preserved() {
        let input = json!({
            "status": "000",
            "total_count": 2,
            "list": [{"a": "x", "b": 1}, {"a": "x", "b": 2}]
        });

        let output = factor_common_fields(input);

        assert_eq!(output["status"], "000");
        assert_eq!(output["total_count"], 2);
        assert_eq!(output["common"], json!({"a": "x"}));
        let keys: Vec<&str> = output.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, ["status", "total_count", "list", "common"]);
    }

    #[test]
    fn test_non_matching_shapes_pass_through() {
        for input in [
            json!(null),
            json!("text"),
            json!([{"a": 1}, {"a": 1}]),
            json!({"list": "not an array"}),
            json!({"list": [1, 1]}),
            json!({"items": [{"a": 1}, {"a": 1}]}),
        ] {
            assert_eq!(factor_common_fields(input.clone()), input);
        }
    }

    #[test]
    fn test_only_top_level_list_is_factored() {
        let input = json!({"data": {"list": [{"a": 1}, {"a": 1}]}});

        assert_eq!(factor_common_fields(input.clone()), input);
    }
}
