use serde_json::{Map, Number, Value};

/// Encode a JSON value as a typed document value
pub fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => serde_json::json!({ "nullValue": null }),
        Value::Bool(b) => serde_json::json!({ "booleanValue": b }),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                // 64-bit integers travel as strings
                serde_json::json!({ "integerValue": i.to_string() })
            } else {
                serde_json::json!({ "doubleValue": n.as_f64().unwrap_or(0.0) })
            }
        }
        Value::String(s) => serde_json::json!({ "stringValue": s }),
        Value::Array(items) => {
            let values: Vec<Value> = items.iter().map(encode_value).collect();
            serde_json::json!({ "arrayValue": { "values": values } })
        }
        Value::Object(map) => serde_json::json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

/// Encode the top-level fields of a JSON object
pub fn encode_fields(map: &Map<String, Value>) -> Value {
    let fields: Map<String, Value> = map
        .iter()
        .map(|(k, v)| (k.clone(), encode_value(v)))
        .collect();
    Value::Object(fields)
}

/// Decode a typed document value back into plain JSON
///
/// Unknown value kinds (references, geo points, bytes) decode to their raw payload.
pub fn decode_value(value: &Value) -> Value {
    let Some(obj) = value.as_object() else {
        return Value::Null;
    };
    let Some((kind, inner)) = obj.iter().next() else {
        return Value::Null;
    };

    match kind.as_str() {
        "nullValue" => Value::Null,
        "booleanValue" => Value::Bool(inner.as_bool().unwrap_or(false)),
        "integerValue" => {
            let parsed = match inner {
                Value::String(s) => s.parse::<i64>().ok(),
                Value::Number(n) => n.as_i64(),
                _ => None,
            };
            parsed.map(|i| Value::Number(i.into())).unwrap_or(Value::Null)
        }
        "doubleValue" => inner
            .as_f64()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => inner.clone(),
        "arrayValue" => {
            let values = inner
                .get("values")
                .and_then(Value::as_array)
                .map(|items| items.iter().map(decode_value).collect())
                .unwrap_or_default();
            Value::Array(values)
        }
        "mapValue" => inner
            .get("fields")
            .map(decode_fields)
            .unwrap_or_else(|| Value::Object(Map::new())),
        _ => inner.clone(),
    }
}

/// Decode a `fields` object into a plain JSON object
pub fn decode_fields(fields: &Value) -> Value {
    let map: Map<String, Value> = fields
        .as_object()
        .map(|obj| obj.iter().map(|(k, v)| (k.clone(), decode_value(v))).collect())
        .unwrap_or_default();
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encode_scalars() {
        assert_eq!(encode_value(&json!("a")), json!({"stringValue": "a"}));
        assert_eq!(encode_value(&json!(true)), json!({"booleanValue": true}));
        assert_eq!(encode_value(&json!(42)), json!({"integerValue": "42"}));
        assert_eq!(encode_value(&json!(25.5)), json!({"doubleValue": 25.5}));
        assert_eq!(encode_value(&Value::Null), json!({"nullValue": null}));
    }

    #[test]
    fn test_encode_nested() {
        let record = json!({"media": {"title": "Heat", "season": 1}, "tags": ["a"]});
        let encoded = encode_fields(record.as_object().unwrap());
        assert_eq!(
            encoded["media"],
            json!({"mapValue": {"fields": {"title": {"stringValue": "Heat"}, "season": {"integerValue": "1"}}}})
        );
        assert_eq!(encoded["tags"], json!({"arrayValue": {"values": [{"stringValue": "a"}]}}));
    }

    #[test]
    fn test_decode_document_fields() {
        let fields = json!({
            "viewerId": {"stringValue": "uid"},
            "currentTime": {"doubleValue": 30.5},
            "duration": {"integerValue": "120"},
            "lastUpdated": {"timestampValue": "2026-01-01T00:00:00Z"},
            "empty": {"arrayValue": {}},
            "media": {"mapValue": {"fields": {"title": {"stringValue": "Heat"}}}}
        });
        let decoded = decode_fields(&fields);
        assert_eq!(decoded["viewerId"], "uid");
        assert_eq!(decoded["currentTime"], 30.5);
        assert_eq!(decoded["duration"], 120);
        assert_eq!(decoded["lastUpdated"], "2026-01-01T00:00:00Z");
        assert_eq!(decoded["empty"], json!([]));
        assert_eq!(decoded["media"]["title"], "Heat");
    }

    #[test]
    fn test_encode_then_decode_preserves_record() {
        let record = json!({"viewerId": "u", "progress": 25.0, "duration": 120, "media": {"title": "X"}});
        let decoded = decode_fields(&encode_fields(record.as_object().unwrap()));
        assert_eq!(decoded, record);
    }
}
