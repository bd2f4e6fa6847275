use serde::{Deserialize, Deserializer};
use serde_json::Value;

// Treat an explicit `null` like a missing field.
pub fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

/// Text form of a string or number; other JSON kinds have none.
pub fn value_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Numbers, or strings holding a number (leading numeric prefix, e.g. "1.5 hours").
pub fn value_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => leading_number(s),
        _ => None,
    }
}

fn leading_number(s: &str) -> Option<f64> {
    let t = s.trim();
    let end = t
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_digit() || *c == '.'))
        .map(|(i, _)| i)
        .unwrap_or(t.len());
    t[..end].parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Holder {
        #[serde(default, deserialize_with = "null_as_default")]
        items: Vec<Value>,
    }

    #[test]
    fn null_and_missing_become_default() {
        let a: Holder = serde_json::from_value(json!({"items": null})).unwrap();
        let b: Holder = serde_json::from_value(json!({})).unwrap();
        assert!(a.items.is_empty());
        assert!(b.items.is_empty());
    }

    #[test]
    fn numbers_parse_from_prefixed_strings() {
        assert_eq!(value_number(&json!("1.5 hours")), Some(1.5));
        assert_eq!(value_number(&json!(90)), Some(90.0));
        assert_eq!(value_number(&json!("n/a")), None);
        assert_eq!(value_text(&json!(42)).as_deref(), Some("42"));
        assert_eq!(value_text(&json!("  ")), None);
    }
}
