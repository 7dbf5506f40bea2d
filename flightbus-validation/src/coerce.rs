// Loose JSON reads: truthiness, string coercion and dotted-path lookup

use serde_json::Value;

/// Truthiness of an optional JSON value.
///
/// `null`, `false`, `0`, `""` and a missing value are falsy; everything else,
/// including empty objects and arrays, is truthy.
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// Convert a JSON value to a string the way a script `String(value)` call does.
pub fn to_string_loose(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => number_to_string(n),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => to_string_loose(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

fn number_to_string(n: &serde_json::Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }

    match n.as_f64() {
        Some(f) if f == 0.0 => "0".to_string(),
        // Outside [1e-6, 1e21) scripts switch to exponent form: 1e21 -> "1e+21"
        Some(f) if f.abs() >= 1e21 || f.abs() < 1e-6 => exponent_form(f),
        // Integral floats print without a fraction: 42.0 -> "42"
        Some(f) if f.fract() == 0.0 => format!("{:.0}", f),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}

fn exponent_form(f: f64) -> String {
    let formatted = format!("{:e}", f);
    match formatted.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{mantissa}e+{exponent}")
        }
        _ => formatted,
    }
}

/// Read a dotted path (`data.flightId`) without failing on malformed parents.
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(value, |current, segment| current.as_object()?.get(segment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truthiness() {
        assert!(!is_truthy(None));
        assert!(!is_truthy(Some(&json!(null))));
        assert!(!is_truthy(Some(&json!(false))));
        assert!(!is_truthy(Some(&json!(0))));
        assert!(!is_truthy(Some(&json!(0.0))));
        assert!(!is_truthy(Some(&json!(""))));

        assert!(is_truthy(Some(&json!(true))));
        assert!(is_truthy(Some(&json!(42))));
        assert!(is_truthy(Some(&json!("AB123"))));
        assert!(is_truthy(Some(&json!({}))));
        assert!(is_truthy(Some(&json!([]))));
    }

    #[test]
    fn test_string_coercion() {
        assert_eq!(to_string_loose(&json!(123)), "123");
        assert_eq!(to_string_loose(&json!(-7)), "-7");
        assert_eq!(to_string_loose(&json!(42.0)), "42");
        assert_eq!(to_string_loose(&json!(1.5)), "1.5");
        assert_eq!(to_string_loose(&json!(-0.0)), "0");
        assert_eq!(to_string_loose(&json!(1e20)), "100000000000000000000");
        assert_eq!(to_string_loose(&json!(1e21)), "1e+21");
        assert_eq!(to_string_loose(&json!(-2.5e30)), "-2.5e+30");
        assert_eq!(to_string_loose(&json!(0.000001)), "0.000001");
        assert_eq!(to_string_loose(&json!(1e-7)), "1e-7");
        assert_eq!(to_string_loose(&json!(1.5e-7)), "1.5e-7");
        assert_eq!(to_string_loose(&json!("XY999")), "XY999");
        assert_eq!(to_string_loose(&json!(true)), "true");
        assert_eq!(to_string_loose(&json!([1, null, "a"])), "1,,a");
        assert_eq!(to_string_loose(&json!({ "a": 1 })), "[object Object]");
    }

    #[test]
    fn test_lookup_is_defensive() {
        let payload = json!({ "data": { "flightId": 7 } });
        assert_eq!(lookup(&payload, "data.flightId"), Some(&json!(7)));
        assert_eq!(lookup(&payload, "data.gate"), None);
        assert_eq!(lookup(&json!("text"), "data.flightId"), None);
        assert_eq!(lookup(&json!({ "data": 5 }), "data.flightId"), None);
        assert_eq!(lookup(&json!(null), "type"), None);
    }
}
