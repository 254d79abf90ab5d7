//! JSON value → cell value coercion.

use serde_json::Value;

use crate::sheet::CellValue;

/// A coerced cell value and whether formula escaping was applied.
#[derive(Debug, Clone, PartialEq)]
pub struct Coerced {
    /// The value to store.
    pub value: CellValue,
    /// True when a leading `=` forced the text to be stored JSON-quoted.
    pub formula_escaped: bool,
}

impl Coerced {
    fn plain(value: CellValue) -> Self {
        Self {
            value,
            formula_escaped: false,
        }
    }
}

/// Maps one JSON value to one cell value.
///
/// Rules, first match wins:
/// 1. `null` → empty text.
/// 2. A one-element list is unwrapped once and its element coerced; any
///    other list is stored as its JSON text.
/// 3. A string starting with `=` is stored as its JSON text (quoted), so
///    spreadsheet applications never evaluate it.
/// 4. Integers that fit `i64` and other strings are stored verbatim.
/// 5. Everything else (floats, booleans, objects, larger integers) is
///    stored as its JSON text.
#[must_use]
pub fn coerce(value: &Value) -> Coerced {
    match value {
        Value::Array(items) if items.len() == 1 => coerce_scalar(&items[0]),
        Value::Array(_) => Coerced::plain(json_text(value)),
        other => coerce_scalar(other),
    }
}

// Rules 1, 3, 4 and 5; a nested list reaching here is not unwrapped again.
fn coerce_scalar(value: &Value) -> Coerced {
    match value {
        Value::Null => Coerced::plain(CellValue::Text(String::new())),
        Value::String(text) if text.starts_with('=') => Coerced {
            value: json_text(value),
            formula_escaped: true,
        },
        Value::String(text) => Coerced::plain(CellValue::Text(text.clone())),
        Value::Number(number) => match number.as_i64() {
            Some(int) => Coerced::plain(CellValue::Int(int)),
            None => Coerced::plain(json_text(value)),
        },
        Value::Bool(_) | Value::Array(_) | Value::Object(_) => Coerced::plain(json_text(value)),
    }
}

fn json_text(value: &Value) -> CellValue {
    // Serializing a `Value` cannot fail: every key is already a string.
    CellValue::Text(serde_json::to_string(value).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn test_coerce_null_is_empty_text() {
        assert_eq!(coerce(&Value::Null).value, text(""));
        assert_eq!(coerce(&json!([null])).value, text(""));
    }

    #[test]
    fn test_coerce_single_element_list_matches_element() {
        for item in [json!("Acme"), json!(7), json!(1.5), json!(true), json!({"a": 1}), json!("=x")] {
            assert_eq!(coerce(&json!([item.clone()])), coerce(&item), "for {item}");
        }
    }

    #[test]
    fn test_coerce_other_lists_serialize() {
        assert_eq!(coerce(&json!([])).value, text("[]"));
        assert_eq!(coerce(&json!(["a", 2])).value, text(r#"["a",2]"#));
    }

    #[test]
    fn test_coerce_nested_single_list_unwraps_once() {
        assert_eq!(coerce(&json!([["x"]])).value, text(r#"["x"]"#));
    }

    #[test]
    fn test_coerce_formula_text_is_quoted() {
        let result = coerce(&json!("=SUM(A1)"));
        assert_eq!(result.value, text(r#""=SUM(A1)""#));
        assert!(result.formula_escaped);
        assert!(coerce(&json!(["=1+1"])).formula_escaped);
        assert!(!coerce(&json!("a=b")).formula_escaped);
    }

    #[test]
    fn test_coerce_integers_and_strings_verbatim() {
        assert_eq!(coerce(&json!(1787)).value, CellValue::Int(1787));
        assert_eq!(coerce(&json!(-3)).value, CellValue::Int(-3));
        assert_eq!(coerce(&json!("Acme")).value, text("Acme"));
    }

    #[test]
    fn test_coerce_other_scalars_serialize() {
        assert_eq!(coerce(&json!(2.5)).value, text("2.5"));
        assert_eq!(coerce(&json!(false)).value, text("false"));
        assert_eq!(coerce(&json!({"k": "v"})).value, text(r#"{"k":"v"}"#));
        assert_eq!(
            coerce(&json!(u64::MAX)).value,
            text("18446744073709551615")
        );
    }
}
