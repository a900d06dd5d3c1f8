//! Deterministic JSON serialization.
//!
//! Object keys are emitted in sorted order at every nesting level, so two
//! deep-equal values always serialize to the same bytes regardless of the
//! order their keys were inserted in. The result cache keys and the
//! hydration payloads both rely on this.

use crate::request::Props;
use serde_json::Value;

/// Serializes `value` with object keys sorted recursively.
pub fn canonical_json(value: &Value) -> String {
	let mut out = String::new();
	write_canonical(value, &mut out);
	out
}

/// Serializes a props map with keys sorted recursively.
pub fn canonical_props(props: &Props) -> String {
	let mut keys: Vec<&String> = props.keys().collect();
	keys.sort();

	let mut out = String::from("{");
	for (i, key) in keys.into_iter().enumerate() {
		if i > 0 {
			out.push(',');
		}
		write_string(key, &mut out);
		out.push(':');
		write_canonical(&props[key], &mut out);
	}
	out.push('}');
	out
}

fn write_canonical(value: &Value, out: &mut String) {
	match value {
		Value::Object(map) => {
			let mut entries: Vec<(&String, &Value)> = map.iter().collect();
			entries.sort_by(|a, b| a.0.cmp(b.0));
			out.push('{');
			for (i, (key, value)) in entries.into_iter().enumerate() {
				if i > 0 {
					out.push(',');
				}
				write_string(key, out);
				out.push(':');
				write_canonical(value, out);
			}
			out.push('}');
		}
		Value::Array(items) => {
			out.push('[');
			for (i, item) in items.iter().enumerate() {
				if i > 0 {
					out.push(',');
				}
				write_canonical(item, out);
			}
			out.push(']');
		}
		// Scalars have a single serde_json representation.
		scalar => out.push_str(&scalar.to_string()),
	}
}

fn write_string(s: &str, out: &mut String) {
	out.push_str(&Value::String(s.to_string()).to_string());
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	fn test_object_keys_are_sorted() {
		let value = json!({"b": 1, "a": {"d": [3, {"z": null, "y": true}], "c": "x"}});
		assert_eq!(
			canonical_json(&value),
			r#"{"a":{"c":"x","d":[3,{"y":true,"z":null}]},"b":1}"#
		);
	}

	#[rstest]
	fn test_props_insertion_order_does_not_matter() {
		// Arrange
		let mut first = Props::new();
		first.insert("fullName".to_string(), json!("Ada"));
		first.insert("admin".to_string(), json!(true));
		let mut second = Props::new();
		second.insert("admin".to_string(), json!(true));
		second.insert("fullName".to_string(), json!("Ada"));

		// Act & Assert
		assert_eq!(canonical_props(&first), canonical_props(&second));
		assert_eq!(canonical_props(&first), r#"{"admin":true,"fullName":"Ada"}"#);
	}

	#[rstest]
	fn test_strings_are_escaped() {
		assert_eq!(canonical_json(&json!("say \"hi\"\n")), r#""say \"hi\"\n""#);
	}

	#[rstest]
	fn test_empty_props() {
		assert_eq!(canonical_props(&Props::new()), "{}");
	}
}
