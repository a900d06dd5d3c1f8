//! Attribute value typing.
//!
//! Component tags carry props as attributes written in one of two forms:
//! a quoted string (`size="48"`) or a braced expression (`size={48}`).
//! Both are typed here. Parsing never fails: anything that does not look
//! like a typed literal is kept as a string, so the same input always maps
//! to the same value and cache keys stay stable.

use regex::Regex;
use serde_json::{Number, Value};
use std::borrow::Cow;
use std::sync::LazyLock;

static INTEGER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^-?\d+$").unwrap());
static DECIMAL_RE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^-?\d+\.\d+([eE][+-]?\d+)?$").unwrap());

/// Types one attribute value.
///
/// - `braced`: the text between `{` and `}` is parsed as JSON; if that
///   fails, the text itself becomes a string value.
/// - unbraced: `true`/`false` become booleans, numeric text becomes a
///   number, everything else stays a string. HTML entities are decoded.
///
/// # Examples
///
/// ```
/// use reinhardt_islands_scanner::parse_prop_literal;
/// use serde_json::json;
///
/// assert_eq!(parse_prop_literal("{\"a\": [1, 2]}", true), json!({"a": [1, 2]}));
/// assert_eq!(parse_prop_literal("user.name", true), json!("user.name"));
/// assert_eq!(parse_prop_literal("42", false), json!(42));
/// assert_eq!(parse_prop_literal("Ada &amp; Grace", false), json!("Ada & Grace"));
/// ```
pub fn parse_prop_literal(raw: &str, braced: bool) -> Value {
	if braced {
		return parse_braced(raw);
	}
	let text = decode_entities(raw);
	match text.as_ref() {
		"true" => Value::Bool(true),
		"false" => Value::Bool(false),
		s => parse_number(s).unwrap_or_else(|| Value::String(text.into_owned())),
	}
}

fn parse_braced(raw: &str) -> Value {
	let trimmed = raw.trim();
	match serde_json::from_str::<Value>(trimmed) {
		Ok(value) => value,
		Err(_) => Value::String(trimmed.to_string()),
	}
}

fn parse_number(s: &str) -> Option<Value> {
	if INTEGER_RE.is_match(s) {
		if let Ok(n) = s.parse::<i64>() {
			return Some(Value::Number(n.into()));
		}
		// Too wide for i64: fall through to a float.
	} else if !DECIMAL_RE.is_match(s) {
		return None;
	}
	s.parse::<f64>()
		.ok()
		.and_then(Number::from_f64)
		.map(Value::Number)
}

/// Decodes the HTML character references a template engine emits when it
/// escapes attribute values. Unknown references are left untouched.
pub fn decode_entities(input: &str) -> Cow<'_, str> {
	if !input.contains('&') {
		return Cow::Borrowed(input);
	}

	let mut out = String::with_capacity(input.len());
	let mut rest = input;
	while let Some(amp) = rest.find('&') {
		out.push_str(&rest[..amp]);
		let tail = &rest[amp..];
		match tail.find(';').filter(|&end| end <= 10) {
			Some(end) => match decode_reference(&tail[1..end]) {
				Some(ch) => {
					out.push(ch);
					rest = &tail[end + 1..];
				}
				None => {
					out.push('&');
					rest = &tail[1..];
				}
			},
			None => {
				out.push('&');
				rest = &tail[1..];
			}
		}
	}
	out.push_str(rest);
	Cow::Owned(out)
}

fn decode_reference(name: &str) -> Option<char> {
	match name {
		"amp" => Some('&'),
		"lt" => Some('<'),
		"gt" => Some('>'),
		"quot" => Some('"'),
		"apos" => Some('\''),
		"nbsp" => Some('\u{a0}'),
		_ => {
			let code = name.strip_prefix('#')?;
			let value = match code.strip_prefix(['x', 'X']) {
				Some(hex) => u32::from_str_radix(hex, 16).ok()?,
				None => code.parse::<u32>().ok()?,
			};
			char::from_u32(value)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	#[case("true", json!(true))]
	#[case("false", json!(false))]
	#[case("null", json!(null))]
	#[case("48", json!(48))]
	#[case("-2.5", json!(-2.5))]
	#[case("\"quoted\"", json!("quoted"))]
	#[case("[1, \"two\"]", json!([1, "two"]))]
	#[case(" {\"nested\": {\"ok\": true}} ", json!({"nested": {"ok": true}}))]
	#[case("props.user", json!("props.user"))]
	fn test_braced_values(#[case] raw: &str, #[case] expected: Value) {
		assert_eq!(parse_prop_literal(raw, true), expected);
	}

	#[rstest]
	#[case("true", json!(true))]
	#[case("false", json!(false))]
	#[case("null", json!("null"))]
	#[case("0", json!(0))]
	#[case("007", json!(7))]
	#[case("-12", json!(-12))]
	#[case("2.75", json!(2.75))]
	#[case("1.", json!("1."))]
	#[case("1e5", json!("1e5"))]
	#[case("Ada", json!("Ada"))]
	#[case("", json!(""))]
	#[case("True", json!("True"))]
	fn test_unbraced_values(#[case] raw: &str, #[case] expected: Value) {
		assert_eq!(parse_prop_literal(raw, false), expected);
	}

	#[rstest]
	fn test_parsing_is_idempotent() {
		// Arrange
		let inputs = [("{\"b\":1,\"a\":2}", true), ("42", false), ("x &lt; y", false)];

		for (raw, braced) in inputs {
			// Act
			let first = parse_prop_literal(raw, braced);
			let second = parse_prop_literal(raw, braced);

			// Assert
			assert_eq!(first, second);
		}
	}

	#[rstest]
	fn test_huge_integer_becomes_float() {
		let value = parse_prop_literal("123456789012345678901234567890", false);
		assert!(value.is_f64());
	}

	#[rstest]
	#[case("a &amp; b", "a & b")]
	#[case("&lt;p&gt;", "<p>")]
	#[case("&#39;x&#x27;", "'x'")]
	#[case("fish & chips", "fish & chips")]
	#[case("&unknown;", "&unknown;")]
	#[case("&#xZZ;", "&#xZZ;")]
	fn test_decode_entities(#[case] input: &str, #[case] expected: &str) {
		assert_eq!(decode_entities(input), expected);
	}
}
