//! Incremental tag tokenizer.
//!
//! [`TagScanner`] walks markup once and yields a [`TagToken`] for every open
//! and close tag, with the byte range it occupies. Text, comments, doctype
//! and processing instructions are skipped, as is the raw text content of
//! `<script>` and `<style>` elements.
//!
//! Malformed tags never stop the scan. A tag whose attribute list cannot be
//! read is reported with `malformed: true`, keeping the attributes read so
//! far, and scanning resumes after the malformed region.

use crate::props::parse_prop_literal;
use serde_json::Value;
use std::ops::Range;

/// How an attribute value was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
	/// `disabled`
	Bare,
	/// `title="Hi"` or `title='Hi'`; holds the text between the quotes.
	Quoted(String),
	/// `size={48}`; holds the text between the outer braces.
	Braced(String),
	/// `size=48`
	Unquoted(String),
}

/// One tag attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
	/// Attribute name, verbatim.
	pub name: String,
	/// Attribute value.
	pub value: AttributeValue,
}

impl Attribute {
	/// Types the attribute value as a prop.
	pub fn to_prop(&self) -> Value {
		match &self.value {
			AttributeValue::Bare => Value::Bool(true),
			AttributeValue::Quoted(raw) | AttributeValue::Unquoted(raw) => {
				parse_prop_literal(raw, false)
			}
			AttributeValue::Braced(raw) => parse_prop_literal(raw, true),
		}
	}
}

/// A tag found in markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagToken {
	/// `<Name ...>` or `<Name ... />`
	Open {
		/// Tag name, verbatim.
		name: String,
		/// Attributes in source order.
		attributes: Vec<Attribute>,
		/// Byte range of the whole tag.
		span: Range<usize>,
		/// Written as `<Name />`.
		self_closing: bool,
		/// The attribute list could not be read to the end.
		malformed: bool,
	},
	/// `</Name>`
	Close {
		/// Tag name, verbatim.
		name: String,
		/// Byte range of the whole tag.
		span: Range<usize>,
	},
}

impl TagToken {
	/// Tag name.
	pub fn name(&self) -> &str {
		match self {
			Self::Open { name, .. } | Self::Close { name, .. } => name,
		}
	}

	/// Byte range of the tag.
	pub fn span(&self) -> Range<usize> {
		match self {
			Self::Open { span, .. } | Self::Close { span, .. } => span.clone(),
		}
	}
}

/// Iterator over the tags of a markup string.
#[derive(Debug, Clone)]
pub struct TagScanner<'a> {
	src: &'a str,
	pos: usize,
}

impl<'a> TagScanner<'a> {
	/// Starts scanning `src` from the beginning.
	pub fn new(src: &'a str) -> Self {
		Self { src, pos: 0 }
	}

	fn bytes(&self) -> &'a [u8] {
		self.src.as_bytes()
	}

	fn peek(&self, at: usize) -> Option<u8> {
		self.bytes().get(at).copied()
	}

	fn starts_with_at(&self, at: usize, pat: &str) -> bool {
		self.src
			.get(at..)
			.is_some_and(|rest| rest.starts_with(pat))
	}

	/// Position just past the next `needle` at or after `from`, or the end of input.
	fn skip_past(&self, from: usize, needle: &str) -> usize {
		match self.src.get(from..).and_then(|rest| rest.find(needle)) {
			Some(offset) => from + offset + needle.len(),
			None => self.src.len(),
		}
	}

	fn read_name(&self, from: usize) -> usize {
		let mut end = from;
		while let Some(b) = self.peek(end) {
			if b.is_ascii_alphanumeric() || matches!(b, b'.' | b'-' | b'_' | b':') {
				end += 1;
			} else {
				break;
			}
		}
		end
	}

	fn skip_whitespace(&self, mut at: usize) -> usize {
		while self.peek(at).is_some_and(|b| b.is_ascii_whitespace()) {
			at += 1;
		}
		at
	}

	fn close_tag(&mut self, start: usize) -> Option<TagToken> {
		let name_start = start + 2;
		let name_end = self.read_name(name_start);
		if name_end == name_start {
			// `</` followed by something that is not a name is text
			self.pos = start + 2;
			return None;
		}
		let end = self.skip_past(name_end, ">");
		self.pos = end;
		Some(TagToken::Close {
			name: self.src[name_start..name_end].to_string(),
			span: start..end,
		})
	}

	fn open_tag(&mut self, start: usize) -> TagToken {
		let name_start = start + 1;
		let name_end = self.read_name(name_start);
		let name = self.src[name_start..name_end].to_string();
		let mut attributes = Vec::new();
		let mut at = name_end;

		let (end, self_closing, malformed) = loop {
			at = self.skip_whitespace(at);
			match self.peek(at) {
				None => break (self.src.len(), false, true),
				Some(b'>') => break (at + 1, false, false),
				Some(b'/') if self.peek(at + 1) == Some(b'>') => break (at + 2, true, false),
				Some(b'/') => at += 1,
				// The next tag starts before this one ended.
				Some(b'<') => break (at, false, true),
				Some(b'"' | b'\'' | b'{' | b'=') => {
					break (self.recover(at), false, true);
				}
				Some(_) => match self.attribute(at) {
					Ok((attribute, next)) => {
						attributes.push(attribute);
						at = next;
					}
					Err(bad) => break (self.recover(bad), false, true),
				},
			}
		};

		if malformed {
			tracing::debug!(tag = %name, offset = start, "malformed tag treated as a leaf");
		}
		self.pos = end;
		if !self_closing && !malformed && is_raw_text_element(&name) {
			self.pos = self.raw_text_end(end, &name);
		}

		TagToken::Open {
			name,
			attributes,
			span: start..end,
			self_closing,
			malformed,
		}
	}

	/// End of a malformed region: just past the next `>`, or before the next
	/// `<`, whichever comes first.
	fn recover(&self, from: usize) -> usize {
		let rest = &self.bytes()[from..];
		match rest.iter().position(|&b| b == b'>' || b == b'<') {
			Some(offset) if rest[offset] == b'>' => from + offset + 1,
			Some(offset) => from + offset,
			None => self.src.len(),
		}
	}

	/// Reads one attribute starting at `at`. On failure returns the position
	/// where the malformed region starts.
	fn attribute(&self, at: usize) -> Result<(Attribute, usize), usize> {
		let name_start = at;
		let mut name_end = at;
		while let Some(b) = self.peek(name_end) {
			if b.is_ascii_whitespace() || matches!(b, b'=' | b'>' | b'/' | b'<' | b'"' | b'\'' | b'{')
			{
				break;
			}
			name_end += 1;
		}
		let name = self.src[name_start..name_end].to_string();

		let after_name = self.skip_whitespace(name_end);
		if self.peek(after_name) != Some(b'=') {
			return Ok((
				Attribute {
					name,
					value: AttributeValue::Bare,
				},
				name_end,
			));
		}

		let value_start = self.skip_whitespace(after_name + 1);
		let (value, next) = match self.peek(value_start) {
			Some(quote @ (b'"' | b'\'')) => {
				let body = value_start + 1;
				let close = self.bytes()[body..]
					.iter()
					.position(|&b| b == quote)
					.ok_or(value_start)?;
				(
					AttributeValue::Quoted(self.src[body..body + close].to_string()),
					body + close + 1,
				)
			}
			Some(b'{') => {
				let close = self.matching_brace(value_start).ok_or(value_start)?;
				(
					AttributeValue::Braced(self.src[value_start + 1..close].to_string()),
					close + 1,
				)
			}
			Some(b'>') | None => (AttributeValue::Quoted(String::new()), value_start),
			Some(_) => {
				let mut end = value_start;
				while let Some(b) = self.peek(end) {
					let ends_tag = b == b'/' && self.peek(end + 1) == Some(b'>');
					if b.is_ascii_whitespace() || b == b'>' || b == b'<' || ends_tag {
						break;
					}
					end += 1;
				}
				(
					AttributeValue::Unquoted(self.src[value_start..end].to_string()),
					end,
				)
			}
		};
		Ok((Attribute { name, value }, next))
	}

	/// Index of the `}` closing the `{` at `open`, skipping braces inside
	/// string literals.
	fn matching_brace(&self, open: usize) -> Option<usize> {
		let mut depth = 0usize;
		let mut in_string: Option<u8> = None;
		let mut escaped = false;
		for (offset, &b) in self.bytes()[open..].iter().enumerate() {
			if let Some(quote) = in_string {
				if escaped {
					escaped = false;
				} else if b == b'\\' {
					escaped = true;
				} else if b == quote {
					in_string = None;
				}
				continue;
			}
			match b {
				b'"' | b'\'' | b'`' => in_string = Some(b),
				b'{' => depth += 1,
				b'}' => {
					depth -= 1;
					if depth == 0 {
						return Some(open + offset);
					}
				}
				_ => {}
			}
		}
		None
	}

	/// Start of the `</name` closing a raw text element, or the end of input.
	fn raw_text_end(&self, from: usize, name: &str) -> usize {
		let needle = format!("</{}", name.to_ascii_lowercase());
		let haystack = self.src[from..].to_ascii_lowercase();
		match haystack.find(&needle) {
			Some(offset) => from + offset,
			None => self.src.len(),
		}
	}
}

fn is_raw_text_element(name: &str) -> bool {
	name.eq_ignore_ascii_case("script") || name.eq_ignore_ascii_case("style")
}

impl Iterator for TagScanner<'_> {
	type Item = TagToken;

	fn next(&mut self) -> Option<TagToken> {
		loop {
			let offset = self.src.get(self.pos..)?.find('<')?;
			let start = self.pos + offset;

			if self.starts_with_at(start, "<!--") {
				self.pos = self.skip_past(start + 4, "-->");
				continue;
			}
			match self.peek(start + 1) {
				Some(b'!' | b'?') => {
					self.pos = self.skip_past(start, ">");
				}
				Some(b'/') => {
					if let Some(token) = self.close_tag(start) {
						return Some(token);
					}
				}
				Some(b) if b.is_ascii_alphabetic() => return Some(self.open_tag(start)),
				_ => self.pos = start + 1,
			}
		}
	}
}
