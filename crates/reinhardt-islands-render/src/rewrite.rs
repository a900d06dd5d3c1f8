//! Positional replacement of scanned spans.

use std::ops::Range;

/// Replaces each span of `source` with its text.
///
/// Spans must not overlap; they may be given in any order. Spans that fall
/// outside `source` or off a char boundary are skipped.
pub fn splice(source: &str, mut replacements: Vec<(Range<usize>, String)>) -> String {
	replacements.sort_by_key(|(span, _)| span.start);
	let extra: usize = replacements.iter().map(|(_, text)| text.len()).sum();
	let mut out = String::with_capacity(source.len() + extra);
	let mut cursor = 0;
	for (span, text) in replacements {
		if span.start < cursor
			|| span.end < span.start
			|| span.end > source.len()
			|| !source.is_char_boundary(span.start)
			|| !source.is_char_boundary(span.end)
		{
			tracing::warn!(?span, "skipping invalid replacement span");
			continue;
		}
		out.push_str(&source[cursor..span.start]);
		out.push_str(&text);
		cursor = span.end;
	}
	out.push_str(&source[cursor..]);
	out
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_replaces_in_position_regardless_of_order() {
		let source = "<p><A /> and <B></B>!</p>";

		let out = splice(
			source,
			vec![(13..20, "[b]".to_string()), (3..8, "[a]".to_string())],
		);

		assert_eq!(out, "<p>[a] and [b]!</p>");
	}

	#[rstest]
	fn test_overlapping_span_is_skipped() {
		let out = splice("abcdef", vec![(0..3, "X".into()), (2..4, "Y".into())]);
		assert_eq!(out, "Xdef");
	}

	#[rstest]
	fn test_no_replacements_is_identity() {
		assert_eq!(splice("héllo", Vec::new()), "héllo");
	}
}
