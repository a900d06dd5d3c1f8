//! Result cache keys.

use reinhardt_islands_types::RenderRequest;

/// Builds the cache key for a request.
///
/// A leaf maps to `Name:{canonical props}`. A request with nested
/// components also encodes every child, in order, so two different
/// nestings under the same parent never share a slot.
///
/// ```
/// use reinhardt_islands_cache::cache_key;
/// use reinhardt_islands_types::{Props, RenderRequest};
/// use serde_json::json;
///
/// let mut props = Props::new();
/// props.insert("fullName".into(), json!("Ada"));
/// assert_eq!(cache_key(&RenderRequest::new("UserBadge", props)), r#"UserBadge:{"fullName":"Ada"}"#);
/// ```
pub fn cache_key(request: &RenderRequest) -> String {
	let mut key = String::new();
	write_key(request, &mut key);
	key
}

fn write_key(request: &RenderRequest, out: &mut String) {
	out.push_str(request.name());
	out.push(':');
	out.push_str(&request.canonical_props());
	if request.children.is_empty() {
		return;
	}
	out.push('[');
	for (i, child) in request.children.iter().enumerate() {
		if i > 0 {
			out.push(',');
		}
		write_key(child, out);
	}
	out.push(']');
}
