//! Island and page markers written into the response.
//!
//! A rendered island becomes
//!
//! ```html
//! <div data-rh-island data-rh-id="rh-island-1" data-rh-component="UserBadge">…html…</div>
//! <script type="application/json" data-rh-props-for="rh-island-1">{"fullName":"Ada"}</script>
//! ```
//!
//! and a failed one a container carrying `data-rh-island-error="<kind>"`.
//! The hydration bootstrap only relies on these attributes.

use reinhardt_islands_conf::ErrorDisplay;
use reinhardt_islands_types::IslandError;
use std::borrow::Cow;

/// Marks an island container.
pub const ISLAND_ATTR: &str = "data-rh-island";
/// Unique id of an island or page within the response.
pub const ID_ATTR: &str = "data-rh-id";
/// Logical component name.
pub const COMPONENT_ATTR: &str = "data-rh-component";
/// Ties a props payload script to its container.
pub const PROPS_FOR_ATTR: &str = "data-rh-props-for";
/// Failure marker; the value is the error kind.
pub const ERROR_ATTR: &str = "data-rh-island-error";
/// Marks a full-page root container.
pub const PAGE_ATTR: &str = "data-rh-page";
/// Client bundle key of a full-page render.
pub const BUNDLE_ATTR: &str = "data-rh-bundle";

/// Sequential ids, unique within one response.
#[derive(Debug)]
pub struct MarkerIds {
	prefix: &'static str,
	next: usize,
}

impl MarkerIds {
	/// Ids for islands: `rh-island-1`, `rh-island-2`, ...
	pub fn islands() -> Self {
		Self {
			prefix: "rh-island",
			next: 1,
		}
	}

	/// Ids for pages: `rh-page-1`, ...
	pub fn pages() -> Self {
		Self {
			prefix: "rh-page",
			next: 1,
		}
	}

	/// Allocates the next id.
	pub fn next_id(&mut self) -> String {
		let id = format!("{}-{}", self.prefix, self.next);
		self.next += 1;
		id
	}
}

/// Escapes text for element content and double-quoted attributes.
pub fn escape_html(text: &str) -> Cow<'_, str> {
	if !text.contains(['&', '<', '>', '"', '\'']) {
		return Cow::Borrowed(text);
	}
	let mut out = String::with_capacity(text.len() + 16);
	for c in text.chars() {
		match c {
			'&' => out.push_str("&amp;"),
			'<' => out.push_str("&lt;"),
			'>' => out.push_str("&gt;"),
			'"' => out.push_str("&quot;"),
			'\'' => out.push_str("&#39;"),
			_ => out.push(c),
		}
	}
	Cow::Owned(out)
}

/// Makes JSON safe to embed in a `<script>` element.
pub fn escape_script_json(json: &str) -> String {
	json.replace("</", "<\\/")
		.replace("<!--", "<\\!--")
		.replace('\u{2028}', "\\u2028")
		.replace('\u{2029}', "\\u2029")
}

fn props_script(id: &str, props_json: &str) -> String {
	format!(
		r#"<script type="application/json" {PROPS_FOR_ATTR}="{id}">{}</script>"#,
		escape_script_json(props_json)
	)
}

/// Container, rendered HTML and props payload of a successful island.
pub fn island_markup(id: &str, component: &str, html: &str, props_json: &str) -> String {
	format!(
		r#"<div {ISLAND_ATTR} {ID_ATTR}="{id}" {COMPONENT_ATTR}="{}">{html}</div>{}"#,
		escape_html(component),
		props_script(id, props_json)
	)
}

/// Failure marker for an island that could not be rendered.
///
/// Development display shows the error in a visible overlay; production
/// display emits a hidden placeholder carrying only the marker attributes.
pub fn error_markup(id: &str, component: &str, err: &IslandError, display: ErrorDisplay) -> String {
	let kind = err.kind();
	let component = escape_html(component);
	match display {
		ErrorDisplay::Production => format!(
			r#"<div {ERROR_ATTR}="{kind}" {ID_ATTR}="{id}" {COMPONENT_ATTR}="{component}" hidden></div>"#
		),
		ErrorDisplay::Development => {
			let stack = err
				.stack()
				.map(|s| format!(r#"<pre style="margin:4px 0 0;white-space:pre-wrap">{}</pre>"#, escape_html(s)))
				.unwrap_or_default();
			format!(
				r#"<div {ERROR_ATTR}="{kind}" {ID_ATTR}="{id}" {COMPONENT_ATTR}="{component}" style="border:2px solid #d33;padding:8px;font:12px monospace;color:#900;background:#fff5f5"><strong>{component}</strong> ({kind}): {}{stack}</div>"#,
				escape_html(&err.detail())
			)
		}
	}
}

/// URL of the client bundle for `bundle_key`: `{prefix}/{bundle_key}.js`.
///
/// The client bundle is the hydration entry the host's asset pipeline
/// builds for the page component, published under the bundle key (the
/// SHA-256 fingerprint of path, modification time and environment). The SSR
/// service never serves it; its own compiled artifacts are server-only and
/// named differently. Hosts route this URL through their static file layer.
pub fn bundle_url(bundle_url_prefix: &str, bundle_key: &str) -> String {
	format!("{}/{bundle_key}.js", bundle_url_prefix.trim_end_matches('/'))
}

/// Root container, props payload and bundle reference of a full-page render.
///
/// The script tag points at [`bundle_url`].
pub fn page_markup(
	id: &str,
	component: &str,
	html: &str,
	props_json: &str,
	bundle_key: Option<&str>,
	bundle_url_prefix: &str,
) -> String {
	let component = escape_html(component);
	match bundle_key {
		Some(key) => {
			let key = escape_html(key);
			format!(
				r#"<div {PAGE_ATTR}="{id}" {COMPONENT_ATTR}="{component}" {BUNDLE_ATTR}="{key}">{html}</div>{}<script type="module" src="{}"></script>"#,
				props_script(id, props_json),
				escape_html(&bundle_url(bundle_url_prefix, &key))
			)
		}
		None => format!(
			r#"<div {PAGE_ATTR}="{id}" {COMPONENT_ATTR}="{component}">{html}</div>{}"#,
			props_script(id, props_json)
		),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_island_markup() {
		let markup = island_markup("rh-island-1", "UserBadge", "<b>Ada</b>", r#"{"fullName":"Ada"}"#);

		assert_eq!(
			markup,
			r#"<div data-rh-island data-rh-id="rh-island-1" data-rh-component="UserBadge"><b>Ada</b></div><script type="application/json" data-rh-props-for="rh-island-1">{"fullName":"Ada"}</script>"#
		);
	}

	#[rstest]
	fn test_props_cannot_close_the_script() {
		let markup = island_markup("rh-island-1", "A", "", r#"{"x":"</script><script>alert(1)</script>"}"#);

		assert_eq!(markup.matches("</script>").count(), 1);
		assert!(markup.contains(r#"<\/script><script>alert(1)<\/script>"#));
	}

	#[rstest]
	#[case(ErrorDisplay::Production, false)]
	#[case(ErrorDisplay::Development, true)]
	fn test_error_markup(#[case] display: ErrorDisplay, #[case] shows_message: bool) {
		// Arrange
		let err = IslandError::RenderExecution {
			component: "Chart".into(),
			message: "x is <undefined>".into(),
			stack: Some("in Chart".into()),
		};

		// Act
		let markup = error_markup("rh-island-2", "Chart", &err, display);

		// Assert
		assert!(markup.starts_with(r#"<div data-rh-island-error="render_execution" data-rh-id="rh-island-2""#));
		assert_eq!(markup.contains("x is &lt;undefined&gt;"), shows_message);
		assert_eq!(markup.contains("in Chart"), shows_message);
		assert_eq!(markup.contains(" hidden>"), !shows_message);
	}

	#[rstest]
	#[case("/islands/bundles", "/islands/bundles/abc123.js")]
	#[case("/islands/bundles/", "/islands/bundles/abc123.js")]
	#[case("https://cdn.example.com/b", "https://cdn.example.com/b/abc123.js")]
	fn test_bundle_url(#[case] prefix: &str, #[case] expected: &str) {
		assert_eq!(bundle_url(prefix, "abc123"), expected);
	}

	#[rstest]
	fn test_page_markup_script_uses_bundle_url() {
		let markup = page_markup("rh-page-1", "Home", "", "{}", Some("abc123"), "/static/");
		assert!(markup.contains(&format!(r#"src="{}""#, bundle_url("/static/", "abc123"))));
	}

	#[rstest]
	fn test_page_markup_references_bundle() {
		let markup = page_markup("rh-page-1", "Home", "<main></main>", "{}", Some("abc123"), "/islands/bundles/");

		assert!(markup.starts_with(r#"<div data-rh-page="rh-page-1" data-rh-component="Home" data-rh-bundle="abc123"><main></main></div>"#));
		assert!(markup.ends_with(r#"<script type="module" src="/islands/bundles/abc123.js"></script>"#));
	}

	#[rstest]
	fn test_ids_are_sequential() {
		let mut ids = MarkerIds::islands();
		assert_eq!(ids.next_id(), "rh-island-1");
		assert_eq!(ids.next_id(), "rh-island-2");
		assert_eq!(MarkerIds::pages().next_id(), "rh-page-1");
	}
}
