//! Discovers component islands in rendered markup.
//!
//! The scanner works over raw text rather than a parsed document: a small
//! incremental tokenizer ([`TagScanner`]) yields open/close tag tokens with
//! byte spans, and [`scan_components`] folds the component tags among them
//! into [`RenderRequest`](reinhardt_islands_types::RenderRequest) trees.
//! Attribute values are typed by [`parse_prop_literal`].
//!
//! ```
//! use reinhardt_islands_scanner::scan_components;
//!
//! let markup = r#"<main><Card title="Hi"><Avatar size={48} /></Card></main>"#;
//! let scan = scan_components(markup);
//! assert_eq!(scan.islands.len(), 1);
//! assert_eq!(scan.max_depth, 1);
//! assert_eq!(&markup[scan.islands[0].span.clone()], r#"<Card title="Hi"><Avatar size={48} /></Card>"#);
//! ```

pub mod props;
pub mod tokenizer;
pub mod tree;

pub use props::{decode_entities, parse_prop_literal};
pub use tokenizer::{Attribute, AttributeValue, TagScanner, TagToken};
pub use tree::{ScanResult, ScannedIsland, scan_components};
