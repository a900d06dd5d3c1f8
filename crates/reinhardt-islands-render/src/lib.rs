//! Island rendering for Reinhardt.
//!
//! The [`Orchestrator`] takes markup produced by the host template engine,
//! finds component tags such as `<UserBadge fullName="Ada" />`, renders
//! them through the SSR execution service and splices the results back in
//! with the markers the client hydration bootstrap expects.
//!
//! ```no_run
//! use reinhardt_islands_conf::IslandsSettings;
//! use reinhardt_islands_render::Orchestrator;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let orchestrator = Orchestrator::from_settings(IslandsSettings::from_env()?)?;
//! let page = orchestrator
//! 	.render_islands(r#"<main><UserBadge fullName="Ada" /></main>"#)
//! 	.await;
//! println!("{} ({} islands)", page.html, page.report.islands);
//! # Ok(())
//! # }
//! ```
//!
//! - [`resolver`]: component name to source file
//! - [`client`]: the SSR wire protocol over HTTP
//! - [`strategy`]: batch / tree / individual planning
//! - [`markup`]: island, failure and page markers
//! - [`rewrite`]: span replacement

pub mod client;
pub mod markup;
pub mod orchestrator;
pub mod resolver;
pub mod rewrite;
pub mod strategy;

pub use client::{HttpSsrClient, SsrClient};
pub use markup::{MarkerIds, bundle_url};
pub use orchestrator::{Orchestrator, PageRender, RenderReport};
pub use resolver::{COMPONENT_EXTENSIONS, ComponentResolver, DirectoryResolver};
pub use rewrite::splice;
pub use strategy::{RenderPlan, RenderStrategy};
