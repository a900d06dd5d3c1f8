//! Settings for Reinhardt islands.
//!
//! Both the host-side renderer and the SSR execution service read their
//! configuration from prefixed environment variables:
//!
//! - [`IslandsSettings`] (`REINHARDT_ISLANDS_*`) for the render orchestrator
//! - [`SsrServerSettings`] (`REINHARDT_ISLANDS_SSR_*`) for the SSR service
//!
//! Every setting has a default, so an empty environment yields a working
//! development setup.

pub mod env;
pub mod islands;
pub mod ssr;

pub use env::{Env, EnvError, parse_bool, validate_env_var_name};
pub use islands::{ErrorDisplay, ISLANDS_ENV_PREFIX, IslandsSettings};
pub use ssr::{SSR_ENV_PREFIX, SsrEnvironment, SsrServerSettings};
