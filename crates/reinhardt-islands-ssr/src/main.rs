//! `reinhardt-islands-ssr`: the SSR execution service.
//!
//! Configuration comes from `REINHARDT_ISLANDS_SSR_*` environment
//! variables; log filtering from `RUST_LOG` (default `info`).

use anyhow::Context as _;
use reinhardt_islands_conf::SsrServerSettings;
use reinhardt_islands_ssr::engine::default_workers;
use reinhardt_islands_ssr::{
	BundleCache, ModuleCompiler, ScriptEngine, SsrServer, SsrService, UiRuntime,
};
use std::sync::Arc;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	tracing_subscriber::registry()
		.with(fmt::layer().with_target(false))
		.with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
		.init();

	let settings = SsrServerSettings::from_env().context("invalid SSR server configuration")?;
	tracing::info!(
		environment = %settings.environment,
		capacity = settings.bundle_cache_capacity,
		artifacts = %settings.artifact_dir.display(),
		"starting SSR service"
	);

	let bundles = Arc::new(BundleCache::from_settings(
		Arc::new(ModuleCompiler::new()),
		&settings,
	));
	if settings.ui_runtime_dir.is_none() {
		tracing::warn!("no UI runtime directory configured, rendering with the built-in runtime");
	}
	let runtime = UiRuntime::from_dir(settings.ui_runtime_dir.clone());
	let engine = ScriptEngine::with_runtime(runtime, default_workers())
		.context("failed to start script engine")?;
	let service = SsrService::new(bundles.clone(), Arc::new(engine), &settings);

	SsrServer::new(service)
		.listen(settings.bind, async {
			if let Err(e) = tokio::signal::ctrl_c().await {
				tracing::error!(error = %e, "failed to listen for shutdown signal");
				std::future::pending::<()>().await;
			}
		})
		.await
		.context("SSR server failed")?;

	bundles.shutdown();
	Ok(())
}
