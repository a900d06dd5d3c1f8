//! Embedded JavaScript engine.
//!
//! `boa_engine::Context` is `!Send`, so each worker is a dedicated thread
//! owning one context, fed through a bounded channel. Requests are spread
//! over the workers round-robin. A worker loads each compiled module once
//! and keeps it until the engine is reset.
//!
//! Every worker evaluates the [`UiRuntime`] scripts and then the bridge
//! (`bridge.js`) that compiled components call into.

use super::{ComponentEngine, ElementSpec};
use crate::error::{ServerError, ServerResult};
use boa_engine::{Context, JsError, JsValue, Source};
use reinhardt_islands_types::{IslandError, IslandResult};
use serde::Deserialize;
use std::collections::HashSet;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread;

const BUILTIN_RUNTIME: &str = include_str!("builtin.js");
const PREACT_ADAPTER: &str = include_str!("preact.js");
const BRIDGE: &str = include_str!("bridge.js");

/// Preact UMD bundles read by [`UiRuntime::Preact`], with whether each is
/// required. These are the `dist/*.umd.js` files of the `preact` and
/// `preact-render-to-string` packages.
pub const PREACT_BUNDLES: &[(&str, bool)] = &[
	("preact.umd.js", true),
	("hooks.umd.js", true),
	("compat.umd.js", false),
	("preact-render-to-string.umd.js", true),
];

/// Loaded modules per worker before the worker starts over.
const MAX_LOADED_MODULES: usize = 512;

const QUEUE_DEPTH: usize = 16;

enum Command {
	Render {
		element: ElementSpec,
		reply: mpsc::Sender<IslandResult<String>>,
	},
	Reset,
}

/// UI library components render with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum UiRuntime {
	/// Preact, loaded from the [`PREACT_BUNDLES`] in a directory.
	Preact(PathBuf),
	/// Minimal built-in runtime covering elements, context, class
	/// components and the server-safe hooks.
	#[default]
	Builtin,
}

impl UiRuntime {
	/// Preact from `dir` when given, the built-in runtime otherwise.
	pub fn from_dir(dir: Option<PathBuf>) -> Self {
		dir.map_or(Self::Builtin, Self::Preact)
	}

	/// Named scripts a worker evaluates before rendering, bridge last.
	fn scripts(&self) -> ServerResult<Vec<(String, String)>> {
		let mut scripts = Vec::new();
		match self {
			Self::Builtin => scripts.push(("builtin.js".to_string(), BUILTIN_RUNTIME.to_string())),
			Self::Preact(dir) => {
				for (file, required) in PREACT_BUNDLES {
					let path = dir.join(file);
					match std::fs::read_to_string(&path) {
						Ok(source) => scripts.push((file.to_string(), source)),
						Err(e) if !required && e.kind() == io::ErrorKind::NotFound => {
							tracing::debug!(bundle = %path.display(), "optional UI runtime bundle not found");
						}
						Err(e) => {
							return Err(ServerError::Engine(format!(
								"failed to read UI runtime bundle {}: {e}",
								path.display()
							)));
						}
					}
				}
				scripts.push(("preact.js".to_string(), PREACT_ADAPTER.to_string()));
			}
		}
		scripts.push(("bridge.js".to_string(), BRIDGE.to_string()));
		Ok(scripts)
	}
}

/// [`ComponentEngine`] backed by boa.
pub struct ScriptEngine {
	workers: Vec<SyncSender<Command>>,
	next: AtomicUsize,
}

impl std::fmt::Debug for ScriptEngine {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ScriptEngine")
			.field("workers", &self.workers.len())
			.finish()
	}
}

impl ScriptEngine {
	/// Starts an engine on the built-in runtime with one worker per
	/// available CPU.
	pub fn new() -> ServerResult<Self> {
		Self::with_runtime(UiRuntime::Builtin, default_workers())
	}

	/// Starts an engine on the built-in runtime with `count` workers.
	pub fn with_workers(count: usize) -> ServerResult<Self> {
		Self::with_runtime(UiRuntime::Builtin, count)
	}

	/// Starts an engine on `runtime` with `count` workers (at least one).
	///
	/// Fails when the runtime's bundles cannot be read or do not evaluate.
	pub fn with_runtime(runtime: UiRuntime, count: usize) -> ServerResult<Self> {
		let scripts = Arc::new(runtime.scripts()?);
		let count = count.max(1);
		let mut workers = Vec::with_capacity(count);
		for index in 0..count {
			let (command_tx, command_rx) = mpsc::sync_channel::<Command>(QUEUE_DEPTH);
			let (init_tx, init_rx) = mpsc::channel::<Result<(), String>>();
			let scripts = scripts.clone();
			thread::Builder::new()
				.name(format!("islands-js-{index}"))
				.spawn(move || worker_main(&scripts, command_rx, init_tx))?;
			init_rx
				.recv()
				.map_err(|_| ServerError::Engine("script worker terminated during startup".into()))?
				.map_err(ServerError::Engine)?;
			workers.push(command_tx);
		}
		tracing::info!(workers = count, runtime = ?runtime, "script engine started");
		Ok(Self {
			workers,
			next: AtomicUsize::new(0),
		})
	}

	/// Number of worker threads.
	pub fn workers(&self) -> usize {
		self.workers.len()
	}

	fn pick(&self) -> &SyncSender<Command> {
		let index = self.next.fetch_add(1, Ordering::Relaxed) % self.workers.len();
		&self.workers[index]
	}
}

impl ComponentEngine for ScriptEngine {
	fn render(&self, element: &ElementSpec) -> IslandResult<String> {
		let unavailable = || IslandError::RenderExecution {
			component: element.component.clone(),
			message: "script engine is not available".into(),
			stack: None,
		};
		let (reply, response) = mpsc::channel();
		self.pick()
			.send(Command::Render {
				element: element.clone(),
				reply,
			})
			.map_err(|_| unavailable())?;
		response.recv().map_err(|_| unavailable())?
	}

	fn reset(&self) {
		for worker in &self.workers {
			let _ = worker.send(Command::Reset);
		}
	}
}

/// One worker per available CPU.
pub fn default_workers() -> usize {
	thread::available_parallelism().map_or(1, |n| n.get())
}

struct Worker {
	context: Context,
	loaded: HashSet<String>,
}

fn worker_main(
	scripts: &[(String, String)],
	commands: Receiver<Command>,
	init_tx: mpsc::Sender<Result<(), String>>,
) {
	let mut context = Context::default();
	let mut init = Ok(());
	for (name, source) in scripts {
		if let Err(e) = context.eval(Source::from_bytes(source)) {
			init = Err(format!("failed to load {name}: {}", js_error_to_string(&e, &mut context)));
			break;
		}
	}
	let ready = init.is_ok();
	if init_tx.send(init).is_err() || !ready {
		return;
	}

	let mut worker = Worker {
		context,
		loaded: HashSet::new(),
	};
	while let Ok(command) = commands.recv() {
		match command {
			Command::Render { element, reply } => {
				let _ = reply.send(worker.render(&element));
			}
			Command::Reset => worker.reset(),
		}
	}
}

#[derive(Deserialize)]
struct Reply {
	html: Option<String>,
	error: Option<String>,
	component: Option<String>,
	stack: Option<String>,
}

impl Worker {
	fn render(&mut self, element: &ElementSpec) -> IslandResult<String> {
		let mut modules = Vec::new();
		element.walk(&mut |e| modules.push(e));
		if self.loaded.len() + modules.len() > MAX_LOADED_MODULES {
			self.reset();
		}
		for spec in modules {
			self.load(spec)?;
		}

		let payload = serde_json::to_string(&element.to_script_value())?;
		let script = format!("__islands.renderTree({payload})");
		let value = self
			.context
			.eval(Source::from_bytes(&script))
			.map_err(|e| IslandError::RenderExecution {
				component: element.component.clone(),
				message: js_error_to_string(&e, &mut self.context),
				stack: None,
			})?;
		let text = js_value_to_string(&value, &mut self.context).map_err(|message| {
			IslandError::RenderExecution {
				component: element.component.clone(),
				message,
				stack: None,
			}
		})?;

		let reply: Reply = serde_json::from_str(&text)?;
		match (reply.html, reply.error) {
			(Some(html), None) => Ok(html),
			(_, error) => Err(IslandError::RenderExecution {
				component: reply.component.unwrap_or_else(|| element.component.clone()),
				message: error.unwrap_or_else(|| "component rendered nothing".into()),
				stack: reply.stack,
			}),
		}
	}

	fn load(&mut self, element: &ElementSpec) -> IslandResult<()> {
		let id = element.artifact.id();
		if self.loaded.contains(id) {
			return Ok(());
		}
		let script = format!(
			"__islands.modules[{}] = ({});",
			serde_json::to_string(id)?,
			element.artifact.code()
		);
		self.context
			.eval(Source::from_bytes(&script))
			.map_err(|e| IslandError::Compilation {
				component: element.component.clone(),
				message: js_error_to_string(&e, &mut self.context),
			})?;
		self.loaded.insert(id.to_string());
		Ok(())
	}

	fn reset(&mut self) {
		const CLEAR: &str = "for (var __k in __islands.modules) { delete __islands.modules[__k]; }";
		if let Err(e) = self.context.eval(Source::from_bytes(CLEAR)) {
			tracing::warn!(error = %js_error_to_string(&e, &mut self.context), "failed to reset script worker");
		}
		self.loaded.clear();
	}
}

fn js_value_to_string(value: &JsValue, context: &mut Context) -> Result<String, String> {
	value
		.to_string(context)
		.map(|s| s.to_std_string_escaped())
		.map_err(|e| js_error_to_string(&e, context))
}

fn js_error_to_string(error: &JsError, context: &mut Context) -> String {
	error
		.to_opaque(context)
		.to_string(context)
		.map(|s| s.to_std_string_escaped())
		.unwrap_or_else(|_| "Unknown JavaScript error".to_string())
}
