//! Client side of the SSR wire protocol.

use async_trait::async_trait;
use reinhardt_islands_conf::IslandsSettings;
use reinhardt_islands_types::wire::{
	BatchRequest, BatchResponse, CLEAR_CACHE_PATH, COMPONENT_ERROR_STATUS, ErrorBody, HEALTH_PATH,
	HealthResponse, INFER_PROPS_PATH, InferPropsRequest, InferPropsResponse, RENDER_BATCH_PATH,
	RENDER_PATH, RENDER_TREE_PATH, RenderResponse, RenderSpec, TreeNode, TreeRequest,
};
use reinhardt_islands_types::{IslandError, IslandResult, RenderOutcome};
use reqwest::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Calls into the SSR execution service.
///
/// `Err` means the call as a whole failed (transport, timeout, oversized or
/// malformed exchange). A component that failed to render is an
/// `Ok(RenderOutcome::Error)`.
#[async_trait]
pub trait SsrClient: Send + Sync {
	/// Renders one component.
	async fn render(&self, spec: RenderSpec) -> IslandResult<RenderOutcome>;

	/// Renders independent components in one round trip. The result has one
	/// outcome per spec, in order.
	async fn render_batch(&self, specs: Vec<RenderSpec>) -> IslandResult<Vec<RenderOutcome>>;

	/// Renders a component with its nested children as one composition.
	async fn render_tree(&self, tree: TreeNode) -> IslandResult<RenderOutcome>;
}

enum Reply<T> {
	Ok(T),
	Component(ErrorBody),
}

/// [`SsrClient`] over HTTP+JSON.
#[derive(Debug, Clone)]
pub struct HttpSsrClient {
	client: reqwest::Client,
	base_url: String,
	max_retries: u32,
	retry_delay: Duration,
	max_payload_bytes: usize,
}

impl HttpSsrClient {
	/// Creates a client for the service at `base_url` with default limits.
	pub fn new(base_url: impl Into<String>) -> IslandResult<Self> {
		Self::from_settings(&IslandsSettings::default().with_ssr_url(base_url))
	}

	/// Creates a client from render-side settings.
	pub fn from_settings(settings: &IslandsSettings) -> IslandResult<Self> {
		let client = reqwest::Client::builder()
			.timeout(settings.request_timeout())
			.build()
			.map_err(|e| IslandError::Transport(format!("failed to create client: {e}")))?;
		Ok(Self {
			client,
			base_url: settings.ssr_url.trim_end_matches('/').to_string(),
			max_retries: settings.max_retries,
			retry_delay: settings.retry_delay(),
			max_payload_bytes: settings.max_payload_bytes,
		})
	}

	/// The service base URL.
	pub fn base_url(&self) -> &str {
		&self.base_url
	}

	fn url(&self, path: &str) -> String {
		format!("{}{}", self.base_url, path)
	}

	/// Prop names the default-exported component in `source` reads.
	pub async fn infer_props(&self, source: &str) -> IslandResult<Vec<String>> {
		let request = InferPropsRequest {
			source: source.to_string(),
		};
		match self.post::<_, InferPropsResponse>(INFER_PROPS_PATH, &request).await? {
			Reply::Ok(response) => Ok(response.keys),
			Reply::Component(body) => Err(IslandError::Transport(body.error)),
		}
	}

	/// Service liveness.
	pub async fn health(&self) -> IslandResult<HealthResponse> {
		let response = self
			.client
			.get(self.url(HEALTH_PATH))
			.send()
			.await
			.map_err(|e| IslandError::Transport(format!("health check failed: {e}")))?;
		if !response.status().is_success() {
			return Err(IslandError::Transport(format!(
				"health check returned {}",
				response.status()
			)));
		}
		response
			.json()
			.await
			.map_err(|e| IslandError::Transport(format!("malformed health response: {e}")))
	}

	/// Clears the service's bundle cache.
	pub async fn clear_cache(&self) -> IslandResult<()> {
		let response = self
			.client
			.post(self.url(CLEAR_CACHE_PATH))
			.send()
			.await
			.map_err(|e| IslandError::Transport(format!("cache clear failed: {e}")))?;
		if !response.status().is_success() {
			return Err(IslandError::Transport(format!(
				"cache clear returned {}",
				response.status()
			)));
		}
		Ok(())
	}

	async fn post<B: Serialize, R: DeserializeOwned>(
		&self,
		path: &str,
		body: &B,
	) -> IslandResult<Reply<R>> {
		let payload = serde_json::to_vec(body)?;
		if payload.len() > self.max_payload_bytes {
			return Err(IslandError::PayloadTooLarge {
				size: payload.len(),
				limit: self.max_payload_bytes,
			});
		}

		let url = self.url(path);
		let mut attempt = 0u32;
		loop {
			match self.send_once(&url, &payload).await {
				Err(Attempt::Retryable(message)) if attempt < self.max_retries => {
					let delay = self.retry_delay.saturating_mul(2u32.saturating_pow(attempt));
					attempt += 1;
					tracing::warn!(
						%url,
						attempt,
						delay_ms = delay.as_millis() as u64,
						error = %message,
						"retrying SSR call"
					);
					tokio::time::sleep(delay).await;
				}
				Err(Attempt::Retryable(message)) => return Err(IslandError::Transport(message)),
				Err(Attempt::Fatal(err)) => return Err(err),
				Ok(reply) => return Ok(reply),
			}
		}
	}

	async fn send_once<R: DeserializeOwned>(
		&self,
		url: &str,
		payload: &[u8],
	) -> Result<Reply<R>, Attempt> {
		let response = self
			.client
			.post(url)
			.header(reqwest::header::CONTENT_TYPE, "application/json")
			.body(payload.to_vec())
			.send()
			.await
			.map_err(|e| Attempt::Retryable(format!("request to {url} failed: {e}")))?;

		let status = response.status();
		if status.is_success() {
			return response
				.json::<R>()
				.await
				.map(Reply::Ok)
				.map_err(|e| Attempt::Fatal(IslandError::Transport(format!("malformed response: {e}"))));
		}
		if matches!(
			status,
			StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
		) {
			return Err(Attempt::Retryable(format!("SSR service returned {status}")));
		}

		let text = response.text().await.unwrap_or_default();
		let body: Option<ErrorBody> = serde_json::from_str(&text).ok();
		if status.as_u16() == COMPONENT_ERROR_STATUS {
			if let Some(body) = body {
				return Ok(Reply::Component(body));
			}
		}
		if status == StatusCode::PAYLOAD_TOO_LARGE {
			// The service does not report its limit; it is below this payload.
			return Err(Attempt::Fatal(IslandError::PayloadTooLarge {
				size: payload.len(),
				limit: self.max_payload_bytes.min(payload.len().saturating_sub(1)),
			}));
		}
		let detail = body.map(|b| b.error).unwrap_or(text);
		Err(Attempt::Fatal(IslandError::Transport(format!(
			"SSR service returned {status}: {detail}"
		))))
	}
}

enum Attempt {
	Retryable(String),
	Fatal(IslandError),
}

fn into_outcome(reply: Reply<RenderResponse>) -> RenderOutcome {
	match reply {
		Reply::Ok(response) => response.into(),
		Reply::Component(body) => body.into(),
	}
}

#[async_trait]
impl SsrClient for HttpSsrClient {
	async fn render(&self, spec: RenderSpec) -> IslandResult<RenderOutcome> {
		self.post(RENDER_PATH, &spec).await.map(into_outcome)
	}

	async fn render_batch(&self, specs: Vec<RenderSpec>) -> IslandResult<Vec<RenderOutcome>> {
		let expected = specs.len();
		let response = match self
			.post::<_, BatchResponse>(RENDER_BATCH_PATH, &BatchRequest { specs })
			.await?
		{
			Reply::Ok(response) => response,
			Reply::Component(body) => {
				return Err(IslandError::Transport(format!("batch render failed: {}", body.error)));
			}
		};
		if response.results.len() != expected {
			return Err(IslandError::Transport(format!(
				"batch response has {} results for {expected} components",
				response.results.len()
			)));
		}
		Ok(response.results.into_iter().map(RenderOutcome::from).collect())
	}

	async fn render_tree(&self, tree: TreeNode) -> IslandResult<RenderOutcome> {
		self.post(RENDER_TREE_PATH, &TreeRequest { tree })
			.await
			.map(into_outcome)
	}
}
