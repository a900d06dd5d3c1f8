//! HTTP front end for [`SsrService`].
//!
//! | Method | Path            | Body                 | Response                          |
//! |--------|-----------------|----------------------|-----------------------------------|
//! | POST   | `/render`       | `RenderSpec`         | 200 `RenderResponse` / 422 error  |
//! | POST   | `/render/batch` | `BatchRequest`       | 200 `BatchResponse`               |
//! | POST   | `/render/tree`  | `TreeRequest`        | 200 `RenderResponse` / 422 error  |
//! | POST   | `/props/infer`  | `InferPropsRequest`  | 200 `InferPropsResponse`          |
//! | GET    | `/health`       |                      | 200 `HealthResponse`              |
//! | POST   | `/cache/clear`  |                      | 204                               |
//!
//! Every non-2xx response carries an `ErrorBody`. Bodies above the
//! configured limit are rejected with 413 before any of them is parsed.

use crate::error::ServerResult;
use crate::service::SsrService;
use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderValue};
use http::{Method, StatusCode};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::Service;
use hyper_util::rt::TokioIo;
use reinhardt_islands_types::wire::{
	BatchRequest, BatchResponse, BatchResult, CLEAR_CACHE_PATH, COMPONENT_ERROR_STATUS, ErrorBody,
	HEALTH_PATH, INFER_PROPS_PATH, InferPropsRequest, InferPropsResponse, RENDER_BATCH_PATH,
	RENDER_PATH, RENDER_TREE_PATH, RenderSpec, TreeRequest,
};
use reinhardt_islands_types::{ErrorKind, IslandError, RenderOutcome};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::{TcpListener, TcpStream};

type HttpResponse = hyper::Response<Full<Bytes>>;

/// HTTP server for the SSR service.
#[derive(Debug, Clone)]
pub struct SsrServer {
	service: Arc<SsrService>,
}

impl SsrServer {
	/// Creates a server for `service`.
	pub fn new(service: SsrService) -> Self {
		Self {
			service: Arc::new(service),
		}
	}

	/// The wrapped service.
	pub fn service(&self) -> &Arc<SsrService> {
		&self.service
	}

	/// Binds `addr` and serves until `shutdown` completes.
	pub async fn listen(
		self,
		addr: SocketAddr,
		shutdown: impl Future<Output = ()> + Send,
	) -> ServerResult<()> {
		let listener = TcpListener::bind(addr).await?;
		self.serve(listener, shutdown).await
	}

	/// Serves connections from `listener` until `shutdown` completes.
	///
	/// Once shutdown starts no new connections are accepted; connections
	/// already accepted run to completion on their own tasks.
	pub async fn serve(
		self,
		listener: TcpListener,
		shutdown: impl Future<Output = ()> + Send,
	) -> ServerResult<()> {
		tracing::info!(addr = %listener.local_addr()?, "SSR server listening");
		tokio::pin!(shutdown);

		loop {
			tokio::select! {
				result = listener.accept() => {
					let (stream, peer) = match result {
						Ok(accepted) => accepted,
						Err(e) => {
							tracing::warn!(error = %e, "failed to accept connection");
							continue;
						}
					};
					let service = self.service.clone();
					tokio::task::spawn(async move {
						if let Err(e) = Self::handle_connection(stream, service).await {
							tracing::debug!(%peer, error = %e, "connection closed with error");
						}
					});
				}
				_ = &mut shutdown => {
					tracing::info!("shutdown signal received, stopping SSR server");
					break;
				}
			}
		}
		Ok(())
	}

	/// Serves HTTP/1 requests on one connection.
	pub async fn handle_connection(stream: TcpStream, service: Arc<SsrService>) -> ServerResult<()> {
		http1::Builder::new()
			.serve_connection(TokioIo::new(stream), RequestService { service })
			.await?;
		Ok(())
	}
}

struct RequestService {
	service: Arc<SsrService>,
}

impl Service<hyper::Request<Incoming>> for RequestService {
	type Response = HttpResponse;
	type Error = Infallible;
	type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

	fn call(&self, req: hyper::Request<Incoming>) -> Self::Future {
		let service = self.service.clone();
		Box::pin(async move {
			let started = Instant::now();
			let method = req.method().clone();
			let path = req.uri().path().to_string();
			let response = route(&service, req).await;
			tracing::debug!(
				%method,
				path = %path,
				status = response.status().as_u16(),
				elapsed_ms = started.elapsed().as_millis() as u64,
				"handled request"
			);
			Ok(response)
		})
	}
}

async fn route(service: &SsrService, req: hyper::Request<Incoming>) -> HttpResponse {
	let method = req.method().clone();
	let path = req.uri().path().to_string();
	match (method, path.as_str()) {
		(Method::POST, RENDER_PATH) => match read_json::<RenderSpec>(service, req).await {
			Ok(spec) => outcome_response(service.render_one(spec).await),
			Err(response) => response,
		},
		(Method::POST, RENDER_BATCH_PATH) => match read_json::<BatchRequest>(service, req).await {
			Ok(batch) => {
				let results = service
					.render_batch(batch.specs)
					.await
					.into_iter()
					.map(BatchResult::from)
					.collect();
				json_response(StatusCode::OK, &BatchResponse { results })
			}
			Err(response) => response,
		},
		(Method::POST, RENDER_TREE_PATH) => match read_json::<TreeRequest>(service, req).await {
			Ok(request) => outcome_response(service.render_tree(request.tree).await),
			Err(response) => response,
		},
		(Method::POST, INFER_PROPS_PATH) => match read_json::<InferPropsRequest>(service, req).await {
			Ok(request) => json_response(
				StatusCode::OK,
				&InferPropsResponse {
					keys: service.infer_props(&request.source),
				},
			),
			Err(response) => response,
		},
		(Method::GET, HEALTH_PATH) => json_response(StatusCode::OK, &service.health()),
		(Method::POST, CLEAR_CACHE_PATH) => {
			let cleared = service.clear_caches();
			tracing::info!(cleared, "caches cleared");
			empty_response(StatusCode::NO_CONTENT)
		}
		(_, RENDER_PATH | RENDER_BATCH_PATH | RENDER_TREE_PATH | INFER_PROPS_PATH | HEALTH_PATH | CLEAR_CACHE_PATH) => {
			json_response(
				StatusCode::METHOD_NOT_ALLOWED,
				&ErrorBody::new(ErrorKind::Transport, "method not allowed"),
			)
		}
		(_, path) => json_response(
			StatusCode::NOT_FOUND,
			&ErrorBody::new(ErrorKind::Transport, format!("no route for {path}")),
		),
	}
}

/// Reads and parses a JSON body, enforcing the payload limit.
async fn read_json<T: DeserializeOwned>(
	service: &SsrService,
	req: hyper::Request<Incoming>,
) -> Result<T, HttpResponse> {
	let limit = service.max_payload_bytes();
	let declared = req
		.headers()
		.get(CONTENT_LENGTH)
		.and_then(|v| v.to_str().ok())
		.and_then(|v| v.parse::<usize>().ok());
	if let Some(size) = declared {
		service.check_payload(size).map_err(|e| too_large(&e))?;
	}

	let bytes = match Limited::new(req.into_body(), limit).collect().await {
		Ok(collected) => collected.to_bytes(),
		Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
			return Err(too_large(&IslandError::PayloadTooLarge {
				size: declared.unwrap_or(limit + 1),
				limit,
			}));
		}
		Err(e) => {
			return Err(json_response(
				StatusCode::BAD_REQUEST,
				&ErrorBody::new(ErrorKind::Transport, format!("failed to read request body: {e}")),
			));
		}
	};

	serde_json::from_slice(&bytes).map_err(|e| {
		json_response(
			StatusCode::BAD_REQUEST,
			&ErrorBody::new(ErrorKind::Serialization, format!("invalid request body: {e}")),
		)
	})
}

fn too_large(err: &IslandError) -> HttpResponse {
	tracing::warn!(error = %err, "rejected oversized request");
	json_response(StatusCode::PAYLOAD_TOO_LARGE, &ErrorBody::from(err))
}

/// 200 for HTML, 504 for a transport-level failure such as a render
/// timeout, the component error status otherwise.
fn outcome_response(outcome: RenderOutcome) -> HttpResponse {
	match BatchResult::from(outcome) {
		BatchResult::Html(body) => json_response(StatusCode::OK, &body),
		BatchResult::Error(body) if body.kind.as_deref() == Some(ErrorKind::Transport.as_str()) => {
			json_response(StatusCode::GATEWAY_TIMEOUT, &body)
		}
		BatchResult::Error(body) => {
			let status = StatusCode::from_u16(COMPONENT_ERROR_STATUS)
				.unwrap_or(StatusCode::UNPROCESSABLE_ENTITY);
			json_response(status, &body)
		}
	}
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> HttpResponse {
	let (status, bytes) = match serde_json::to_vec(body) {
		Ok(bytes) => (status, bytes),
		Err(e) => {
			tracing::error!(error = %e, "failed to serialize response");
			(
				StatusCode::INTERNAL_SERVER_ERROR,
				br#"{"error":"failed to serialize response","kind":"serialization"}"#.to_vec(),
			)
		}
	};
	let mut response = hyper::Response::new(Full::new(Bytes::from(bytes)));
	*response.status_mut() = status;
	response
		.headers_mut()
		.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
	response
}

fn empty_response(status: StatusCode) -> HttpResponse {
	let mut response = hyper::Response::new(Full::new(Bytes::new()));
	*response.status_mut() = status;
	response
}
