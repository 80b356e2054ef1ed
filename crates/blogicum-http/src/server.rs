use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::StatusCode;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::Service;
use hyper_util::rt::TokioIo;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::{TcpListener, TcpStream};

use crate::{Handler, Request, Response};

/// Default cap on request bodies, in bytes.
pub const DEFAULT_MAX_BODY_SIZE: usize = 12 * 1024 * 1024;

/// HTTP/1.1 server driving a single root handler.
pub struct HttpServer {
	handler: Arc<dyn Handler>,
	max_body_size: usize,
}

impl HttpServer {
	pub fn new(handler: Arc<dyn Handler>) -> Self {
		Self {
			handler,
			max_body_size: DEFAULT_MAX_BODY_SIZE,
		}
	}

	/// Requests with a larger body are answered with 413 before the handler
	/// runs.
	pub fn with_max_body_size(mut self, max_body_size: usize) -> Self {
		self.max_body_size = max_body_size;
		self
	}

	/// Accepts connections until `shutdown` resolves. In-flight connections
	/// are left to finish on their own tasks.
	pub async fn listen_with_shutdown<F>(
		self,
		addr: SocketAddr,
		shutdown: F,
	) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
	where
		F: Future<Output = ()> + Send,
	{
		let listener = TcpListener::bind(addr).await?;
		tracing::info!("Server listening on http://{}", listener.local_addr()?);
		self.serve(listener, shutdown).await
	}

	/// Runs the accept loop on an already bound listener.
	pub async fn serve<F>(
		self,
		listener: TcpListener,
		shutdown: F,
	) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
	where
		F: Future<Output = ()> + Send,
	{
		tokio::pin!(shutdown);

		loop {
			tokio::select! {
				result = listener.accept() => {
					let (stream, socket_addr) = match result {
						Ok(accepted) => accepted,
						Err(err) => {
							tracing::warn!(error = %err, "failed to accept connection");
							continue;
						}
					};
					let handler = self.handler.clone();
					let max_body_size = self.max_body_size;
					tokio::task::spawn(async move {
						if let Err(err) = Self::handle_connection(stream, socket_addr, handler, max_body_size).await {
							tracing::debug!(error = ?err, peer = %socket_addr, "connection closed with error");
						}
					});
				}
				_ = &mut shutdown => {
					tracing::info!("Shutdown signal received, stopping server");
					break;
				}
			}
		}

		Ok(())
	}

	pub async fn handle_connection(
		stream: TcpStream,
		socket_addr: SocketAddr,
		handler: Arc<dyn Handler>,
		max_body_size: usize,
	) -> Result<(), hyper::Error> {
		let io = TokioIo::new(stream);
		let service = RequestService {
			handler,
			remote_addr: socket_addr,
			max_body_size,
		};

		http1::Builder::new().serve_connection(io, service).await
	}
}

struct RequestService {
	handler: Arc<dyn Handler>,
	remote_addr: SocketAddr,
	max_body_size: usize,
}

fn declared_length(req: &hyper::Request<Incoming>) -> Option<u64> {
	req.headers()
		.get(hyper::header::CONTENT_LENGTH)?
		.to_str()
		.ok()?
		.parse()
		.ok()
}

fn payload_too_large() -> Response {
	Response::new(StatusCode::PAYLOAD_TOO_LARGE)
		.with_content_type("text/plain; charset=utf-8")
		.with_body("Request body too large")
}

fn into_hyper(
	response: Response,
) -> Result<hyper::Response<Full<Bytes>>, Box<dyn std::error::Error + Send + Sync>> {
	let mut builder = hyper::Response::builder().status(response.status);
	for (key, value) in response.headers.iter() {
		builder = builder.header(key, value);
	}
	Ok(builder.body(Full::new(response.body))?)
}

impl Service<hyper::Request<Incoming>> for RequestService {
	type Response = hyper::Response<Full<Bytes>>;
	type Error = Box<dyn std::error::Error + Send + Sync>;
	type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

	fn call(&self, req: hyper::Request<Incoming>) -> Self::Future {
		let handler = self.handler.clone();
		let remote_addr = self.remote_addr;
		let max_body_size = self.max_body_size;

		Box::pin(async move {
			let started = Instant::now();
			if declared_length(&req).is_some_and(|len| len > max_body_size as u64) {
				tracing::warn!(peer = %remote_addr, max_body_size, "request body too large");
				return into_hyper(payload_too_large());
			}

			let (parts, body) = req.into_parts();
			let body_bytes = match Limited::new(body, max_body_size).collect().await {
				Ok(collected) => collected.to_bytes(),
				Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => {
					tracing::warn!(peer = %remote_addr, max_body_size, "request body too large");
					return into_hyper(payload_too_large());
				}
				Err(err) => return Err(err),
			};

			let mut request = Request::new(
				parts.method,
				parts.uri,
				parts.version,
				parts.headers,
				body_bytes,
			);
			request.remote_addr = Some(remote_addr);
			let method = request.method.clone();
			let path = request.full_path();

			let response = match handler.handle(request).await {
				Ok(response) => response,
				Err(err) => {
					tracing::error!(error = %err, "unhandled error escaped the root handler");
					Response::internal_server_error()
				}
			};

			tracing::debug!(
				method = %method,
				path = %path,
				status = response.status.as_u16(),
				elapsed_ms = started.elapsed().as_millis() as u64,
				"connection served request"
			);

			into_hyper(response)
		})
	}
}
