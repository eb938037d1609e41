use std::io::{self, Read};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tiny_http::{Header, Request, Response, Server, StatusCode};
use tracing::{debug, error, info, warn};

use super::request::{RequestBody, ReviewRequest};
use super::response::ResponseEnvelope;
use super::service::ReviewService;

/// Largest request body passed to the pipeline. Longer bodies are rejected
/// as malformed without being parsed.
pub const MAX_BODY_BYTES: u64 = 1024 * 1024;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// HTTP front end for a [`ReviewService`].
///
/// Every request, whatever its path, is converted into a [`ReviewRequest`] and
/// run through the pipeline on one of `workers` threads.
pub struct HttpServer {
    service: ReviewService,
    workers: usize,
}

/// Handle to a running HTTP server
///
/// Provides methods for waiting until the server is ready, stopping it gracefully,
/// or joining the worker threads.
pub struct ServerHandle {
    addr: SocketAddr,
    server: Arc<Server>,
    shutdown: Arc<AtomicBool>,
    workers: Vec<JoinHandle<()>>,
}

impl ServerHandle {
    /// Address the server is listening on
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Wait for the server to be ready to accept connections
    ///
    /// Polls the server address by attempting TCP connections until successful.
    ///
    /// # Errors
    ///
    /// Returns `TimedOut` if the server doesn't become ready within ~250ms (50 attempts × 5ms).
    pub fn wait_ready(&self) -> io::Result<()> {
        for _ in 0..50 {
            if TcpStream::connect(self.addr).is_ok() {
                return Ok(());
            }
            thread::sleep(Duration::from_millis(5));
        }
        Err(io::Error::new(io::ErrorKind::TimedOut, "server not ready"))
    }

    /// Stop the server gracefully
    ///
    /// Requests already being handled run to completion. Consumes the handle.
    pub fn stop(self) {
        self.shutdown.store(true, Ordering::SeqCst);
        for _ in &self.workers {
            self.server.unblock();
        }
        for worker in self.workers {
            if worker.join().is_err() {
                warn!("HTTP worker panicked during shutdown");
            }
        }
        info!(addr = %self.addr, "HTTP server stopped");
    }

    /// Block until every worker thread finishes
    ///
    /// # Errors
    ///
    /// Returns the panic payload of the first worker that panicked.
    pub fn join(self) -> thread::Result<()> {
        let mut result = Ok(());
        for worker in self.workers {
            if let Err(e) = worker.join() {
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }
        result
    }
}

impl HttpServer {
    pub fn new(service: ReviewService) -> Self {
        Self {
            service,
            workers: thread::available_parallelism().map_or(4, |n| n.get()),
        }
    }

    /// Number of worker threads (at least one)
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Start the HTTP server on the given address
    ///
    /// # Arguments
    ///
    /// * `addr` - Address to bind to (e.g., `"0.0.0.0:8080"` or `"127.0.0.1:0"`)
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid or the port cannot be bound.
    pub fn start<A: ToSocketAddrs>(self, addr: A) -> io::Result<ServerHandle> {
        let addr = addr
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "invalid address"))?;
        let server = Server::http(addr).map_err(io::Error::other)?;
        let addr = server.server_addr().to_ip().unwrap_or(addr);
        let server = Arc::new(server);
        let shutdown = Arc::new(AtomicBool::new(false));

        let workers = (0..self.workers)
            .map(|id| {
                let server = Arc::clone(&server);
                let shutdown = Arc::clone(&shutdown);
                let service = self.service.clone();
                thread::Builder::new()
                    .name(format!("review-http-{id}"))
                    .spawn(move || worker_loop(&server, &shutdown, &service))
            })
            .collect::<io::Result<Vec<_>>>()?;

        info!(%addr, workers = workers.len(), "HTTP server listening");
        Ok(ServerHandle {
            addr,
            server,
            shutdown,
            workers,
        })
    }
}

fn worker_loop(server: &Server, shutdown: &AtomicBool, service: &ReviewService) {
    while !shutdown.load(Ordering::SeqCst) {
        match server.recv_timeout(POLL_INTERVAL) {
            Ok(Some(request)) => serve_one(request, service),
            Ok(None) => continue,
            Err(_) if shutdown.load(Ordering::SeqCst) => break,
            Err(e) => {
                error!(error = %e, "HTTP accept failed");
                break;
            }
        }
    }
}

fn serve_one(mut request: Request, service: &ReviewService) {
    let review_request = to_review_request(&mut request);
    let envelope = service.handle(&review_request);
    if let Err(e) = request.respond(to_http_response(&envelope)) {
        debug!(error = %e, "Client went away before response was written");
    }
}

/// Canonical spelling for headers the pipeline looks up by exact name.
fn canonical_header_name(name: &str) -> &str {
    if name.eq_ignore_ascii_case("origin") {
        "Origin"
    } else if name.eq_ignore_ascii_case("authorization") {
        "Authorization"
    } else {
        name
    }
}

fn to_review_request(request: &mut Request) -> ReviewRequest {
    let mut review = ReviewRequest::new(request.method().to_string());
    for header in request.headers() {
        let name = canonical_header_name(header.field.as_str().as_str());
        review
            .headers
            .entry(name.to_string())
            .or_insert_with(|| header.value.as_str().to_string());
    }

    review.body = read_body(request.as_reader(), MAX_BODY_BYTES);
    review
}

fn read_body(reader: impl Read, limit: u64) -> Option<RequestBody> {
    let mut raw = Vec::new();
    if let Err(e) = reader.take(limit + 1).read_to_end(&mut raw) {
        warn!(error = %e, "Failed to read request body");
        return Some(RequestBody::Unreadable);
    }
    if raw.len() as u64 > limit {
        warn!(limit, "Request body too large");
        return Some(RequestBody::TooLarge { limit });
    }
    (!raw.is_empty()).then_some(RequestBody::Bytes(raw))
}

fn to_http_response(envelope: &ResponseEnvelope) -> Response<io::Cursor<Vec<u8>>> {
    envelope.headers.iter().fold(
        Response::from_data(envelope.body_bytes()).with_status_code(StatusCode(envelope.status_code)),
        |resp, (name, value)| match Header::from_bytes(name.as_bytes(), value.as_bytes()) {
            Ok(header) => resp.with_header(header),
            Err(()) => {
                warn!(header = name, "Dropping response header with invalid bytes");
                resp
            }
        },
    )
}
