use std::io::{self, Read};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use http::{HeaderMap, HeaderName, HeaderValue, Method};
use tracing::{debug, error, info, warn};

use crate::dispatcher::Dispatcher;
use crate::server::{HttpRequest, HttpResponse};

/// Blocking HTTP/1.1 listener feeding a [`Dispatcher`].
///
/// A fixed set of worker threads share one `tiny_http` listener; each worker
/// reads a request, dispatches it and writes the response.
pub struct HttpServer {
    dispatcher: Arc<Dispatcher>,
    workers: usize,
}

/// Handle to a running HTTP server
///
/// Provides methods for waiting until the server is ready, stopping it gracefully,
/// or joining the worker threads.
pub struct ServerHandle {
    addr: SocketAddr,
    server: Arc<tiny_http::Server>,
    running: Arc<AtomicBool>,
    workers: Vec<JoinHandle<()>>,
}

impl ServerHandle {
    /// Address the listener is bound to. Useful when binding port 0.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Wait for the server to be ready to accept connections
    ///
    /// Polls the server address by attempting TCP connections until successful.
    ///
    /// # Errors
    ///
    /// Returns `TimedOut` error if the server doesn't become ready within ~250ms (50 attempts × 5ms).
    pub fn wait_ready(&self) -> io::Result<()> {
        for _ in 0..50 {
            if TcpStream::connect(self.addr).is_ok() {
                return Ok(());
            }
            thread::sleep(Duration::from_millis(5));
        }
        Err(io::Error::new(io::ErrorKind::TimedOut, "server not ready"))
    }

    /// Stop accepting requests and wait for every worker to exit.
    ///
    /// Requests already being handled run to completion.
    pub fn stop(self) {
        self.running.store(false, Ordering::SeqCst);
        for _ in 0..self.workers.len() {
            self.server.unblock();
        }
        for worker in self.workers {
            if worker.join().is_err() {
                error!("http worker panicked during shutdown");
            }
        }
        info!(addr = %self.addr, "http server stopped");
    }

    /// Block until every worker exits.
    ///
    /// Workers only exit after [`ServerHandle::stop`] is requested from
    /// another handle-holder or a worker panics outside the dispatcher.
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

    /// A clonable stop signal for use from another thread (e.g. a signal
    /// handler) while this handle is blocked in [`ServerHandle::join`].
    #[must_use]
    pub fn shutdown_trigger(&self) -> ShutdownTrigger {
        ShutdownTrigger {
            server: Arc::clone(&self.server),
            running: Arc::clone(&self.running),
            workers: self.workers.len(),
        }
    }
}

/// Stops a running server without owning its [`ServerHandle`].
#[derive(Clone)]
pub struct ShutdownTrigger {
    server: Arc<tiny_http::Server>,
    running: Arc<AtomicBool>,
    workers: usize,
}

impl ShutdownTrigger {
    pub fn shutdown(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            for _ in 0..self.workers {
                self.server.unblock();
            }
        }
    }
}

impl HttpServer {
    pub fn new(dispatcher: Dispatcher) -> Self {
        let workers = dispatcher.config().http_workers.max(1);
        Self {
            dispatcher: Arc::new(dispatcher),
            workers,
        }
    }

    /// Override the worker count from the config.
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
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
        let server = tiny_http::Server::http(addr)
            .map_err(|e| io::Error::new(io::ErrorKind::AddrNotAvailable, e.to_string()))?;
        let bound = server.server_addr().to_ip().unwrap_or(addr);
        let server = Arc::new(server);
        let running = Arc::new(AtomicBool::new(true));

        let mut workers = Vec::with_capacity(self.workers);
        for n in 0..self.workers {
            let server = Arc::clone(&server);
            let running = Arc::clone(&running);
            let dispatcher = Arc::clone(&self.dispatcher);
            let worker = thread::Builder::new()
                .name(format!("hiweb-http-{n}"))
                .spawn(move || worker_loop(&server, &running, &dispatcher))?;
            workers.push(worker);
        }

        info!(addr = %bound, workers = self.workers, "http server listening");
        Ok(ServerHandle {
            addr: bound,
            server,
            running,
            workers,
        })
    }
}

fn worker_loop(server: &tiny_http::Server, running: &AtomicBool, dispatcher: &Dispatcher) {
    while running.load(Ordering::SeqCst) {
        match server.recv() {
            Ok(request) => handle(request, dispatcher),
            Err(e) => {
                if running.load(Ordering::SeqCst) {
                    warn!(error = %e, "failed to accept request");
                }
            }
        }
    }
    debug!("http worker exiting");
}

fn handle(mut request: tiny_http::Request, dispatcher: &Dispatcher) {
    let config = dispatcher.config();
    let limit = config.max_body_bytes.max(config.max_multipart_bytes);

    let Ok(method) = Method::from_bytes(request.method().as_str().as_bytes()) else {
        respond(request, plain(400, "bad method"));
        return;
    };

    let mut body = Vec::new();
    let read = request
        .as_reader()
        .take(limit.saturating_add(1))
        .read_to_end(&mut body);
    if let Err(e) = read {
        warn!(error = %e, url = %request.url(), "failed to read request body");
        respond(request, plain(400, "bad request body"));
        return;
    }
    if body.len() as u64 > limit {
        warn!(url = %request.url(), limit, "request body too large");
        respond(request, plain(413, "payload too large"));
        return;
    }

    let mut req = HttpRequest::new(method, request.url()).body(body);
    for header in request.headers() {
        req = req.header(header.field.as_str().as_str(), header.value.as_str());
    }
    if let Some(peer) = request.remote_addr() {
        req = req.peer(*peer);
    }

    let response = dispatcher.dispatch(req);
    respond(request, response);
}

fn plain(status: u16, message: &str) -> HttpResponse {
    HttpResponse {
        status,
        headers: HeaderMap::new(),
        body: message.as_bytes().to_vec(),
    }
}

fn respond(request: tiny_http::Request, response: HttpResponse) {
    let mut out = tiny_http::Response::from_data(response.body)
        .with_status_code(tiny_http::StatusCode(response.status));
    for (name, value) in &response.headers {
        if let Some(header) = to_tiny_header(name, value) {
            out.add_header(header);
        }
    }
    if let Err(e) = request.respond(out) {
        debug!(error = %e, "client went away before the response was written");
    }
}

fn to_tiny_header(name: &HeaderName, value: &HeaderValue) -> Option<tiny_http::Header> {
    tiny_http::Header::from_bytes(name.as_str().as_bytes(), value.as_bytes()).ok()
}
