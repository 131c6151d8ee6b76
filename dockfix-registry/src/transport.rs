use crate::config::ResolverConfig;
use std::cell::RefCell;
use thiserror::Error;

/// Status and body of a completed HTTP exchange, whatever the status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: String::new(),
        }
    }
}

/// The exchange did not complete (DNS, refused connection, timeout, reset).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("transport failure: {message}")]
pub struct TransportError {
    pub message: String,
}

/// Blocking GET. Implementations must report HTTP error statuses as
/// `Ok(HttpResponse)` and reserve `Err` for failures below HTTP.
pub trait HttpTransport {
    fn get(&self, url: &str) -> Result<HttpResponse, TransportError>;
}

/// Production transport backed by a `ureq` agent.
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(config: &ResolverConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(config.request_timeout())
            .user_agent(concat!("dockfix/", env!("CARGO_PKG_VERSION")))
            .build();
        Self { agent }
    }
}

impl HttpTransport for UreqTransport {
    fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        let (status, response) = match self.agent.get(url).set("Accept", "application/json").call() {
            Ok(resp) => (resp.status(), resp),
            Err(ureq::Error::Status(code, resp)) => (code, resp),
            Err(ureq::Error::Transport(t)) => {
                return Err(TransportError {
                    message: t.to_string(),
                });
            }
        };
        let body = response.into_string().map_err(|e| TransportError {
            message: format!("read body: {e}"),
        })?;
        Ok(HttpResponse { status, body })
    }
}

type Handler = Box<dyn Fn(&str) -> Result<HttpResponse, TransportError>>;

/// In-memory transport answering from a closure and recording every URL.
pub struct MemoryTransport {
    handler: Handler,
    requests: RefCell<Vec<String>>,
}

impl MemoryTransport {
    pub fn new(handler: impl Fn(&str) -> Result<HttpResponse, TransportError> + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            requests: RefCell::new(Vec::new()),
        }
    }

    /// Serves fixed bodies by exact URL; anything else is a 404.
    pub fn routes(routes: Vec<(String, HttpResponse)>) -> Self {
        Self::new(move |url| {
            Ok(routes
                .iter()
                .find(|(u, _)| u == url)
                .map(|(_, r)| r.clone())
                .unwrap_or_else(|| HttpResponse::status(404)))
        })
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }
}

impl HttpTransport for MemoryTransport {
    fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        self.requests.borrow_mut().push(url.to_string());
        (self.handler)(url)
    }
}
