/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum FailoverError {
    /// The service list was empty when the request was dispatched.
    #[error("no services configured")]
    NoServicesConfigured,
    /// Every configured service used up its attempts without a success.
    #[error("all {services} services exhausted after {attempts} attempts")]
    AllServicesExhausted {
        /// Number of services that were tried.
        services: usize,
        /// Total transport calls issued across all services.
        attempts: usize,
        /// Cause of the final failed attempt.
        last_error: Option<AttemptError>,
    },
    /// Invalid client options or environment configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Why a single attempt against a service did not succeed.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AttemptError {
    /// The request method is not one of GET, POST, PUT, DELETE or PATCH.
    #[error("unsupported http method: {0}")]
    UnsupportedMethod(String),
    /// The transport could not complete the exchange.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The service answered with a status code of 400 or above.
    #[error("http error {status}: {body}")]
    HttpStatus { status: u16, body: String },
}

/// Failure reported by a [`Transport`](crate::Transport) implementation.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("connection failed: {0}")]
    Connect(String),
    /// The request could not be built or sent (bad URL, bad header, ...).
    #[error("request error: {0}")]
    Request(String),
    /// The response could not be read.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let message = err.to_string();
        if err.is_timeout() {
            Self::Timeout(message)
        } else if err.is_connect() {
            Self::Connect(message)
        } else if err.is_builder() || err.is_request() {
            Self::Request(message)
        } else {
            Self::Protocol(message)
        }
    }
}
