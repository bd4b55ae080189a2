//! `api-failover` is an async HTTP client that delivers a request to the first
//! healthy backend out of a prioritized list.
//!
//! Every service is tried in list order. Each one gets up to
//! [`FailoverOptions::max_retries`] attempts with a fixed pause between them
//! before the client moves on to the next one:
//! - [`FailoverClient::dispatch`]
//! - [`FailoverClient::dispatch_raw`]
//! - [`FailoverClient::add_service`] / [`FailoverClient::remove_service`]

mod client;
mod decode;
mod error;
mod events;
mod options;
mod request;
mod transport;
mod types;

pub use client::FailoverClient;
pub use decode::join_url;
pub use error::{AttemptError, FailoverError, TransportError};
pub use events::{EventLevel, EventSink, FailoverEvent, TracingSink};
pub use options::FailoverOptions;
pub use request::{Attachment, HttpMethod, RequestSpec};
pub use transport::{ReqwestTransport, Transport, TransportRequest, TransportResponse};
pub use types::{AttemptOutcome, RawResponse, RequestResult, ResponseBody, ServiceDescriptor};

pub type Result<T> = std::result::Result<T, FailoverError>;
