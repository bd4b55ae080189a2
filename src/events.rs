//! Structured failover events and the sink they are reported to.
//!
//! The client never logs on its own; it hands every event to the
//! [`EventSink`] it was built with. [`TracingSink`] is the default.

use std::fmt;
use std::time::Duration;

use crate::AttemptOutcome;

/// Severity attached to a [`FailoverEvent`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventLevel {
    Info,
    Warn,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FailoverEvent {
    /// A service became the current failover candidate.
    ServiceSelected { service: String },
    /// Moving on after `from` used up its attempts.
    ServiceSwitched { from: String, to: String },
    AttemptStarted {
        service: String,
        attempt: usize,
        max_attempts: usize,
        url: String,
    },
    AttemptFinished {
        service: String,
        attempt: usize,
        outcome: AttemptOutcome,
    },
    RetryScheduled { service: String, delay: Duration },
    ServiceExhausted { service: String, attempts: usize },
    UnsupportedMethod { service: String, method: String },
    RequestSucceeded { service: String },
    AllServicesFailed { services: usize, attempts: usize },
    NoServicesConfigured,
    ServiceAdded { service: String, base_url: String },
    ServiceRemoved { service: String },
    ServiceNotFound { service: String },
}

impl FailoverEvent {
    pub fn level(&self) -> EventLevel {
        match self {
            Self::AttemptFinished { outcome, .. } if !outcome.succeeded => EventLevel::Warn,
            Self::ServiceNotFound { .. } => EventLevel::Warn,
            Self::ServiceExhausted { .. }
            | Self::UnsupportedMethod { .. }
            | Self::AllServicesFailed { .. }
            | Self::NoServicesConfigured => EventLevel::Error,
            _ => EventLevel::Info,
        }
    }
}

impl fmt::Display for FailoverEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ServiceSelected { service } => write!(f, "trying service {service}"),
            Self::ServiceSwitched { from, to } => {
                write!(f, "switching from service {from} to {to}")
            }
            Self::AttemptStarted {
                service,
                attempt,
                max_attempts,
                url,
            } => write!(
                f,
                "attempt {attempt}/{max_attempts} against {service} at {url}"
            ),
            Self::AttemptFinished {
                service,
                attempt,
                outcome,
            } => match (&outcome.error, outcome.status) {
                (Some(error), _) => {
                    write!(f, "attempt {attempt} against {service} failed: {error}")
                }
                (None, Some(status)) => {
                    write!(f, "attempt {attempt} against {service} succeeded with {status}")
                }
                (None, None) => write!(f, "attempt {attempt} against {service} succeeded"),
            },
            Self::RetryScheduled { service, delay } => {
                write!(f, "waiting {} ms before retrying {service}", delay.as_millis())
            }
            Self::ServiceExhausted { service, attempts } => {
                write!(f, "all {attempts} attempts against {service} failed")
            }
            Self::UnsupportedMethod { service, method } => {
                write!(f, "unsupported http method {method} for {service}")
            }
            Self::RequestSucceeded { service } => write!(f, "request served by {service}"),
            Self::AllServicesFailed { services, attempts } => write!(
                f,
                "all {services} services failed to handle the request after {attempts} attempts"
            ),
            Self::NoServicesConfigured => f.write_str("no services configured"),
            Self::ServiceAdded { service, base_url } => {
                write!(f, "added service {service} at {base_url}")
            }
            Self::ServiceRemoved { service } => write!(f, "removed service {service}"),
            Self::ServiceNotFound { service } => write!(f, "service {service} not found"),
        }
    }
}

/// Receives failover events. Closures taking `&FailoverEvent` are sinks too.
pub trait EventSink: Send + Sync {
    fn record(&self, event: &FailoverEvent);
}

impl<F> EventSink for F
where
    F: Fn(&FailoverEvent) + Send + Sync,
{
    fn record(&self, event: &FailoverEvent) {
        self(event)
    }
}

/// Forwards events to `tracing` at the matching level.
///
/// Without the `tracing` feature events are dropped.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    #[cfg(feature = "tracing")]
    fn record(&self, event: &FailoverEvent) {
        match event.level() {
            EventLevel::Info => tracing::info!(target: "api_failover", "{event}"),
            EventLevel::Warn => tracing::warn!(target: "api_failover", "{event}"),
            EventLevel::Error => tracing::error!(target: "api_failover", "{event}"),
        }
    }

    #[cfg(not(feature = "tracing"))]
    fn record(&self, _event: &FailoverEvent) {}
}
