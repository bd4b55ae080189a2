use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use tokio::time::sleep;

use crate::{
    decode::{decode_body, join_url},
    events::{EventSink, FailoverEvent, TracingSink},
    AttemptError, AttemptOutcome, FailoverError, FailoverOptions, HttpMethod, RawResponse,
    ReqwestTransport, RequestResult, RequestSpec, Result, ServiceDescriptor, Transport,
    TransportRequest, TransportResponse,
};

/// HTTP client that fails over across a prioritized list of services.
///
/// Cloning is cheap; clones share the same service list, transport and event
/// sink.
#[derive(Clone)]
pub struct FailoverClient {
    services: Arc<RwLock<Vec<ServiceDescriptor>>>,
    transport: Arc<dyn Transport>,
    events: Arc<dyn EventSink>,
    options: FailoverOptions,
}

impl fmt::Debug for FailoverClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FailoverClient")
            .field("services", &self.services())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// How the attempts against a single service ended.
struct ServiceRun {
    attempts: usize,
    result: std::result::Result<TransportResponse, AttemptError>,
}

impl FailoverClient {
    /// Creates a client over `services`, tried in the given order.
    ///
    /// Uses [`ReqwestTransport`], [`TracingSink`] and default options.
    pub fn new(services: impl IntoIterator<Item = ServiceDescriptor>) -> Self {
        Self {
            services: Arc::new(RwLock::new(services.into_iter().collect())),
            transport: Arc::new(ReqwestTransport::new()),
            events: Arc::new(TracingSink),
            options: FailoverOptions::default(),
        }
    }

    /// Creates a client over the three localhost placeholders from
    /// [`ServiceDescriptor::local_defaults`].
    pub fn with_default_services() -> Self {
        Self::new(ServiceDescriptor::local_defaults())
    }

    /// Creates a client from environment variables.
    ///
    /// Reads:
    /// - `FAILOVER_SERVICES`: comma separated `name=url` pairs, in priority
    ///   order (e.g. `primary=http://10.0.0.1/api,backup=http://10.0.0.2/api`)
    /// - `FAILOVER_MAX_RETRIES`, `FAILOVER_RETRY_DELAY_MS`,
    ///   `FAILOVER_TIMEOUT_MS`: optional overrides of [`FailoverOptions`]
    ///
    /// # Example
    ///
    /// ```no_run
    /// use api_failover::FailoverClient;
    ///
    /// let client = FailoverClient::from_env().expect("missing FAILOVER_SERVICES");
    /// ```
    pub fn from_env() -> Result<Self> {
        let raw = std::env::var("FAILOVER_SERVICES").map_err(|_| {
            FailoverError::Config("missing FAILOVER_SERVICES environment variable".to_owned())
        })?;
        let services = parse_services(&raw)?;

        let defaults = FailoverOptions::default();
        let options = FailoverOptions {
            max_retries: env_number("FAILOVER_MAX_RETRIES")?.unwrap_or(defaults.max_retries),
            retry_delay_ms: env_number("FAILOVER_RETRY_DELAY_MS")?
                .unwrap_or(defaults.retry_delay_ms),
            timeout_ms: env_number("FAILOVER_TIMEOUT_MS")?.unwrap_or(defaults.timeout_ms),
        };

        Self::new(services).with_options(options)
    }

    /// Applies retry, delay and timeout options.
    ///
    /// Fails with [`FailoverError::Config`] if the options are invalid.
    pub fn with_options(mut self, opts: FailoverOptions) -> Result<Self> {
        opts.validate()?;
        self.options = opts;
        Ok(self)
    }

    /// Replaces the HTTP transport.
    pub fn with_transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Arc::new(transport);
        self
    }

    /// Replaces the event sink.
    pub fn with_event_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.events = Arc::new(sink);
        self
    }

    /// Returns the options this client was configured with.
    pub fn options(&self) -> &FailoverOptions {
        &self.options
    }

    /// Returns a copy of the current service list in priority order.
    pub fn services(&self) -> Vec<ServiceDescriptor> {
        self.services
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the number of configured services.
    pub fn service_count(&self) -> usize {
        self.services
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Appends a service as the lowest-priority candidate.
    ///
    /// Duplicate names are kept; both entries are tried in order.
    pub fn add_service(&self, name: impl Into<String>, base_url: impl Into<String>) {
        let service = ServiceDescriptor::new(name, base_url);
        self.emit(FailoverEvent::ServiceAdded {
            service: service.name.clone(),
            base_url: service.base_url.clone(),
        });
        self.services
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(service);
    }

    /// Removes the first service named `name`. Returns whether one was found.
    pub fn remove_service(&self, name: &str) -> bool {
        let removed = {
            let mut services = self
                .services
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            match services.iter().position(|service| service.name == name) {
                Some(index) => {
                    services.remove(index);
                    true
                }
                None => false,
            }
        };

        let service = name.to_owned();
        if removed {
            self.emit(FailoverEvent::ServiceRemoved { service });
        } else {
            self.emit(FailoverEvent::ServiceNotFound { service });
        }
        removed
    }

    /// Sends a GET request to the first service that answers successfully.
    pub async fn get(&self, endpoint: &str) -> Result<RequestResult> {
        self.dispatch(&RequestSpec::get(endpoint)).await
    }

    /// Sends a POST request with a JSON body.
    pub async fn post(&self, endpoint: &str, body: serde_json::Value) -> Result<RequestResult> {
        self.dispatch(&RequestSpec::post(endpoint).body(body)).await
    }

    /// Dispatches `request` with failover and normalizes the response body.
    ///
    /// Services are tried in list order, each up to `max_retries` times. A
    /// status below 400 is a success; the first one wins.
    pub async fn dispatch(&self, request: &RequestSpec) -> Result<RequestResult> {
        let (service_name, response) = self.failover(request).await?;
        Ok(RequestResult {
            service_name,
            status: response.status,
            body: decode_body(&response.body),
        })
    }

    /// Same failover as [`dispatch`](Self::dispatch), but returns the
    /// transport response untouched.
    pub async fn dispatch_raw(&self, request: &RequestSpec) -> Result<RawResponse> {
        let (service_name, response) = self.failover(request).await?;
        Ok(RawResponse {
            service_name,
            response,
        })
    }

    async fn failover(&self, request: &RequestSpec) -> Result<(String, TransportResponse)> {
        // Snapshot; list edits during the call do not affect this dispatch.
        let services = self.services();
        if services.is_empty() {
            self.emit(FailoverEvent::NoServicesConfigured);
            return Err(FailoverError::NoServicesConfigured);
        }

        let mut attempts = 0usize;
        let mut last_error = None;

        for (index, service) in services.iter().enumerate() {
            if index > 0 {
                self.emit(FailoverEvent::ServiceSwitched {
                    from: services[index - 1].name.clone(),
                    to: service.name.clone(),
                });
            }
            self.emit(FailoverEvent::ServiceSelected {
                service: service.name.clone(),
            });

            let run = self.attempt_service(service, request).await;
            attempts += run.attempts;
            match run.result {
                Ok(response) => {
                    self.emit(FailoverEvent::RequestSucceeded {
                        service: service.name.clone(),
                    });
                    return Ok((service.name.clone(), response));
                }
                Err(error) => last_error = Some(error),
            }
        }

        self.emit(FailoverEvent::AllServicesFailed {
            services: services.len(),
            attempts,
        });
        Err(FailoverError::AllServicesExhausted {
            services: services.len(),
            attempts,
            last_error,
        })
    }

    /// Tries one service up to `max_retries` times, pausing between attempts
    /// but never after the last one.
    async fn attempt_service(
        &self,
        service: &ServiceDescriptor,
        request: &RequestSpec,
    ) -> ServiceRun {
        let method = match HttpMethod::try_from(&request.method) {
            Ok(method) => method,
            Err(error) => {
                self.emit(FailoverEvent::UnsupportedMethod {
                    service: service.name.clone(),
                    method: request.method.to_string(),
                });
                return ServiceRun {
                    attempts: 0,
                    result: Err(error),
                };
            }
        };

        let url = join_url(&service.base_url, &request.endpoint);
        let max_attempts = self.options.max_retries.max(1);
        let mut attempt = 1usize;

        loop {
            self.emit(FailoverEvent::AttemptStarted {
                service: service.name.clone(),
                attempt,
                max_attempts,
                url: url.clone(),
            });

            let result = self.send_once(&url, method, request).await;
            self.emit(FailoverEvent::AttemptFinished {
                service: service.name.clone(),
                attempt,
                outcome: AttemptOutcome::from_result(&result),
            });

            match result {
                Ok(response) => {
                    return ServiceRun {
                        attempts: attempt,
                        result: Ok(response),
                    };
                }
                Err(error) if attempt >= max_attempts => {
                    self.emit(FailoverEvent::ServiceExhausted {
                        service: service.name.clone(),
                        attempts: attempt,
                    });
                    return ServiceRun {
                        attempts: attempt,
                        result: Err(error),
                    };
                }
                Err(_) => {}
            }

            self.wait_before_retry(service).await;
            attempt += 1;
        }
    }

    /// Issues one transport call. Statuses of 400 and above are failures.
    async fn send_once(
        &self,
        url: &str,
        method: HttpMethod,
        request: &RequestSpec,
    ) -> std::result::Result<TransportResponse, AttemptError> {
        let transport_request = TransportRequest {
            url: url.to_owned(),
            method,
            headers: request.headers.clone(),
            query: request.query.clone(),
            body: if method.carries_body() {
                request.body.clone()
            } else {
                None
            },
            attachments: if method.carries_attachments() {
                request.attachments.clone()
            } else {
                Vec::new()
            },
            timeout: self.options.timeout(),
        };

        let response = self.transport.send(transport_request).await?;
        if response.status >= 400 {
            return Err(AttemptError::HttpStatus {
                status: response.status,
                body: response.text(),
            });
        }
        Ok(response)
    }

    /// Pauses the calling task for the configured retry delay.
    async fn wait_before_retry(&self, service: &ServiceDescriptor) {
        let delay = self.options.retry_delay();
        self.emit(FailoverEvent::RetryScheduled {
            service: service.name.clone(),
            delay,
        });
        if !delay.is_zero() {
            sleep(delay).await;
        }
    }

    fn emit(&self, event: FailoverEvent) {
        self.events.record(&event);
    }
}

/// Parses `name=url` pairs separated by commas.
fn parse_services(raw: &str) -> Result<Vec<ServiceDescriptor>> {
    let services = raw
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (name, url) = entry.split_once('=').ok_or_else(|| {
                FailoverError::Config(format!("service entry '{entry}' is not name=url"))
            })?;
            let (name, url) = (name.trim(), url.trim());
            if name.is_empty() || url.is_empty() {
                return Err(FailoverError::Config(format!(
                    "service entry '{entry}' has an empty name or url"
                )));
            }
            Ok(ServiceDescriptor::new(name, url))
        })
        .collect::<Result<Vec<_>>>()?;

    if services.is_empty() {
        return Err(FailoverError::Config(
            "FAILOVER_SERVICES is set but empty".to_owned(),
        ));
    }
    Ok(services)
}

fn env_number<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| FailoverError::Config(format!("{key} is not a valid number: '{value}'"))),
        Err(_) => Ok(None),
    }
}
