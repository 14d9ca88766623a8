use std::time::Duration;

use ::metrics::{
    ConnectionHealthTracker, HealthCheck, RegistersMetrics, prometheus::core::Collector,
};
use futures::future::join_all;
use nonempty::NonEmpty;
use serde::de::DeserializeOwned;
use tracing::{debug, error, warn};
use url::Url;

use crate::{
    UNHEALTHY_AFTER_N_ERRORS,
    error::{Error, Result},
    metrics::Metrics,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub name: String,
    pub url: Url,
}

impl Endpoint {
    pub fn new(name: impl Into<String>, url: Url) -> Self {
        Self {
            name: name.into(),
            url,
        }
    }

    /// Names the primary `primary` and the fallbacks `fallback-1`, `fallback-2`, ...
    pub fn primary_with_fallbacks(primary: Url, fallbacks: Vec<Url>) -> NonEmpty<Self> {
        NonEmpty {
            head: Self::new("primary", primary),
            tail: fallbacks
                .into_iter()
                .enumerate()
                .map(|(idx, url)| Self::new(format!("fallback-{}", idx + 1), url))
                .collect(),
        }
    }

    fn join(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[derive(Debug, Clone)]
struct TrackedEndpoint {
    endpoint: Endpoint,
    health: ConnectionHealthTracker,
}

/// Outcome of actively checking one endpoint.
#[derive(Debug)]
pub struct Probed<R> {
    pub endpoint: Endpoint,
    /// Passive health as seen by regular traffic.
    pub healthy: bool,
    pub response: Result<R>,
}

enum Attempt<T> {
    Trying {
        index: usize,
        last_error: Option<Error>,
    },
    Succeeded(T),
    Exhausted {
        last_error: Option<Error>,
    },
}

/// Sends GET requests to an ordered list of endpoints, moving on to the next
/// one whenever an endpoint fails. Each attempt is bounded by the client's
/// timeout.
#[derive(Clone)]
pub struct FailoverClient {
    upstream: String,
    http: reqwest::Client,
    endpoints: NonEmpty<TrackedEndpoint>,
    metrics: Metrics,
}

impl FailoverClient {
    pub fn new(
        upstream: &str,
        endpoints: NonEmpty<Endpoint>,
        request_timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| Error::Other(format!("failed to build http client: {e}")))?;

        let endpoints = endpoints.map(|endpoint| TrackedEndpoint {
            endpoint,
            health: ConnectionHealthTracker::new(UNHEALTHY_AFTER_N_ERRORS),
        });

        Ok(Self {
            upstream: upstream.to_string(),
            http,
            endpoints,
            metrics: Metrics::new(upstream),
        })
    }

    pub fn endpoints(&self) -> impl Iterator<Item = &Endpoint> {
        self.endpoints.iter().map(|tracked| &tracked.endpoint)
    }

    pub async fn get_json<R>(&self, path: &str, query: &[(&str, &str)]) -> Result<R>
    where
        R: DeserializeOwned,
    {
        self.get_with(path, query, Ok::<R, String>).await
    }

    /// Like `get_json` but runs `convert` on the decoded body. A conversion
    /// error fails the attempt, so the next endpoint is tried.
    pub async fn get_with<R, T, F>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        convert: F,
    ) -> Result<T>
    where
        R: DeserializeOwned,
        F: Fn(R) -> std::result::Result<T, String> + Send + Sync,
    {
        let mut attempt = Attempt::Trying {
            index: 0,
            last_error: None,
        };

        loop {
            attempt = match attempt {
                Attempt::Trying { index, last_error } => match self.endpoints.get(index) {
                    None => Attempt::Exhausted { last_error },
                    Some(tracked) => {
                        match self.request(&tracked.endpoint, path, query, &convert).await {
                            Ok(value) => {
                                tracked.health.note_success();
                                Attempt::Succeeded(value)
                            }
                            Err(err) => {
                                self.note_failure(tracked, &err);
                                Attempt::Trying {
                                    index: index + 1,
                                    last_error: Some(err),
                                }
                            }
                        }
                    }
                },
                Attempt::Succeeded(value) => return Ok(value),
                Attempt::Exhausted { last_error } => {
                    let last = last_error
                        .unwrap_or_else(|| Error::Other("no endpoint was tried".to_string()));
                    error!(
                        "all {} {} endpoints failed for `{path}`, last error: {last}",
                        self.endpoints.len(),
                        self.upstream
                    );
                    return Err(Error::Exhausted {
                        upstream: self.upstream.clone(),
                        last: Box::new(last),
                    });
                }
            };
        }
    }

    /// Sends the same request to every endpoint concurrently. Results keep the
    /// endpoint order. Passive health is left untouched.
    pub async fn probe<R>(&self, path: &str) -> NonEmpty<Probed<R>>
    where
        R: DeserializeOwned,
    {
        let (head, tail) = futures::join!(
            self.probe_one(&self.endpoints.head, path),
            join_all(
                self.endpoints
                    .tail
                    .iter()
                    .map(|tracked| self.probe_one(tracked, path))
            )
        );

        NonEmpty { head, tail }
    }

    async fn probe_one<R>(&self, tracked: &TrackedEndpoint, path: &str) -> Probed<R>
    where
        R: DeserializeOwned,
    {
        Probed {
            endpoint: tracked.endpoint.clone(),
            healthy: tracked.health.healthy(),
            response: self
                .request(&tracked.endpoint, path, &[], &Ok::<R, String>)
                .await,
        }
    }

    async fn request<R, T, F>(
        &self,
        endpoint: &Endpoint,
        path: &str,
        query: &[(&str, &str)],
        convert: &F,
    ) -> Result<T>
    where
        R: DeserializeOwned,
        F: Fn(R) -> std::result::Result<T, String>,
    {
        let url = endpoint.join(path);
        debug!("GET {url} via {}", endpoint.name);

        let response = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| network_error(&url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body = response
            .json::<R>()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    network_error(&url, &e)
                } else {
                    Error::Decode {
                        url: url.clone(),
                        msg: e.to_string(),
                    }
                }
            })?;

        convert(body).map_err(|msg| Error::Decode { url, msg })
    }

    fn note_failure(&self, tracked: &TrackedEndpoint, err: &Error) {
        warn!(
            "{} endpoint '{}' failed: {err}",
            self.upstream, tracked.endpoint.name
        );
        tracked.health.note_failure();
        self.metrics
            .upstream_request_errors
            .with_label_values(&[tracked.endpoint.name.as_str()])
            .inc();
    }
}

fn network_error(url: &str, err: &reqwest::Error) -> Error {
    let msg = if err.is_timeout() {
        "timed out".to_string()
    } else {
        err.to_string()
    };

    Error::Network {
        url: url.to_string(),
        msg,
    }
}

impl RegistersMetrics for FailoverClient {
    fn metrics(&self) -> Vec<Box<dyn Collector>> {
        self.metrics.metrics()
    }
}
