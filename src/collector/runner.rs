use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use reqwest::{Client, Method, StatusCode};
use tokio::sync::OnceCell;
use tokio::task::JoinSet;

use crate::{
    collector::client::build_client,
    config::GoRuntimeConfig,
    error::{EndpointError, FetchError},
    fields::flatten,
    metrics::METRICS,
    schema::RuntimeSnapshot,
    sink::Accumulator,
};

/// Outcome of one poll cycle.
///
/// Errors are informational: a cycle where every endpoint failed
/// still completes normally.
#[derive(Debug, Default)]
pub struct GatherReport {
    /// Endpoints attempted this cycle
    pub polled: usize,

    /// Measurements handed to the accumulator
    pub emitted: usize,

    /// One entry per failed endpoint
    pub errors: Vec<EndpointError>,
}

/// Runtime statistics input.
///
/// Holds the read-only configuration and the lazily built HTTP
/// client. Shared across cycles behind an `Arc`.
///
/// LIFECYCLE:
/// - The client is built on the first `gather` and reused after
/// - A failed build leaves the cell empty, so the next cycle retries
///
pub struct GoRuntime {
    cfg: GoRuntimeConfig,
    method: Method,
    client: OnceCell<Client>,
}

impl GoRuntime {
    pub fn new(cfg: GoRuntimeConfig) -> anyhow::Result<Self> {
        cfg.validate()?;
        let method = Method::from_bytes(cfg.method.as_bytes())?;

        Ok(Self {
            cfg,
            method,
            client: OnceCell::new(),
        })
    }

    pub fn config(&self) -> &GoRuntimeConfig {
        &self.cfg
    }

    pub fn client_initialized(&self) -> bool {
        self.client.initialized()
    }

    async fn client(&self) -> anyhow::Result<&Client> {
        self.client
            .get_or_try_init(|| async {
                log::debug!("building HTTP client (timeout {:?})", self.cfg.timeout);
                build_client(&self.cfg).await
            })
            .await
    }

    /// Runs one poll cycle over every configured URL.
    ///
    /// DESIGN:
    /// - One task per endpoint, all started before any is awaited
    /// - Returns only after every task finished or failed
    /// - Endpoint errors go to `acc.add_error` and into the report
    ///
    /// Only a client construction failure makes this return `Err`.
    ///
    pub async fn gather(
        self: &Arc<Self>,
        acc: Arc<dyn Accumulator>,
    ) -> anyhow::Result<GatherReport> {
        let client = self.client().await?.clone();

        METRICS.cycles.fetch_add(1, Ordering::Relaxed);

        let mut tasks = JoinSet::new();
        let mut urls = HashMap::new();

        for url in self.cfg.urls.iter().cloned() {
            let this = Arc::clone(self);
            let client = client.clone();
            let acc = Arc::clone(&acc);
            let task_url = url.clone();

            let handle = tasks.spawn(async move {
                this.gather_url(&client, acc.as_ref(), &task_url).await
            });
            urls.insert(handle.id(), url);
        }

        let mut report = GatherReport {
            polled: urls.len(),
            ..Default::default()
        };
        METRICS
            .endpoints_polled
            .fetch_add(report.polled, Ordering::Relaxed);

        while let Some(joined) = tasks.join_next_with_id().await {
            let (id, result) = match joined {
                Ok((id, result)) => (id, result),
                Err(e) => (e.id(), Err(FetchError::Task(e.to_string()))),
            };

            match result {
                Ok(()) => report.emitted += 1,
                Err(source) => {
                    if matches!(source, FetchError::Decode(_)) {
                        METRICS.decode_errors.fetch_add(1, Ordering::Relaxed);
                    }
                    METRICS.endpoint_errors.fetch_add(1, Ordering::Relaxed);

                    let url = urls.remove(&id).unwrap_or_default();
                    let err = EndpointError::new(url, source);
                    acc.add_error(&err);
                    report.errors.push(err);
                }
            }
        }

        log::debug!(
            "cycle done: polled={} emitted={} errors={}",
            report.polled,
            report.emitted,
            report.errors.len()
        );

        Ok(report)
    }

    /// Fetches, decodes and emits a single endpoint.
    async fn gather_url(
        &self,
        client: &Client,
        acc: &dyn Accumulator,
        url: &str,
    ) -> Result<(), FetchError> {
        let mut request = client.request(self.method.clone(), url);
        if self.cfg.has_basic_auth() {
            request = request.basic_auth(&self.cfg.username, Some(&self.cfg.password));
        }
        let request = request
            .build()
            .map_err(|e| FetchError::Request(e.to_string()))?;

        let resp = client.execute(request).await?;

        let status = resp.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status { actual: status });
        }

        let body = resp.bytes().await?;
        let data: RuntimeSnapshot = serde_json::from_slice(&body)?;

        self.parse(&data, acc);
        Ok(())
    }

    fn parse(&self, rd: &RuntimeSnapshot, acc: &dyn Accumulator) {
        let (fields, tags) = flatten(rd);
        acc.add_gauge(self.cfg.measurement_name(), fields, tags);
        METRICS.measurements_emitted.fetch_add(1, Ordering::Relaxed);
    }
}
