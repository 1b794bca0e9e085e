//! Probe worker: probes the endpoints of one shard in sequence

use std::sync::Arc;

use crate::classifier::classify;
use crate::config::ProbeMethod;
use crate::endpoints::Endpoint;
use crate::io::{HttpClient, ProbeRequest};
use crate::report::FailureRecord;

/// Every probe is issued over this scheme, whatever the endpoint was written with
const PROBE_SCHEME: &str = "http://";

/// Build the probe URL for an endpoint, dropping any scheme it carries
pub fn probe_url(endpoint: &str) -> String {
    let host = endpoint
        .strip_prefix("http://")
        .or_else(|| endpoint.strip_prefix("https://"))
        .unwrap_or(endpoint);
    format!("{}{}", PROBE_SCHEME, host)
}

/// Probes a shard of endpoints and classifies each result
#[derive(Clone)]
pub struct ProbeWorker {
    http: Arc<dyn HttpClient>,
    method: ProbeMethod,
}

impl std::fmt::Debug for ProbeWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeWorker")
            .field("method", &self.method)
            .finish()
    }
}

impl ProbeWorker {
    pub fn new(http: Arc<dyn HttpClient>, method: ProbeMethod) -> Self {
        Self { http, method }
    }

    /// Probe every endpoint of the shard and return the failures, in shard order.
    ///
    /// A transport error that is neither a connect nor a read timeout aborts
    /// the shard with [`crate::WatchpostError::Worker`].
    pub async fn probe_shard(&self, endpoints: &[Endpoint]) -> crate::Result<Vec<FailureRecord>> {
        let mut failures = Vec::new();

        for endpoint in endpoints {
            let request = ProbeRequest {
                method: self.method,
                url: probe_url(&endpoint.name),
                auth: endpoint.rules.auth.clone(),
            };

            let result = self.http.probe(&request).await;
            let outcome = classify(result.as_ref(), &endpoint.rules).ok_or_else(|| {
                let cause = result
                    .as_ref()
                    .err()
                    .map(ToString::to_string)
                    .unwrap_or_default();
                crate::WatchpostError::Worker(format!(
                    "Probe of '{}' failed: {}",
                    endpoint.name, cause
                ))
            })?;

            tracing::debug!("Probe '{}': {}", endpoint.name, outcome);

            if let Some(failure) = outcome.into_failure(&endpoint.name) {
                failures.push(failure);
            }
        }

        Ok(failures)
    }
}
