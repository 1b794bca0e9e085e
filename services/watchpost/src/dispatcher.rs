//! Dispatcher: shards endpoints across concurrent probe workers and fans in the failures

use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::endpoints::Endpoint;
use crate::probe::ProbeWorker;
use crate::report::FailureRecord;

/// Extra time a worker gets beyond its worst-case probe time before it is abandoned
const DEFAULT_JOIN_GRACE: Duration = Duration::from_secs(5);

/// Split `endpoints` into `min(worker_count, len)` contiguous shards.
///
/// Every shard holds `len / shards` endpoints except the last, which also
/// takes the remainder.
pub fn partition(endpoints: &[Endpoint], worker_count: usize) -> Vec<&[Endpoint]> {
    let shards = worker_count.min(endpoints.len());
    if shards == 0 {
        return Vec::new();
    }

    let chunk_size = endpoints.len() / shards;
    (0..shards)
        .map(|i| {
            let start = i * chunk_size;
            let end = if i + 1 == shards {
                endpoints.len()
            } else {
                start + chunk_size
            };
            &endpoints[start..end]
        })
        .collect()
}

/// Runs one probe worker per shard and collects their failures
#[derive(Debug)]
pub struct Dispatcher {
    worker: ProbeWorker,
    worker_count: usize,
    per_endpoint_budget: Duration,
    join_grace: Duration,
}

impl Dispatcher {
    /// `per_endpoint_budget` is the longest a single probe can take, normally
    /// the connect timeout plus the read timeout.
    pub fn new(worker: ProbeWorker, worker_count: usize, per_endpoint_budget: Duration) -> Self {
        Self {
            worker,
            worker_count,
            per_endpoint_budget,
            join_grace: DEFAULT_JOIN_GRACE,
        }
    }

    pub fn with_join_grace(mut self, join_grace: Duration) -> Self {
        self.join_grace = join_grace;
        self
    }

    /// Probe all endpoints and return the failures of every shard that
    /// completed, concatenated in launch order.
    ///
    /// A shard whose worker errors, panics or overruns its deadline is logged
    /// and contributes nothing; the other shards are unaffected.
    pub async fn run(&self, endpoints: &[Endpoint]) -> Vec<FailureRecord> {
        let shards = partition(endpoints, self.worker_count);
        tracing::debug!(
            "Dispatching {} endpoints across {} workers",
            endpoints.len(),
            shards.len()
        );

        let mut pending = Vec::with_capacity(shards.len());
        for (index, shard) in shards.into_iter().enumerate() {
            let shard: Vec<Endpoint> = shard.to_vec();
            let deadline = Instant::now() + self.shard_budget(shard.len());
            let worker = self.worker.clone();
            let (tx, rx) = oneshot::channel();

            let handle = tokio::spawn(async move {
                let result = worker.probe_shard(&shard).await;
                // The receiver is gone only if the dispatcher gave up on this shard
                let _ = tx.send(result);
            });
            pending.push((index, deadline, rx, handle));
        }

        let mut failures = Vec::new();
        for (index, deadline, rx, handle) in pending {
            match tokio::time::timeout_at(deadline, rx).await {
                Ok(Ok(Ok(shard_failures))) => {
                    tracing::debug!(
                        "Worker {} reported {} failures",
                        index,
                        shard_failures.len()
                    );
                    failures.extend(shard_failures);
                }
                Ok(Ok(Err(e))) => {
                    tracing::error!("Worker {} aborted its shard: {}", index, e);
                }
                Ok(Err(_)) => {
                    tracing::error!("Worker {} exited without reporting", index);
                }
                Err(_) => {
                    tracing::error!("Worker {} missed its deadline, abandoning shard", index);
                    handle.abort();
                }
            }
        }

        failures
    }

    fn shard_budget(&self, shard_len: usize) -> Duration {
        let probes = u32::try_from(shard_len).unwrap_or(u32::MAX);
        self.per_endpoint_budget
            .saturating_mul(probes)
            .saturating_add(self.join_grace)
    }
}
