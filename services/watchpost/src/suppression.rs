//! Time-windowed alert suppression keyed by (endpoint, reason)

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::report::FailureRecord;
use crate::state::StateBackend;

/// Source of wall-clock time in epoch seconds
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now(&self) -> i64;
}

/// The system wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// One persisted suppression record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuppressionEntry {
    pub endpoint: String,
    pub reason: String,
    pub last_alerted: i64,
}

/// When each (endpoint, reason) pair was last alerted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuppressionStore {
    entries: BTreeMap<(String, String), i64>,
}

impl SuppressionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = SuppressionEntry>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|e| ((e.endpoint, e.reason), e.last_alerted))
                .collect(),
        }
    }

    pub fn entries(&self) -> Vec<SuppressionEntry> {
        self.entries
            .iter()
            .map(|((endpoint, reason), last_alerted)| SuppressionEntry {
                endpoint: endpoint.clone(),
                reason: reason.clone(),
                last_alerted: *last_alerted,
            })
            .collect()
    }

    pub fn last_alerted(&self, endpoint: &str, reason: &str) -> Option<i64> {
        self.entries
            .get(&(endpoint.to_string(), reason.to_string()))
            .copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Filter `failures` down to the ones worth alerting and record them.
    ///
    /// A failure is suppressed when the same (endpoint, reason) was alerted
    /// less than `window` ago; its entry is left as is. Otherwise the entry is
    /// created or refreshed to `now` and the failure is kept.
    pub fn decide(
        &mut self,
        failures: Vec<FailureRecord>,
        window: Duration,
        now: i64,
    ) -> Vec<FailureRecord> {
        let window = i64::try_from(window.as_secs()).unwrap_or(i64::MAX);
        let mut alertable = Vec::with_capacity(failures.len());

        for failure in failures {
            let key = (failure.endpoint.clone(), failure.reason.clone());
            match self.entries.entry(key) {
                Entry::Occupied(mut entry) => {
                    let elapsed = now.saturating_sub(*entry.get());
                    if elapsed < window {
                        tracing::debug!(
                            "Suppressing {} (alerted {}s ago)",
                            failure,
                            elapsed
                        );
                        continue;
                    }
                    entry.insert(now);
                }
                Entry::Vacant(entry) => {
                    entry.insert(now);
                }
            }
            alertable.push(failure);
        }

        alertable
    }

    /// Parse the line-record format: `endpoint,reason,timestamp` per line.
    ///
    /// Fields are split from the right, so the endpoint may itself contain
    /// commas. Any malformed line rejects the whole document.
    pub fn parse(content: &str) -> crate::Result<Self> {
        let mut entries = BTreeMap::new();

        for (number, line) in content.lines().enumerate() {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }

            let malformed = || {
                crate::WatchpostError::State(format!(
                    "Malformed suppression record on line {}: {:?}",
                    number + 1,
                    line
                ))
            };

            let mut fields = line.rsplitn(3, ',');
            let timestamp = fields.next().ok_or_else(malformed)?;
            let reason = fields.next().ok_or_else(malformed)?;
            let endpoint = fields.next().ok_or_else(malformed)?;
            if endpoint.is_empty() || reason.is_empty() {
                return Err(malformed());
            }
            let timestamp: i64 = timestamp.trim().parse().map_err(|_| malformed())?;

            entries.insert((endpoint.to_string(), reason.to_string()), timestamp);
        }

        Ok(Self { entries })
    }

    /// Serialize to the line-record format, one newline-terminated record per entry
    pub fn to_lines(&self) -> String {
        self.entries
            .iter()
            .map(|((endpoint, reason), timestamp)| {
                format!("{},{},{}\n", endpoint, reason, timestamp)
            })
            .collect()
    }

    /// Load the store, falling back to an empty one if it is absent or unreadable
    pub async fn load(backend: &dyn StateBackend) -> Self {
        match backend.read().await {
            Ok(Some(contents)) => match Self::parse(&contents) {
                Ok(store) => {
                    tracing::debug!("Loaded {} suppression entries", store.len());
                    store
                }
                Err(e) => {
                    tracing::warn!("{}; starting with empty suppression state", e);
                    Self::new()
                }
            },
            Ok(None) => {
                tracing::debug!("No suppression state stored yet");
                Self::new()
            }
            Err(e) => {
                tracing::warn!("{}; starting with empty suppression state", e);
                Self::new()
            }
        }
    }

    /// Persist the store. Failures are logged and otherwise ignored.
    pub async fn save(&self, backend: &dyn StateBackend) {
        match backend.write(&self.to_lines()).await {
            Ok(()) => tracing::debug!("Saved {} suppression entries", self.len()),
            Err(e) => tracing::error!("Failed to persist suppression state: {}", e),
        }
    }
}
