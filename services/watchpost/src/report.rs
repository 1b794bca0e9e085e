//! Failure records and the aggregated run report

use serde::{Deserialize, Serialize};
use std::fmt;

/// An endpoint that failed its probe, keyed by a stable reason tag
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FailureRecord {
    pub endpoint: String,
    pub reason: String,
    /// Human-readable annotation, not part of the suppression key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl FailureRecord {
    pub fn new(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            reason: reason.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl fmt::Display for FailureRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{} - {} ({})", self.endpoint, self.reason, detail),
            None => write!(f, "{} - {}", self.endpoint, self.reason),
        }
    }
}

/// Outcome of one run after suppression: what the notifier gets to see
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub total: usize,
    pub failures: Vec<FailureRecord>,
}

impl RunReport {
    pub fn up(&self) -> usize {
        self.total.saturating_sub(self.failures.len())
    }

    /// Render the alert body: a summary line, then one line per failure
    pub fn message(&self) -> String {
        let mut message = format!("*{}/{}* endpoints are up.\n", self.up(), self.total);
        message.push_str("Following endpoints seem to be down.\n");
        for failure in &self.failures {
            match &failure.detail {
                Some(detail) => message.push_str(&format!(
                    "> {}  *`{}`*  ({})\n",
                    failure.endpoint, failure.reason, detail
                )),
                None => message.push_str(&format!(
                    "> {}  *`{}`*\n",
                    failure.endpoint, failure.reason
                )),
            }
        }
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_lists_every_failure() {
        let report = RunReport {
            total: 3,
            failures: vec![
                FailureRecord::new("b.com", "conn-timeout"),
                FailureRecord::new("c.com", "status-code:503").with_detail("Service Unavailable"),
            ],
        };

        assert_eq!(
            report.message(),
            "*1/3* endpoints are up.\n\
             Following endpoints seem to be down.\n\
             > b.com  *`conn-timeout`*\n\
             > c.com  *`status-code:503`*  (Service Unavailable)\n"
        );
    }

    #[test]
    fn up_never_underflows() {
        let report = RunReport {
            total: 0,
            failures: vec![FailureRecord::new("a.com", "conn-timeout")],
        };
        assert_eq!(report.up(), 0);
    }

    #[test]
    fn display_includes_detail_when_present() {
        let record = FailureRecord::new("a.com", "status-code:599").with_detail("unknown");
        assert_eq!(record.to_string(), "a.com - status-code:599 (unknown)");
        assert_eq!(
            FailureRecord::new("a.com", "content-mismatch").to_string(),
            "a.com - content-mismatch"
        );
    }
}
