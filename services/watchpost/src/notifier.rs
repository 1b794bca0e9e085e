//! Notifier trait for sending run reports

use async_trait::async_trait;

use crate::report::RunReport;

/// Trait for delivering a run report to a channel
#[async_trait]
pub trait Notifier: Send + Sync + std::fmt::Debug {
    /// Get the notifier type name (e.g. "webhook")
    fn type_name(&self) -> &str;

    /// Deliver the report. Implementations decide themselves when there is
    /// nothing worth sending.
    async fn notify(&self, report: &RunReport) -> crate::Result<()>;
}
