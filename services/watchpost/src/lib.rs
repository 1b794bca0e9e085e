//! Watchpost - endpoint uptime and content monitoring
//!
//! Probes a list of endpoints concurrently, suppresses repeat alerts for
//! failures that were already reported within a time window, and posts the
//! remaining failures to webhooks. One invocation performs one run.

pub mod classifier;
pub mod config;
pub mod dispatcher;
pub mod endpoints;
pub mod error;
pub mod io;
pub mod notifier;
pub mod probe;
pub mod report;
pub mod state;
pub mod suppression;
pub mod tags;
pub mod webhook;

pub use config::{load_config, Config};
pub use error::{Result, WatchpostError};
pub use report::{FailureRecord, RunReport};

use std::sync::Arc;
use std::time::Duration;

use crate::dispatcher::Dispatcher;
use crate::endpoints::Endpoint;
use crate::io::{HttpClient, ReqwestHttpClient};
use crate::notifier::Notifier;
use crate::probe::ProbeWorker;
use crate::state::{FileStateBackend, StateBackend};
use crate::suppression::{Clock, SuppressionStore, SystemClock};
use crate::tags::{SlackTagResolver, TagResolver};
use crate::webhook::WebhookNotifier;

/// Builds a [`Watchpost`] from configuration, with optional injected collaborators
pub struct WatchpostBuilder {
    config: Config,
    http: Option<Arc<dyn HttpClient>>,
    state_backend: Option<Arc<dyn StateBackend>>,
    notifiers: Option<Vec<Arc<dyn Notifier>>>,
    tag_resolver: Option<Arc<dyn TagResolver>>,
    clock: Option<Arc<dyn Clock>>,
}

impl WatchpostBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            http: None,
            state_backend: None,
            notifiers: None,
            tag_resolver: None,
            clock: None,
        }
    }

    pub fn with_http_client(mut self, http: Arc<dyn HttpClient>) -> Self {
        self.http = Some(http);
        self
    }

    /// Replace the file backend named by `suppression.state_file`.
    /// Has no effect when suppression is not configured.
    pub fn with_state_backend(mut self, backend: Arc<dyn StateBackend>) -> Self {
        self.state_backend = Some(backend);
        self
    }

    /// Replace the notifiers built from the `notifications` section
    pub fn with_notifiers(mut self, notifiers: Vec<Arc<dyn Notifier>>) -> Self {
        self.notifiers = Some(notifiers);
        self
    }

    pub fn with_tag_resolver(mut self, resolver: Arc<dyn TagResolver>) -> Self {
        self.tag_resolver = Some(resolver);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Validate the configuration and resolve the endpoint list.
    ///
    /// Every fatal configuration problem surfaces here, before any probing.
    pub async fn build(self) -> Result<Watchpost> {
        let config = self.config;
        config.validate()?;
        let endpoints = endpoints::resolve_endpoints(&config).await?;

        let http: Arc<dyn HttpClient> = match self.http {
            Some(http) => http,
            None => Arc::new(ReqwestHttpClient::new(&config.probe)?),
        };

        let worker = ProbeWorker::new(Arc::clone(&http), config.probe.method);
        let dispatcher = Dispatcher::new(
            worker,
            config.workers,
            config.probe.connect_timeout + config.probe.read_timeout,
        );

        let suppression = config.suppression.as_ref().map(|suppression| {
            let backend = self.state_backend.unwrap_or_else(|| {
                Arc::new(FileStateBackend::new(suppression.state_file.clone()))
            });
            (backend, suppression.window)
        });

        let notifiers = match self.notifiers {
            Some(notifiers) => notifiers,
            None => match &config.notifications {
                Some(notifications) => {
                    let tags = self.tag_resolver.unwrap_or_else(|| {
                        Arc::new(SlackTagResolver::new(
                            notifications.slack.as_ref(),
                            Arc::clone(&http),
                        ))
                    });
                    let webhook: Arc<dyn Notifier> =
                        Arc::new(WebhookNotifier::new(notifications, tags, Arc::clone(&http)));
                    vec![webhook]
                }
                None => Vec::new(),
            },
        };

        tracing::debug!(
            "Built watchpost: endpoints={}, workers={}, suppression={}, notifiers={}",
            endpoints.len(),
            config.workers,
            suppression.is_some(),
            notifiers.len()
        );

        Ok(Watchpost {
            endpoints,
            dispatcher,
            suppression,
            notifiers,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
        })
    }
}

/// A configured monitoring run
pub struct Watchpost {
    endpoints: Vec<Endpoint>,
    dispatcher: Dispatcher,
    suppression: Option<(Arc<dyn StateBackend>, Duration)>,
    notifiers: Vec<Arc<dyn Notifier>>,
    clock: Arc<dyn Clock>,
}

impl Watchpost {
    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    /// Probe every endpoint once, filter the failures through the suppression
    /// store, notify, and persist the store.
    ///
    /// Persistence and delivery problems are logged; they never fail the run.
    pub async fn run_once(&self) -> Result<RunReport> {
        tracing::info!("Probing {} endpoints", self.endpoints.len());
        let failures = self.dispatcher.run(&self.endpoints).await;
        tracing::info!("{} endpoints failed their probe", failures.len());

        let (alertable, store) = match &self.suppression {
            Some((backend, window)) => {
                let mut store = SuppressionStore::load(backend.as_ref()).await;
                let alertable = store.decide(failures, *window, self.clock.now());
                (alertable, Some((backend, store)))
            }
            None => (failures, None),
        };

        let report = RunReport {
            total: self.endpoints.len(),
            failures: alertable,
        };

        for notifier in &self.notifiers {
            if let Err(e) = notifier.notify(&report).await {
                tracing::warn!("Notification via '{}' failed: {}", notifier.type_name(), e);
            }
        }

        if let Some((backend, store)) = store {
            store.save(backend.as_ref()).await;
        }

        for failure in &report.failures {
            tracing::info!("{}", failure);
        }

        Ok(report)
    }
}
