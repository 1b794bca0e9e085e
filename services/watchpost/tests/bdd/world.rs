//! BDD test world for watchpost

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use cucumber::World;
use watchpost::classifier::Outcome;
use watchpost::config::EndpointRules;
use watchpost::io::{HttpClient, HttpResponse, ProbeRequest, TransportError};
use watchpost::notifier::Notifier;
use watchpost::state::StateBackend;
use watchpost::suppression::Clock;
use watchpost::RunReport;

/// How a scripted endpoint answers a probe
#[derive(Debug, Clone)]
pub enum Scripted {
    Respond { status: u16, body: String },
    ConnectTimeout,
    ReadTimeout,
}

/// An HTTP client whose probe answers are set per URL by the scenario
#[derive(Debug, Clone, Default)]
pub struct ScriptedHttpClient {
    pub answers: Arc<Mutex<HashMap<String, Scripted>>>,
}

impl ScriptedHttpClient {
    pub fn script(&self, url: String, answer: Scripted) {
        self.answers.lock().unwrap().insert(url, answer);
    }
}

#[async_trait::async_trait]
impl HttpClient for ScriptedHttpClient {
    async fn probe(&self, request: &ProbeRequest) -> Result<HttpResponse, TransportError> {
        let answer = self.answers.lock().unwrap().get(&request.url).cloned();
        match answer {
            Some(Scripted::Respond { status, body }) => Ok(HttpResponse { status, body }),
            Some(Scripted::ConnectTimeout) => Err(TransportError::ConnectTimeout),
            Some(Scripted::ReadTimeout) => Err(TransportError::ReadTimeout),
            None => Err(TransportError::Other(format!(
                "no scripted answer for {}",
                request.url
            ))),
        }
    }

    async fn get(&self, url: &str) -> watchpost::Result<HttpResponse> {
        Err(watchpost::WatchpostError::Http(format!("unexpected GET {}", url)))
    }

    async fn post_json(
        &self,
        url: &str,
        _body: &serde_json::Value,
    ) -> watchpost::Result<HttpResponse> {
        Err(watchpost::WatchpostError::Http(format!("unexpected POST {}", url)))
    }
}

/// A state backend that keeps the suppression document in memory across runs
#[derive(Debug, Clone, Default)]
pub struct MemoryStateBackend {
    pub contents: Arc<Mutex<Option<String>>>,
}

#[async_trait::async_trait]
impl StateBackend for MemoryStateBackend {
    async fn read(&self) -> watchpost::Result<Option<String>> {
        Ok(self.contents.lock().unwrap().clone())
    }

    async fn write(&self, contents: &str) -> watchpost::Result<()> {
        *self.contents.lock().unwrap() = Some(contents.to_string());
        Ok(())
    }
}

/// A notifier that records every report it is handed
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    pub reports: Arc<Mutex<Vec<RunReport>>>,
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    fn type_name(&self) -> &str {
        "recording"
    }

    async fn notify(&self, report: &RunReport) -> watchpost::Result<()> {
        self.reports.lock().unwrap().push(report.clone());
        Ok(())
    }
}

/// A clock pinned to one instant
#[derive(Debug)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now(&self) -> i64 {
        self.0
    }
}

#[derive(Debug, Default, World)]
pub struct WatchpostWorld {
    // Run testing
    pub http: ScriptedHttpClient,
    pub state: MemoryStateBackend,
    pub notifier: RecordingNotifier,
    pub endpoints: Vec<String>,
    pub rules: BTreeMap<String, EndpointRules>,
    pub workers: Option<usize>,
    pub window_seconds: Option<u64>,
    pub last_report: Option<RunReport>,

    // Classification testing
    pub probe_result: Option<Result<HttpResponse, TransportError>>,
    pub classify_rules: EndpointRules,
    pub outcome: Option<Option<Outcome>>,
}

impl WatchpostWorld {
    /// Register an endpoint (once) and script its answer
    pub fn script(&mut self, endpoint: &str, answer: Scripted) {
        if !self.endpoints.iter().any(|e| e == endpoint) {
            self.endpoints.push(endpoint.to_string());
        }
        self.http
            .script(watchpost::probe::probe_url(endpoint), answer);
    }
}
