//! Probe outcome classification

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::EndpointRules;
use crate::io::{HttpResponse, TransportError};
use crate::report::FailureRecord;

/// Reason tag for a connect-phase timeout
pub const REASON_CONNECT_TIMEOUT: &str = "conn-timeout";
/// Reason tag for a body missing a required substring
pub const REASON_CONTENT_MISMATCH: &str = "content-mismatch";

/// The classification of one probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    HttpError { code: u16, description: String },
    ContentMismatch,
    ConnectTimeout,
    /// The service answered but too slowly; never reported as a failure
    ReadTimeoutIgnored,
}

impl Outcome {
    /// The suppression/report reason tag, or `None` for outcomes that are not failures
    pub fn reason(&self) -> Option<String> {
        match self {
            Outcome::Success | Outcome::ReadTimeoutIgnored => None,
            Outcome::HttpError { code, .. } => Some(format!("status-code:{}", code)),
            Outcome::ContentMismatch => Some(REASON_CONTENT_MISMATCH.to_string()),
            Outcome::ConnectTimeout => Some(REASON_CONNECT_TIMEOUT.to_string()),
        }
    }

    /// Convert into a failure record for `endpoint`, if this outcome is a failure
    pub fn into_failure(self, endpoint: &str) -> Option<FailureRecord> {
        let reason = self.reason()?;
        let record = FailureRecord::new(endpoint, reason);
        Some(match self {
            Outcome::HttpError { description, .. } => record.with_detail(description),
            _ => record,
        })
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success => write!(f, "success"),
            Outcome::HttpError { code, description } => write!(f, "{} {}", code, description),
            Outcome::ContentMismatch => write!(f, "content mismatch"),
            Outcome::ConnectTimeout => write!(f, "connect timeout"),
            Outcome::ReadTimeoutIgnored => write!(f, "read timeout (ignored)"),
        }
    }
}

/// Classify a probe result against the endpoint's rules.
///
/// Returns `None` for transport errors other than the two timeout kinds; those
/// are not classifiable and are left to the caller.
pub fn classify(
    result: Result<&HttpResponse, &TransportError>,
    rules: &EndpointRules,
) -> Option<Outcome> {
    let response = match result {
        Ok(response) => response,
        Err(TransportError::ConnectTimeout) => return Some(Outcome::ConnectTimeout),
        Err(TransportError::ReadTimeout) => return Some(Outcome::ReadTimeoutIgnored),
        Err(TransportError::Other(_)) => return None,
    };

    if rules
        .required_strings
        .iter()
        .any(|required| !response.body.contains(required.as_str()))
    {
        return Some(Outcome::ContentMismatch);
    }

    if response.status >= 500 {
        return Some(Outcome::HttpError {
            code: response.status,
            description: status_description(response.status),
        });
    }

    Some(Outcome::Success)
}

fn status_description(code: u16) -> String {
    reqwest::StatusCode::from_u16(code)
        .ok()
        .and_then(|status| status.canonical_reason())
        .unwrap_or("unknown")
        .to_string()
}
