//! Endpoint descriptors and endpoint list loading

use std::collections::HashSet;
use std::path::Path;

use crate::config::{Config, EndpointRules};

/// Rows containing this marker are template placeholders, not real endpoints
const PLACEHOLDER_MARKER: &str = "sample.domain";

/// A single endpoint to probe, with the rules that apply to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub name: String,
    pub rules: EndpointRules,
}

impl Endpoint {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rules: EndpointRules::default(),
        }
    }

    pub fn with_rules(mut self, rules: EndpointRules) -> Self {
        self.rules = rules;
        self
    }
}

/// First field of a CSV row. A quoted field may contain commas and `""`
/// escapes; quoted fields spanning several lines are not supported.
fn first_column(line: &str) -> String {
    let line = line.trim_start();
    let Some(quoted) = line.strip_prefix('"') else {
        return line.split(',').next().unwrap_or_default().trim().to_string();
    };

    let mut field = String::new();
    let mut chars = quoted.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '"' {
            field.push(c);
        } else if chars.peek() == Some(&'"') {
            chars.next();
            field.push('"');
        } else {
            break;
        }
    }
    field.trim().to_string()
}

/// Extract endpoint names from an endpoints CSV document.
///
/// The first line is a header. The endpoint is the first column of every
/// following non-empty row.
pub fn parse_endpoints_csv(content: &str) -> Vec<String> {
    content
        .lines()
        .skip(1)
        .map(first_column)
        .filter(|name| !name.is_empty() && !name.contains(PLACEHOLDER_MARKER))
        .collect()
}

/// Read an endpoints CSV file from disk
pub async fn load_endpoints_file(path: &Path) -> crate::Result<Vec<String>> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        crate::WatchpostError::Config(format!("Failed to read endpoints file {:?}: {}", path, e))
    })?;
    let endpoints = parse_endpoints_csv(&content);
    tracing::debug!("Loaded {} endpoints from {:?}", endpoints.len(), path);
    Ok(endpoints)
}

/// Build the full endpoint list for a run: inline endpoints first, then the
/// endpoints file, duplicates dropped, rules attached.
pub async fn resolve_endpoints(config: &Config) -> crate::Result<Vec<Endpoint>> {
    let mut names = config.endpoints.clone();
    if let Some(path) = &config.endpoints_file {
        names.extend(load_endpoints_file(path).await?);
    }

    let mut seen = HashSet::new();
    let endpoints: Vec<Endpoint> = names
        .into_iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty() && seen.insert(name.clone()))
        .map(|name| {
            let rules = config.rules.get(&name).cloned().unwrap_or_default();
            Endpoint::new(name).with_rules(rules)
        })
        .collect();

    if endpoints.is_empty() {
        return Err(crate::WatchpostError::Config(
            "No endpoints configured".to_string(),
        ));
    }

    for name in config.rules.keys() {
        if !endpoints.iter().any(|e| &e.name == name) {
            tracing::warn!("Rules configured for unknown endpoint '{}'", name);
        }
    }

    Ok(endpoints)
}
