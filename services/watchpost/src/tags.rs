//! Resolution of human mention tags into Slack mention markup

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::SlackConfig;
use crate::io::HttpClient;

const SLACK_API_URL: &str = "https://slack.com/api";
const HERE_TAG: &str = "@here";

/// Turns configured tags (`@here`, `@alice`, `@oncall`) into a mention prefix
#[async_trait]
pub trait TagResolver: Send + Sync + std::fmt::Debug {
    /// Resolve `tags` into a mention string, newline-terminated when non-empty.
    /// Tags that cannot be resolved are dropped.
    async fn resolve(&self, tags: &[String]) -> String;
}

#[derive(Debug, Deserialize)]
struct UsersList {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    members: Vec<Member>,
}

#[derive(Debug, Deserialize)]
struct Member {
    #[serde(default)]
    id: String,
    #[serde(default)]
    profile: Option<Profile>,
}

#[derive(Debug, Deserialize)]
struct Profile {
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserGroupsList {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    usergroups: Vec<UserGroup>,
}

#[derive(Debug, Deserialize)]
struct UserGroup {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    handle: Option<String>,
}

/// Resolves tags against the Slack users and user groups APIs
pub struct SlackTagResolver {
    bot_token: Option<String>,
    workspace_token: Option<String>,
    http: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for SlackTagResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackTagResolver")
            .field("has_bot_token", &self.bot_token.is_some())
            .field("has_workspace_token", &self.workspace_token.is_some())
            .finish()
    }
}

impl SlackTagResolver {
    pub fn new(config: Option<&SlackConfig>, http: Arc<dyn HttpClient>) -> Self {
        let config = config.cloned().unwrap_or_default();
        Self {
            bot_token: config.bot_token,
            workspace_token: config.workspace_token,
            http,
        }
    }

    async fn fetch<T: DeserializeOwned>(&self, url: &str, what: &str) -> Option<T> {
        let response = match self.http.get(url).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Slack {} request failed: {}", what, e);
                return None;
            }
        };

        if response.status != 200 {
            tracing::warn!("Slack {} returned status {}", what, response.status);
            return None;
        }

        match serde_json::from_str(&response.body) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::warn!("Failed to parse Slack {} response: {}", what, e);
                None
            }
        }
    }

    async fn user_mentions(&self, names: &[&str]) -> Vec<String> {
        let Some(token) = &self.bot_token else {
            tracing::info!("`bot_token` is required for Slack to resolve user tags");
            return Vec::new();
        };

        let url = format!("{}/users.list?token={}", SLACK_API_URL, token);
        let Some(list) = self.fetch::<UsersList>(&url, "users.list").await else {
            return Vec::new();
        };
        if !list.ok {
            tracing::warn!("Failed to get user ids for tags: {:?}", names);
            return Vec::new();
        }

        let ids: Vec<String> = names
            .iter()
            .flat_map(|name| {
                list.members.iter().filter(move |member| {
                    member
                        .profile
                        .as_ref()
                        .and_then(|p| p.display_name.as_deref())
                        .is_some_and(|display_name| display_name == *name)
                })
            })
            .map(|member| member.id.clone())
            .collect();

        tracing::info!("Detected user ids for Slack are: {:?}", ids);
        ids.into_iter().map(|id| format!("<@{}>", id)).collect()
    }

    async fn team_mentions(&self, names: &[&str]) -> Vec<String> {
        let Some(token) = &self.workspace_token else {
            tracing::info!("`workspace_token` is required for Slack to resolve team tags");
            return Vec::new();
        };

        let url = format!("{}/usergroups.list?token={}", SLACK_API_URL, token);
        let Some(list) = self.fetch::<UserGroupsList>(&url, "usergroups.list").await else {
            return Vec::new();
        };
        if !list.ok {
            tracing::warn!("Failed to get team ids for tags: {:?}", names);
            return Vec::new();
        }

        let ids: Vec<String> = names
            .iter()
            .flat_map(|name| {
                list.usergroups
                    .iter()
                    .filter(move |group| group.handle.as_deref() == Some(*name))
            })
            .filter_map(|group| group.id.clone())
            .collect();

        tracing::info!("Detected team ids for Slack are: {:?}", ids);
        ids.into_iter()
            .map(|id| format!("<!subteam^{}>", id))
            .collect()
    }
}

#[async_trait]
impl TagResolver for SlackTagResolver {
    async fn resolve(&self, tags: &[String]) -> String {
        let mut mentions = Vec::new();
        if tags.iter().any(|tag| tag == HERE_TAG) {
            mentions.push("<!here>".to_string());
        }

        let names: Vec<&str> = tags
            .iter()
            .filter(|tag| tag.as_str() != HERE_TAG)
            .map(|tag| tag.trim_start_matches('@'))
            .filter(|name| !name.is_empty())
            .collect();

        if !names.is_empty() {
            mentions.extend(self.user_mentions(&names).await);
            mentions.extend(self.team_mentions(&names).await);
        }

        if mentions.is_empty() {
            String::new()
        } else {
            format!("{}\n", mentions.join(" "))
        }
    }
}
