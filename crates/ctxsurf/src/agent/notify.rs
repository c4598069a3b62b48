//! Best-effort group-chat notifications.
//!
//! Delivery is fire-and-forget: the response body is never inspected and
//! callers discard errors after logging them.

use std::future::Future;
use std::pin::Pin;

use serde::Serialize;

use crate::config::SurfConfig;

/// Sub-path of the group-chat endpoint.
pub const GROUPCHAT_PATH: &str = "/api/groupchat/send";

/// Channel notifications are posted to.
pub const DEFAULT_CHANNEL: &str = "dev";

/// Boxed future returned by [`Notifier::notify`].
pub type NotifyFuture<'a> = Pin<Box<dyn Future<Output = Result<(), String>> + Send + 'a>>;

/// Sends a short message to the team's collaboration channel.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str) -> NotifyFuture<'_>;
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GroupChatMessage {
    pub team_id: String,
    pub author: String,
    pub author_type: String,
    pub message: String,
    pub channel: String,
}

/// Posts [`GroupChatMessage`]s to `{api_url}/api/groupchat/send`.
#[derive(Debug, Clone)]
pub struct HttpNotifier {
    client: reqwest::Client,
    endpoint: String,
    team_id: String,
    author: String,
}

impl HttpNotifier {
    pub fn new(client: reqwest::Client, config: &SurfConfig) -> Self {
        Self {
            client,
            endpoint: format!(
                "{}{GROUPCHAT_PATH}",
                config.api_url.trim_end_matches('/')
            ),
            team_id: config.team_id.clone(),
            author: config.agent_id.clone(),
        }
    }

    pub fn message(&self, text: &str) -> GroupChatMessage {
        GroupChatMessage {
            team_id: self.team_id.clone(),
            author: self.author.clone(),
            author_type: "agent".into(),
            message: text.into(),
            channel: DEFAULT_CHANNEL.into(),
        }
    }
}

impl Notifier for HttpNotifier {
    fn notify(&self, message: &str) -> NotifyFuture<'_> {
        let body = self.message(message);
        Box::pin(async move {
            self.client
                .post(&self.endpoint)
                .json(&body)
                .send()
                .await
                .map(|_| ())
                .map_err(|e| format!("group chat notify failed: {e}"))
        })
    }
}

/// Drops every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _message: &str) -> NotifyFuture<'_> {
        Box::pin(std::future::ready(Ok(())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_shape() {
        let config = SurfConfig::defaults_from(|_| None)
            .with_agent_id("agent-9")
            .with_team_id("team-9")
            .with_api_url("http://chat.local/");
        let notifier = HttpNotifier::new(reqwest::Client::new(), &config);
        assert_eq!(notifier.endpoint, "http://chat.local/api/groupchat/send");

        let json = serde_json::to_value(notifier.message("hello")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "teamId": "team-9",
                "author": "agent-9",
                "authorType": "agent",
                "message": "hello",
                "channel": "dev"
            })
        );
    }
}
