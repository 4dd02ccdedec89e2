use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use shopbot_core::{Notifier, NotifyError};

use crate::blocks::{Block, MessageTemplate};

pub const DEFAULT_API_BASE_URL: &str = "https://slack.com/api";
const CHANNEL_TYPES: &str = "public_channel,private_channel";
const CHANNEL_PAGE_LIMIT: u32 = 1000;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OutgoingMessage {
    pub channel: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_ts: Option<String>,
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<Block>,
}

impl OutgoingMessage {
    pub fn text(channel: impl Into<String>, text: impl Into<String>) -> Self {
        Self { channel: channel.into(), thread_ts: None, text: text.into(), blocks: Vec::new() }
    }

    pub fn reply(
        channel: impl Into<String>,
        thread_ts: Option<String>,
        template: MessageTemplate,
    ) -> Self {
        Self {
            channel: channel.into(),
            thread_ts,
            text: template.fallback_text,
            blocks: template.blocks,
        }
    }
}

#[async_trait]
pub trait MessagePoster: Send + Sync {
    async fn post_message(&self, message: &OutgoingMessage) -> Result<(), NotifyError>;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SlackUser {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub real_name: Option<String>,
    pub email: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackChannel {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_private: bool,
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(flatten)]
    body: T,
}

#[derive(Debug, Default, Deserialize)]
struct Empty {}

#[derive(Debug, Default, Deserialize)]
struct UsersListBody {
    #[serde(default)]
    members: Vec<Member>,
}

#[derive(Debug, Deserialize)]
struct Member {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    real_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ConversationsBody {
    #[serde(default)]
    channels: Vec<SlackChannel>,
    #[serde(default)]
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ProfileBody {
    #[serde(default)]
    profile: Option<Profile>,
}

#[derive(Debug, Default, Deserialize)]
struct Profile {
    #[serde(default)]
    email: Option<String>,
}

/// Slack Web API client authenticated with the bot token.
#[derive(Clone)]
pub struct SlackWebClient {
    client: Client,
    base_url: String,
    bot_token: SecretString,
}

impl SlackWebClient {
    pub fn new(
        base_url: impl Into<String>,
        bot_token: SecretString,
        timeout: Duration,
    ) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| NotifyError::Unreachable(error.to_string()))?;
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Ok(Self { client, base_url, bot_token })
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/{method}", self.base_url)
    }

    async fn call<T>(&self, request: reqwest::RequestBuilder, method: &str) -> Result<T, NotifyError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let response = request
            .bearer_auth(self.bot_token.expose_secret())
            .send()
            .await
            .map_err(|error| NotifyError::Unreachable(format!("{method}: {error}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Unreachable(format!("{method} returned {status}")));
        }

        let envelope: ApiEnvelope<T> = response
            .json()
            .await
            .map_err(|error| NotifyError::Unreachable(format!("{method}: {error}")))?;
        if !envelope.ok {
            return Err(NotifyError::Rejected(
                envelope.error.unwrap_or_else(|| "unknown_error".to_owned()),
            ));
        }
        Ok(envelope.body)
    }

    pub async fn post(&self, message: &OutgoingMessage) -> Result<(), NotifyError> {
        let request = self.client.post(self.endpoint("chat.postMessage")).json(message);
        self.call::<Empty>(request, "chat.postMessage").await?;
        debug!(
            event_name = "egress.slack.message_posted",
            channel_id = %message.channel,
            threaded = message.thread_ts.is_some(),
            "posted slack message"
        );
        Ok(())
    }

    pub async fn user_email(&self, user_id: &str) -> Result<Option<String>, NotifyError> {
        let request =
            self.client.get(self.endpoint("users.profile.get")).query(&[("user", user_id)]);
        let body: ProfileBody = self.call(request, "users.profile.get").await?;
        Ok(body.profile.and_then(|profile| profile.email))
    }

    /// Workspace members, each enriched with a profile email where one can be read.
    pub async fn list_users(&self) -> Result<Vec<SlackUser>, NotifyError> {
        let request = self.client.get(self.endpoint("users.list"));
        let body: UsersListBody = self.call(request, "users.list").await?;

        let mut users = Vec::with_capacity(body.members.len());
        for member in body.members {
            let email = match self.user_email(&member.id).await {
                Ok(email) => email,
                Err(error) => {
                    warn!(
                        event_name = "egress.slack.profile_lookup_failed",
                        user_id = %member.id,
                        error = %error,
                        "failed to read slack user profile"
                    );
                    None
                }
            };
            users.push(SlackUser {
                id: member.id,
                name: member.name,
                real_name: member.real_name,
                email,
            });
        }
        Ok(users)
    }
}

impl SlackWebClient {
    /// Public and private channels, following `next_cursor` until it comes back empty.
    pub async fn list_channels(&self) -> Result<Vec<SlackChannel>, NotifyError> {
        let mut channels = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut query =
                vec![("types", CHANNEL_TYPES.to_owned()), ("limit", CHANNEL_PAGE_LIMIT.to_string())];
            if let Some(cursor) = &cursor {
                query.push(("cursor", cursor.clone()));
            }
            let request = self.client.get(self.endpoint("conversations.list")).query(&query);
            let page: ConversationsBody = self.call(request, "conversations.list").await?;

            channels.extend(page.channels);
            cursor = page
                .response_metadata
                .and_then(|metadata| metadata.next_cursor)
                .filter(|next| !next.is_empty());
            if cursor.is_none() {
                break;
            }
        }

        debug!(
            event_name = "egress.slack.channels_listed",
            channel_count = channels.len(),
            "listed slack channels"
        );
        Ok(channels)
    }
}

#[async_trait]
impl MessagePoster for SlackWebClient {
    async fn post_message(&self, message: &OutgoingMessage) -> Result<(), NotifyError> {
        self.post(message).await
    }
}

#[async_trait]
impl Notifier for SlackWebClient {
    async fn notify(&self, channel_id: &str, text: &str) -> Result<(), NotifyError> {
        self.post(&OutgoingMessage::text(channel_id, text)).await
    }
}
