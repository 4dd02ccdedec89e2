use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

use shopbot_core::{ApplicationError, Product};

use crate::blocks::{self, MessageTemplate};

pub const COMMAND_KEYWORD: &str = "query";
pub const USAGE_HINT: &str =
    "Usage: `query - <min>-<max> - <limit>` (three whole numbers, e.g. `query - 100-200 - 5`)";

/// A message that reached the bot, already stripped of transport details.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandEnvelope {
    pub text: String,
    pub channel_id: String,
    pub user_id: String,
    pub thread_ts: Option<String>,
    pub request_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProductQuery {
    pub min_price: u64,
    pub max_price: u64,
    pub limit: u64,
    pub raw_text: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatCommand {
    Query(ProductQuery),
    /// Addressed to the bot but not in the accepted shape.
    Usage,
    /// Ordinary channel chatter.
    NotACommand,
}

fn query_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^query\s*-\s*(\d+)-(\d+)\s*-\s*(\d+)$")
            .expect("query command pattern is a valid regex")
    })
}

pub fn parse_chat_command(input: &str) -> ChatCommand {
    let trimmed = input.trim();
    let Some(captures) = query_pattern().captures(trimmed) else {
        return if is_addressed_to_bot(trimmed) { ChatCommand::Usage } else { ChatCommand::NotACommand };
    };

    let number = |index: usize| captures.get(index).and_then(|m| m.as_str().parse::<u64>().ok());
    match (number(1), number(2), number(3)) {
        (Some(min_price), Some(max_price), Some(limit)) => ChatCommand::Query(ProductQuery {
            min_price,
            max_price,
            limit,
            raw_text: trimmed.to_owned(),
        }),
        _ => ChatCommand::Usage,
    }
}

fn is_addressed_to_bot(text: &str) -> bool {
    let keyword = text.split(|ch: char| ch.is_whitespace() || ch == '-').next().unwrap_or_default();
    keyword.eq_ignore_ascii_case(COMMAND_KEYWORD) || keyword.eq_ignore_ascii_case("help")
}

/// Runs an accepted product query. Implementations record the query before fetching.
#[async_trait]
pub trait ProductQueryService: Send + Sync {
    async fn query_products(
        &self,
        query: &ProductQuery,
        envelope: &CommandEnvelope,
    ) -> Result<Vec<Product>, ApplicationError>;
}

pub struct CommandRouter<S> {
    service: S,
}

impl<S> CommandRouter<S>
where
    S: ProductQueryService,
{
    pub fn new(service: S) -> Self {
        Self { service }
    }

    /// `None` means the message was not meant for the bot.
    pub async fn route(&self, envelope: &CommandEnvelope) -> Option<MessageTemplate> {
        match parse_chat_command(&envelope.text) {
            ChatCommand::Query(query) => {
                Some(match self.service.query_products(&query, envelope).await {
                    Ok(products) => blocks::product_results_message(&query, &products),
                    Err(error) => {
                        blocks::error_message(&format!("Error: {error}"), &envelope.request_id)
                    }
                })
            }
            ChatCommand::Usage => Some(blocks::usage_message()),
            ChatCommand::NotACommand => {
                debug!(request_id = %envelope.request_id, "ignoring non-command message");
                None
            }
        }
    }
}

#[cfg(test)]
#[derive(Default)]
pub(crate) struct NoopProductQueryService;

#[cfg(test)]
#[async_trait]
impl ProductQueryService for NoopProductQueryService {
    async fn query_products(
        &self,
        _query: &ProductQuery,
        _envelope: &CommandEnvelope,
    ) -> Result<Vec<Product>, ApplicationError> {
        Ok(Vec::new())
    }
}
