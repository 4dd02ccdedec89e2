use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::{
    blocks::MessageTemplate,
    commands::{CommandEnvelope, CommandRouter, ProductQueryService},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlackEnvelope {
    pub envelope_id: String,
    pub event: SlackEvent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlackEvent {
    Message(MessageEvent),
    Unsupported { event_type: String },
}

impl SlackEvent {
    pub fn event_type(&self) -> SlackEventType {
        match self {
            Self::Message(_) => SlackEventType::Message,
            Self::Unsupported { .. } => SlackEventType::Unsupported,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SlackEventType {
    Message,
    Unsupported,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageEvent {
    pub channel_id: String,
    pub user_id: String,
    pub text: String,
    pub ts: String,
    pub thread_ts: Option<String>,
}

impl MessageEvent {
    /// Where a reply belongs: the originating thread if there is one.
    pub fn reply_thread(&self) -> Option<&str> {
        self.thread_ts.as_deref()
    }
}

/// Body of a request delivered by the Events API webhook.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventsApiRequest {
    UrlVerification { challenge: String },
    Event(SlackEnvelope),
    /// Bot echoes, edits and other message subtypes the listener must not answer.
    Ignored,
}

#[derive(Debug, Error)]
#[error("malformed events payload: {0}")]
pub struct EventsPayloadError(String);

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RawRequest {
    UrlVerification {
        challenge: String,
    },
    EventCallback {
        #[serde(default)]
        event_id: Option<String>,
        event: RawEvent,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    subtype: Option<String>,
    #[serde(default)]
    bot_id: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    ts: Option<String>,
    #[serde(default)]
    thread_ts: Option<String>,
}

pub fn parse_events_request(body: &[u8]) -> Result<EventsApiRequest, EventsPayloadError> {
    let raw: RawRequest =
        serde_json::from_slice(body).map_err(|error| EventsPayloadError(error.to_string()))?;

    let (event_id, event) = match raw {
        RawRequest::UrlVerification { challenge } => {
            return Ok(EventsApiRequest::UrlVerification { challenge })
        }
        RawRequest::EventCallback { event_id, event } => (event_id, event),
        RawRequest::Other => return Ok(EventsApiRequest::Ignored),
    };

    if event.event_type != "message" {
        return Ok(EventsApiRequest::Event(SlackEnvelope {
            envelope_id: event_id.unwrap_or_default(),
            event: SlackEvent::Unsupported { event_type: event.event_type },
        }));
    }
    if event.bot_id.is_some() || event.subtype.is_some() {
        return Ok(EventsApiRequest::Ignored);
    }

    let (Some(channel_id), Some(user_id), Some(ts)) = (event.channel, event.user, event.ts) else {
        return Err(EventsPayloadError("message event without channel, user or ts".to_owned()));
    };
    let envelope_id = event_id.unwrap_or_else(|| format!("{channel_id}-{ts}"));

    Ok(EventsApiRequest::Event(SlackEnvelope {
        envelope_id,
        event: SlackEvent::Message(MessageEvent {
            channel_id,
            user_id,
            text: event.text.unwrap_or_default(),
            ts,
            thread_ts: event.thread_ts,
        }),
    }))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    Responded(MessageTemplate),
    Processed,
    Ignored,
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> SlackEventType;
    async fn handle(&self, envelope: &SlackEnvelope, ctx: &EventContext) -> HandlerResult;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<SlackEventType, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.event_type(), Arc::new(handler));
    }

    pub async fn dispatch(&self, envelope: &SlackEnvelope, ctx: &EventContext) -> HandlerResult {
        let Some(handler) = self.handlers.get(&envelope.event.event_type()) else {
            return HandlerResult::Ignored;
        };

        handler.handle(envelope, ctx).await
    }
}

#[cfg(test)]
pub(crate) fn default_dispatcher() -> EventDispatcher {
    dispatcher_with_service(crate::commands::NoopProductQueryService)
}

pub fn dispatcher_with_service<S>(service: S) -> EventDispatcher
where
    S: ProductQueryService + 'static,
{
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(MessageHandler::new(service));
    dispatcher
}

pub struct MessageHandler<S> {
    router: CommandRouter<S>,
}

impl<S> MessageHandler<S>
where
    S: ProductQueryService,
{
    pub fn new(service: S) -> Self {
        Self { router: CommandRouter::new(service) }
    }
}

#[async_trait]
impl<S> EventHandler for MessageHandler<S>
where
    S: ProductQueryService + 'static,
{
    fn event_type(&self) -> SlackEventType {
        SlackEventType::Message
    }

    async fn handle(&self, envelope: &SlackEnvelope, ctx: &EventContext) -> HandlerResult {
        let SlackEvent::Message(event) = &envelope.event else {
            return HandlerResult::Ignored;
        };

        let command = CommandEnvelope {
            text: event.text.clone(),
            channel_id: event.channel_id.clone(),
            user_id: event.user_id.clone(),
            thread_ts: event.thread_ts.clone(),
            request_id: ctx.correlation_id.clone(),
        };

        match self.router.route(&command).await {
            Some(message) => HandlerResult::Responded(message),
            None => HandlerResult::Processed,
        }
    }
}
