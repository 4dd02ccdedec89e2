use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    events::{EventContext, EventDispatcher, HandlerResult, SlackEnvelope, SlackEvent},
    web::{MessagePoster, OutgoingMessage},
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EnqueueError {
    #[error("listener queue is full")]
    Full,
    #[error("listener is no longer accepting events")]
    Closed,
}

/// In-process queue between the Events API webhook and the listener.
pub struct ChannelTransport {
    receiver: mpsc::Receiver<SlackEnvelope>,
}

#[derive(Clone, Debug)]
pub struct EnvelopeSender {
    sender: mpsc::Sender<SlackEnvelope>,
}

impl ChannelTransport {
    pub fn new(capacity: usize) -> (Self, EnvelopeSender) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { receiver }, EnvelopeSender { sender })
    }
}

impl EnvelopeSender {
    /// Never waits; the webhook has to answer Slack within its delivery window.
    pub fn try_push(&self, envelope: SlackEnvelope) -> Result<(), EnqueueError> {
        self.sender.try_send(envelope).map_err(|error| match error {
            TrySendError::Full(_) => EnqueueError::Full,
            TrySendError::Closed(_) => EnqueueError::Closed,
        })
    }
}

pub struct ListenerRunner {
    transport: ChannelTransport,
    dispatcher: EventDispatcher,
    poster: Arc<dyn MessagePoster>,
}

impl ListenerRunner {
    pub fn new(
        transport: ChannelTransport,
        dispatcher: EventDispatcher,
        poster: Arc<dyn MessagePoster>,
    ) -> Self {
        Self { transport, dispatcher, poster }
    }

    /// Pumps envelopes until `shutdown` fires or every sender is dropped.
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!(event_name = "ingress.chat.listener_started", "chat listener started");

        loop {
            let next = tokio::select! {
                biased;
                _ = shutdown.cancelled() => None,
                next = self.transport.receiver.recv() => next,
            };
            let Some(envelope) = next else {
                break;
            };

            info!(
                event_name = "ingress.chat.envelope_received",
                envelope_id = %envelope.envelope_id,
                event_type = ?envelope.event.event_type(),
                correlation_id = %envelope.envelope_id,
                "received chat envelope"
            );
            self.handle_envelope(&envelope).await;
        }

        self.transport.receiver.close();
        info!(event_name = "ingress.chat.listener_stopped", "chat listener stopped");
    }

    async fn handle_envelope(&self, envelope: &SlackEnvelope) {
        let context = EventContext { correlation_id: envelope.envelope_id.clone() };
        let reply = match self.dispatcher.dispatch(envelope, &context).await {
            HandlerResult::Responded(reply) => reply,
            result => {
                debug!(envelope_id = %envelope.envelope_id, ?result, "no reply for envelope");
                return;
            }
        };

        let SlackEvent::Message(event) = &envelope.event else {
            return;
        };
        let outgoing = OutgoingMessage::reply(
            &event.channel_id,
            event.reply_thread().map(str::to_owned),
            reply,
        );
        match self.poster.post_message(&outgoing).await {
            Ok(()) => debug!(
                event_name = "egress.chat.reply_sent",
                envelope_id = %envelope.envelope_id,
                channel_id = %event.channel_id,
                "posted chat reply"
            ),
            Err(error) => warn!(
                event_name = "egress.chat.reply_failed",
                envelope_id = %envelope.envelope_id,
                channel_id = %event.channel_id,
                error = %error,
                "failed to post chat reply"
            ),
        }
    }
}
