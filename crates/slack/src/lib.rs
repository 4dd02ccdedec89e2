//! Slack integration for shopbot
//!
//! - **Commands** (`commands`) - parses `query - <min>-<max> - <limit>` chat messages
//! - **Events** (`events`) - Events API payloads and handler dispatch
//! - **Listener** (`listener`) - queue-fed event loop with cancellation
//! - **Web API** (`web`) - `chat.postMessage`, `users.list`, `users.profile.get`,
//!   `conversations.list`
//! - **Block Kit** (`blocks`) - reply builders
//!
//! # Architecture
//!
//! ```text
//! POST /slack/events → EnvelopeSender → ListenerRunner → EventDispatcher → CommandRouter
//!                                             ↓
//!                        chat.postMessage ← MessageTemplate
//! ```

pub mod blocks;
pub mod commands;
pub mod events;
pub mod listener;
pub mod web;

pub use commands::{CommandEnvelope, ProductQuery, ProductQueryService};
pub use events::{dispatcher_with_service, parse_events_request, EventsApiRequest};
pub use listener::{ChannelTransport, EnqueueError, EnvelopeSender, ListenerRunner};
pub use web::{MessagePoster, OutgoingMessage, SlackChannel, SlackUser, SlackWebClient};
