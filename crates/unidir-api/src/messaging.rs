// Unidir
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Direct messaging with a live change feed
//!
//! Every insert is published on a broadcast channel. WebSocket clients of
//! `/api/v1/messages/stream` receive the inserts they are a party to.

use crate::auth::SessionContext;
use crate::error::{ApiError, ApiResult};
use crate::store::ProfileStore;
use chrono::{DateTime, Utc};
use futures::{SinkExt, StreamExt};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{RwLock, broadcast};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tracing::{debug, error, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

/// Longest message body accepted, in characters
pub const MAX_MESSAGE_LENGTH: usize = 4000;

/// Number of most recent messages returned by a listing
pub const HISTORY_LIMIT: usize = 100;

const FEED_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Message {
    pub id: Uuid,
    pub sender_id: Uuid,

    /// Addressee; an unaddressed message is only visible to its sender
    pub receiver_id: Option<Uuid>,

    pub content: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Whether `user_id` sent or received this message
    pub fn visible_to(&self, user_id: Uuid) -> bool {
        self.sender_id == user_id || self.receiver_id == Some(user_id)
    }
}

/// Message with the sender's display name
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageEntry {
    #[serde(flatten)]
    pub message: Message,
    pub sender_name: Option<String>,
}

/// Frame pushed to live subscribers
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FeedEvent {
    pub event_type: String,
    pub payload: Message,
    pub timestamp: DateTime<Utc>,
}

impl FeedEvent {
    pub const MESSAGE_INSERTED: &'static str = "message_inserted";

    pub fn inserted(message: Message) -> Self {
        Self {
            event_type: Self::MESSAGE_INSERTED.to_string(),
            payload: message,
            timestamp: Utc::now(),
        }
    }
}

/// Append-only message log that publishes every insert
pub struct MessageFeed {
    messages: RwLock<Vec<Message>>,
    profiles: Arc<dyn ProfileStore>,
    sender: broadcast::Sender<Message>,
}

impl MessageFeed {
    pub fn new(profiles: Arc<dyn ProfileStore>) -> Self {
        let (sender, _) = broadcast::channel(FEED_CAPACITY);
        Self {
            messages: RwLock::new(Vec::new()),
            profiles,
            sender,
        }
    }

    /// Receive every message inserted from now on. Slow receivers lag and
    /// miss messages; nothing is queued for disconnected users.
    pub fn subscribe(&self) -> broadcast::Receiver<Message> {
        self.sender.subscribe()
    }

    pub async fn send(&self, session: &SessionContext, content: &str, receiver_id: Option<Uuid>) -> ApiResult<Message> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ApiError::bad_request("Message content cannot be empty"));
        }
        if content.chars().count() > MAX_MESSAGE_LENGTH {
            return Err(ApiError::bad_request(format!("Message content exceeds {} characters", MAX_MESSAGE_LENGTH)));
        }

        let message = Message {
            id: Uuid::new_v4(),
            sender_id: session.user_id,
            receiver_id,
            content: content.to_string(),
            is_read: false,
            created_at: Utc::now(),
        };

        self.messages.write().await.push(message.clone());
        counter!("unidir_messages_total", 1, "kind" => if receiver_id.is_some() { "direct" } else { "unaddressed" });

        // No receivers is fine
        if self.sender.send(message.clone()).is_err() {
            debug!("No live subscribers for message {}", message.id);
        }

        info!("Message {} sent by {}", message.id, message.sender_id);
        Ok(message)
    }

    /// The caller's most recent messages, in arrival order
    pub async fn visible(&self, session: &SessionContext) -> ApiResult<Vec<MessageEntry>> {
        let mut messages: Vec<Message> = self
            .messages
            .read()
            .await
            .iter()
            .rev()
            .filter(|m| m.visible_to(session.user_id))
            .take(HISTORY_LIMIT)
            .cloned()
            .collect();
        messages.reverse();

        let mut sender_ids: Vec<Uuid> = messages.iter().map(|m| m.sender_id).collect();
        sender_ids.sort();
        sender_ids.dedup();

        let names: HashMap<Uuid, Option<String>> = self.profiles.get_many(&sender_ids).await?.into_iter().map(|p| (p.user_id, p.full_name)).collect();

        Ok(messages
            .into_iter()
            .map(|message| {
                let sender_name = names.get(&message.sender_id).cloned().flatten();
                MessageEntry { message, sender_name }
            })
            .collect())
    }

    /// Mark a direct message as read; only its receiver may do so
    pub async fn mark_read(&self, session: &SessionContext, message_id: Uuid) -> ApiResult<Message> {
        let mut messages = self.messages.write().await;
        let message = messages
            .iter_mut()
            .find(|m| m.id == message_id && m.visible_to(session.user_id))
            .ok_or_else(|| ApiError::not_found("Message not found"))?;

        if message.receiver_id != Some(session.user_id) {
            return Err(ApiError::forbidden("Only the receiver can mark a message as read"));
        }

        message.is_read = true;
        Ok(message.clone())
    }
}

/// Forward inserts visible to `user_id` over an open WebSocket until either
/// side closes. Lagged receivers skip what they missed and carry on.
pub async fn stream_to<S>(websocket: WebSocketStream<S>, user_id: Uuid, mut receiver: broadcast::Receiver<Message>) -> Result<(), WsError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (mut sink, mut incoming) = websocket.split();

    loop {
        tokio::select! {
            received = receiver.recv() => match received {
                Ok(message) if message.visible_to(user_id) => {
                    let frame = match serde_json::to_string(&FeedEvent::inserted(message)) {
                        Ok(json) => json,
                        Err(e) => {
                            error!("Failed to serialize feed event: {}", e);
                            continue;
                        }
                    };
                    sink.send(WsMessage::Text(frame)).await?;
                    counter!("unidir_stream_events_total", 1);
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => warn!("Message stream of {} lagged, {} message(s) skipped", user_id, skipped),
                Err(RecvError::Closed) => break,
            },
            frame = incoming.next() => match frame {
                Some(Ok(frame)) if frame.is_close() => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e),
                None => break,
            },
        }
    }

    if let Err(e) = sink.close().await {
        debug!("Message stream of {} closed uncleanly: {}", user_id, e);
    }
    info!("Message stream closed for {}", user_id);
    Ok(())
}
