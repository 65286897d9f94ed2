use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tokio_stream::{Stream, StreamExt};
use uuid::Uuid;

use crate::entities::message;

/// Messages buffered per meetup before slow subscribers start lagging
const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub meetup_id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl From<message::Model> for ChatMessage {
    fn from(m: message::Model) -> Self {
        Self {
            id: m.id,
            meetup_id: m.meetup_id,
            user_id: m.user_id,
            user_name: m.user_name,
            message: m.body,
            created_at: m.created_at.with_timezone(&Utc),
        }
    }
}

/// In-process fan-out of chat messages, one broadcast topic per meetup.
/// Topics are created on first subscribe and dropped once nobody listens.
#[derive(Clone, Default)]
pub struct ChatHub {
    topics: Arc<Mutex<HashMap<Uuid, broadcast::Sender<ChatMessage>>>>,
}

impl ChatHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn topics(&self) -> MutexGuard<'_, HashMap<Uuid, broadcast::Sender<ChatMessage>>> {
        self.topics.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn subscribe(&self, meetup_id: Uuid) -> ChatSubscription {
        let receiver = self
            .topics()
            .entry(meetup_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe();

        tracing::debug!(meetup_id = %meetup_id, "Chat subscriber added");

        let messages = BroadcastStream::new(receiver).filter_map(move |item| match item {
            Ok(message) => Some(message),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::warn!(meetup_id = %meetup_id, skipped, "Chat subscriber lagged");
                None
            }
        });

        ChatSubscription {
            meetup_id,
            messages: Box::pin(messages),
            hub: self.clone(),
        }
    }

    /// Deliver to the meetup's current subscribers; returns how many there were
    pub fn publish(&self, message: ChatMessage) -> usize {
        let meetup_id = message.meetup_id;
        let topics = self.topics();

        match topics.get(&meetup_id) {
            Some(sender) => sender.send(message).unwrap_or(0),
            None => 0,
        }
    }

    pub fn subscriber_count(&self, meetup_id: Uuid) -> usize {
        self.topics()
            .get(&meetup_id)
            .map_or(0, broadcast::Sender::receiver_count)
    }

    fn prune(&self, meetup_id: Uuid) {
        let mut topics = self.topics();
        if topics
            .get(&meetup_id)
            .is_some_and(|sender| sender.receiver_count() == 0)
        {
            topics.remove(&meetup_id);
            tracing::debug!(meetup_id = %meetup_id, "Chat topic closed");
        }
    }
}

/// A live feed of one meetup's messages, consumed as a [`Stream`].
///
/// Dropping it cancels the feed and closes the topic when it was the last
/// listener. Messages sent before subscribing are not replayed, and lagged
/// gaps are skipped.
pub struct ChatSubscription {
    meetup_id: Uuid,
    messages: Pin<Box<dyn Stream<Item = ChatMessage> + Send>>,
    hub: ChatHub,
}

impl ChatSubscription {
    pub fn meetup_id(&self) -> Uuid {
        self.meetup_id
    }
}

impl Stream for ChatSubscription {
    type Item = ChatMessage;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<ChatMessage>> {
        self.messages.as_mut().poll_next(cx)
    }
}

impl Drop for ChatSubscription {
    fn drop(&mut self) {
        // The receiver must be gone before the count is checked
        self.messages = Box::pin(tokio_stream::empty::<ChatMessage>());
        self.hub.prune(self.meetup_id);
    }
}
