//! Broadcast channel
//!
//! Fan-out of JSON notifications to the real-time subscribers connected at the
//! moment of publish. Delivery is at-most-once per subscriber: there is no
//! replay, no queueing for absent clients and no acknowledgement.

use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// WebSocket session ID type
pub type SessionId = String;

/// Message sent to the welcome topic on connect
pub const WELCOME_MESSAGE: &str = "Connected to the monitoring system";

/// Named event under which a payload is delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    Alarm,
    Message,
    Pong,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Alarm => "alarm",
            Self::Message => "message",
            Self::Pong => "pong",
        }
    }
}

/// Frames handed to a session's writer task
#[derive(Debug, Clone, PartialEq)]
pub enum HubMessage {
    Text(String),
    Close,
}

/// Serialize the `{"event": ..., "data": ...}` envelope
pub fn envelope(topic: Topic, payload: &serde_json::Value) -> String {
    serde_json::json!({ "event": topic.as_str(), "data": payload }).to_string()
}

/// Publishing side of the channel, injected into the ingest path
pub trait Broadcaster: Send + Sync {
    /// Deliver to every current subscriber; returns how many accepted it
    fn publish(&self, topic: Topic, payload: serde_json::Value) -> usize;

    /// Number of connected subscribers
    fn subscriber_count(&self) -> usize;
}

/// Registry of connected sessions
#[derive(Default)]
pub struct SubscriberHub {
    sessions: RwLock<HashMap<SessionId, mpsc::UnboundedSender<HubMessage>>>,
}

impl SubscriberHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session and send it the one-time welcome payload
    pub fn register(&self, session_id: SessionId, sender: mpsc::UnboundedSender<HubMessage>) {
        let welcome = envelope(
            Topic::Message,
            &serde_json::json!({ "message": WELCOME_MESSAGE }),
        );
        if sender.send(HubMessage::Text(welcome)).is_err() {
            debug!("Session {} closed before welcome", session_id);
            return;
        }

        info!("Subscriber connected: {}", session_id);
        self.sessions.write().insert(session_id, sender);
    }

    /// Remove a session. Once this returns it receives nothing further.
    pub fn unregister(&self, session_id: &str) {
        if self.sessions.write().remove(session_id).is_some() {
            info!("Subscriber disconnected: {}", session_id);
        }
    }

    /// Send a frame to one session only
    pub fn send_to(&self, session_id: &str, message: HubMessage) -> bool {
        self.sessions
            .read()
            .get(session_id)
            .is_some_and(|sender| sender.send(message).is_ok())
    }
}

impl Broadcaster for SubscriberHub {
    fn publish(&self, topic: Topic, payload: serde_json::Value) -> usize {
        let text = envelope(topic, &payload);
        let sessions = self.sessions.read();

        let delivered = sessions
            .iter()
            .filter(|(session_id, sender)| {
                let ok = sender.send(HubMessage::Text(text.clone())).is_ok();
                if !ok {
                    debug!("Dropping {} for closed session {}", topic.as_str(), session_id);
                }
                ok
            })
            .count();

        debug!(
            topic = topic.as_str(),
            delivered,
            subscribers = sessions.len(),
            "Published"
        );
        delivered
    }

    fn subscriber_count(&self) -> usize {
        self.sessions.read().len()
    }
}
