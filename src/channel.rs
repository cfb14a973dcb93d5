//! Push channel to the attached client
//!
//! At most one client is attached at a time; attaching a new one replaces the
//! previous sink with no handoff of in-flight state. Delivery is
//! fire-and-forget: with no client attached (or a failed send) the
//! notification is dropped, never queued or retried.

use axum::extract::ws::{Message, WebSocket};
use futures_util::SinkExt;
use futures_util::stream::SplitSink;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::session::{AnalysisResult, ExtractedProduct};

type ClientSink = SplitSink<WebSocket, Message>;

/// Outbound wire messages
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    Status { message: String },
    VoicePrompt { message: String },
    Products { products: Vec<ExtractedProduct> },
    Analysis { analysis: AnalysisResult },
    Error { message: String },
}

/// Cloneable handle over the single attached client
#[derive(Clone, Default)]
pub struct StatusChannel {
    sink: Arc<Mutex<Option<ClientSink>>>,
}

impl StatusChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a client, replacing any previous one
    pub async fn attach(&self, sink: ClientSink) {
        let mut guard = self.sink.lock().await;
        if guard.is_some() {
            debug!("Replacing previously attached client");
        }
        *guard = Some(sink);
    }

    /// Drop the attached client reference
    pub async fn detach(&self) {
        *self.sink.lock().await = None;
    }

    pub async fn is_attached(&self) -> bool {
        self.sink.lock().await.is_some()
    }

    /// Push a notification to the attached client, if any
    ///
    /// A send failure detaches the dead sink; the notification itself is
    /// lost either way.
    pub async fn notify(&self, notification: &Notification) {
        let text = match serde_json::to_string(notification) {
            Ok(text) => text,
            Err(e) => {
                debug!("Failed to serialize notification: {}", e);
                return;
            }
        };

        let mut guard = self.sink.lock().await;
        match guard.as_mut() {
            Some(sink) => {
                if sink.send(Message::Text(text)).await.is_err() {
                    debug!("Client send failed, dropping sink");
                    *guard = None;
                }
            }
            None => debug!("No client attached, notification dropped"),
        }
    }

    pub async fn status(&self, message: impl Into<String>) {
        self.notify(&Notification::Status {
            message: message.into(),
        })
        .await;
    }

    pub async fn voice(&self, message: impl Into<String>) {
        self.notify(&Notification::VoicePrompt {
            message: message.into(),
        })
        .await;
    }

    pub async fn error(&self, message: impl Into<String>) {
        self.notify(&Notification::Error {
            message: message.into(),
        })
        .await;
    }

    pub async fn products(&self, products: Vec<ExtractedProduct>) {
        self.notify(&Notification::Products { products }).await;
    }

    pub async fn analysis(&self, analysis: &AnalysisResult) {
        self.notify(&Notification::Analysis {
            analysis: analysis.clone(),
        })
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_matches_wire_contract() {
        let json = serde_json::to_value(Notification::Status {
            message: "Searching".to_string(),
        })
        .unwrap();
        assert_eq!(json["type"], "status");
        assert_eq!(json["message"], "Searching");
    }

    #[test]
    fn voice_prompt_tag_is_snake_case() {
        let json = serde_json::to_value(Notification::VoicePrompt {
            message: "Now moving to Flipkart".to_string(),
        })
        .unwrap();
        assert_eq!(json["type"], "voice_prompt");
    }

    #[test]
    fn products_payload_embeds_product_fields() {
        let product = ExtractedProduct::new(
            "A Great Wireless Headphone Set".to_string(),
            "₹1,299".to_string(),
            "amazon",
            1,
            "headphones",
        );
        let json = serde_json::to_value(Notification::Products {
            products: vec![product],
        })
        .unwrap();
        assert_eq!(json["type"], "products");
        assert_eq!(json["products"][0]["source"], "amazon");
        assert_eq!(json["products"][0]["position"], 1);
        assert_eq!(json["products"][0]["originalQuery"], "headphones");
    }

    #[test]
    fn error_matches_wire_contract() {
        let json = serde_json::to_value(Notification::Error {
            message: "Autonomous flow already in progress".to_string(),
        })
        .unwrap();
        assert_eq!(json["type"], "error");
    }

    #[tokio::test]
    async fn notify_without_client_is_a_silent_no_op() {
        let channel = StatusChannel::new();
        assert!(!channel.is_attached().await);
        // Must not panic, block, or queue
        channel.status("nobody listening").await;
        channel.error("still nobody").await;
        assert!(!channel.is_attached().await);
    }
}
