// Pub/Sub Transport Module
//
// The service layer sits on top of a topic-based publish/subscribe bus. This
// module defines the subset of that bus the service layer relies on. Delivery
// ordering, at-least/at-most-once semantics and wildcard rules are properties
// of the concrete transport and are not assumed here.

use async_trait::async_trait;
use bytes::Bytes;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

/// Type alias for async-returning function
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Pub/sub protocol version tag attached to published messages
pub const PUB_SUB_VERSION: u8 = 1;

/// A message delivered by the transport to a subscriber
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Identity of the node that published the message
    pub node_id: u64,
    /// Topic the message was published on
    pub topic: Bytes,
    /// Message payload
    pub data: Bytes,
    /// Transport message type
    pub message_type: u8,
    /// Pub/sub version tag of the publisher
    pub version: u8,
}

impl Delivery {
    pub fn new(node_id: u64, topic: impl Into<Bytes>, data: impl Into<Bytes>) -> Self {
        Self {
            node_id,
            topic: topic.into(),
            data: data.into(),
            message_type: 0,
            version: PUB_SUB_VERSION,
        }
    }
}

/// Callback invoked by the transport for every message on a subscribed topic.
///
/// Callbacks are compared by `Arc::ptr_eq` when unsubscribing.
pub type MessageCallback = Arc<dyn Fn(Delivery) -> BoxFuture<'static, ()> + Send + Sync>;

/// Options attached to a publish call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishOptions {
    pub qos: u8,
    pub version: u8,
}

impl Default for PublishOptions {
    fn default() -> Self {
        Self {
            qos: 0,
            version: PUB_SUB_VERSION,
        }
    }
}

/// Publish/subscribe transport interface
#[async_trait]
pub trait PubSubTransport: Send + Sync {
    /// Route messages published on `topic` to `callback`
    async fn subscribe(&self, topic: &[u8], callback: MessageCallback)
        -> Result<(), TransportError>;

    /// Remove a subscription previously made with the same topic and callback
    async fn unsubscribe(
        &self,
        topic: &[u8],
        callback: &MessageCallback,
    ) -> Result<(), TransportError>;

    /// Publish `payload` on `topic`
    async fn publish(
        &self,
        topic: &[u8],
        payload: &[u8],
        options: PublishOptions,
    ) -> Result<(), TransportError>;
}

/// Error type for transport operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Subscribe error: {0}")]
    SubscribeError(String),
    #[error("Unsubscribe error: {0}")]
    UnsubscribeError(String),
    #[error("Publish error: {0}")]
    PublishError(String),
    #[error("Transport unavailable: {0}")]
    Unavailable(String),
}
