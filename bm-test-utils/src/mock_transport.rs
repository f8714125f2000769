// Mock Transport Implementation
//
// INTENTION: Provide an in-memory implementation of the PubSubTransport trait for
// testing only. It records every call, can be told to fail, and delivers
// messages to subscribed callbacks on demand.

use async_trait::async_trait;
use bm_common::logging::{Component, Logger};
use bm_service::network::{
    Delivery, MessageCallback, PubSubTransport, PublishOptions, TransportError,
};
use bytes::Bytes;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A message handed to `publish`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub topic: Vec<u8>,
    pub payload: Vec<u8>,
    pub options: PublishOptions,
}

/// A pub/sub transport that keeps everything in memory
pub struct MockTransport {
    /// Live subscriptions in subscription order
    subscriptions: Mutex<Vec<(Vec<u8>, MessageCallback)>>,
    /// Topics passed to successful subscribe calls
    subscribe_calls: Mutex<Vec<Vec<u8>>>,
    /// Topics passed to successful unsubscribe calls
    unsubscribe_calls: Mutex<Vec<Vec<u8>>>,
    /// Messages published through this transport
    published: Mutex<Vec<PublishedMessage>>,
    fail_subscribe: AtomicBool,
    fail_unsubscribe: AtomicBool,
    fail_publish: AtomicBool,
    /// Delay applied inside publish before it completes
    publish_delay: Mutex<Option<Duration>>,
    /// Logger
    logger: Logger,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// Create a new mock transport
    pub fn new() -> Self {
        Self {
            subscriptions: Mutex::new(Vec::new()),
            subscribe_calls: Mutex::new(Vec::new()),
            unsubscribe_calls: Mutex::new(Vec::new()),
            published: Mutex::new(Vec::new()),
            fail_subscribe: AtomicBool::new(false),
            fail_unsubscribe: AtomicBool::new(false),
            fail_publish: AtomicBool::new(false),
            publish_delay: Mutex::new(None),
            logger: Logger::new_root(Component::Transport, 0),
        }
    }

    pub fn set_fail_subscribe(&self, fail: bool) {
        self.fail_subscribe.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_unsubscribe(&self, fail: bool) {
        self.fail_unsubscribe.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_publish(&self, fail: bool) {
        self.fail_publish.store(fail, Ordering::SeqCst);
    }

    /// Make every publish take at least `delay`
    pub fn set_publish_delay(&self, delay: Option<Duration>) {
        *self.publish_delay.lock().unwrap() = delay;
    }

    /// All messages published so far
    pub fn published(&self) -> Vec<PublishedMessage> {
        self.published.lock().unwrap().clone()
    }

    /// Messages published on `topic`
    pub fn published_on(&self, topic: &[u8]) -> Vec<PublishedMessage> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.topic == topic)
            .cloned()
            .collect()
    }

    /// Number of live subscriptions on `topic`
    pub fn subscription_count(&self, topic: &[u8]) -> usize {
        self.subscriptions
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| t == topic)
            .count()
    }

    pub fn is_subscribed(&self, topic: &[u8]) -> bool {
        self.subscription_count(topic) > 0
    }

    /// Topics of all live subscriptions
    pub fn subscribed_topics(&self) -> Vec<Vec<u8>> {
        self.subscriptions
            .lock()
            .unwrap()
            .iter()
            .map(|(t, _)| t.clone())
            .collect()
    }

    /// Number of successful subscribe calls made for `topic`
    pub fn subscribe_calls(&self, topic: &[u8]) -> usize {
        self.subscribe_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.as_slice() == topic)
            .count()
    }

    /// Number of successful unsubscribe calls made for `topic`
    pub fn unsubscribe_calls(&self, topic: &[u8]) -> usize {
        self.unsubscribe_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.as_slice() == topic)
            .count()
    }

    /// Deliver a message to every callback subscribed on exactly `topic`.
    ///
    /// Returns the number of callbacks invoked.
    pub async fn deliver(&self, node_id: u64, topic: &[u8], data: &[u8]) -> usize {
        let callbacks: Vec<MessageCallback> = self
            .subscriptions
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, cb)| cb.clone())
            .collect();

        self.logger.debug(format!(
            "MockTransport: delivering {} bytes on '{}' to {} subscribers",
            data.len(),
            String::from_utf8_lossy(topic),
            callbacks.len()
        ));

        for callback in &callbacks {
            let delivery = Delivery::new(
                node_id,
                Bytes::copy_from_slice(topic),
                Bytes::copy_from_slice(data),
            );
            callback(delivery).await;
        }
        callbacks.len()
    }
}

#[async_trait]
impl PubSubTransport for MockTransport {
    async fn subscribe(
        &self,
        topic: &[u8],
        callback: MessageCallback,
    ) -> Result<(), TransportError> {
        if self.fail_subscribe.load(Ordering::SeqCst) {
            return Err(TransportError::SubscribeError(format!(
                "injected failure for '{}'",
                String::from_utf8_lossy(topic)
            )));
        }
        self.logger.debug(format!(
            "MockTransport: subscribe '{}'",
            String::from_utf8_lossy(topic)
        ));
        self.subscriptions
            .lock()
            .unwrap()
            .push((topic.to_vec(), callback));
        self.subscribe_calls.lock().unwrap().push(topic.to_vec());
        Ok(())
    }

    async fn unsubscribe(
        &self,
        topic: &[u8],
        callback: &MessageCallback,
    ) -> Result<(), TransportError> {
        if self.fail_unsubscribe.load(Ordering::SeqCst) {
            return Err(TransportError::UnsubscribeError(format!(
                "injected failure for '{}'",
                String::from_utf8_lossy(topic)
            )));
        }
        let mut subscriptions = self.subscriptions.lock().unwrap();
        let position = subscriptions
            .iter()
            .position(|(t, cb)| t == topic && Arc::ptr_eq(cb, callback))
            .ok_or_else(|| {
                TransportError::UnsubscribeError(format!(
                    "'{}' is not subscribed",
                    String::from_utf8_lossy(topic)
                ))
            })?;
        subscriptions.remove(position);
        self.unsubscribe_calls.lock().unwrap().push(topic.to_vec());
        Ok(())
    }

    async fn publish(
        &self,
        topic: &[u8],
        payload: &[u8],
        options: PublishOptions,
    ) -> Result<(), TransportError> {
        let delay = *self.publish_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(TransportError::PublishError(format!(
                "injected failure for '{}'",
                String::from_utf8_lossy(topic)
            )));
        }
        self.published.lock().unwrap().push(PublishedMessage {
            topic: topic.to_vec(),
            payload: payload.to_vec(),
            options,
        });
        Ok(())
    }
}
