// Request Dispatch Module
//
// Runs when the transport delivers a message on a subscribed request topic:
//
// 1. take the registry lock (bounded wait; on timeout the message is dropped)
// 2. select the first entry, in registration order, whose request topic is the
//    delivered topic
// 3. validate the request framing
// 4. allocate a zeroed reply buffer and call the handler with its payload region
// 5. on success, fill in the reply header and publish on the reply topic
// 6. release the buffers and the lock
//
// The topic check (step 2) runs before the framing check (step 3): the entry
// has to be known before a framing failure can be attributed to a service. A
// malformed request on a topic no service owns is reported as
// `NoMatchingService`. Either way no handler runs.
//
// Nothing is returned to the transport. Every failure is logged and the message
// is dropped; nothing is retried.

use bm_common::logging::{Component, Logger};
use bm_common::{log_debug, log_warn};
use bytes::Bytes;
use std::sync::Arc;

use crate::config::ServiceConfig;
use crate::network::{Delivery, PubSubTransport, TransportError};
use crate::services::message::{ReplyBuffer, RequestMessage};
use crate::services::service_registry::{ServiceEntry, ServiceRegistry};
use crate::services::ServiceRequest;

/// What happened to a single delivered request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The handler ran and its reply was published
    Replied { service: Bytes, reply_len: usize },
    /// No registered service owns the topic
    NoMatchingService,
    /// The registry lock was not acquired in time
    LockTimeout,
    /// The topic or the request framing failed validation
    InvalidRequest(String),
    /// The handler reported more reply bytes than the buffer holds
    InvalidReply(String),
    /// The handler returned an error, so no reply was sent
    HandlerDeclined,
    /// The reply could not be published
    PublishFailed(TransportError),
    /// A reply or topic buffer could not be allocated
    OutOfMemory,
}

/// The engine invoked for every inbound request
pub struct RequestDispatcher {
    registry: Arc<ServiceRegistry>,
    transport: Arc<dyn PubSubTransport>,
    config: Arc<ServiceConfig>,
    logger: Arc<Logger>,
}

impl RequestDispatcher {
    pub fn new(
        registry: Arc<ServiceRegistry>,
        transport: Arc<dyn PubSubTransport>,
        config: Arc<ServiceConfig>,
        logger: &Logger,
    ) -> Self {
        Self {
            registry,
            transport,
            config,
            logger: Arc::new(logger.with_component(Component::Dispatch)),
        }
    }

    /// Dispatch one delivered message. At most one handler is invoked.
    pub async fn dispatch(&self, delivery: &Delivery) -> DispatchOutcome {
        let services = match self.registry.lock().await {
            Ok(guard) => guard,
            Err(e) => {
                log_warn!(
                    self.logger,
                    "Dropping request on '{}' from node {:016x}: {e}",
                    String::from_utf8_lossy(&delivery.topic),
                    delivery.node_id
                );
                return DispatchOutcome::LockTimeout;
            }
        };

        let entry = match self.select(services.entries(), &delivery.topic) {
            Ok(entry) => entry,
            Err(outcome) => return outcome,
        };
        let logger = self.logger.with_service(&entry.name);

        let request = match RequestMessage::parse(&delivery.data) {
            Ok(request) => request,
            Err(e) => {
                log_debug!(logger, "Dropping request: {e}");
                return DispatchOutcome::InvalidRequest(e.to_string());
            }
        };

        let mut reply = match ReplyBuffer::allocate(self.config.max_message_size) {
            Ok(reply) => reply,
            Err(e) => {
                log_warn!(logger, "Dropping request {}: {e}", request.header.request_id);
                return DispatchOutcome::OutOfMemory;
            }
        };

        let service_request = ServiceRequest {
            service: &entry.name,
            requester: delivery.node_id,
            request_id: request.header.request_id,
            data: request.data,
        };
        let written = match (entry.handler)(&service_request, reply.payload_mut()) {
            Ok(written) => written,
            Err(e) => {
                log_debug!(
                    logger,
                    "Handler declined request {}: {e}",
                    request.header.request_id
                );
                return DispatchOutcome::HandlerDeclined;
            }
        };

        let payload = match reply.finish(delivery.node_id, request.header.request_id, written) {
            Ok(payload) => payload,
            Err(e) => {
                log_warn!(logger, "Discarding reply to {}: {e}", request.header.request_id);
                return DispatchOutcome::InvalidReply(e.to_string());
            }
        };

        let topic = match self.config.topics.reply_topic(&entry.name) {
            Ok(topic) => topic,
            Err(e) => {
                log_warn!(logger, "Discarding reply to {}: {e}", request.header.request_id);
                return DispatchOutcome::OutOfMemory;
            }
        };

        match self
            .transport
            .publish(&topic, payload, self.config.publish_options())
            .await
        {
            Ok(()) => {
                log_debug!(
                    logger,
                    "Replied to request {} from node {:016x} with {written} bytes",
                    request.header.request_id,
                    delivery.node_id
                );
                DispatchOutcome::Replied {
                    service: entry.name.clone(),
                    reply_len: written,
                }
            }
            Err(e) => {
                log_warn!(
                    logger,
                    "Failed to publish reply to {}: {e}",
                    request.header.request_id
                );
                DispatchOutcome::PublishFailed(e)
            }
        }
    }

    /// First entry whose request topic equals `topic`.
    ///
    /// Entries whose name is only a prefix of the topic are skipped and logged.
    fn select<'g>(
        &self,
        services: &'g [ServiceEntry],
        topic: &[u8],
    ) -> Result<&'g ServiceEntry, DispatchOutcome> {
        let mut prefix_only = false;
        for entry in services {
            if !topic.starts_with(&entry.name) {
                continue;
            }
            if self.config.topics.is_request_topic_for(topic, &entry.name) {
                return Ok(entry);
            }
            log_debug!(
                self.logger,
                "Topic length {} does not match service '{}' request topic length {}",
                topic.len(),
                String::from_utf8_lossy(&entry.name),
                self.config.topics.request_topic_len(entry.name.len())
            );
            prefix_only = true;
        }

        if prefix_only {
            Err(DispatchOutcome::InvalidRequest(format!(
                "topic '{}' is not the request topic of any registered service",
                String::from_utf8_lossy(topic)
            )))
        } else {
            log_debug!(
                self.logger,
                "No service registered for topic '{}'",
                String::from_utf8_lossy(topic)
            );
            Err(DispatchOutcome::NoMatchingService)
        }
    }
}
