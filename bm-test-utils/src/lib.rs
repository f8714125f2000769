// Test utilities for Bristlemouth service layer crates
//
// This crate provides test-specific functionality that should not be available
// in production builds. All functions in this crate are for testing only.

pub mod mock_transport;

pub use mock_transport::{MockTransport, PublishedMessage};

use anyhow::anyhow;
use bm_common::logging::{LogLevel, LoggingConfig};
use bm_service::{handler, RequestMessage, ServiceConfig, ServiceHandler, ServiceModule};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Node identity used by the local module in tests
pub const TEST_NODE_ID: u64 = 0x00c0_ffee;

/// Create a test configuration with warn-level logging
pub fn create_test_config() -> ServiceConfig {
    ServiceConfig::new(TEST_NODE_ID)
        .with_logging_config(LoggingConfig::new().with_default_level(LogLevel::Warn))
}

/// Create a module on a fresh mock transport
pub fn create_test_module(
    config: ServiceConfig,
) -> anyhow::Result<(ServiceModule, Arc<MockTransport>)> {
    let transport = Arc::new(MockTransport::new());
    let module = ServiceModule::init(config, transport.clone())?;
    Ok((module, transport))
}

/// Same as [`create_test_module`] with a lock timeout generous enough for contended tests
pub fn create_relaxed_test_module() -> anyhow::Result<(ServiceModule, Arc<MockTransport>)> {
    create_test_module(create_test_config().with_lock_timeout(Duration::from_secs(5)))
}

/// Encode a request message
pub fn request_bytes(request_id: u32, data: &[u8]) -> Vec<u8> {
    RequestMessage::encode(request_id, data).expect("request encodes")
}

/// Handler that copies the request payload into the reply and counts its calls
pub fn echo_handler(calls: Arc<AtomicUsize>) -> ServiceHandler {
    handler(move |request, reply| {
        calls.fetch_add(1, Ordering::SeqCst);
        if request.data.len() > reply.len() {
            return Err(anyhow!("request does not fit in the reply"));
        }
        reply[..request.data.len()].copy_from_slice(request.data);
        Ok(request.data.len())
    })
}

/// Handler that writes `len` bytes of `fill` and counts its calls
pub fn fixed_reply_handler(calls: Arc<AtomicUsize>, fill: u8, len: usize) -> ServiceHandler {
    handler(move |_request, reply| {
        calls.fetch_add(1, Ordering::SeqCst);
        let len = len.min(reply.len());
        reply[..len].fill(fill);
        Ok(len)
    })
}

/// Handler that always declines and counts its calls
pub fn declining_handler(calls: Arc<AtomicUsize>) -> ServiceHandler {
    handler(move |_request, _reply| {
        calls.fetch_add(1, Ordering::SeqCst);
        Err(anyhow!("declined"))
    })
}

/// Handler that replies with an empty payload
pub fn noop_handler() -> ServiceHandler {
    handler(|_request, _reply| Ok(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bm_service::network::BoxFuture;
    use bm_service::{Delivery, MessageCallback, PubSubTransport};

    #[tokio::test]
    async fn mock_transport_tracks_subscriptions() {
        let transport = MockTransport::new();
        let callback: MessageCallback =
            Arc::new(|_delivery: Delivery| Box::pin(async {}) as BoxFuture<'static, ()>);

        transport
            .subscribe(b"a/_service_req", callback.clone())
            .await
            .unwrap();
        assert!(transport.is_subscribed(b"a/_service_req"));
        assert_eq!(transport.deliver(1, b"a/_service_req", &[1]).await, 1);
        assert_eq!(transport.deliver(1, b"b/_service_req", &[1]).await, 0);

        transport
            .unsubscribe(b"a/_service_req", &callback)
            .await
            .unwrap();
        assert!(!transport.is_subscribed(b"a/_service_req"));
        assert!(transport
            .unsubscribe(b"a/_service_req", &callback)
            .await
            .is_err());
        assert_eq!(transport.subscribe_calls(b"a/_service_req"), 1);
        assert_eq!(transport.unsubscribe_calls(b"a/_service_req"), 1);
    }
}
