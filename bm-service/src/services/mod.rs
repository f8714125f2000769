// Services Module
//
// Everything that makes a locally hosted service reachable. The dispatch
// engine ties an inbound request to a registry entry and its handler.

pub mod dispatch;
pub mod message;
pub mod service_registry;

use anyhow::Result;
use std::sync::Arc;

pub use dispatch::{DispatchOutcome, RequestDispatcher};
pub use message::{
    ReplyBuffer, ReplyHeader, ReplyMessage, RequestHeader, RequestMessage, REPLY_HEADER_SIZE,
    REQUEST_HEADER_SIZE,
};
pub use service_registry::{ServiceEntry, ServiceRegistry};

/// Request data handed to a service handler
#[derive(Debug, Clone, Copy)]
pub struct ServiceRequest<'a> {
    /// Name of the service the request was matched to
    pub service: &'a [u8],
    /// Node that sent the request
    pub requester: u64,
    /// Correlation id echoed into the reply
    pub request_id: u32,
    /// Request payload
    pub data: &'a [u8],
}

/// Handler for a service
///
/// The handler writes at most `reply.len()` bytes into `reply` and returns the
/// number of bytes written. Returning an error suppresses the reply.
pub type ServiceHandler =
    Arc<dyn Fn(&ServiceRequest<'_>, &mut [u8]) -> Result<usize> + Send + Sync>;

/// Wrap a closure as a [`ServiceHandler`]
pub fn handler<F>(f: F) -> ServiceHandler
where
    F: Fn(&ServiceRequest<'_>, &mut [u8]) -> Result<usize> + Send + Sync + 'static,
{
    Arc::new(f)
}
