// Network Module
//
// This module provides the transport contract used by the service layer.

pub mod transport;

pub use transport::{
    BoxFuture, Delivery, MessageCallback, PubSubTransport, PublishOptions, TransportError,
    PUB_SUB_VERSION,
};
