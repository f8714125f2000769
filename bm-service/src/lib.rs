// Public modules
pub mod config;
pub mod error;
pub mod network;
pub mod routing;
pub mod service_module;
pub mod services;

// Re-export the main types from the service module
pub use service_module::ServiceModule;

pub use config::ServiceConfig;
pub use error::{Result, ServiceError};

// Re-export the main types from the services module
pub use services::{
    handler, DispatchOutcome, ReplyHeader, ReplyMessage, RequestHeader, RequestMessage,
    ServiceHandler, ServiceRegistry, ServiceRequest, REPLY_HEADER_SIZE, REQUEST_HEADER_SIZE,
};

// Re-export the main types from the routing module
pub use routing::{build_topic, ServiceTopics};

// Re-export the main types from the network module
pub use network::{
    Delivery, MessageCallback, PubSubTransport, PublishOptions, TransportError, PUB_SUB_VERSION,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
