// Service Module
//
// The ServiceModule is the entry point of the service layer. It owns the
// registry, the dispatcher and the transport handle, and exposes the
// registration API. It is constructed explicitly with `init` and torn down
// with `shutdown`; there is no process-wide instance.
//
// Invariant: a name is in the registry if and only if its request topic is
// subscribed with this module's callback, exactly once however many entries
// share the name.

use bm_common::logging::{Component, Logger};
use bm_common::{log_debug, log_info, log_warn};
use bytes::Bytes;
use std::sync::{Arc, Weak};

use crate::config::ServiceConfig;
use crate::error::{Result, ServiceError};
use crate::network::{BoxFuture, Delivery, MessageCallback, PubSubTransport};
use crate::services::dispatch::{DispatchOutcome, RequestDispatcher};
use crate::services::service_registry::{ServiceEntry, ServiceRegistry};
use crate::services::ServiceHandler;

/// Service registration and request dispatch on top of a pub/sub transport
pub struct ServiceModule {
    config: Arc<ServiceConfig>,
    registry: Arc<ServiceRegistry>,
    dispatcher: Arc<RequestDispatcher>,
    transport: Arc<dyn PubSubTransport>,
    /// Callback handed to the transport for every request topic
    callback: MessageCallback,
    logger: Arc<Logger>,
}

impl ServiceModule {
    /// Create the module: validate the configuration, create the registry lock
    /// and prepare the request callback. No services exist until registered.
    pub fn init(config: ServiceConfig, transport: Arc<dyn PubSubTransport>) -> Result<Self> {
        if let Some(logging_config) = &config.logging_config {
            logging_config.apply();
        }
        let logger = Arc::new(Logger::new_root(Component::Service, config.node_id));

        config.validate()?;
        let config = Arc::new(config);

        let registry = Arc::new(ServiceRegistry::new(
            config.lock_timeout,
            Arc::new(logger.with_component(Component::Registry)),
        ));
        let dispatcher = Arc::new(RequestDispatcher::new(
            registry.clone(),
            transport.clone(),
            config.clone(),
            &logger,
        ));
        let callback = request_callback(Arc::downgrade(&dispatcher));

        log_info!(
            logger,
            "Service module initialized (lock timeout {:?}, max message size {})",
            config.lock_timeout,
            config.max_message_size
        );

        Ok(Self {
            config,
            registry,
            dispatcher,
            transport,
            callback,
            logger,
        })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// The callback subscribed on every request topic
    pub fn request_callback(&self) -> MessageCallback {
        self.callback.clone()
    }

    /// Register a service and subscribe its request topic.
    ///
    /// The entry becomes visible to dispatch only once the subscription succeeded;
    /// on any failure the registry is left unchanged. A duplicate name shares the
    /// subscription of the entry already holding it.
    pub async fn register(&self, name: impl Into<Bytes>, handler: ServiceHandler) -> Result<()> {
        let name = name.into();
        if name.is_empty() {
            return Err(ServiceError::InvalidArgument(
                "service name must not be empty".to_string(),
            ));
        }

        let mut services = self.registry.lock().await?;
        services.reserve_one()?;
        if services.find(&name).is_some() {
            log_debug!(
                self.logger,
                "Service '{}' is already registered; later entry will not receive requests",
                String::from_utf8_lossy(&name)
            );
        } else {
            let topic = self.config.topics.request_topic(&name)?;
            if let Err(e) = self
                .transport
                .subscribe(&topic, self.callback.clone())
                .await
            {
                log_warn!(
                    self.logger,
                    "Failed to subscribe '{}': {e}",
                    String::from_utf8_lossy(&topic)
                );
                return Err(e.into());
            }
        }

        log_info!(
            self.logger,
            "Registered service '{}'",
            String::from_utf8_lossy(&name)
        );
        services.append(ServiceEntry::new(name, handler));
        Ok(())
    }

    /// Unregister a service and unsubscribe its request topic.
    ///
    /// Matching is exact: the stored name must have the same length and bytes.
    /// The topic stays subscribed while another entry with the same name remains.
    pub async fn unregister(&self, name: &[u8]) -> Result<()> {
        if name.is_empty() {
            return Err(ServiceError::InvalidArgument(
                "service name must not be empty".to_string(),
            ));
        }

        let mut services = self.registry.lock().await?;
        match services.count(name) {
            0 => {
                return Err(ServiceError::NotFound(
                    String::from_utf8_lossy(name).into_owned(),
                ))
            }
            1 => {
                let topic = self.config.topics.request_topic(name)?;
                if let Err(e) = self.transport.unsubscribe(&topic, &self.callback).await {
                    log_warn!(
                        self.logger,
                        "Failed to unsubscribe '{}': {e}",
                        String::from_utf8_lossy(&topic)
                    );
                    return Err(e.into());
                }
            }
            _ => {}
        }

        services.remove(name);
        log_info!(
            self.logger,
            "Unregistered service '{}'",
            String::from_utf8_lossy(name)
        );
        Ok(())
    }

    /// Names of all registered services in registration order
    pub async fn registered_services(&self) -> Result<Vec<Bytes>> {
        let services = self.registry.lock().await?;
        Ok(services.iter().map(|entry| entry.name.clone()).collect())
    }

    pub async fn is_registered(&self, name: &[u8]) -> Result<bool> {
        let services = self.registry.lock().await?;
        Ok(services.find(name).is_some())
    }

    /// Dispatch a delivered request directly, returning what happened.
    ///
    /// Transports normally go through [`ServiceModule::request_callback`] instead.
    pub async fn dispatch(&self, delivery: &Delivery) -> DispatchOutcome {
        self.dispatcher.dispatch(delivery).await
    }

    /// Unsubscribe every request topic and empty the registry.
    ///
    /// Every entry is removed even if some unsubscribe calls fail; the first
    /// failure is returned.
    pub async fn shutdown(&self) -> Result<()> {
        let mut services = self.registry.lock().await?;
        let entries = services.take_all();
        let mut first_error = None;

        for (index, entry) in entries.iter().enumerate() {
            // One subscription per distinct name
            if entries[..index].iter().any(|e| e.name == entry.name) {
                continue;
            }
            let result = match self.config.topics.request_topic(&entry.name) {
                Ok(topic) => self
                    .transport
                    .unsubscribe(&topic, &self.callback)
                    .await
                    .map_err(ServiceError::from),
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                log_warn!(
                    self.logger,
                    "Failed to unsubscribe service '{}' during shutdown: {e}",
                    String::from_utf8_lossy(&entry.name)
                );
                first_error.get_or_insert(e);
            }
        }

        log_info!(
            self.logger,
            "Service module shut down ({} services removed)",
            entries.len()
        );
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

fn request_callback(dispatcher: Weak<RequestDispatcher>) -> MessageCallback {
    Arc::new(move |delivery: Delivery| {
        let dispatcher = dispatcher.clone();
        Box::pin(async move {
            if let Some(dispatcher) = dispatcher.upgrade() {
                dispatcher.dispatch(&delivery).await;
            }
        }) as BoxFuture<'static, ()>
    })
}
