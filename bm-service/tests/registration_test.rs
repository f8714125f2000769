// Tests for service registration
//
// These tests verify that register/unregister keep the registry and the
// transport subscriptions in step, including on every failure path.

use anyhow::Result;
use bm_service::{Delivery, DispatchOutcome, ServiceError, ServiceModule};
use bm_test_utils::{
    create_test_config, create_test_module, echo_handler, noop_handler, request_bytes,
    MockTransport,
};
use bytes::Bytes;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const LED_REQ: &[u8] = b"led/_service_req";

#[tokio::test]
async fn test_register_then_unregister() -> Result<()> {
    let (module, transport) = create_test_module(create_test_config())?;

    module.register(&b"led"[..], noop_handler()).await?;
    assert!(transport.is_subscribed(LED_REQ));
    assert_eq!(module.registered_services().await?, vec![Bytes::from_static(b"led")]);

    module.unregister(b"led").await?;
    assert!(module.registered_services().await?.is_empty());
    assert!(!transport.is_subscribed(LED_REQ));
    assert_eq!(transport.subscribe_calls(LED_REQ), 1);
    assert_eq!(transport.unsubscribe_calls(LED_REQ), 1);
    Ok(())
}

#[tokio::test]
async fn test_empty_name_is_rejected() -> Result<()> {
    let (module, transport) = create_test_module(create_test_config())?;

    let result = module.register(Bytes::new(), noop_handler()).await;
    assert!(matches!(result, Err(ServiceError::InvalidArgument(_))));
    assert!(module.registered_services().await?.is_empty());
    assert!(transport.subscribed_topics().is_empty());

    let result = module.unregister(b"").await;
    assert!(matches!(result, Err(ServiceError::InvalidArgument(_))));
    Ok(())
}

#[tokio::test]
async fn test_subscribe_failure_leaves_no_entry() -> Result<()> {
    let (module, transport) = create_test_module(create_test_config())?;
    let calls = Arc::new(AtomicUsize::new(0));
    transport.set_fail_subscribe(true);

    let result = module.register(&b"led"[..], echo_handler(calls.clone())).await;
    assert!(matches!(result, Err(ServiceError::Transport(_))));
    assert!(module.registered_services().await?.is_empty());
    assert!(!module.is_registered(b"led").await?);

    // A request for the failed registration is not matched to anything
    let delivery = Delivery::new(42, &LED_REQ[..], request_bytes(1, &[0x01]));
    assert_eq!(
        module.dispatch(&delivery).await,
        DispatchOutcome::NoMatchingService
    );
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    // Registration works once the transport recovers
    transport.set_fail_subscribe(false);
    module.register(&b"led"[..], echo_handler(calls)).await?;
    assert!(module.is_registered(b"led").await?);
    Ok(())
}

#[tokio::test]
async fn test_unregister_unknown_service() -> Result<()> {
    let (module, transport) = create_test_module(create_test_config())?;

    let result = module.unregister(b"missing").await;
    assert!(matches!(result, Err(ServiceError::NotFound(name)) if name == "missing"));
    assert_eq!(transport.unsubscribe_calls(b"missing/_service_req"), 0);
    Ok(())
}

#[tokio::test]
async fn test_unregister_matches_exact_name_only() -> Result<()> {
    let (module, transport) = create_test_module(create_test_config())?;
    module.register(&b"led"[..], noop_handler()).await?;

    // A shorter or longer name sharing a prefix must not remove "led"
    assert!(matches!(
        module.unregister(b"le").await,
        Err(ServiceError::NotFound(_))
    ));
    assert!(matches!(
        module.unregister(b"led2").await,
        Err(ServiceError::NotFound(_))
    ));
    assert!(module.is_registered(b"led").await?);
    assert!(transport.is_subscribed(LED_REQ));

    module.register(&b"led2"[..], noop_handler()).await?;
    module.unregister(b"led").await?;
    assert_eq!(
        module.registered_services().await?,
        vec![Bytes::from_static(b"led2")]
    );
    assert!(transport.is_subscribed(b"led2/_service_req"));
    Ok(())
}

#[tokio::test]
async fn test_unsubscribe_failure_keeps_entry() -> Result<()> {
    let (module, transport) = create_test_module(create_test_config())?;
    module.register(&b"pump"[..], noop_handler()).await?;
    transport.set_fail_unsubscribe(true);

    let result = module.unregister(b"pump").await;
    assert!(matches!(result, Err(ServiceError::Transport(_))));
    assert!(module.is_registered(b"pump").await?);
    assert!(transport.is_subscribed(b"pump/_service_req"));
    Ok(())
}

#[tokio::test]
async fn test_registration_order_is_preserved() -> Result<()> {
    let (module, _transport) = create_test_module(create_test_config())?;
    for name in ["gamma", "alpha", "beta"] {
        module.register(name.as_bytes().to_vec(), noop_handler()).await?;
    }

    let names: Vec<Bytes> = module.registered_services().await?;
    assert_eq!(
        names,
        vec![
            Bytes::from_static(b"gamma"),
            Bytes::from_static(b"alpha"),
            Bytes::from_static(b"beta"),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_shutdown_unsubscribes_every_service() -> Result<()> {
    let (module, transport) = create_test_module(create_test_config())?;
    module.register(&b"a"[..], noop_handler()).await?;
    module.register(&b"b"[..], noop_handler()).await?;

    module.shutdown().await?;
    assert!(module.registered_services().await?.is_empty());
    assert!(transport.subscribed_topics().is_empty());
    assert_eq!(transport.unsubscribe_calls(b"a/_service_req"), 1);
    assert_eq!(transport.unsubscribe_calls(b"b/_service_req"), 1);
    Ok(())
}

#[tokio::test]
async fn test_shutdown_releases_shared_subscription_once() -> Result<()> {
    let (module, transport) = create_test_module(create_test_config())?;
    module.register(&b"led"[..], noop_handler()).await?;
    module.register(&b"led"[..], noop_handler()).await?;

    module.shutdown().await?;
    assert!(module.registered_services().await?.is_empty());
    assert!(!transport.is_subscribed(LED_REQ));
    assert_eq!(transport.unsubscribe_calls(LED_REQ), 1);
    Ok(())
}

#[tokio::test]
async fn test_duplicate_unsubscribe_failure_keeps_entries() -> Result<()> {
    let (module, transport) = create_test_module(create_test_config())?;
    module.register(&b"led"[..], noop_handler()).await?;
    module.register(&b"led"[..], noop_handler()).await?;
    transport.set_fail_unsubscribe(true);

    // Only the last entry touches the transport
    module.unregister(b"led").await?;
    let result = module.unregister(b"led").await;
    assert!(matches!(result, Err(ServiceError::Transport(_))));
    assert!(module.is_registered(b"led").await?);
    assert!(transport.is_subscribed(LED_REQ));
    Ok(())
}

#[tokio::test]
async fn test_shutdown_reports_first_failure_but_clears_registry() -> Result<()> {
    let (module, transport) = create_test_module(create_test_config())?;
    module.register(&b"a"[..], noop_handler()).await?;
    transport.set_fail_unsubscribe(true);

    assert!(matches!(
        module.shutdown().await,
        Err(ServiceError::Transport(_))
    ));
    assert!(module.registered_services().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_init_rejects_invalid_config() {
    let transport = Arc::new(MockTransport::new());
    let config = create_test_config().with_max_message_size(8);

    let result = ServiceModule::init(config, transport);
    assert!(matches!(result, Err(ServiceError::InvalidArgument(_))));
}

#[tokio::test]
async fn test_custom_suffixes_drive_topics() -> Result<()> {
    let config = create_test_config()
        .with_request_suffix("/req")
        .with_reply_suffix("/rep");
    let (module, transport) = create_test_module(config)?;
    assert_eq!(module.config().topics.request_suffix, "/req");

    module.register(&b"sensor"[..], noop_handler()).await?;
    assert!(transport.is_subscribed(b"sensor/req"));
    assert!(!transport.is_subscribed(b"sensor/_service_req"));
    Ok(())
}
