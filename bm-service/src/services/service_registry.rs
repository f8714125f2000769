// Service Registry Module
//
// The registry is the ordered collection of locally hosted services. Entries are
// kept in registration order, which is also the order dispatch scans them in.
//
// A single mutex guards the whole collection. Every access (register,
// unregister, dispatch lookup) goes through `lock()`, which gives up after the
// configured timeout instead of waiting indefinitely.
//
// The registry does not talk to the transport and does not call handlers; the
// service module and the dispatcher do that while holding the guard.

use bm_common::logging::Logger;
use bm_common::log_debug;
use bytes::Bytes;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};

use crate::error::{Result, ServiceError};
use crate::services::ServiceHandler;

#[derive(Clone)]
pub struct ServiceEntry {
    /// Service name, shared with the caller that registered it
    pub name: Bytes,
    /// Handler invoked for requests on this service
    pub handler: ServiceHandler,
}

impl ServiceEntry {
    pub fn new(name: Bytes, handler: ServiceHandler) -> Self {
        Self { name, handler }
    }

    /// Exact match: same length and same bytes
    pub fn has_name(&self, name: &[u8]) -> bool {
        self.name.as_ref() == name
    }
}

impl fmt::Debug for ServiceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceEntry")
            .field("name", &String::from_utf8_lossy(&self.name))
            .finish_non_exhaustive()
    }
}

/// Registry of locally hosted services
pub struct ServiceRegistry {
    services: Mutex<Vec<ServiceEntry>>,
    lock_timeout: Duration,
    logger: Arc<Logger>,
}

impl ServiceRegistry {
    pub fn new(lock_timeout: Duration, logger: Arc<Logger>) -> Self {
        Self {
            services: Mutex::new(Vec::new()),
            lock_timeout,
            logger,
        }
    }

    /// Acquire the registry lock, waiting at most the configured timeout.
    pub async fn lock(&self) -> Result<RegistryGuard<'_>> {
        match tokio::time::timeout(self.lock_timeout, self.services.lock()).await {
            Ok(guard) => Ok(RegistryGuard { guard }),
            Err(_) => {
                log_debug!(
                    self.logger,
                    "Registry lock not acquired within {:?}",
                    self.lock_timeout
                );
                Err(ServiceError::Timeout(self.lock_timeout))
            }
        }
    }
}

/// Exclusive access to the registry entries, released on drop
pub struct RegistryGuard<'a> {
    guard: MutexGuard<'a, Vec<ServiceEntry>>,
}

impl RegistryGuard<'_> {
    /// Make room for one more entry so a following `append` cannot fail
    pub fn reserve_one(&mut self) -> Result<()> {
        self.guard.try_reserve(1)?;
        Ok(())
    }

    /// Append at the tail, preserving registration order
    pub fn append(&mut self, entry: ServiceEntry) {
        self.guard.push(entry);
    }

    /// First entry whose name matches exactly
    pub fn find(&self, name: &[u8]) -> Option<&ServiceEntry> {
        self.guard.iter().find(|entry| entry.has_name(name))
    }

    /// Number of entries whose name matches exactly
    pub fn count(&self, name: &[u8]) -> usize {
        self.guard.iter().filter(|entry| entry.has_name(name)).count()
    }

    /// Remove the first entry whose name matches exactly
    pub fn remove(&mut self, name: &[u8]) -> Option<ServiceEntry> {
        let position = self.guard.iter().position(|entry| entry.has_name(name))?;
        Some(self.guard.remove(position))
    }

    /// Remove every entry, returning them in registration order
    pub fn take_all(&mut self) -> Vec<ServiceEntry> {
        std::mem::take(&mut *self.guard)
    }

    pub fn entries(&self) -> &[ServiceEntry] {
        &self.guard
    }
}

impl Deref for RegistryGuard<'_> {
    type Target = [ServiceEntry];

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::handler;
    use bm_common::logging::Component;

    fn registry(timeout_ms: u64) -> ServiceRegistry {
        ServiceRegistry::new(
            Duration::from_millis(timeout_ms),
            Arc::new(Logger::new_root(Component::Registry, 1)),
        )
    }

    fn entry(name: &'static [u8]) -> ServiceEntry {
        ServiceEntry::new(Bytes::from_static(name), handler(|_, _| Ok(0)))
    }

    #[tokio::test]
    async fn entries_keep_registration_order() {
        let registry = registry(100);
        let mut guard = registry.lock().await.unwrap();
        for name in [&b"c"[..], b"a", b"b"] {
            guard.reserve_one().unwrap();
            guard.append(ServiceEntry::new(
                Bytes::copy_from_slice(name),
                handler(|_, _| Ok(0)),
            ));
        }
        let names: Vec<&[u8]> = guard.iter().map(|e| e.name.as_ref()).collect();
        assert_eq!(names, vec![&b"c"[..], b"a", b"b"]);
    }

    #[tokio::test]
    async fn remove_requires_exact_length() {
        let registry = registry(100);
        let mut guard = registry.lock().await.unwrap();
        guard.append(entry(b"led"));
        guard.append(entry(b"led2"));

        // Neither a shorter nor a longer probe matches by prefix
        assert!(guard.remove(b"le").is_none());
        assert!(guard.remove(b"led22").is_none());

        let removed = guard.remove(b"led2").unwrap();
        assert_eq!(removed.name.as_ref(), b"led2");
        assert_eq!(guard.len(), 1);
        assert!(guard.find(b"led").is_some());
    }

    #[tokio::test]
    async fn duplicate_names_remove_first_registered() {
        let registry = registry(100);
        let mut guard = registry.lock().await.unwrap();
        guard.append(entry(b"dup"));
        guard.append(entry(b"other"));
        guard.append(entry(b"dup"));

        assert_eq!(guard.count(b"dup"), 2);
        assert_eq!(guard.count(b"du"), 0);

        guard.remove(b"dup").unwrap();
        assert_eq!(guard.count(b"dup"), 1);
        let names: Vec<&[u8]> = guard.iter().map(|e| e.name.as_ref()).collect();
        assert_eq!(names, vec![&b"other"[..], b"dup"]);
    }

    #[tokio::test]
    async fn lock_times_out_while_held() {
        let registry = registry(20);
        let _held = registry.lock().await.unwrap();

        let result = registry.lock().await;
        assert!(matches!(result, Err(ServiceError::Timeout(d)) if d == Duration::from_millis(20)));
    }

    #[tokio::test]
    async fn lock_is_released_on_drop() {
        let registry = registry(20);
        {
            let mut guard = registry.lock().await.unwrap();
            guard.append(entry(b"x"));
        }
        let mut guard = registry.lock().await.unwrap();
        assert_eq!(guard.take_all().len(), 1);
        assert!(guard.is_empty());
    }
}
