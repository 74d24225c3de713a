//! BackendChain - ordered, type-erased list of delivery backends

use std::sync::Arc;

use contracts::{BackendError, DeliveryBackend, DeliveryReceipt, Message};
use futures::future::{BoxFuture, FutureExt};

/// Object-safe view of a [`DeliveryBackend`]
///
/// Implemented for every `DeliveryBackend + Sync`, so callers never
/// implement it directly.
pub trait SharedBackend: Send + Sync {
    fn name(&self) -> &str;

    fn attempt<'a>(
        &'a self,
        message: &'a Message,
    ) -> BoxFuture<'a, Result<DeliveryReceipt, BackendError>>;
}

impl<B> SharedBackend for B
where
    B: DeliveryBackend + Sync + 'static,
{
    fn name(&self) -> &str {
        DeliveryBackend::name(self)
    }

    fn attempt<'a>(
        &'a self,
        message: &'a Message,
    ) -> BoxFuture<'a, Result<DeliveryReceipt, BackendError>> {
        DeliveryBackend::attempt(self, message).boxed()
    }
}

/// Backends in preference order
#[derive(Clone, Default)]
pub struct BackendChain {
    backends: Vec<Arc<dyn SharedBackend>>,
}

impl BackendChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a backend (lowest preference so far)
    pub fn with<B>(mut self, backend: B) -> Self
    where
        B: DeliveryBackend + Sync + 'static,
    {
        self.push(backend);
        self
    }

    pub fn push<B>(&mut self, backend: B)
    where
        B: DeliveryBackend + Sync + 'static,
    {
        self.backends.push(Arc::new(backend));
    }

    /// Append an already shared backend
    pub fn push_shared(&mut self, backend: Arc<dyn SharedBackend>) {
        self.backends.push(backend);
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// Backend names in preference order
    pub fn names(&self) -> Vec<String> {
        self.backends.iter().map(|b| b.name().to_string()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn SharedBackend>> {
        self.backends.iter()
    }
}

impl std::fmt::Debug for BackendChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.backends.iter().map(|b| b.name())).finish()
    }
}
