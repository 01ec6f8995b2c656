//! Registry — one sampler per (counter, interval), created on first request.
//!
//! Internally registered providers overlay the OS backend: a sampler
//! created for an overridden identity polls the override instead of a real
//! counter. Overrides are consulted only when a sampler is created.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::runtime::Handle;
use tracing::debug;

use drowse_core::{Clock, CounterId, SamplerConfig, SamplerKey};

use crate::error::{SamplerError, SamplerResult};
use crate::sampler::{ProviderFn, Sampler};

/// Source of providers for counters that have no override.
pub trait CounterBackend: Send + Sync {
    /// Produce a provider for `id`, or `SamplerError::UnknownCounter`.
    fn bind(&self, id: &CounterId) -> SamplerResult<ProviderFn<f64>>;
}

/// A backend that knows no counters. Only overrides resolve.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBackend;

impl CounterBackend for NullBackend {
    fn bind(&self, id: &CounterId) -> SamplerResult<ProviderFn<f64>> {
        Err(SamplerError::UnknownCounter(id.clone()))
    }
}

/// Get-or-create cache of scalar samplers.
pub struct Registry {
    samplers: DashMap<SamplerKey, Arc<Sampler<f64>>>,
    overrides: DashMap<CounterId, ProviderFn<f64>>,
    backend: Arc<dyn CounterBackend>,
    defaults: SamplerConfig,
    clock: Clock,
    handle: Handle,
}

impl Registry {
    /// Create a registry whose samplers tick on the current tokio runtime.
    pub fn new(backend: Arc<dyn CounterBackend>, defaults: SamplerConfig) -> SamplerResult<Self> {
        let handle = Handle::try_current().map_err(|_| SamplerError::NoRuntime)?;
        Ok(Self::with_handle(handle, backend, defaults))
    }

    pub fn with_handle(
        handle: Handle,
        backend: Arc<dyn CounterBackend>,
        defaults: SamplerConfig,
    ) -> Self {
        Self {
            samplers: DashMap::new(),
            overrides: DashMap::new(),
            backend,
            defaults,
            clock: Clock::new(),
            handle,
        }
    }

    /// Get the sampler for a counter at `interval_ms`, creating it on first use.
    ///
    /// Concurrent callers asking for the same key receive the same instance.
    pub fn get_counter(
        &self,
        category: &str,
        counter: &str,
        instance: &str,
        interval_ms: u64,
    ) -> SamplerResult<Arc<Sampler<f64>>> {
        self.get(SamplerKey::new(category, counter, instance, interval_ms))
    }

    pub fn get(&self, key: SamplerKey) -> SamplerResult<Arc<Sampler<f64>>> {
        if let Some(existing) = self.samplers.get(&key) {
            return Ok(Arc::clone(existing.value()));
        }

        // The shard stays write-locked while the provider is bound and the
        // sampler built, so a racing caller for the same key waits and then
        // finds it occupied. Binding runs at most once per key. Unrelated keys
        // hashed to the same shard wait for that bind too, including any OS
        // refresh the backend does; this only happens on first use of a key.
        match self.samplers.entry(key) {
            Entry::Occupied(entry) => Ok(Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                let sampler = self.create(entry.key())?;
                debug!(key = %entry.key(), "sampler created");
                Ok(Arc::clone(entry.insert(sampler).value()))
            }
        }
    }

    /// Register a provider that takes precedence over the backend for
    /// `(category, counter, instance)`. The last registration wins.
    ///
    /// Samplers that already exist for that identity keep their provider.
    pub fn register_internal<F>(&self, category: &str, counter: &str, instance: &str, provider: F)
    where
        F: Fn() -> anyhow::Result<f64> + Send + Sync + 'static,
    {
        let id = CounterId::new(category, counter, instance);
        debug!(counter = %id, "internal provider registered");
        self.overrides.insert(id, Arc::new(provider));
    }

    pub fn len(&self) -> usize {
        self.samplers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samplers.is_empty()
    }

    /// Keys of all samplers created so far, sorted.
    pub fn keys(&self) -> Vec<SamplerKey> {
        let mut keys: Vec<SamplerKey> = self.samplers.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    /// The clock every sampler of this registry timestamps frames with.
    pub fn clock(&self) -> Clock {
        self.clock
    }

    pub fn defaults(&self) -> &SamplerConfig {
        &self.defaults
    }

    fn create(&self, key: &SamplerKey) -> SamplerResult<Arc<Sampler<f64>>> {
        let overridden = self
            .overrides
            .get(&key.counter)
            .map(|entry| Arc::clone(entry.value()));
        let provider = match overridden {
            Some(provider) => provider,
            None => self.backend.bind(&key.counter)?,
        };

        Sampler::builder(key.clone(), provider, 0.0)
            .idle_timeout(self.defaults.idle_timeout)
            .clock(self.clock)
            .handle(self.handle.clone())
            .build()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("samplers", &self.samplers.len())
            .field("overrides", &self.overrides.len())
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}
