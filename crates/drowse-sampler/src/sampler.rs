//! Sampler — polls a provider while readers are active, then sleeps.
//!
//! Each activation runs one tokio task that ticks, publishes a frame, and
//! sleeps for the update interval before the next tick. Ticks are never
//! scheduled at a fixed rate, so a slow provider delays the next tick
//! instead of overlapping it. Providers run on the blocking pool, so a slow
//! OS call never holds up the runtime's workers.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicI64, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::{ArcSwap, ArcSwapOption};
use tokio::runtime::Handle;
use tracing::{debug, error, trace};

use drowse_core::config::DEFAULT_IDLE_TIMEOUT;
use drowse_core::{ease, Clock, EaseFn, Frame, Sample, SamplerKey};

use crate::error::{SamplerError, SamplerResult};
use crate::state::{ActivityState, StateCell};

/// The function a sampler polls for raw measurements.
pub type ProviderFn<V> = Arc<dyn Fn() -> anyhow::Result<V> + Send + Sync>;

/// A self-suspending, eased sampler over one provider.
pub struct Sampler<V: Sample> {
    key: SamplerKey,
    provider: ProviderFn<V>,
    ease: EaseFn<V>,
    /// Substituted for frame sides that have no sample yet.
    default: V,
    /// Written only by the tick task.
    frame: ArcSwap<Frame<V>>,
    /// Last eased value handed to a reader; becomes the next frame's
    /// `previous`. Raw reads leave it alone.
    last_returned: ArcSwapOption<V>,
    state: StateCell,
    /// Ticks left before the sampler goes back to sleep.
    countdown: AtomicI64,
    update_interval_ms: AtomicU64,
    idle_timeout: AtomicU32,
    clock: Clock,
    handle: Handle,
    /// Runs between the last tick's decrement and publishing `Sleeping`.
    #[cfg(test)]
    before_sleep: ArcSwapOption<Box<dyn Fn() + Send + Sync>>,
}

impl<V: Sample> Sampler<V> {
    /// Start building a sampler for `key`.
    ///
    /// `default` is returned before the first sample and fixes the arity
    /// the provider must produce.
    pub fn builder(key: SamplerKey, provider: ProviderFn<V>, default: V) -> SamplerBuilder<V> {
        SamplerBuilder {
            key,
            provider,
            default,
            ease: ease::<V>,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            clock: None,
            handle: None,
        }
    }

    /// Read the sampler's value and keep it awake.
    ///
    /// Never blocks. If the sampler is asleep, exactly one of any number of
    /// concurrent callers schedules an immediate tick; every caller gets the
    /// latest published frame, eased when `easing` is set.
    pub fn get_value(self: &Arc<Self>, easing: bool) -> V {
        self.countdown.store(
            i64::from(self.idle_timeout.load(Ordering::Relaxed)),
            Ordering::SeqCst,
        );
        if self.state.load() == ActivityState::Sleeping && self.state.try_wake() {
            self.wake();
        }

        let frame = self.frame.load();
        if easing {
            let value = (self.ease)(
                &frame,
                self.clock.now_ms(),
                self.update_interval_ms(),
                &self.default,
            );
            self.last_returned.store(Some(Arc::new(value.clone())));
            value
        } else {
            frame
                .current
                .clone()
                .unwrap_or_else(|| self.default.clone())
        }
    }

    pub fn key(&self) -> &SamplerKey {
        &self.key
    }

    pub fn state(&self) -> ActivityState {
        self.state.load()
    }

    /// The most recently published frame.
    pub fn frame(&self) -> Arc<Frame<V>> {
        self.frame.load_full()
    }

    pub fn default_value(&self) -> &V {
        &self.default
    }

    pub fn update_interval_ms(&self) -> u64 {
        self.update_interval_ms.load(Ordering::Relaxed)
    }

    /// Change the sampling cadence. Takes effect from the next tick.
    pub fn set_update_interval(&self, interval_ms: u64) -> SamplerResult<()> {
        if interval_ms == 0 {
            return Err(SamplerError::InvalidInterval);
        }
        self.update_interval_ms.store(interval_ms, Ordering::Relaxed);
        Ok(())
    }

    pub fn idle_timeout(&self) -> u32 {
        self.idle_timeout.load(Ordering::Relaxed)
    }

    /// Change how many ticks the sampler stays awake after a read.
    /// Takes effect from the next read.
    pub fn set_idle_timeout(&self, ticks: u32) {
        self.idle_timeout.store(ticks, Ordering::Relaxed);
    }

    fn wake(self: &Arc<Self>) {
        debug!(key = %self.key, "sampler waking");
        let sampler = Arc::clone(self);
        self.handle.spawn(async move { sampler.run().await });
    }

    /// Tick loop for one activation. Only one runs per sampler at a time:
    /// it is started by the wake winner and ends by publishing `Sleeping`.
    async fn run(self: Arc<Self>) {
        loop {
            self.state.activate();
            self.tick().await;

            let remaining = self.countdown.fetch_sub(1, Ordering::SeqCst) - 1;
            if remaining > 0 {
                tokio::time::sleep(Duration::from_millis(self.update_interval_ms())).await;
                continue;
            }

            #[cfg(test)]
            {
                if let Some(hook) = self.before_sleep.load_full() {
                    hook();
                }
            }

            self.state.sleep();
            // A reader that reset the countdown after the decrement saw us
            // Active and did not wake us; pick its request up here.
            if self.countdown.load(Ordering::SeqCst) > 0 && self.state.try_wake() {
                trace!(key = %self.key, "read arrived while falling asleep, staying awake");
                continue;
            }

            debug!(key = %self.key, "sampler idle, sleeping");
            break;
        }
    }

    async fn tick(&self) {
        let provider = Arc::clone(&self.provider);
        let sample = match tokio::task::spawn_blocking(move || call_provider(&provider)).await {
            Ok(result) => result,
            Err(e) if e.is_panic() => Err(SamplerError::ProviderPanicked(panic_message(
                e.into_panic().as_ref(),
            ))),
            Err(e) => Err(SamplerError::Provider(anyhow::anyhow!(
                "sampling task cancelled: {e}"
            ))),
        };
        let sample = sample.and_then(|value| {
            if value.arity() == self.default.arity() {
                Ok(value)
            } else {
                Err(SamplerError::ArityMismatch {
                    expected: self.default.arity(),
                    actual: value.arity(),
                })
            }
        });

        match sample {
            Ok(current) => {
                let previous = match self.last_returned.load_full() {
                    Some(observed) => Some(V::clone(&observed)),
                    None => self.frame.load().current.clone(),
                };
                let frame = Frame::new(previous, current, self.clock.now_ms());
                trace!(key = %self.key, timestamp_ms = frame.timestamp_ms, "frame published");
                self.frame.store(Arc::new(frame));
            }
            Err(e) => {
                error!(
                    category = %self.key.category(),
                    counter = %self.key.counter_name(),
                    instance = %self.key.instance(),
                    interval_ms = self.update_interval_ms(),
                    error = %e,
                    "failed to sample counter"
                );
            }
        }
    }
}

impl<V: Sample> std::fmt::Debug for Sampler<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sampler")
            .field("key", &self.key)
            .field("state", &self.state.load())
            .field("update_interval_ms", &self.update_interval_ms())
            .field("idle_timeout", &self.idle_timeout())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Sampler`].
pub struct SamplerBuilder<V: Sample> {
    key: SamplerKey,
    provider: ProviderFn<V>,
    default: V,
    ease: EaseFn<V>,
    idle_timeout: u32,
    clock: Option<Clock>,
    handle: Option<Handle>,
}

impl<V: Sample> SamplerBuilder<V> {
    pub fn idle_timeout(mut self, ticks: u32) -> Self {
        self.idle_timeout = ticks;
        self
    }

    /// Replace the linear easing strategy.
    pub fn easing(mut self, ease: EaseFn<V>) -> Self {
        self.ease = ease;
        self
    }

    /// Share a clock with other samplers. Defaults to a fresh clock.
    pub fn clock(mut self, clock: Clock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Runtime the tick task is spawned on. Defaults to the current runtime.
    pub fn handle(mut self, handle: Handle) -> Self {
        self.handle = Some(handle);
        self
    }

    /// Build the sampler, asleep and with an empty frame.
    ///
    /// Values without a fixed arity are probed once so a default of the
    /// wrong arity is rejected here rather than at every tick.
    pub fn build(self) -> SamplerResult<Arc<Sampler<V>>> {
        if self.key.interval_ms == 0 {
            return Err(SamplerError::InvalidInterval);
        }

        if !V::FIXED_ARITY {
            let probe =
                call_provider(&self.provider).map_err(|e| SamplerError::Probe(Box::new(e)))?;
            if probe.arity() != self.default.arity() {
                return Err(SamplerError::ArityMismatch {
                    expected: self.default.arity(),
                    actual: probe.arity(),
                });
            }
        }

        let handle = match self.handle {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|_| SamplerError::NoRuntime)?,
        };

        Ok(Arc::new(Sampler {
            update_interval_ms: AtomicU64::new(self.key.interval_ms),
            key: self.key,
            provider: self.provider,
            ease: self.ease,
            default: self.default,
            frame: ArcSwap::from_pointee(Frame::empty()),
            last_returned: ArcSwapOption::empty(),
            state: StateCell::new(),
            countdown: AtomicI64::new(0),
            idle_timeout: AtomicU32::new(self.idle_timeout),
            clock: self.clock.unwrap_or_default(),
            handle,
            #[cfg(test)]
            before_sleep: ArcSwapOption::empty(),
        }))
    }
}

/// Invoke a provider, turning errors and panics into [`SamplerError`].
fn call_provider<V>(provider: &ProviderFn<V>) -> SamplerResult<V> {
    match catch_unwind(AssertUnwindSafe(|| provider())) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(SamplerError::Provider(e)),
        Err(payload) => Err(SamplerError::ProviderPanicked(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
