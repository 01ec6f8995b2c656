//! drowse-sampler — samplers that poll only while someone is reading.
//!
//! A [`Sampler`] owns one provider function and publishes its samples as
//! [`Frame`](drowse_core::Frame)s. Reading a sampler keeps it awake; when
//! nobody has read it for `idle_timeout` ticks it stops polling until the
//! next read.
//!
//! # Architecture
//!
//! ```text
//! Registry
//!   ├── get_counter(category, counter, instance, interval_ms)
//!   │     get-or-create, one Sampler per SamplerKey
//!   ├── register_internal(...) → override overlay, consulted at creation
//!   └── CounterBackend::bind() → OS provider when no override exists
//!
//! Sampler<V>
//!   ├── get_value(easing) ← any thread, never blocks
//!   │     resets countdown, CAS Sleeping → Waking, spawns tick task
//!   └── tick task (one per activation)
//!         sample → publish Frame → countdown-- → sleep(interval) | Sleeping
//! ```
//!
//! # Lifecycle
//!
//! ```text
//!            get_value (CAS winner)           first tick
//! Sleeping ──────────────────────────▶ Waking ──────────▶ Active
//!    ▲                                                     │
//!    └──────────────── countdown reaches 0 ◀───────────────┘
//! ```

pub mod error;
pub mod registry;
pub mod sampler;
pub mod state;

pub use error::{SamplerError, SamplerResult};
pub use registry::{CounterBackend, NullBackend, Registry};
pub use sampler::{ProviderFn, Sampler, SamplerBuilder};
pub use state::ActivityState;
