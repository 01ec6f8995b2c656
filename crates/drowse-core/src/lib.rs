//! drowse-core — value model shared by every drowse crate.
//!
//! A sampled metric is published as an immutable [`Frame`] holding the
//! previous and current values plus the time the current value was taken.
//! Readers never see the raw step between samples; they see the
//! [`ease`]d value, a linear interpolation that reaches the current
//! sample exactly one update interval after it was taken.
//!
//! ```text
//!  value
//!    │          current ●━━━━━━━━━━
//!    │                ╱
//!    │              ╱   ease(frame, now)
//!    │  previous  ╱
//!    │ ━━━━━━━━━●
//!    └──────────┴─────────┴──────── now
//!           timestamp   timestamp + interval
//! ```

pub mod clock;
pub mod config;
pub mod ease;
pub mod types;

pub use clock::Clock;
pub use config::{ConfigError, DrowseConfig, LogConfig, SamplerConfig, WatchConfig};
pub use ease::{ease, progress, EaseFn};
pub use types::*;
