//! Shared types used across drowse crates.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a physical counter, independent of sampling cadence.
///
/// This is the key of the provider override overlay.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CounterId {
    pub category: String,
    pub counter: String,
    #[serde(default)]
    pub instance: String,
}

impl CounterId {
    pub fn new(
        category: impl Into<String>,
        counter: impl Into<String>,
        instance: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            counter: counter.into(),
            instance: instance.into(),
        }
    }
}

impl fmt::Display for CounterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.instance.is_empty() {
            write!(f, "{}/{}", self.category, self.counter)
        } else {
            write!(f, "{}/{}/{}", self.category, self.counter, self.instance)
        }
    }
}

/// Identity of a sampler: a counter plus the cadence it is polled at.
///
/// The same counter sampled at two intervals is two distinct samplers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SamplerKey {
    pub counter: CounterId,
    pub interval_ms: u64,
}

impl SamplerKey {
    pub fn new(
        category: impl Into<String>,
        counter: impl Into<String>,
        instance: impl Into<String>,
        interval_ms: u64,
    ) -> Self {
        Self {
            counter: CounterId::new(category, counter, instance),
            interval_ms,
        }
    }

    pub fn category(&self) -> &str {
        &self.counter.category
    }

    pub fn counter_name(&self) -> &str {
        &self.counter.counter
    }

    pub fn instance(&self) -> &str {
        &self.counter.instance
    }
}

impl fmt::Display for SamplerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}ms", self.counter, self.interval_ms)
    }
}

/// A value a sampler can publish and interpolate.
///
/// Implemented for scalar `f64` and for `Vec<f64>` (one element per
/// sub-metric, e.g. per CPU core).
pub trait Sample: Clone + fmt::Debug + Send + Sync + 'static {
    /// Whether every value of this type has the same arity.
    ///
    /// Types with a runtime arity get their provider probed once at
    /// construction so a mismatched default fails fast.
    const FIXED_ARITY: bool;

    /// Number of sub-metrics carried by this value.
    fn arity(&self) -> usize;

    /// Linear interpolation from `from` to `to` at factor `t` in `[0, 1]`.
    ///
    /// Callers guarantee both sides have the same arity.
    fn lerp(from: &Self, to: &Self, t: f64) -> Self;
}

impl Sample for f64 {
    const FIXED_ARITY: bool = true;

    fn arity(&self) -> usize {
        1
    }

    fn lerp(from: &Self, to: &Self, t: f64) -> Self {
        let value = from + (to - from) * t;
        // Rounding must not push the result outside the segment, or easing
        // would stop being monotonic just before it snaps to `to`.
        let (lo, hi) = if from <= to { (*from, *to) } else { (*to, *from) };
        value.max(lo).min(hi)
    }
}

impl Sample for Vec<f64> {
    const FIXED_ARITY: bool = false;

    fn arity(&self) -> usize {
        self.len()
    }

    fn lerp(from: &Self, to: &Self, t: f64) -> Self {
        from.iter()
            .zip(to.iter())
            .map(|(a, b)| f64::lerp(a, b, t))
            .collect()
    }
}

/// An immutable (previous, current, timestamp) triple.
///
/// Frames are replaced wholesale, never mutated. A side is `None` until a
/// sample has been taken for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame<V> {
    pub previous: Option<V>,
    pub current: Option<V>,
    /// Clock time in milliseconds at which `current` was obtained.
    pub timestamp_ms: u64,
}

impl<V> Frame<V> {
    /// The frame a sampler starts with, before its first sample.
    pub fn empty() -> Self {
        Self {
            previous: None,
            current: None,
            timestamp_ms: 0,
        }
    }

    pub fn new(previous: Option<V>, current: V, timestamp_ms: u64) -> Self {
        Self {
            previous,
            current: Some(current),
            timestamp_ms,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_none()
    }
}

impl<V> Default for Frame<V> {
    fn default() -> Self {
        Self::empty()
    }
}
