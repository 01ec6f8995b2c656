//! Activity state of a sampler, packed into one atomic cell.
//!
//! The wake guard is the state itself: only the caller whose
//! compare-and-swap moves `Sleeping` to `Waking` may start a tick task.

use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ActivityState {
    /// No tick task, provider not polled.
    Sleeping = 0,
    /// A reader won the wake race; the first tick is pending.
    Waking = 1,
    /// The tick task is running or waiting for its next tick.
    Active = 2,
}

impl ActivityState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => ActivityState::Sleeping,
            1 => ActivityState::Waking,
            _ => ActivityState::Active,
        }
    }
}

#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(ActivityState::Sleeping as u8))
    }

    pub(crate) fn load(&self) -> ActivityState {
        ActivityState::from_u8(self.0.load(Ordering::SeqCst))
    }

    /// `Sleeping → Waking`. Returns `true` for exactly one of any set of racing callers.
    pub(crate) fn try_wake(&self) -> bool {
        self.0
            .compare_exchange(
                ActivityState::Sleeping as u8,
                ActivityState::Waking as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }

    pub(crate) fn activate(&self) {
        self.0.store(ActivityState::Active as u8, Ordering::SeqCst);
    }

    pub(crate) fn sleep(&self) {
        self.0.store(ActivityState::Sleeping as u8, Ordering::SeqCst);
    }
}
