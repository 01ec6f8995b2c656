//! drowse-sys — operating-system counters for the drowse registry.
//!
//! Counter identities use performance-counter naming so OS counters and
//! internally registered providers share one lookup surface:
//!
//! | category | counter | instance |
//! |----------|---------|----------|
//! | `Processor` | `% Processor Time` | `_Total` or a core index |
//! | `Memory` | `Available MBytes` | |
//! | `Memory` | `% Committed Bytes In Use` | |
//! | `Paging File` | `% Usage` | `_Total` |
//! | `System` | `Processes` | |
//!
//! Names match case-insensitively.

pub mod backend;
pub mod counters;

pub use backend::{per_core_usage, SystemCounters};
pub use counters::{CpuInstance, SystemCounter};
