pub mod counters;
pub mod watch;
