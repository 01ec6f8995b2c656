//! Known OS counters and how to read them from `sysinfo`.

use anyhow::{anyhow, bail};
use sysinfo::System;

use drowse_core::CounterId;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuInstance {
    Total,
    Core(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemCounter {
    /// Busy percentage, 0–100.
    ProcessorTime(CpuInstance),
    AvailableMBytes,
    /// Used physical memory as a percentage of total.
    CommittedBytesInUse,
    /// Used swap as a percentage of total; 0 without swap.
    PagingFileUsage,
    Processes,
}

impl SystemCounter {
    /// Resolve a counter identity, or `None` if it is not an OS counter.
    pub fn parse(id: &CounterId) -> Option<Self> {
        let category = id.category.trim();
        let counter = id.counter.trim();
        let instance = id.instance.trim();
        let is = |a: &str, b: &str| a.eq_ignore_ascii_case(b);

        if is(category, "Processor") && is(counter, "% Processor Time") {
            if is(instance, "_Total") {
                return Some(SystemCounter::ProcessorTime(CpuInstance::Total));
            }
            return instance
                .parse()
                .ok()
                .map(|core| SystemCounter::ProcessorTime(CpuInstance::Core(core)));
        }
        if is(category, "Memory") && instance.is_empty() {
            if is(counter, "Available MBytes") {
                return Some(SystemCounter::AvailableMBytes);
            }
            if is(counter, "% Committed Bytes In Use") {
                return Some(SystemCounter::CommittedBytesInUse);
            }
        }
        if is(category, "Paging File") && is(counter, "% Usage") && is(instance, "_Total") {
            return Some(SystemCounter::PagingFileUsage);
        }
        if is(category, "System") && is(counter, "Processes") && instance.is_empty() {
            return Some(SystemCounter::Processes);
        }
        None
    }

    /// Canonical identity of this counter.
    pub fn id(&self) -> CounterId {
        match self {
            SystemCounter::ProcessorTime(CpuInstance::Total) => {
                CounterId::new("Processor", "% Processor Time", "_Total")
            }
            SystemCounter::ProcessorTime(CpuInstance::Core(core)) => {
                CounterId::new("Processor", "% Processor Time", core.to_string())
            }
            SystemCounter::AvailableMBytes => CounterId::new("Memory", "Available MBytes", ""),
            SystemCounter::CommittedBytesInUse => {
                CounterId::new("Memory", "% Committed Bytes In Use", "")
            }
            SystemCounter::PagingFileUsage => CounterId::new("Paging File", "% Usage", "_Total"),
            SystemCounter::Processes => CounterId::new("System", "Processes", ""),
        }
    }

    /// Refresh whatever `read` depends on, so the first real read has a
    /// baseline (CPU usage is a delta between two refreshes).
    pub(crate) fn prime(&self, system: &mut System) {
        match self {
            SystemCounter::ProcessorTime(_) => system.refresh_cpu(),
            SystemCounter::AvailableMBytes
            | SystemCounter::CommittedBytesInUse
            | SystemCounter::PagingFileUsage => system.refresh_memory(),
            SystemCounter::Processes => {}
        }
    }

    pub(crate) fn read(&self, system: &mut System) -> anyhow::Result<f64> {
        match self {
            SystemCounter::ProcessorTime(CpuInstance::Total) => {
                system.refresh_cpu();
                Ok(f64::from(system.global_cpu_info().cpu_usage()))
            }
            SystemCounter::ProcessorTime(CpuInstance::Core(core)) => {
                system.refresh_cpu();
                system
                    .cpus()
                    .get(*core)
                    .map(|cpu| f64::from(cpu.cpu_usage()))
                    .ok_or_else(|| anyhow!("processor {core} not present"))
            }
            SystemCounter::AvailableMBytes => {
                system.refresh_memory();
                Ok(system.available_memory() as f64 / BYTES_PER_MB)
            }
            SystemCounter::CommittedBytesInUse => {
                system.refresh_memory();
                let total = system.total_memory();
                if total == 0 {
                    bail!("total memory reported as 0");
                }
                Ok(system.used_memory() as f64 / total as f64 * 100.0)
            }
            SystemCounter::PagingFileUsage => {
                system.refresh_memory();
                let total = system.total_swap();
                if total == 0 {
                    return Ok(0.0);
                }
                Ok(system.used_swap() as f64 / total as f64 * 100.0)
            }
            SystemCounter::Processes => {
                system.refresh_processes();
                Ok(system.processes().len() as f64)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_identities() {
        let cases = [
            (
                CounterId::new("Processor", "% Processor Time", "_Total"),
                SystemCounter::ProcessorTime(CpuInstance::Total),
            ),
            (
                CounterId::new("processor", "% processor time", "3"),
                SystemCounter::ProcessorTime(CpuInstance::Core(3)),
            ),
            (
                CounterId::new("Memory", "Available MBytes", ""),
                SystemCounter::AvailableMBytes,
            ),
            (
                CounterId::new("Memory", "% Committed Bytes In Use", ""),
                SystemCounter::CommittedBytesInUse,
            ),
            (
                CounterId::new("Paging File", "% Usage", "_Total"),
                SystemCounter::PagingFileUsage,
            ),
            (
                CounterId::new("System", "Processes", ""),
                SystemCounter::Processes,
            ),
        ];
        for (id, expected) in cases {
            assert_eq!(SystemCounter::parse(&id), Some(expected), "{id}");
        }
    }

    #[test]
    fn rejects_unknown_identities() {
        for id in [
            CounterId::new("Processor", "% Processor Time", "all"),
            CounterId::new("Memory", "Available MBytes", "_Total"),
            CounterId::new("GPU", "Utilization", ""),
            CounterId::new("Drowse", "Uptime Seconds", ""),
        ] {
            assert_eq!(SystemCounter::parse(&id), None, "{id}");
        }
    }

    #[test]
    fn id_round_trips() {
        for counter in [
            SystemCounter::ProcessorTime(CpuInstance::Total),
            SystemCounter::ProcessorTime(CpuInstance::Core(0)),
            SystemCounter::AvailableMBytes,
            SystemCounter::CommittedBytesInUse,
            SystemCounter::PagingFileUsage,
            SystemCounter::Processes,
        ] {
            assert_eq!(SystemCounter::parse(&counter.id()), Some(counter));
        }
    }

    #[test]
    fn memory_percentages_are_bounded() {
        let mut system = System::new();
        for counter in [SystemCounter::CommittedBytesInUse, SystemCounter::PagingFileUsage] {
            let value = counter.read(&mut system).unwrap();
            assert!((0.0..=100.0).contains(&value), "{counter:?} = {value}");
        }
    }

    #[test]
    fn missing_core_is_an_error() {
        let mut system = System::new();
        let counter = SystemCounter::ProcessorTime(CpuInstance::Core(usize::MAX));
        assert!(counter.read(&mut system).is_err());
    }
}
