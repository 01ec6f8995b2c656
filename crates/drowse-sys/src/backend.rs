//! `CounterBackend` over `sysinfo`.

use std::sync::Arc;

use parking_lot::Mutex;
use sysinfo::System;
use tracing::debug;

use drowse_core::CounterId;
use drowse_sampler::{CounterBackend, ProviderFn, SamplerError, SamplerResult};

use crate::counters::{CpuInstance, SystemCounter};

/// Binds OS counter identities to `sysinfo` readers.
///
/// Every binding owns its own `System`, so samplers polling the same
/// counter at different cadences never share a CPU-usage baseline.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemCounters;

impl SystemCounters {
    /// Every identity this backend binds on the current machine.
    pub fn supported() -> Vec<CounterId> {
        let mut system = System::new();
        system.refresh_cpu();

        let mut ids = vec![SystemCounter::ProcessorTime(CpuInstance::Total).id()];
        ids.extend(
            (0..system.cpus().len())
                .map(|core| SystemCounter::ProcessorTime(CpuInstance::Core(core)).id()),
        );
        ids.extend(
            [
                SystemCounter::AvailableMBytes,
                SystemCounter::CommittedBytesInUse,
                SystemCounter::PagingFileUsage,
                SystemCounter::Processes,
            ]
            .iter()
            .map(SystemCounter::id),
        );
        ids
    }
}

impl CounterBackend for SystemCounters {
    fn bind(&self, id: &CounterId) -> SamplerResult<ProviderFn<f64>> {
        let counter =
            SystemCounter::parse(id).ok_or_else(|| SamplerError::UnknownCounter(id.clone()))?;

        let mut system = System::new();
        counter.prime(&mut system);
        if let SystemCounter::ProcessorTime(CpuInstance::Core(core)) = counter {
            if core >= system.cpus().len() {
                return Err(SamplerError::UnknownCounter(id.clone()));
            }
        }

        debug!(counter = %id, "bound OS counter");
        let system = Mutex::new(system);
        Ok(Arc::new(move || counter.read(&mut system.lock())))
    }
}

/// Provider of per-core busy percentages, plus the core count to size the
/// sampler's default with.
pub fn per_core_usage() -> (ProviderFn<Vec<f64>>, usize) {
    let mut system = System::new();
    system.refresh_cpu();
    let cores = system.cpus().len();

    let system = Mutex::new(system);
    let provider: ProviderFn<Vec<f64>> = Arc::new(move || {
        let mut system = system.lock();
        system.refresh_cpu();
        Ok(system
            .cpus()
            .iter()
            .map(|cpu| f64::from(cpu.cpu_usage()))
            .collect())
    });
    (provider, cores)
}

#[cfg(test)]
mod tests {
    use super::*;
    use drowse_core::SamplerKey;
    use drowse_sampler::Sampler;

    #[test]
    fn supported_identities_all_bind() {
        let backend = SystemCounters;
        let ids = SystemCounters::supported();
        assert!(ids.len() >= 6);
        for id in &ids {
            assert!(backend.bind(id).is_ok(), "{id} did not bind");
        }
    }

    #[test]
    fn unknown_identity_is_rejected() {
        let err = SystemCounters
            .bind(&CounterId::new("GPU", "Utilization", ""))
            .err()
            .unwrap();
        assert!(matches!(err, SamplerError::UnknownCounter(_)));
    }

    #[test]
    fn absent_core_is_rejected() {
        let id = CounterId::new("Processor", "% Processor Time", "100000");
        assert!(SystemCounters.bind(&id).is_err());
    }

    #[test]
    fn bound_providers_read_plausible_values() {
        let processes = SystemCounters
            .bind(&CounterId::new("System", "Processes", ""))
            .unwrap();
        assert!(processes().unwrap() >= 1.0);

        let available = SystemCounters
            .bind(&CounterId::new("Memory", "Available MBytes", ""))
            .unwrap();
        assert!(available().unwrap() >= 0.0);

        let cpu = SystemCounters
            .bind(&CounterId::new("Processor", "% Processor Time", "_Total"))
            .unwrap();
        let usage = cpu().unwrap();
        assert!((0.0..=100.0).contains(&usage), "cpu usage {usage}");
    }

    #[tokio::test]
    async fn per_core_sampler_matches_core_count() {
        let (provider, cores) = per_core_usage();
        let key = SamplerKey::new("Processor", "% Processor Time", "*", 1000);
        let sampler = Sampler::builder(key, provider, vec![0.0; cores])
            .build()
            .unwrap();
        assert_eq!(sampler.get_value(true).len(), cores);
    }
}
