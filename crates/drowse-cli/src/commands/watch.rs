use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Args;
use serde::Serialize;
use tokio::time::Instant;
use tracing::info;

use drowse_core::{DrowseConfig, SamplerKey, WatchConfig};
use drowse_sampler::{Registry, Sampler};
use drowse_sys::{per_core_usage, SystemCounters};

use crate::OutputFormat;

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Counter category, e.g. "Processor".
    #[arg(long, requires = "counter")]
    category: Option<String>,
    /// Counter name, e.g. "% Processor Time".
    #[arg(long, requires = "category")]
    counter: Option<String>,
    /// Counter instance, e.g. "_Total" (empty if omitted).
    #[arg(long, requires = "category")]
    instance: Option<String>,
    /// Sampling interval for the flag-specified counter.
    #[arg(long)]
    interval_ms: Option<u64>,
    /// Print raw samples instead of eased values for the flag-specified counter.
    #[arg(long)]
    raw: bool,
    /// Also watch per-core processor time as one vector.
    #[arg(long)]
    per_core: bool,
    /// How often to read and print, in milliseconds.
    #[arg(long, default_value = "100")]
    period_ms: u64,
    /// Stop after this many seconds (default: until Ctrl-C).
    #[arg(long)]
    duration_secs: Option<u64>,
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

/// One printed line.
#[derive(Debug, Serialize)]
struct Reading<'a> {
    t_ms: u64,
    counter: String,
    interval_ms: u64,
    eased: bool,
    value: ReadingValue<'a>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ReadingValue<'a> {
    Scalar(f64),
    Vector(&'a [f64]),
}

impl Reading<'_> {
    fn render(&self, format: OutputFormat) -> anyhow::Result<String> {
        Ok(match format {
            OutputFormat::Json => serde_json::to_string(self)?,
            OutputFormat::Text => {
                let value = match &self.value {
                    ReadingValue::Scalar(v) => format!("{v:.2}"),
                    ReadingValue::Vector(vs) => vs
                        .iter()
                        .map(|v| format!("{v:.1}"))
                        .collect::<Vec<_>>()
                        .join(" "),
                };
                format!(
                    "{:>8} {}@{}ms{} {}",
                    self.t_ms,
                    self.counter,
                    self.interval_ms,
                    if self.eased { "" } else { " (raw)" },
                    value
                )
            }
        })
    }
}

/// Config entries plus the flag-specified counter; total processor time
/// when nothing else is asked for.
fn collect_watches(args: &WatchArgs, config: &DrowseConfig) -> Vec<WatchConfig> {
    let mut watches = config.watch.clone();

    if let (Some(category), Some(counter)) = (&args.category, &args.counter) {
        watches.push(WatchConfig {
            category: category.clone(),
            counter: counter.clone(),
            instance: args.instance.clone().unwrap_or_default(),
            interval_ms: args.interval_ms,
            easing: !args.raw,
        });
    }

    if watches.is_empty() && !args.per_core {
        watches.push(WatchConfig {
            category: "Processor".to_string(),
            counter: "% Processor Time".to_string(),
            instance: "_Total".to_string(),
            interval_ms: args.interval_ms,
            easing: !args.raw,
        });
    }
    watches
}

pub async fn run(args: WatchArgs, config: DrowseConfig) -> anyhow::Result<()> {
    anyhow::ensure!(args.period_ms > 0, "--period-ms must be greater than 0");

    let registry = Registry::new(Arc::new(SystemCounters), config.defaults)?;
    let started = Instant::now();
    registry.register_internal("Drowse", "Uptime Seconds", "", move || {
        Ok(started.elapsed().as_secs_f64())
    });

    let watches = collect_watches(&args, &config);
    let mut samplers = Vec::with_capacity(watches.len());
    for watch in &watches {
        let key = watch.key(&config.defaults);
        let sampler = registry
            .get(key.clone())
            .with_context(|| format!("cannot watch {key}"))?;
        samplers.push((sampler, watch.easing));
    }

    let per_core = if args.per_core {
        let (provider, cores) = per_core_usage();
        let interval_ms = args
            .interval_ms
            .unwrap_or(config.defaults.update_interval_ms);
        let key = SamplerKey::new("Processor", "% Processor Time", "*", interval_ms);
        let sampler = Sampler::builder(key, provider, vec![0.0; cores])
            .idle_timeout(config.defaults.idle_timeout)
            .clock(registry.clock())
            .build()?;
        Some(sampler)
    } else {
        None
    };

    info!(
        counters = samplers.len(),
        per_core = args.per_core,
        period_ms = args.period_ms,
        "watching"
    );

    let deadline = args
        .duration_secs
        .map(|secs| Instant::now() + Duration::from_secs(secs));
    let mut ticker = tokio::time::interval(Duration::from_millis(args.period_ms));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let t_ms = registry.clock().now_ms();
                for (sampler, easing) in &samplers {
                    print_reading(&sampler_reading(t_ms, sampler, *easing), args.format)?;
                }
                if let Some(sampler) = &per_core {
                    let values = sampler.get_value(true);
                    let reading = Reading {
                        t_ms,
                        counter: sampler.key().counter.to_string(),
                        interval_ms: sampler.update_interval_ms(),
                        eased: true,
                        value: ReadingValue::Vector(&values),
                    };
                    print_reading(&reading, args.format)?;
                }

                if deadline.is_some_and(|d| Instant::now() >= d) {
                    break;
                }
            }
            _ = &mut ctrl_c => {
                info!("interrupted");
                break;
            }
        }
    }

    info!(samplers = registry.len(), "watch finished");
    Ok(())
}

fn sampler_reading(t_ms: u64, sampler: &Arc<Sampler<f64>>, easing: bool) -> Reading<'static> {
    Reading {
        t_ms,
        counter: sampler.key().counter.to_string(),
        interval_ms: sampler.update_interval_ms(),
        eased: easing,
        value: ReadingValue::Scalar(sampler.get_value(easing)),
    }
}

fn print_reading(reading: &Reading<'_>, format: OutputFormat) -> anyhow::Result<()> {
    println!("{}", reading.render(format)?);
    Ok(())
}
