//! Workload Generator (§4.3): one worker per exported volume, sampling I/O
//! at a fixed cadence until the volume is unexported or deleted.

use crate::registry::{Registry, Role};
use rand::Rng;
use std::time::Duration;
use stor_port::{IoSample, Volume};

const SAMPLE_INTERVAL: Duration = Duration::from_secs(30);
const DEFAULT_IO_SIZE_KB: u64 = 8;

pub fn spawn(registry: Registry, volume: Volume) {
    let shutdown = registry.spawn_task(volume.id.as_str(), Role::Workload);
    tokio::spawn(async move {
        loop {
            let current = match registry.get_volume(&volume.id) {
                Ok(v) if v.is_exported => v,
                _ => {
                    tracing::debug!(volume_id = %volume.id, "workload worker exiting: not exported");
                    return;
                }
            };
            let Some(host_id) = current.exported_host_id.clone() else {
                return;
            };

            let (iops, latency) = {
                let mut rng = rand::thread_rng();
                (rng.gen_range(100..=1000u32), rng.gen_range(1.0..=10.0f64))
            };
            let io_size_kb = current.workload_size.unwrap_or(DEFAULT_IO_SIZE_KB);
            let throughput = iops as f64 * io_size_kb as f64 / 1024.0;

            let sample = IoSample {
                timestamp: chrono::Utc::now(),
                volume_id: current.id.clone(),
                host_id: host_id.clone(),
                iops,
                latency,
                throughput,
            };
            if let Err(err) = registry.facade().push("io_metrics", sample) {
                registry
                    .logger()
                    .warn(format!("failed to append io sample for {}: {err}", current.id), false);
            }
            registry
                .logger()
                .io_sample(current.id.as_str(), host_id.as_str(), iops, latency, throughput);

            if shutdown.race(tokio::time::sleep(SAMPLE_INTERVAL)).await.is_none() {
                return;
            }
        }
    });
}
