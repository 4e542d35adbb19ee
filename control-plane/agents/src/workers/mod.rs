//! Background worker population (§4.3-§4.5): one long-lived `tokio` task
//! per exported volume's workload stream, per (volume, snapshot frequency)
//! pair, and per (volume, replication target) pair, all tracked through
//! `Registry`'s task table so a configuration change can cancel exactly the
//! workers it invalidates.

pub mod replication;
pub mod snapshot;
pub mod workload;
