//! CLI/env configuration, mirroring the teacher's `clap`-derived,
//! env-overridable `StartOptions` idiom (§10.2).

use clap::Parser;

#[derive(Debug, Parser, Clone)]
#[command(name = "rest", about = "Storage array fleet simulator control plane")]
pub struct CliArgs {
    /// Listen port. `FLASK_PORT`'s Rust equivalent.
    #[arg(long, env = "PORT", default_value_t = 5000)]
    pub port: u16,

    /// Probe for the first free port in [port, port+50) instead of binding
    /// to `port` directly.
    #[arg(long, env = "PROBE_PORT", default_value_t = false)]
    pub probe_port: bool,

    /// Instance data directory. Defaults to `data_instance_<port>`.
    #[arg(long, env = "DATA_DIR")]
    pub data_dir: Option<String>,

    /// Path to the shared cross-instance registry file.
    #[arg(long, env = "GLOBAL_REGISTRY_PATH", default_value = "global_systems.json")]
    pub global_registry_path: String,
}

impl CliArgs {
    pub fn data_dir(&self, port: u16) -> String {
        self.data_dir
            .clone()
            .unwrap_or_else(|| format!("data_instance_{port}"))
    }
}
