mod config;
mod error;
mod routes;

use actix_web::{web, App, HttpServer};
use agents::Registry;
use clap::Parser;
use config::CliArgs;
use std::net::TcpListener;
use tracing_actix_web::TracingLogger;
use utils::{FmtLayer, FmtStyle, TracingTelemetry};

/// Probes `[start, start+50)` for the first port this process can bind,
/// the way the instance's original port-probing startup did (§4.7).
fn probe_port(start: u16) -> anyhow::Result<u16> {
    for port in start..start.saturating_add(50) {
        if TcpListener::bind(("0.0.0.0", port)).is_ok() {
            return Ok(port);
        }
    }
    anyhow::bail!("no free port found in [{start}, {start}+50)")
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    TracingTelemetry::builder()
        .with_writer(FmtLayer::Stdout)
        .with_style(FmtStyle::Compact)
        .init("rest");

    let port = if args.probe_port {
        probe_port(args.port)?
    } else {
        args.port
    };
    let data_dir = args.data_dir(port);

    let registry = Registry::new(data_dir.clone(), args.global_registry_path.clone(), port)?;
    tracing::info!(port, data_dir = %data_dir, "instance starting");

    let (housekeeper_handle, housekeeper_shutdown) = shutdown::pair();
    let housekeeper_registry = registry.clone();
    tokio::spawn(agents::housekeeper::run(housekeeper_registry, housekeeper_shutdown));

    let app_registry = registry.clone();
    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_registry.clone()))
            .wrap(TracingLogger::default())
            .configure(routes::configure)
    })
    .bind(("0.0.0.0", port))?
    .run();

    tokio::select! {
        result = server => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown requested");
        }
    }
    housekeeper_handle.cancel();
    Ok(())
}
