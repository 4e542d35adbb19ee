use actix_web::{get, post, web, HttpResponse};
use agents::logger::parse_io_lines;
use agents::workers::replication::{handle_receive, handle_stop, ReplicationReceivePayload, ReplicationStopPayload};
use agents::Registry;
use chrono::Duration as ChronoDuration;
use serde::Serialize;
use std::collections::HashMap;
use stor_port::SvcError;

const LOG_TAIL_LINES: usize = 500;
const LATENCY_WINDOW_MINUTES: i64 = 15;
const TOP_LATENCY_VOLUME_COUNT: usize = 3;

#[get("/data/{collection}")]
async fn data_passthrough(registry: web::Data<Registry>, path: web::Path<String>) -> HttpResponse {
    HttpResponse::Ok().json(registry.facade().load_raw(&path.into_inner()))
}

#[get("/data/global-systems")]
async fn global_systems(registry: web::Data<Registry>) -> HttpResponse {
    HttpResponse::Ok().json(registry.global_registry().all())
}

#[get("/logs/local")]
async fn logs_local(registry: web::Data<Registry>) -> HttpResponse {
    HttpResponse::Ok().json(registry.logger().local_lines(LOG_TAIL_LINES))
}

#[get("/logs/global")]
async fn logs_global(registry: web::Data<Registry>) -> HttpResponse {
    HttpResponse::Ok().json(registry.logger().global_lines(LOG_TAIL_LINES))
}

#[derive(Debug, Default, Serialize)]
struct VolumeLatencySeries {
    timestamps: Vec<String>,
    values: Vec<f64>,
}

/// Per-volume latency history over the trailing window, for exported volumes
/// only: `{volume_id: {"timestamps": [...], "values": [...]}}`.
#[get("/api/latency")]
async fn api_latency(registry: web::Data<Registry>) -> HttpResponse {
    let cutoff = chrono::Utc::now() - ChronoDuration::minutes(LATENCY_WINDOW_MINUTES);
    let exported: std::collections::HashSet<String> = registry
        .list_volumes()
        .into_iter()
        .filter(|v| v.is_exported)
        .map(|v| v.id.to_string())
        .collect();

    let mut by_volume: HashMap<String, VolumeLatencySeries> = HashMap::new();
    for sample in parse_io_lines(&registry.logger().all_local_lines()) {
        if sample.timestamp < cutoff || !exported.contains(&sample.volume_id) {
            continue;
        }
        let series = by_volume.entry(sample.volume_id).or_default();
        series.timestamps.push(sample.timestamp.format("%Y-%m-%dT%H:%M:%SZ").to_string());
        series.values.push(sample.latency);
    }
    HttpResponse::Ok().json(by_volume)
}

#[derive(Debug, Serialize)]
struct TopVolumeLatency {
    volume_id: String,
    avg_latency: f64,
}

#[derive(Debug, Serialize)]
struct TopLatencyResponse {
    top_volumes: Vec<TopVolumeLatency>,
}

/// Top volumes by average latency over the trailing window:
/// `{"top_volumes": [{"volume_id": .., "avg_latency": ..}]}`, highest first.
#[get("/api/top-latency")]
async fn api_top_latency(registry: web::Data<Registry>) -> HttpResponse {
    let cutoff = chrono::Utc::now() - ChronoDuration::minutes(LATENCY_WINDOW_MINUTES);

    let mut by_volume: HashMap<String, Vec<f64>> = HashMap::new();
    for sample in parse_io_lines(&registry.logger().all_local_lines()) {
        if sample.timestamp < cutoff {
            continue;
        }
        by_volume.entry(sample.volume_id).or_default().push(sample.latency);
    }

    let mut averages: Vec<TopVolumeLatency> = by_volume
        .into_iter()
        .filter(|(_, lats)| !lats.is_empty())
        .map(|(volume_id, lats)| {
            let avg = lats.iter().sum::<f64>() / lats.len() as f64;
            TopVolumeLatency {
                volume_id,
                avg_latency: (avg * 100.0).round() / 100.0,
            }
        })
        .collect();
    averages.sort_by(|a, b| b.avg_latency.partial_cmp(&a.avg_latency).unwrap_or(std::cmp::Ordering::Equal));
    averages.truncate(TOP_LATENCY_VOLUME_COUNT);

    HttpResponse::Ok().json(TopLatencyResponse { top_volumes: averages })
}

#[post("/replication-receive")]
async fn replication_receive(
    registry: web::Data<Registry>,
    body: web::Json<ReplicationReceivePayload>,
) -> Result<HttpResponse, crate::error::ApiError> {
    match handle_receive(&registry, body.into_inner()) {
        Ok(()) => Ok(HttpResponse::Ok().finish()),
        Err(err) => {
            if matches!(err, SvcError::TargetCapacityExceeded) {
                Ok(HttpResponse::BadRequest().json(serde_json::json!({ "error": err.to_string() })))
            } else {
                Err(err.into())
            }
        }
    }
}

#[post("/replication-stop")]
async fn replication_stop(registry: web::Data<Registry>, body: web::Json<ReplicationStopPayload>) -> HttpResponse {
    handle_stop(&registry, body.into_inner());
    HttpResponse::Ok().finish()
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(global_systems)
        .service(logs_local)
        .service(logs_global)
        .service(api_latency)
        .service(api_top_latency)
        .service(replication_receive)
        .service(replication_stop)
        .service(data_passthrough);
}
