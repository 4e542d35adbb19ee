use crate::error::ApiResult;
use actix_web::{delete, get, post, put, web, HttpResponse};
use agents::specs::CreateSystemOpts;
use agents::Registry;
use serde::Deserialize;
use stor_port::error::ImmutableSystemFieldSnafu;

#[post("/system")]
async fn create_system(registry: web::Data<Registry>, body: web::Json<CreateSystemOpts>) -> ApiResult<HttpResponse> {
    let system = registry.create_system(body.into_inner())?;
    Ok(HttpResponse::Created().json(system))
}

#[get("/system")]
async fn get_system(registry: web::Data<Registry>) -> ApiResult<HttpResponse> {
    let system = registry.get_system()?;
    Ok(HttpResponse::Ok().json(system))
}

#[derive(Debug, Deserialize)]
struct UpdateSystemRequest {
    name: Option<String>,
    max_throughput: Option<f64>,
    max_capacity: Option<u64>,
}

#[put("/system")]
async fn update_system(registry: web::Data<Registry>, body: web::Json<UpdateSystemRequest>) -> ApiResult<HttpResponse> {
    if body.max_throughput.is_some() || body.max_capacity.is_some() {
        return Err(ImmutableSystemFieldSnafu.build().into());
    }
    let system = match &body.name {
        Some(name) => registry.update_system_name(name.clone())?,
        None => registry.get_system()?,
    };
    Ok(HttpResponse::Ok().json(system))
}

#[delete("/system")]
async fn delete_system(registry: web::Data<Registry>) -> ApiResult<HttpResponse> {
    registry.delete_system()?;
    Ok(HttpResponse::NoContent().finish())
}

#[get("/all-systems")]
async fn all_systems(registry: web::Data<Registry>) -> HttpResponse {
    HttpResponse::Ok().json(registry.global_registry().all())
}

#[get("/system/metrics")]
async fn system_metrics(registry: web::Data<Registry>) -> HttpResponse {
    let metrics: stor_port::SystemMetrics = registry.facade().load("system_metrics");
    HttpResponse::Ok().json(metrics)
}

#[post("/cleanup")]
async fn cleanup(registry: web::Data<Registry>) -> ApiResult<HttpResponse> {
    let metrics = agents::housekeeper::sweep(&registry)?;
    Ok(HttpResponse::Ok().json(metrics))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(create_system)
        .service(get_system)
        .service(update_system)
        .service(delete_system)
        .service(all_systems)
        .service(system_metrics)
        .service(cleanup);
}
