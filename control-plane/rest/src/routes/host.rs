use crate::error::ApiResult;
use actix_web::{delete, get, post, put, web, HttpResponse};
use agents::Registry;
use serde::Deserialize;
use stor_port::HostId;

#[derive(Debug, Deserialize)]
struct HostRequest {
    name: String,
    application_type: String,
    protocol: String,
}

#[post("/host")]
async fn create_host(registry: web::Data<Registry>, body: web::Json<HostRequest>) -> ApiResult<HttpResponse> {
    let body = body.into_inner();
    let host = registry.create_host(body.name, body.application_type, body.protocol)?;
    Ok(HttpResponse::Created().json(host))
}

#[get("/host")]
async fn list_hosts(registry: web::Data<Registry>) -> HttpResponse {
    HttpResponse::Ok().json(registry.list_hosts())
}

#[get("/host/{id}")]
async fn get_host(registry: web::Data<Registry>, path: web::Path<String>) -> ApiResult<HttpResponse> {
    let host = registry.get_host(&HostId::from(path.into_inner()))?;
    Ok(HttpResponse::Ok().json(host))
}

#[put("/host/{id}")]
async fn update_host(
    registry: web::Data<Registry>,
    path: web::Path<String>,
    body: web::Json<HostRequest>,
) -> ApiResult<HttpResponse> {
    let body = body.into_inner();
    let host = registry.update_host(
        &HostId::from(path.into_inner()),
        body.name,
        body.application_type,
        body.protocol,
    )?;
    Ok(HttpResponse::Ok().json(host))
}

#[delete("/host/{id}")]
async fn delete_host(registry: web::Data<Registry>, path: web::Path<String>) -> ApiResult<HttpResponse> {
    registry.delete_host(&HostId::from(path.into_inner()))?;
    Ok(HttpResponse::NoContent().finish())
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(create_host)
        .service(list_hosts)
        .service(get_host)
        .service(update_host)
        .service(delete_host);
}
