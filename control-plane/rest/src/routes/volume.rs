use crate::error::ApiResult;
use actix_web::{delete, get, post, put, web, HttpResponse};
use agents::specs::UpdateVolumeRequest;
use agents::Registry;
use serde::Deserialize;
use stor_port::{HostId, SystemId, VolumeId};

#[derive(Debug, Deserialize)]
struct CreateVolumeRequest {
    system_id: SystemId,
    name: String,
    size: u64,
}

#[post("/volume")]
async fn create_volume(registry: web::Data<Registry>, body: web::Json<CreateVolumeRequest>) -> ApiResult<HttpResponse> {
    let body = body.into_inner();
    let volume = registry.create_volume(&body.system_id, body.name, body.size)?;
    Ok(HttpResponse::Created().json(volume))
}

#[get("/volume/{id}")]
async fn get_volume(registry: web::Data<Registry>, path: web::Path<String>) -> ApiResult<HttpResponse> {
    let volume = registry.get_volume(&VolumeId::from(path.into_inner()))?;
    Ok(HttpResponse::Ok().json(volume))
}

#[put("/volume/{id}")]
async fn update_volume(
    registry: web::Data<Registry>,
    path: web::Path<String>,
    body: web::Json<UpdateVolumeRequest>,
) -> ApiResult<HttpResponse> {
    let volume = registry.update_volume(&VolumeId::from(path.into_inner()), body.into_inner())?;
    Ok(HttpResponse::Ok().json(volume))
}

#[delete("/volume/{id}")]
async fn delete_volume(registry: web::Data<Registry>, path: web::Path<String>) -> ApiResult<HttpResponse> {
    registry.delete_volume(&VolumeId::from(path.into_inner()))?;
    Ok(HttpResponse::NoContent().finish())
}

#[derive(Debug, Deserialize)]
struct ExportVolumeRequest {
    volume_id: VolumeId,
    host_id: HostId,
    workload_size: Option<u64>,
}

#[post("/export-volume")]
async fn export_volume(registry: web::Data<Registry>, body: web::Json<ExportVolumeRequest>) -> ApiResult<HttpResponse> {
    let body = body.into_inner();
    let volume = registry.export_volume(&body.volume_id, body.host_id, body.workload_size)?;
    Ok(HttpResponse::Ok().json(volume))
}

#[derive(Debug, Deserialize)]
struct UnexportVolumeRequest {
    volume_id: VolumeId,
}

#[post("/unexport-volume")]
async fn unexport_volume(registry: web::Data<Registry>, body: web::Json<UnexportVolumeRequest>) -> ApiResult<HttpResponse> {
    let volume = registry.unexport_volume(&body.volume_id, "requested via control plane")?;
    Ok(HttpResponse::Ok().json(volume))
}

#[get("/data/exported-volumes")]
async fn exported_volumes(registry: web::Data<Registry>) -> HttpResponse {
    let volumes: Vec<_> = registry.list_volumes().into_iter().filter(|v| v.is_exported).collect();
    HttpResponse::Ok().json(volumes)
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(create_volume)
        .service(get_volume)
        .service(update_volume)
        .service(delete_volume)
        .service(export_volume)
        .service(unexport_volume)
        .service(exported_volumes);
}
