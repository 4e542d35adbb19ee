use crate::error::ApiResult;
use actix_web::{delete, get, post, put, web, HttpResponse};
use agents::specs::CreateSettingRequest;
use agents::Registry;
use serde::Deserialize;
use stor_port::{SettingId, SettingKind};

#[post("/settings")]
async fn create_setting(registry: web::Data<Registry>, body: web::Json<CreateSettingRequest>) -> ApiResult<HttpResponse> {
    let setting = registry.create_setting(body.into_inner())?;
    Ok(HttpResponse::Created().json(setting))
}

#[get("/settings/{id}")]
async fn get_setting(registry: web::Data<Registry>, path: web::Path<String>) -> ApiResult<HttpResponse> {
    let setting = registry.get_setting(&SettingId::from(path.into_inner()))?;
    Ok(HttpResponse::Ok().json(setting))
}

#[get("/data/all-settings")]
async fn all_settings(registry: web::Data<Registry>) -> HttpResponse {
    HttpResponse::Ok().json(registry.list_settings())
}

#[derive(Debug, Deserialize)]
struct UpdateSettingRequest {
    #[serde(flatten)]
    kind: SettingKind,
}

#[put("/settings/{id}")]
async fn update_setting(
    registry: web::Data<Registry>,
    path: web::Path<String>,
    body: web::Json<UpdateSettingRequest>,
) -> ApiResult<HttpResponse> {
    let setting = registry.update_setting(&SettingId::from(path.into_inner()), body.into_inner().kind)?;
    Ok(HttpResponse::Ok().json(setting))
}

#[delete("/settings/{id}")]
async fn delete_setting(registry: web::Data<Registry>, path: web::Path<String>) -> ApiResult<HttpResponse> {
    registry.delete_setting(&SettingId::from(path.into_inner()))?;
    Ok(HttpResponse::NoContent().finish())
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(create_setting)
        .service(get_setting)
        .service(all_settings)
        .service(update_setting)
        .service(delete_setting);
}
