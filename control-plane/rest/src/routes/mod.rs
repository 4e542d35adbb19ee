pub mod data;
pub mod host;
pub mod settings;
pub mod system;
pub mod volume;

use actix_web::web;

pub fn configure(cfg: &mut web::ServiceConfig) {
    system::configure(cfg);
    host::configure(cfg);
    volume::configure(cfg);
    settings::configure(cfg);
    data::configure(cfg);
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test, App};
    use agents::Registry;
    use serde_json::json;

    fn new_registry(port: u16) -> Registry {
        let data_dir = tempfile::tempdir().unwrap();
        let registry_file = tempfile::NamedTempFile::new().unwrap();
        Registry::new(data_dir.path(), registry_file.path(), port).unwrap()
    }

    #[actix_web::test]
    async fn create_system_then_get_system_round_trips() {
        let registry = new_registry(5100);
        let app = test::init_service(App::new().app_data(web::Data::new(registry)).configure(configure)).await;

        let req = test::TestRequest::post().uri("/system").set_json(json!({})).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let req = test::TestRequest::get().uri("/system").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn creating_a_second_system_on_the_same_instance_is_a_conflict() {
        let registry = new_registry(5101);
        let app = test::init_service(App::new().app_data(web::Data::new(registry)).configure(configure)).await;

        let req = test::TestRequest::post().uri("/system").set_json(json!({})).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

        let req = test::TestRequest::post().uri("/system").set_json(json!({})).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn updating_max_capacity_is_rejected_as_immutable() {
        let registry = new_registry(5102);
        let app = test::init_service(App::new().app_data(web::Data::new(registry)).configure(configure)).await;

        let req = test::TestRequest::post().uri("/system").set_json(json!({})).to_request();
        test::call_service(&app, req).await;

        let req = test::TestRequest::put()
            .uri("/system")
            .set_json(json!({ "max_capacity": 99 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn exported_volumes_is_empty_before_any_export() {
        let registry = new_registry(5103);
        let app = test::init_service(App::new().app_data(web::Data::new(registry)).configure(configure)).await;

        let req = test::TestRequest::post().uri("/system").set_json(json!({})).to_request();
        test::call_service(&app, req).await;

        let req = test::TestRequest::get().uri("/data/exported-volumes").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body, json!([]));
    }

    #[actix_web::test]
    async fn unknown_collection_passthrough_defaults_to_empty_array() {
        let registry = new_registry(5104);
        let app = test::init_service(App::new().app_data(web::Data::new(registry)).configure(configure)).await;

        let req = test::TestRequest::get().uri("/data/widgets").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body, json!([]));
    }
}
