use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use appointment_cell::router::{admin_routes, patient_routes};
use appointment_cell::FrontDesk;
use doctor_cell::router::directory_routes;
use shared_config::AppConfig;
use shared_database::ClinicStore;

pub fn create_router(store: Arc<dyn ClinicStore>, config: Arc<AppConfig>) -> Router {
    let desk = Arc::new(FrontDesk::new(Arc::clone(&store), Arc::clone(&config)));

    Router::new()
        .route("/", get(|| async { "Clinic Desk API is running!" }))
        .nest("/directory", directory_routes(store, config))
        .nest("/admin", admin_routes(Arc::clone(&desk)))
        .nest("/patients", patient_routes(desk))
}
