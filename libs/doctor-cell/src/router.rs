use std::sync::Arc;

use axum::{routing::get, Router};

use shared_config::AppConfig;
use shared_database::ClinicStore;

use crate::handlers::{self, DirectoryState};

pub fn directory_routes(store: Arc<dyn ClinicStore>, config: Arc<AppConfig>) -> Router {
    let state = Arc::new(DirectoryState { store, config });

    Router::new()
        .route("/departments", get(handlers::list_departments))
        .route("/departments/{department_id}/doctors", get(handlers::list_department_doctors))
        .route("/doctors/{doctor_id}", get(handlers::get_doctor))
        .route("/doctors/{doctor_id}/availability", get(handlers::get_doctor_availability))
        .route("/slots", get(handlers::get_slot_grid))
        .with_state(state)
}
