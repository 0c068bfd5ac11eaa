// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::services::FrontDesk;

/// Staff desk: full appointment management and rating audits.
pub fn admin_routes(desk: Arc<FrontDesk>) -> Router {
    Router::new()
        .route(
            "/appointments",
            get(handlers::list_appointments).post(handlers::create_appointment),
        )
        .route(
            "/appointments/{appointment_id}",
            get(handlers::get_appointment)
                .put(handlers::update_appointment)
                .delete(handlers::delete_appointment),
        )
        .route("/ratings/audit", get(handlers::audit_ratings))
        .route("/ratings/repair", post(handlers::repair_ratings))
        .route("/ratings/doctors/{doctor_id}/audit", get(handlers::audit_doctor_rating))
        .route("/ratings/doctors/{doctor_id}/recompute", post(handlers::recompute_doctor_rating))
        .with_state(desk)
}

/// Patient desk, bound to the patient in the path.
pub fn patient_routes(desk: Arc<FrontDesk>) -> Router {
    Router::new()
        .route(
            "/{patient_id}/appointments",
            get(handlers::list_patient_appointments).post(handlers::book_patient_appointment),
        )
        .route(
            "/{patient_id}/appointments/{appointment_id}/rating",
            post(handlers::rate_appointment),
        )
        .with_state(desk)
}
