// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Local;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::error::AppError;
use shared_models::AppointmentFilter;

use crate::models::{CreateAppointmentRequest, RateAppointmentRequest, UpdateAppointmentRequest};
use crate::services::{AdminDesk, FrontDesk, PatientDesk};

// ==============================================================================
// ADMIN DESK HANDLERS
// ==============================================================================

pub async fn list_appointments(
    State(desk): State<Arc<FrontDesk>>,
    Query(filter): Query<AppointmentFilter>,
) -> Result<Json<Value>, AppError> {
    let appointments = AdminDesk::new(desk).list_appointment_listings(filter).await?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

pub async fn create_appointment(
    State(desk): State<Arc<FrontDesk>>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let today = Local::now().date_naive();
    let appointment = AdminDesk::new(desk).create(request, today).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment booked successfully"
    })))
}

pub async fn get_appointment(
    State(desk): State<Arc<FrontDesk>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = AdminDesk::new(desk).get(appointment_id).await?;

    Ok(Json(json!({ "appointment": appointment })))
}

pub async fn update_appointment(
    State(desk): State<Arc<FrontDesk>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<UpdateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = AdminDesk::new(desk).update(appointment_id, request).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment updated successfully"
    })))
}

pub async fn delete_appointment(
    State(desk): State<Arc<FrontDesk>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    AdminDesk::new(desk).delete(appointment_id).await?;

    Ok(Json(json!({
        "success": true,
        "appointment_id": appointment_id,
        "message": "Appointment deleted successfully"
    })))
}

pub async fn audit_ratings(State(desk): State<Arc<FrontDesk>>) -> Result<Json<Value>, AppError> {
    let drifts = AdminDesk::new(desk).audit_ratings().await?;

    Ok(Json(json!({
        "consistent": drifts.is_empty(),
        "drifts": drifts,
        "total": drifts.len()
    })))
}

pub async fn repair_ratings(State(desk): State<Arc<FrontDesk>>) -> Result<Json<Value>, AppError> {
    let repaired = AdminDesk::new(desk).repair_drift().await?;

    Ok(Json(json!({
        "success": true,
        "repaired": repaired,
        "total": repaired.len()
    })))
}

pub async fn audit_doctor_rating(
    State(desk): State<Arc<FrontDesk>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let drift = AdminDesk::new(desk).audit_doctor(doctor_id).await?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "consistent": drift.is_none(),
        "drift": drift
    })))
}

pub async fn recompute_doctor_rating(
    State(desk): State<Arc<FrontDesk>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let doctor = AdminDesk::new(desk).recompute_rating(doctor_id).await?;

    Ok(Json(json!({
        "doctor": doctor,
        "avg_rating": doctor.avg_rating
    })))
}

// ==============================================================================
// PATIENT DESK HANDLERS
// ==============================================================================

pub async fn list_patient_appointments(
    State(desk): State<Arc<FrontDesk>>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointments = PatientDesk::new(desk, patient_id).list_appointments().await?;

    Ok(Json(json!({
        "patient_id": patient_id,
        "appointments": appointments,
        "total": appointments.len()
    })))
}

pub async fn book_patient_appointment(
    State(desk): State<Arc<FrontDesk>>,
    Path(patient_id): Path<Uuid>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let today = Local::now().date_naive();
    let appointment = PatientDesk::new(desk, patient_id).create(request, today).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment booked successfully"
    })))
}

pub async fn rate_appointment(
    State(desk): State<Arc<FrontDesk>>,
    Path((patient_id, appointment_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<RateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let doctor = PatientDesk::new(desk, patient_id)
        .rate(appointment_id, request.rating)
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment_id": appointment_id,
        "doctor": doctor,
        "avg_rating": doctor.avg_rating,
        "message": "Thank you for rating your doctor"
    })))
}
