use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Local;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::ClinicStore;
use shared_models::error::AppError;

use crate::models::{AvailabilityQuery, DoctorListQuery, SlotGridQuery};
use crate::services::calendar::{bookable_dates, generate_slots};
use crate::services::directory::parse_min_rating;
use crate::services::{AvailabilityResolver, DoctorDirectory};

pub struct DirectoryState {
    pub store: Arc<dyn ClinicStore>,
    pub config: Arc<AppConfig>,
}

pub async fn list_departments(
    State(state): State<Arc<DirectoryState>>,
) -> Result<Json<Value>, AppError> {
    let directory = DoctorDirectory::new(Arc::clone(&state.store));

    let departments = directory.list_departments().await?;

    Ok(Json(json!({
        "departments": departments,
        "total": departments.len()
    })))
}

pub async fn list_department_doctors(
    State(state): State<Arc<DirectoryState>>,
    Path(department_id): Path<Uuid>,
    Query(query): Query<DoctorListQuery>,
) -> Result<Json<Value>, AppError> {
    let directory = DoctorDirectory::new(Arc::clone(&state.store));

    let threshold = parse_min_rating(query.min_rating.as_deref())?;
    let doctors = directory.list_doctors(department_id).await?;
    let doctors = DoctorDirectory::filter_by_min_rating(doctors, threshold);

    Ok(Json(json!({
        "department_id": department_id,
        "min_rating": threshold,
        "doctors": doctors,
        "total": doctors.len()
    })))
}

pub async fn get_doctor(
    State(state): State<Arc<DirectoryState>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let directory = DoctorDirectory::new(Arc::clone(&state.store));

    let doctor = directory.get_doctor(doctor_id).await?;

    Ok(Json(json!({
        "doctor": doctor,
        "full_name": doctor.full_name()
    })))
}

pub async fn get_doctor_availability(
    State(state): State<Arc<DirectoryState>>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<Value>, AppError> {
    let resolver = AvailabilityResolver::new(Arc::clone(&state.store));

    let availability = resolver
        .resolve(doctor_id, query.date, query.exclude_appointment_id)
        .await?;

    Ok(Json(json!({
        "availability": availability,
        "total_available": availability.available.len()
    })))
}

/// The daily slot grid plus the choices a booking form offers.
pub async fn get_slot_grid(
    State(state): State<Arc<DirectoryState>>,
    Query(query): Query<SlotGridQuery>,
) -> Result<Json<Value>, AppError> {
    let today = Local::now().date_naive();
    let date = query.date.unwrap_or(today);

    let slots = generate_slots(date);
    let labels: Vec<String> = slots.iter().map(|s| s.label()).collect();

    Ok(Json(json!({
        "date": date,
        "slots": slots,
        "labels": labels,
        "bookable_dates": bookable_dates(today, state.config.booking_window_days),
        "rating_choices": DoctorDirectory::rating_choices()
    })))
}
