// libs/appointment-cell/src/models.rs
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use doctor_cell::services::calendar::parse_slot_time;
use doctor_cell::DoctorError;
use shared_database::StoreError;
use shared_models::{AppError, Appointment, AppointmentChanges, AppointmentStatus, ErrorKind, Rating};

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

/// Body of a booking request.
///
/// `patient_id` is required for admin bookings; client bookings take the
/// patient from the session and may omit it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    pub patient_id: Option<Uuid>,
    pub doctor_id: Uuid,
    pub appointment_date: NaiveDate,
    /// `HH:MM` or `HH:MM:SS`.
    pub appointment_time: String,
    pub notes: Option<String>,
    pub doctor_rating: Option<f64>,
}

/// Full replacement of an appointment's editable fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub appointment_date: NaiveDate,
    pub appointment_time: String,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    /// Absent keeps the stored rating.
    pub doctor_rating: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateAppointmentRequest {
    pub rating: f64,
}

/// A validated booking, ready for the slot checks.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingDraft {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    pub notes: Option<String>,
    pub doctor_rating: Option<Rating>,
}

impl CreateAppointmentRequest {
    pub fn into_draft(self, patient_id: Uuid) -> Result<BookingDraft, AppointmentError> {
        Ok(BookingDraft {
            patient_id,
            doctor_id: self.doctor_id,
            appointment_date: self.appointment_date,
            appointment_time: parse_slot_time(&self.appointment_time)?,
            notes: normalize_notes(self.notes),
            doctor_rating: parse_rating(self.doctor_rating)?,
        })
    }
}

impl UpdateAppointmentRequest {
    pub fn into_changes(self) -> Result<AppointmentChanges, AppointmentError> {
        Ok(AppointmentChanges {
            patient_id: self.patient_id,
            doctor_id: self.doctor_id,
            appointment_date: self.appointment_date,
            appointment_time: parse_slot_time(&self.appointment_time)?,
            status: self.status,
            doctor_rating: parse_rating(self.doctor_rating)?,
            notes: normalize_notes(self.notes),
        })
    }
}

/// Blank notes are stored as null.
fn normalize_notes(notes: Option<String>) -> Option<String> {
    notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
}

fn parse_rating(raw: Option<f64>) -> Result<Option<Rating>, AppointmentError> {
    raw.map(|value| Rating::new(value).map_err(|e| AppointmentError::ValidationError(e.to_string())))
        .transpose()
}

// ==============================================================================
// LISTINGS
// ==============================================================================

/// An appointment with the names the admin table shows. A name is `None`
/// when its row is gone.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AppointmentListing {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub patient_name: Option<String>,
    pub doctor_name: Option<String>,
    pub department_name: Option<String>,
}

// ==============================================================================
// RATING CONSISTENCY
// ==============================================================================

/// A doctor whose stored average no longer matches its appointments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RatingDrift {
    pub doctor_id: Uuid,
    pub doctor_name: String,
    pub stored: Option<f64>,
    pub expected: Option<f64>,
    pub rated_appointments: usize,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Appointment slot not available")]
    SlotNotAvailable,

    #[error("Patient not found")]
    PatientNotFound,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Invalid appointment time: {0}")]
    InvalidTime(String),

    #[error("Invalid status transition from {from} to {to}")]
    InvalidStatusTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Appointment cannot be rescheduled in status {0}")]
    NotReschedulable(AppointmentStatus),

    #[error("Date {0} is outside the booking window")]
    OutsideBookingWindow(NaiveDate),

    #[error("Appointment has already been rated")]
    AlreadyRated,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AppointmentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppointmentError::NotFound => ErrorKind::NotFound,
            AppointmentError::SlotNotAvailable => ErrorKind::Conflict,
            AppointmentError::PatientNotFound
            | AppointmentError::DoctorNotFound
            | AppointmentError::InvalidTime(_)
            | AppointmentError::InvalidStatusTransition { .. }
            | AppointmentError::NotReschedulable(_)
            | AppointmentError::OutsideBookingWindow(_)
            | AppointmentError::ValidationError(_) => ErrorKind::Validation,
            AppointmentError::AlreadyRated | AppointmentError::Unauthorized(_) => ErrorKind::Permission,
            AppointmentError::Store(e) => e.kind(),
        }
    }
}

impl From<DoctorError> for AppointmentError {
    fn from(error: DoctorError) -> Self {
        match error {
            DoctorError::NotFound => AppointmentError::DoctorNotFound,
            DoctorError::InvalidTimeSlot(msg) => AppointmentError::InvalidTime(msg),
            DoctorError::ValidationError(msg) => AppointmentError::ValidationError(msg),
            DoctorError::DepartmentNotFound => {
                AppointmentError::ValidationError("Department not found".to_string())
            }
            DoctorError::Store(e) => AppointmentError::Store(e),
        }
    }
}

impl From<AppointmentError> for AppError {
    fn from(error: AppointmentError) -> Self {
        AppError::from_kind(error.kind(), error.to_string())
    }
}
