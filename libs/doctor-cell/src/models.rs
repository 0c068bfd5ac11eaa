use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;
use uuid::Uuid;

use shared_database::StoreError;
use shared_models::{minute_time, AppError, ErrorKind};

/// One bookable half-hour window. Derived on demand, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Slot {
    #[serde(with = "minute_time")]
    pub start: NaiveTime,
    #[serde(with = "minute_time")]
    pub end: NaiveTime,
}

impl Slot {
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    pub fn label(&self) -> String {
        format!("{} - {}", self.start.format("%H:%M"), self.end.format("%H:%M"))
    }

    pub fn overlaps(&self, other: &Slot) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Free and taken slots of one doctor on one date.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DoctorAvailability {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub available: Vec<Slot>,
    #[serde(serialize_with = "serialize_times")]
    pub booked: BTreeSet<NaiveTime>,
}

impl DoctorAvailability {
    pub fn is_free(&self, start: NaiveTime) -> bool {
        self.available.iter().any(|slot| slot.start == start)
    }
}

fn serialize_times<S>(times: &BTreeSet<NaiveTime>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_seq(times.iter().map(|t| t.format("%H:%M").to_string()))
}

#[derive(Debug, Deserialize)]
pub struct DoctorListQuery {
    /// A rating threshold, or `All` / absent for no filter.
    pub min_rating: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub date: NaiveDate,
    pub exclude_appointment_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct SlotGridQuery {
    pub date: Option<NaiveDate>,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DoctorError {
    #[error("Doctor not found")]
    NotFound,

    #[error("Department not found")]
    DepartmentNotFound,

    #[error("Invalid time slot: {0}")]
    InvalidTimeSlot(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl DoctorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DoctorError::NotFound | DoctorError::DepartmentNotFound => ErrorKind::NotFound,
            DoctorError::InvalidTimeSlot(_) | DoctorError::ValidationError(_) => ErrorKind::Validation,
            DoctorError::Store(e) => e.kind(),
        }
    }
}

impl From<DoctorError> for AppError {
    fn from(error: DoctorError) -> Self {
        AppError::from_kind(error.kind(), error.to_string())
    }
}
