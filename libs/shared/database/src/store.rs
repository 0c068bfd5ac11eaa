use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use thiserror::Error;
use uuid::Uuid;

use shared_models::{
    Appointment, AppointmentChanges, AppointmentFilter, Department, Doctor, ErrorKind,
    NewAppointment, Patient, Rating,
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    /// An active appointment already holds the (doctor, date, time) triple.
    #[error("slot already booked")]
    SlotTaken,

    /// The conditional rating write matched no row: wrong patient, or already rated.
    #[error("rating rejected")]
    RatingRejected,

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("query failed: {0}")]
    Query(String),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::NotFound(_) => ErrorKind::NotFound,
            StoreError::SlotTaken => ErrorKind::Conflict,
            StoreError::RatingRejected => ErrorKind::Permission,
            StoreError::Unavailable(_) | StoreError::Query(_) => ErrorKind::Persistence,
        }
    }
}

/// Read and write surface the scheduling engine needs from the persistent store.
///
/// Every mutating method is one atomic unit: it either commits all of its
/// steps (row write plus any `avg_rating` recompute) or none of them.
#[async_trait]
pub trait ClinicStore: Send + Sync {
    /// All departments, ordered by name.
    async fn list_departments(&self) -> Result<Vec<Department>, StoreError>;

    /// Doctors of one department, ordered by last then first name.
    async fn list_doctors(&self, department_id: Uuid) -> Result<Vec<Doctor>, StoreError>;

    /// Every doctor in the clinic.
    async fn list_all_doctors(&self) -> Result<Vec<Doctor>, StoreError>;

    async fn get_doctor(&self, doctor_id: Uuid) -> Result<Option<Doctor>, StoreError>;

    async fn get_patient(&self, patient_id: Uuid) -> Result<Option<Patient>, StoreError>;

    async fn get_appointment(&self, appointment_id: Uuid) -> Result<Option<Appointment>, StoreError>;

    /// Appointments matching `filter`, newest date and time first.
    async fn list_appointments(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, StoreError>;

    /// Start times of non-cancelled appointments for a doctor on a date.
    async fn booked_times(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<Vec<NaiveTime>, StoreError>;

    /// Inserts the row unless an active appointment holds the slot, and
    /// recomputes the doctor's average when the row carries a rating.
    async fn insert_appointment(&self, appointment: NewAppointment) -> Result<Appointment, StoreError>;

    /// Replaces the editable fields, re-checking the slot (excluding this row)
    /// and recomputing the average of both the previous and the new doctor.
    /// A stored rating is never replaced by a different value.
    async fn update_appointment(
        &self,
        appointment_id: Uuid,
        changes: AppointmentChanges,
    ) -> Result<Appointment, StoreError>;

    /// Removes the row and recomputes its doctor's average. Returns the removed row.
    async fn delete_appointment(&self, appointment_id: Uuid) -> Result<Appointment, StoreError>;

    /// Sets the rating only if the appointment belongs to `patient_id` and is
    /// still unrated, then recomputes the doctor's average.
    async fn rate_appointment(
        &self,
        appointment_id: Uuid,
        patient_id: Uuid,
        rating: Rating,
    ) -> Result<Doctor, StoreError>;

    /// Recomputes one doctor's `avg_rating` from its appointments.
    async fn recompute_avg_rating(&self, doctor_id: Uuid) -> Result<Doctor, StoreError>;
}
