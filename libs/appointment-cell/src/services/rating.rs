// libs/appointment-cell/src/services/rating.rs
use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use shared_database::{ClinicStore, StoreError};
use shared_models::{Doctor, Rating};

use crate::models::AppointmentError;

/// Applies one-time patient ratings and keeps each doctor's average current.
pub struct RatingAggregator {
    store: Arc<dyn ClinicStore>,
}

impl RatingAggregator {
    pub fn new(store: Arc<dyn ClinicStore>) -> Self {
        Self { store }
    }

    /// Rate an appointment on behalf of `patient_id` and return the doctor
    /// with its recomputed average.
    ///
    /// The store sets the rating only if the row is owned by the patient and
    /// still unrated; the read beforehand only chooses the error message.
    pub async fn rate(
        &self,
        appointment_id: Uuid,
        patient_id: Uuid,
        rating: f64,
    ) -> Result<Doctor, AppointmentError> {
        let rating = Rating::new(rating).map_err(|e| AppointmentError::ValidationError(e.to_string()))?;

        let appointment = self
            .store
            .get_appointment(appointment_id)
            .await?
            .ok_or(AppointmentError::NotFound)?;

        match self.store.rate_appointment(appointment_id, patient_id, rating).await {
            Ok(doctor) => {
                info!(
                    "Appointment {} rated {} - doctor {} average now {:?}",
                    appointment_id, rating, doctor.id, doctor.avg_rating
                );
                Ok(doctor)
            }
            Err(StoreError::RatingRejected) if appointment.patient_id != patient_id => {
                warn!("Patient {} tried to rate appointment {} of another patient", patient_id, appointment_id);
                Err(AppointmentError::Unauthorized(
                    "appointment belongs to another patient".to_string(),
                ))
            }
            Err(StoreError::RatingRejected) => {
                warn!("Appointment {} has already been rated", appointment_id);
                Err(AppointmentError::AlreadyRated)
            }
            Err(StoreError::NotFound(_)) => Err(AppointmentError::NotFound),
            Err(e) => Err(e.into()),
        }
    }

    /// Recompute one doctor's average from its appointments.
    pub async fn recompute(&self, doctor_id: Uuid) -> Result<Doctor, AppointmentError> {
        let doctor = self.store.recompute_avg_rating(doctor_id).await?;
        info!("Recomputed average rating of doctor {}: {:?}", doctor_id, doctor.avg_rating);
        Ok(doctor)
    }
}
