// libs/doctor-cell/src/services/availability.rs

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use tracing::debug;
use uuid::Uuid;

use shared_database::ClinicStore;
use shared_models::truncate_to_minute;

use crate::models::{DoctorAvailability, DoctorError};
use crate::services::calendar::generate_slots;

/// Splits a doctor's daily slot grid into free and booked windows.
pub struct AvailabilityResolver {
    store: Arc<dyn ClinicStore>,
}

impl AvailabilityResolver {
    pub fn new(store: Arc<dyn ClinicStore>) -> Self {
        Self { store }
    }

    /// Free and booked slots for `doctor_id` on `date`.
    ///
    /// `exclude_appointment_id` leaves one appointment out of the booked set,
    /// so an appointment being edited does not block its own slot.
    pub async fn resolve(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<DoctorAvailability, DoctorError> {
        debug!("Resolving availability for doctor {} on {}", doctor_id, date);

        if self.store.get_doctor(doctor_id).await?.is_none() {
            return Err(DoctorError::NotFound);
        }

        let booked: BTreeSet<NaiveTime> = self
            .store
            .booked_times(doctor_id, date, exclude_appointment_id)
            .await?
            .into_iter()
            .map(truncate_to_minute)
            .collect();

        let available = generate_slots(date)
            .into_iter()
            .filter(|slot| !booked.contains(&slot.start))
            .collect::<Vec<_>>();

        debug!(
            "Doctor {} on {}: {} free, {} booked",
            doctor_id,
            date,
            available.len(),
            booked.len()
        );

        Ok(DoctorAvailability {
            doctor_id,
            date,
            available,
            booked,
        })
    }

    /// Whether `time` is a free slot start for the doctor on `date`.
    pub async fn is_available(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<bool, DoctorError> {
        let availability = self.resolve(doctor_id, date, exclude_appointment_id).await?;
        Ok(availability.is_free(truncate_to_minute(time)))
    }
}
