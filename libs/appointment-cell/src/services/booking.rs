// libs/appointment-cell/src/services/booking.rs
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use futures::future::try_join_all;
use tracing::{debug, info, warn};
use uuid::Uuid;

use doctor_cell::services::calendar::is_slot_start;
use doctor_cell::AvailabilityResolver;
use shared_database::{ClinicStore, StoreError};
use shared_models::{
    truncate_to_minute, Appointment, AppointmentChanges, AppointmentFilter, AppointmentStatus, Doctor,
    NewAppointment,
};

use crate::models::{AppointmentError, AppointmentListing, BookingDraft};
use crate::services::lifecycle::AppointmentLifecycleService;

/// Validates and commits appointment writes.
///
/// The checks here are read-side pre-checks that produce precise errors. The
/// store repeats the slot and rating guards inside its atomic write.
pub struct BookingTransaction {
    store: Arc<dyn ClinicStore>,
    availability: AvailabilityResolver,
    lifecycle: AppointmentLifecycleService,
}

impl BookingTransaction {
    pub fn new(store: Arc<dyn ClinicStore>) -> Self {
        Self {
            availability: AvailabilityResolver::new(Arc::clone(&store)),
            lifecycle: AppointmentLifecycleService::new(),
            store,
        }
    }

    /// Book a new appointment. New appointments always start as Scheduled.
    pub async fn create(&self, draft: BookingDraft) -> Result<Appointment, AppointmentError> {
        info!(
            "Booking appointment for patient {} with doctor {} on {} at {}",
            draft.patient_id, draft.doctor_id, draft.appointment_date, draft.appointment_time
        );

        let time = truncate_to_minute(draft.appointment_time);
        self.validate_slot(&draft.appointment_date, &time)?;
        self.verify_patient_exists(draft.patient_id).await?;

        if !self
            .availability
            .is_available(draft.doctor_id, draft.appointment_date, time, None)
            .await?
        {
            warn!(
                "Slot {} {} already booked for doctor {}",
                draft.appointment_date, time, draft.doctor_id
            );
            return Err(AppointmentError::SlotNotAvailable);
        }

        let appointment = self
            .store
            .insert_appointment(NewAppointment {
                patient_id: draft.patient_id,
                doctor_id: draft.doctor_id,
                appointment_date: draft.appointment_date,
                appointment_time: time,
                status: AppointmentStatus::Scheduled,
                doctor_rating: draft.doctor_rating,
                notes: draft.notes,
            })
            .await
            .map_err(|e| match e {
                // A reference that vanished after the pre-checks is still bad input.
                StoreError::NotFound(what) => AppointmentError::ValidationError(format!("unknown {}", what)),
                other => map_store_error(other),
            })?;

        info!("Appointment {} booked successfully with doctor {}", appointment.id, appointment.doctor_id);
        Ok(appointment)
    }

    /// Replace an appointment's editable fields.
    pub async fn update(
        &self,
        appointment_id: Uuid,
        changes: AppointmentChanges,
    ) -> Result<Appointment, AppointmentError> {
        info!("Updating appointment {}", appointment_id);

        let current = self.get(appointment_id).await?;
        let time = truncate_to_minute(changes.appointment_time);

        self.lifecycle
            .validate_status_transition(&current.status, &changes.status)?;

        let rescheduled = current.doctor_id != changes.doctor_id
            || current.appointment_date != changes.appointment_date
            || truncate_to_minute(current.appointment_time) != time;

        if let (Some(stored), Some(requested)) = (current.doctor_rating, changes.doctor_rating) {
            if stored != requested {
                warn!("Attempt to overwrite rating of appointment {}", appointment_id);
                return Err(AppointmentError::AlreadyRated);
            }
        }

        if current.patient_id != changes.patient_id {
            self.verify_patient_exists(changes.patient_id).await?;
        }

        // An unchanged slot is already held by this row.
        if rescheduled {
            self.lifecycle.validate_reschedule(&current.status)?;
            self.validate_slot(&changes.appointment_date, &time)?;

            // Cancelled rows hold no slot, so only an active result needs a free one.
            if changes.status.is_active() {
                if !self
                    .availability
                    .is_available(changes.doctor_id, changes.appointment_date, time, Some(appointment_id))
                    .await?
                {
                    warn!(
                        "Slot {} {} already booked for doctor {}",
                        changes.appointment_date, time, changes.doctor_id
                    );
                    return Err(AppointmentError::SlotNotAvailable);
                }
            } else if self.store.get_doctor(changes.doctor_id).await?.is_none() {
                return Err(AppointmentError::DoctorNotFound);
            }
        }

        let changes = AppointmentChanges {
            appointment_time: time,
            ..changes
        };
        let updated = self
            .store
            .update_appointment(appointment_id, changes)
            .await
            .map_err(map_store_error)?;

        info!("Appointment {} updated successfully", appointment_id);
        Ok(updated)
    }

    /// Remove an appointment. The doctor's average is recomputed in the same
    /// store transaction when the row carried a rating.
    pub async fn delete(&self, appointment_id: Uuid) -> Result<(), AppointmentError> {
        info!("Deleting appointment {}", appointment_id);

        let removed = self
            .store
            .delete_appointment(appointment_id)
            .await
            .map_err(|e| match e {
                StoreError::NotFound(_) => AppointmentError::NotFound,
                other => map_store_error(other),
            })?;

        info!(
            "Appointment {} deleted (doctor {}, rated: {})",
            removed.id,
            removed.doctor_id,
            removed.is_rated()
        );
        Ok(())
    }

    pub async fn get(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        debug!("Fetching appointment {}", appointment_id);

        self.store
            .get_appointment(appointment_id)
            .await?
            .ok_or(AppointmentError::NotFound)
    }

    /// All appointments matching `filter`, newest first.
    pub async fn list_appointments(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, AppointmentError> {
        debug!("Listing appointments with filter {:?}", filter);

        Ok(self.store.list_appointments(filter).await?)
    }

    pub async fn list_patient_appointments(&self, patient_id: Uuid) -> Result<Vec<Appointment>, AppointmentError> {
        self.list_appointments(&AppointmentFilter {
            patient_id: Some(patient_id),
            doctor_id: None,
        })
        .await
    }

    /// Attaches patient, doctor and department names to each appointment.
    pub async fn describe(&self, appointments: Vec<Appointment>) -> Result<Vec<AppointmentListing>, AppointmentError> {
        let doctors: HashMap<Uuid, Doctor> = self
            .store
            .list_all_doctors()
            .await?
            .into_iter()
            .map(|d| (d.id, d))
            .collect();
        let departments: HashMap<Uuid, String> = self
            .store
            .list_departments()
            .await?
            .into_iter()
            .map(|d| (d.id, d.name))
            .collect();

        let patient_ids: HashSet<Uuid> = appointments.iter().map(|a| a.patient_id).collect();
        let patients = try_join_all(patient_ids.into_iter().map(|id| self.store.get_patient(id))).await?;
        let patient_names: HashMap<Uuid, String> = patients
            .into_iter()
            .flatten()
            .map(|p| (p.id, p.full_name()))
            .collect();

        Ok(appointments
            .into_iter()
            .map(|appointment| {
                let doctor = doctors.get(&appointment.doctor_id);
                AppointmentListing {
                    patient_name: patient_names.get(&appointment.patient_id).cloned(),
                    doctor_name: doctor.map(Doctor::full_name),
                    department_name: doctor.and_then(|d| departments.get(&d.department_id)).cloned(),
                    appointment,
                }
            })
            .collect())
    }

    fn validate_slot(&self, date: &NaiveDate, time: &NaiveTime) -> Result<(), AppointmentError> {
        if !is_slot_start(*date, *time) {
            return Err(AppointmentError::InvalidTime(format!(
                "{} is not a slot start on {}",
                time.format("%H:%M"),
                date
            )));
        }
        Ok(())
    }

    async fn verify_patient_exists(&self, patient_id: Uuid) -> Result<(), AppointmentError> {
        if self.store.get_patient(patient_id).await?.is_none() {
            return Err(AppointmentError::PatientNotFound);
        }
        Ok(())
    }
}

fn map_store_error(error: StoreError) -> AppointmentError {
    match error {
        StoreError::SlotTaken => AppointmentError::SlotNotAvailable,
        StoreError::RatingRejected => AppointmentError::AlreadyRated,
        other => AppointmentError::Store(other),
    }
}
