// libs/appointment-cell/src/services/consistency.rs
//
// Rating consistency audit: compares each doctor's stored average with the
// mean of the ratings its appointments actually carry.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::try_join_all;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_database::{ClinicStore, StoreError};
use shared_models::rating::average_rating;
use shared_models::{Appointment, AppointmentFilter, Doctor, Rating};

use crate::models::{AppointmentError, RatingDrift};

/// Stored averages are rounded to two decimals.
const AVERAGE_TOLERANCE: f64 = 0.005;

pub struct RatingConsistencyService {
    store: Arc<dyn ClinicStore>,
}

impl RatingConsistencyService {
    pub fn new(store: Arc<dyn ClinicStore>) -> Self {
        Self { store }
    }

    /// Every doctor whose stored average disagrees with its appointments.
    pub async fn audit_ratings(&self) -> Result<Vec<RatingDrift>, AppointmentError> {
        let doctors = self.store.list_all_doctors().await?;
        let appointments = self.store.list_appointments(&AppointmentFilter::default()).await?;

        let mut ratings: HashMap<Uuid, Vec<Rating>> = HashMap::new();
        for appointment in &appointments {
            if let Some(rating) = appointment.doctor_rating {
                ratings.entry(appointment.doctor_id).or_default().push(rating);
            }
        }

        let drifts: Vec<RatingDrift> = doctors
            .iter()
            .filter_map(|doctor| {
                let doctor_ratings = ratings.remove(&doctor.id).unwrap_or_default();
                check_doctor(doctor, &doctor_ratings)
            })
            .collect();

        if drifts.is_empty() {
            debug!("Rating audit: {} doctors consistent", doctors.len());
        } else {
            warn!("Rating audit: {} of {} doctors drifted", drifts.len(), doctors.len());
        }
        Ok(drifts)
    }

    /// Drift of a single doctor, or `None` when consistent.
    pub async fn audit_doctor(&self, doctor_id: Uuid) -> Result<Option<RatingDrift>, AppointmentError> {
        let doctor = self
            .store
            .get_doctor(doctor_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("doctor {}", doctor_id)))?;

        let appointments = self
            .store
            .list_appointments(&AppointmentFilter {
                patient_id: None,
                doctor_id: Some(doctor_id),
            })
            .await?;

        Ok(check_doctor(&doctor, &collect_ratings(&appointments)))
    }

    /// Recompute every drifting doctor. Returns the repaired doctors.
    pub async fn repair_drift(&self) -> Result<Vec<Doctor>, AppointmentError> {
        let drifts = self.audit_ratings().await?;

        let repaired = try_join_all(
            drifts
                .iter()
                .map(|drift| self.store.recompute_avg_rating(drift.doctor_id)),
        )
        .await?;

        info!("Repaired average rating of {} doctors", repaired.len());
        Ok(repaired)
    }
}

fn collect_ratings(appointments: &[Appointment]) -> Vec<Rating> {
    appointments.iter().filter_map(|a| a.doctor_rating).collect()
}

fn check_doctor(doctor: &Doctor, ratings: &[Rating]) -> Option<RatingDrift> {
    let expected = average_rating(ratings.iter().copied());
    if same_average(doctor.avg_rating, expected) {
        return None;
    }

    Some(RatingDrift {
        doctor_id: doctor.id,
        doctor_name: doctor.full_name(),
        stored: doctor.avg_rating,
        expected,
        rated_appointments: ratings.len(),
    })
}

fn same_average(stored: Option<f64>, expected: Option<f64>) -> bool {
    match (stored, expected) {
        (None, None) => true,
        (Some(a), Some(b)) => (a - b).abs() < AVERAGE_TOLERANCE,
        _ => false,
    }
}
