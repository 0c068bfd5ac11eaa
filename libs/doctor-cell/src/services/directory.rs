use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use shared_database::ClinicStore;
use shared_models::{Department, Doctor, Rating};

use crate::models::DoctorError;

/// Read path into the department and doctor catalog.
pub struct DoctorDirectory {
    store: Arc<dyn ClinicStore>,
}

impl DoctorDirectory {
    pub fn new(store: Arc<dyn ClinicStore>) -> Self {
        Self { store }
    }

    pub async fn list_departments(&self) -> Result<Vec<Department>, DoctorError> {
        debug!("Listing departments");
        Ok(self.store.list_departments().await?)
    }

    /// Doctors of a department with their current `avg_rating`. A known
    /// department may have no doctors; an unknown one is an error.
    pub async fn list_doctors(&self, department_id: Uuid) -> Result<Vec<Doctor>, DoctorError> {
        debug!("Listing doctors for department {}", department_id);

        let doctors = self.store.list_doctors(department_id).await?;
        if doctors.is_empty() {
            let departments = self.store.list_departments().await?;
            if !departments.iter().any(|d| d.id == department_id) {
                return Err(DoctorError::DepartmentNotFound);
            }
        }
        Ok(doctors)
    }

    pub async fn get_doctor(&self, doctor_id: Uuid) -> Result<Doctor, DoctorError> {
        self.store
            .get_doctor(doctor_id)
            .await?
            .ok_or(DoctorError::NotFound)
    }

    /// Keeps doctors rated at or above `threshold`. With no threshold every
    /// doctor is kept; otherwise unrated doctors are dropped.
    pub fn filter_by_min_rating(doctors: Vec<Doctor>, threshold: Option<f64>) -> Vec<Doctor> {
        match threshold {
            None => doctors,
            Some(min) => doctors
                .into_iter()
                .filter(|d| d.avg_rating.is_some_and(|avg| avg >= min))
                .collect(),
        }
    }

    /// Thresholds offered to users, best first.
    pub fn rating_choices() -> Vec<Rating> {
        Rating::choices()
    }
}

/// Reads a threshold from user input. `All`, blank, or absent means no filter.
pub fn parse_min_rating(raw: Option<&str>) -> Result<Option<f64>, DoctorError> {
    let Some(raw) = raw.map(str::trim) else {
        return Ok(None);
    };
    if raw.is_empty() || raw.eq_ignore_ascii_case("all") {
        return Ok(None);
    }

    let value: f64 = raw
        .parse()
        .map_err(|_| DoctorError::ValidationError(format!("min_rating '{}' is not a number", raw)))?;
    Rating::new(value).map_err(|e| DoctorError::ValidationError(e.to_string()))?;
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doctor(avg: Option<f64>) -> Doctor {
        Doctor {
            id: Uuid::new_v4(),
            first_name: "Test".to_string(),
            last_name: "Doctor".to_string(),
            department_id: Uuid::new_v4(),
            specialty: None,
            bio: None,
            phone: None,
            email: None,
            avg_rating: avg,
        }
    }

    #[test]
    fn no_threshold_keeps_unrated_doctors() {
        let doctors = vec![doctor(None), doctor(Some(2.0))];
        assert_eq!(DoctorDirectory::filter_by_min_rating(doctors, None).len(), 2);
    }

    #[test]
    fn threshold_drops_unrated_and_lower_rated() {
        let doctors = vec![doctor(None), doctor(Some(3.99)), doctor(Some(4.0)), doctor(Some(4.75))];
        let kept = DoctorDirectory::filter_by_min_rating(doctors, Some(4.0));
        let ratings: Vec<_> = kept.iter().map(|d| d.avg_rating).collect();
        assert_eq!(ratings, vec![Some(4.0), Some(4.75)]);
    }

    #[test]
    fn threshold_input_parsing() {
        assert_eq!(parse_min_rating(None).unwrap(), None);
        assert_eq!(parse_min_rating(Some("All")).unwrap(), None);
        assert_eq!(parse_min_rating(Some(" ")).unwrap(), None);
        assert_eq!(parse_min_rating(Some("3.5")).unwrap(), Some(3.5));
        assert!(parse_min_rating(Some("great")).is_err());
        assert!(parse_min_rating(Some("3.2")).is_err());
    }
}
