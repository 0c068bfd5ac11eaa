use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::InMemoryStore;
use shared_models::{Department, Doctor, Patient};

pub struct TestConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_key: String,
    pub booking_window_days: u32,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            supabase_service_key: "test-service-key".to_string(),
            booking_window_days: 4,
        }
    }
}

impl TestConfig {
    pub fn with_url(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_service_key: self.supabase_service_key.clone(),
            booking_window_days: self.booking_window_days,
            ..AppConfig::default()
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid test date")
}

pub fn time(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).expect("valid test time")
}

pub fn test_department(name: &str) -> Department {
    Department {
        id: Uuid::new_v4(),
        name: name.to_string(),
        min_doctors: 1,
        max_doctors: 5,
    }
}

pub fn test_doctor(department_id: Uuid, first_name: &str, last_name: &str) -> Doctor {
    Doctor {
        id: Uuid::new_v4(),
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        department_id,
        specialty: Some("General Practice".to_string()),
        bio: Some("Experienced physician".to_string()),
        phone: None,
        email: Some(format!("{}@clinic.test", last_name.to_lowercase())),
        avg_rating: None,
    }
}

pub fn test_patient(first_name: &str, last_name: &str) -> Patient {
    Patient {
        id: Uuid::new_v4(),
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        gender: Some("F".to_string()),
        phone: Some("555-0100".to_string()),
        email: None,
    }
}

/// A small clinic seeded into an `InMemoryStore`: two departments, three
/// doctors and two patients.
pub struct TestClinic {
    pub store: Arc<InMemoryStore>,
    pub cardiology: Department,
    pub pediatrics: Department,
    pub house: Doctor,
    pub wilson: Doctor,
    pub cuddy: Doctor,
    pub alice: Patient,
    pub bob: Patient,
}

impl TestClinic {
    pub async fn seed() -> Self {
        let store = Arc::new(InMemoryStore::new());

        let cardiology = test_department("Cardiology");
        let pediatrics = test_department("Pediatrics");
        let house = test_doctor(cardiology.id, "Gregory", "House");
        let wilson = test_doctor(cardiology.id, "James", "Wilson");
        let cuddy = test_doctor(pediatrics.id, "Lisa", "Cuddy");
        let alice = test_patient("Alice", "Smith");
        let bob = test_patient("Bob", "Jones");

        for department in [&cardiology, &pediatrics] {
            store.insert_department(department.clone()).await;
        }
        for doctor in [&house, &wilson, &cuddy] {
            store.insert_doctor(doctor.clone()).await;
        }
        for patient in [&alice, &bob] {
            store.insert_patient(patient.clone()).await;
        }

        Self {
            store,
            cardiology,
            pediatrics,
            house,
            wilson,
            cuddy,
            alice,
            bob,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_database::ClinicStore;

    #[test]
    fn test_config_creation() {
        let config = TestConfig::default();
        let app_config = config.to_app_config();

        assert_eq!(app_config.supabase_url, "http://localhost:54321");
        assert_eq!(app_config.supabase_anon_key, "test-anon-key");
        assert!(app_config.is_configured());
    }

    #[tokio::test]
    async fn test_clinic_seeds_store() {
        let clinic = TestClinic::seed().await;

        let departments = clinic.store.list_departments().await.unwrap();
        assert_eq!(departments.len(), 2);

        let cardiologists = clinic.store.list_doctors(clinic.cardiology.id).await.unwrap();
        assert_eq!(cardiologists.len(), 2);
    }
}
