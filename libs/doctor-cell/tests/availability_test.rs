use std::sync::Arc;

use assert_matches::assert_matches;
use uuid::Uuid;

use doctor_cell::services::calendar::generate_slots;
use doctor_cell::{AvailabilityResolver, DoctorDirectory, DoctorError};
use shared_database::ClinicStore;
use shared_models::{AppointmentStatus, NewAppointment, Rating};
use shared_utils::test_utils::{date, test_department, time, TestClinic};

fn booking(clinic: &TestClinic, hour: u32, minute: u32, status: AppointmentStatus) -> NewAppointment {
    NewAppointment {
        patient_id: clinic.alice.id,
        doctor_id: clinic.house.id,
        appointment_date: date(2024, 1, 1),
        appointment_time: time(hour, minute),
        status,
        doctor_rating: None,
        notes: None,
    }
}

#[tokio::test]
async fn empty_day_is_fully_available() {
    let clinic = TestClinic::seed().await;
    let resolver = AvailabilityResolver::new(clinic.store.clone());

    let availability = resolver.resolve(clinic.house.id, date(2024, 1, 1), None).await.unwrap();

    assert_eq!(availability.available, generate_slots(date(2024, 1, 1)));
    assert!(availability.booked.is_empty());
}

#[tokio::test]
async fn booked_and_available_partition_the_grid() {
    let clinic = TestClinic::seed().await;
    for (h, m) in [(9, 0), (11, 30), (15, 30)] {
        clinic
            .store
            .insert_appointment(booking(&clinic, h, m, AppointmentStatus::Scheduled))
            .await
            .unwrap();
    }

    let resolver = AvailabilityResolver::new(clinic.store.clone());
    let availability = resolver.resolve(clinic.house.id, date(2024, 1, 1), None).await.unwrap();

    let all = generate_slots(date(2024, 1, 1));
    assert_eq!(availability.available.len() + availability.booked.len(), all.len());
    for slot in &all {
        let free = availability.available.contains(slot);
        let taken = availability.booked.contains(&slot.start);
        assert!(free ^ taken, "slot {} must be exactly one of free/booked", slot.label());
    }
}

#[tokio::test]
async fn cancelled_appointments_release_their_slot() {
    let clinic = TestClinic::seed().await;
    clinic
        .store
        .insert_appointment(booking(&clinic, 10, 0, AppointmentStatus::Cancelled))
        .await
        .unwrap();

    let resolver = AvailabilityResolver::new(clinic.store.clone());
    assert!(resolver
        .is_available(clinic.house.id, date(2024, 1, 1), time(10, 0), None)
        .await
        .unwrap());
}

#[tokio::test]
async fn excluded_appointment_does_not_block_itself() {
    let clinic = TestClinic::seed().await;
    let own = clinic
        .store
        .insert_appointment(booking(&clinic, 13, 0, AppointmentStatus::Scheduled))
        .await
        .unwrap();

    let resolver = AvailabilityResolver::new(clinic.store.clone());
    let day = date(2024, 1, 1);

    assert!(!resolver.is_available(clinic.house.id, day, time(13, 0), None).await.unwrap());
    assert!(resolver.is_available(clinic.house.id, day, time(13, 0), Some(own.id)).await.unwrap());
}

#[tokio::test]
async fn other_doctors_and_dates_are_independent() {
    let clinic = TestClinic::seed().await;
    clinic
        .store
        .insert_appointment(booking(&clinic, 9, 0, AppointmentStatus::Scheduled))
        .await
        .unwrap();

    let resolver = AvailabilityResolver::new(clinic.store.clone());
    assert!(resolver.is_available(clinic.wilson.id, date(2024, 1, 1), time(9, 0), None).await.unwrap());
    assert!(resolver.is_available(clinic.house.id, date(2024, 1, 2), time(9, 0), None).await.unwrap());
}

#[tokio::test]
async fn unknown_doctor_is_not_found() {
    let clinic = TestClinic::seed().await;
    let resolver = AvailabilityResolver::new(clinic.store.clone());

    let result = resolver.resolve(Uuid::new_v4(), date(2024, 1, 1), None).await;
    assert_matches!(result, Err(DoctorError::NotFound));
}

#[tokio::test]
async fn directory_lists_departments_and_doctors_with_ratings() {
    let clinic = TestClinic::seed().await;
    let store: Arc<dyn ClinicStore> = clinic.store.clone();
    let directory = DoctorDirectory::new(store);

    let departments = directory.list_departments().await.unwrap();
    let names: Vec<_> = departments.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["Cardiology", "Pediatrics"]);

    let rated = clinic
        .store
        .insert_appointment(booking(&clinic, 9, 0, AppointmentStatus::Completed))
        .await
        .unwrap();
    clinic
        .store
        .rate_appointment(rated.id, clinic.alice.id, Rating::new(4.5).unwrap())
        .await
        .unwrap();

    let doctors = directory.list_doctors(clinic.cardiology.id).await.unwrap();
    let last_names: Vec<_> = doctors.iter().map(|d| d.last_name.as_str()).collect();
    assert_eq!(last_names, vec!["House", "Wilson"]);
    assert_eq!(doctors[0].avg_rating, Some(4.5));
    assert_eq!(doctors[1].avg_rating, None);

    let filtered = DoctorDirectory::filter_by_min_rating(doctors, Some(4.0));
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].id, clinic.house.id);
}

#[tokio::test]
async fn test_directory_distinguishes_empty_and_unknown_departments() {
    let clinic = TestClinic::seed().await;
    let directory = DoctorDirectory::new(clinic.store.clone());

    let radiology = test_department("Radiology");
    clinic.store.insert_department(radiology.clone()).await;
    assert!(directory.list_doctors(radiology.id).await.unwrap().is_empty());

    let unknown = directory.list_doctors(Uuid::new_v4()).await;
    assert_matches!(unknown, Err(DoctorError::DepartmentNotFound));
}
