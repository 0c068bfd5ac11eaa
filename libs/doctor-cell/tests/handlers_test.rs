use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use doctor_cell::router::directory_routes;
use shared_database::ClinicStore;
use shared_models::{AppointmentStatus, NewAppointment};
use shared_utils::test_utils::{date, time, TestClinic, TestConfig};

fn create_test_app(clinic: &TestClinic) -> Router {
    directory_routes(clinic.store.clone(), TestConfig::default().to_arc())
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    (status, json)
}

#[tokio::test]
async fn test_list_departments() {
    let clinic = TestClinic::seed().await;

    let (status, json) = get_json(create_test_app(&clinic), "/departments").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total"], 2);
    assert_eq!(json["departments"][0]["name"], "Cardiology");
}

#[tokio::test]
async fn test_list_doctors_with_all_filter() {
    let clinic = TestClinic::seed().await;
    let uri = format!("/departments/{}/doctors?min_rating=All", clinic.cardiology.id);

    let (status, json) = get_json(create_test_app(&clinic), &uri).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total"], 2);
    assert!(json["min_rating"].is_null());
}

#[tokio::test]
async fn test_list_doctors_threshold_excludes_unrated() {
    let clinic = TestClinic::seed().await;
    let uri = format!("/departments/{}/doctors?min_rating=1.0", clinic.cardiology.id);

    let (status, json) = get_json(create_test_app(&clinic), &uri).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total"], 0);
}

#[tokio::test]
async fn test_list_doctors_rejects_bad_threshold() {
    let clinic = TestClinic::seed().await;
    let uri = format!("/departments/{}/doctors?min_rating=excellent", clinic.cardiology.id);

    let (status, json) = get_json(create_test_app(&clinic), &uri).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "validation");
}

#[tokio::test]
async fn test_list_doctors_of_unknown_department() {
    let clinic = TestClinic::seed().await;
    let uri = format!("/departments/{}/doctors", Uuid::new_v4());

    let (status, json) = get_json(create_test_app(&clinic), &uri).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["kind"], "not_found");
}

#[tokio::test]
async fn test_get_unknown_doctor() {
    let clinic = TestClinic::seed().await;
    let uri = format!("/doctors/{}", Uuid::new_v4());

    let (status, _) = get_json(create_test_app(&clinic), &uri).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_availability_endpoint_reports_booked_slots() {
    let clinic = TestClinic::seed().await;
    let booked = clinic
        .store
        .insert_appointment(NewAppointment {
            patient_id: clinic.bob.id,
            doctor_id: clinic.house.id,
            appointment_date: date(2024, 1, 1),
            appointment_time: time(9, 30),
            status: AppointmentStatus::Scheduled,
            doctor_rating: None,
            notes: None,
        })
        .await
        .unwrap();

    let uri = format!("/doctors/{}/availability?date=2024-01-01", clinic.house.id);
    let (status, json) = get_json(create_test_app(&clinic), &uri).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_available"], 11);
    assert_eq!(json["availability"]["booked"][0], "09:30");

    let uri = format!(
        "/doctors/{}/availability?date=2024-01-01&exclude_appointment_id={}",
        clinic.house.id, booked.id
    );
    let (_, json) = get_json(create_test_app(&clinic), &uri).await;
    assert_eq!(json["total_available"], 12);
}

#[tokio::test]
async fn test_slot_grid() {
    let clinic = TestClinic::seed().await;

    let (status, json) = get_json(create_test_app(&clinic), "/slots?date=2024-01-01").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["slots"].as_array().map(Vec::len), Some(12));
    assert_eq!(json["labels"][0], "09:00 - 09:30");
    assert_eq!(json["labels"][11], "15:30 - 16:00");
    assert_eq!(json["bookable_dates"].as_array().map(Vec::len), Some(4));
    assert_eq!(json["rating_choices"][0], 5.0);
}

#[tokio::test]
async fn test_store_trait_object_is_shareable() {
    let clinic = TestClinic::seed().await;
    let store: Arc<dyn ClinicStore> = clinic.store.clone();
    let app = directory_routes(store, TestConfig::default().to_arc());

    let (status, _) = get_json(app, "/departments").await;
    assert_eq!(status, StatusCode::OK);
}
