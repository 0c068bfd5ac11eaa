use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::{
    parse_minute_time, Appointment, AppointmentChanges, AppointmentFilter, Department, Doctor,
    NewAppointment, Patient, Rating,
};

use crate::store::{ClinicStore, StoreError};
use crate::supabase::{SupabaseClient, SupabaseError};

/// Postgres unique_violation; raised by the partial index on active slots.
const UNIQUE_VIOLATION: &str = "23505";
/// Postgres foreign_key_violation.
const FOREIGN_KEY_VIOLATION: &str = "23503";
/// Raised by the engine's SQL functions; PostgREST maps `PTxxx` to HTTP status xxx.
const RATING_REJECTED: &str = "PT403";
const ROW_NOT_FOUND: &str = "PT404";

impl From<SupabaseError> for StoreError {
    fn from(error: SupabaseError) -> Self {
        match error {
            SupabaseError::Api { status, code, message } => match code.as_deref() {
                Some(UNIQUE_VIOLATION) => StoreError::SlotTaken,
                Some(RATING_REJECTED) => StoreError::RatingRejected,
                Some(ROW_NOT_FOUND) => StoreError::NotFound(message),
                Some(FOREIGN_KEY_VIOLATION) => StoreError::NotFound(message),
                _ if status == StatusCode::SERVICE_UNAVAILABLE || status == StatusCode::GATEWAY_TIMEOUT => {
                    StoreError::Unavailable(message)
                }
                _ => StoreError::Query(format!("{} ({})", message, status)),
            },
            SupabaseError::Transport(e) => StoreError::Unavailable(e.to_string()),
            SupabaseError::InvalidHeader(e) => StoreError::Unavailable(e),
            SupabaseError::Decode(e) => StoreError::Query(e),
        }
    }
}

#[derive(Debug, Deserialize)]
struct BookedTimeRow {
    appointment_time: String,
}

/// `ClinicStore` backed by Supabase's PostgREST API.
///
/// Reads are plain table queries. Every mutation goes through one of the SQL
/// functions in `sql/clinic_engine.sql`, so the row write and the
/// `avg_rating` recompute share a single database transaction.
pub struct SupabaseStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
        }
    }

    async fn select<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, StoreError> {
        let rows: Vec<T> = self.supabase.request(Method::GET, path, None).await?;
        Ok(rows)
    }

    async fn select_one<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, StoreError> {
        let rows: Vec<T> = self.select(path).await?;
        Ok(rows.into_iter().next())
    }
}

#[async_trait]
impl ClinicStore for SupabaseStore {
    async fn list_departments(&self) -> Result<Vec<Department>, StoreError> {
        self.select("/rest/v1/department?select=*&order=name.asc").await
    }

    async fn list_doctors(&self, department_id: Uuid) -> Result<Vec<Doctor>, StoreError> {
        let path = format!(
            "/rest/v1/doctor?department_id=eq.{}&order=last_name.asc,first_name.asc",
            department_id
        );
        self.select(&path).await
    }

    async fn list_all_doctors(&self) -> Result<Vec<Doctor>, StoreError> {
        self.select("/rest/v1/doctor?select=*&order=last_name.asc,first_name.asc").await
    }

    async fn get_doctor(&self, doctor_id: Uuid) -> Result<Option<Doctor>, StoreError> {
        self.select_one(&format!("/rest/v1/doctor?id=eq.{}", doctor_id)).await
    }

    async fn get_patient(&self, patient_id: Uuid) -> Result<Option<Patient>, StoreError> {
        self.select_one(&format!("/rest/v1/patient?id=eq.{}", patient_id)).await
    }

    async fn get_appointment(&self, appointment_id: Uuid) -> Result<Option<Appointment>, StoreError> {
        self.select_one(&format!("/rest/v1/appointment?id=eq.{}", appointment_id)).await
    }

    async fn list_appointments(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, StoreError> {
        let mut query_parts = vec!["select=*".to_string()];
        if let Some(patient_id) = filter.patient_id {
            query_parts.push(format!("patient_id=eq.{}", patient_id));
        }
        if let Some(doctor_id) = filter.doctor_id {
            query_parts.push(format!("doctor_id=eq.{}", doctor_id));
        }
        query_parts.push("order=appointment_date.desc,appointment_time.desc".to_string());

        let path = format!("/rest/v1/appointment?{}", query_parts.join("&"));
        self.select(&path).await
    }

    async fn booked_times(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<Vec<NaiveTime>, StoreError> {
        let mut query_parts = vec![
            "select=appointment_time".to_string(),
            format!("doctor_id=eq.{}", doctor_id),
            format!("appointment_date=eq.{}", date.format("%Y-%m-%d")),
            "status=neq.Cancelled".to_string(),
        ];
        if let Some(exclude_id) = exclude_appointment_id {
            query_parts.push(format!("id=neq.{}", exclude_id));
        }

        let path = format!("/rest/v1/appointment?{}", query_parts.join("&"));
        let rows: Vec<BookedTimeRow> = self.select(&path).await?;

        let times = rows
            .into_iter()
            .filter_map(|row| {
                let parsed = parse_minute_time(&row.appointment_time);
                if parsed.is_none() {
                    warn!("Skipping unparseable appointment_time '{}'", row.appointment_time);
                }
                parsed
            })
            .collect();
        Ok(times)
    }

    async fn insert_appointment(&self, appointment: NewAppointment) -> Result<Appointment, StoreError> {
        debug!("Booking appointment via rpc for doctor {}", appointment.doctor_id);
        let args = json!({
            "p_patient_id": appointment.patient_id,
            "p_doctor_id": appointment.doctor_id,
            "p_date": appointment.appointment_date,
            "p_time": appointment.appointment_time.format("%H:%M").to_string(),
            "p_status": appointment.status,
            "p_rating": appointment.doctor_rating,
            "p_notes": appointment.notes,
        });
        Ok(self.supabase.rpc("book_appointment", args).await?)
    }

    async fn update_appointment(
        &self,
        appointment_id: Uuid,
        changes: AppointmentChanges,
    ) -> Result<Appointment, StoreError> {
        debug!("Updating appointment {} via rpc", appointment_id);
        let args = json!({
            "p_appointment_id": appointment_id,
            "p_patient_id": changes.patient_id,
            "p_doctor_id": changes.doctor_id,
            "p_date": changes.appointment_date,
            "p_time": changes.appointment_time.format("%H:%M").to_string(),
            "p_status": changes.status,
            "p_rating": changes.doctor_rating,
            "p_notes": changes.notes,
        });
        Ok(self.supabase.rpc("update_appointment", args).await?)
    }

    async fn delete_appointment(&self, appointment_id: Uuid) -> Result<Appointment, StoreError> {
        debug!("Deleting appointment {} via rpc", appointment_id);
        let args = json!({ "p_appointment_id": appointment_id });
        Ok(self.supabase.rpc("delete_appointment", args).await?)
    }

    async fn rate_appointment(
        &self,
        appointment_id: Uuid,
        patient_id: Uuid,
        rating: Rating,
    ) -> Result<Doctor, StoreError> {
        debug!("Rating appointment {} via rpc", appointment_id);
        let args = json!({
            "p_appointment_id": appointment_id,
            "p_patient_id": patient_id,
            "p_rating": rating,
        });
        Ok(self.supabase.rpc("rate_appointment", args).await?)
    }

    async fn recompute_avg_rating(&self, doctor_id: Uuid) -> Result<Doctor, StoreError> {
        let args = json!({ "p_doctor_id": doctor_id });
        Ok(self.supabase.rpc("recompute_doctor_rating", args).await?)
    }
}
