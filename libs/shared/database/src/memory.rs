use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use shared_models::rating::average_rating;
use shared_models::{
    truncate_to_minute, Appointment, AppointmentChanges, AppointmentFilter, Department, Doctor,
    NewAppointment, Patient, Rating,
};

use crate::store::{ClinicStore, StoreError};

#[derive(Default)]
struct Tables {
    departments: HashMap<Uuid, Department>,
    doctors: HashMap<Uuid, Doctor>,
    patients: HashMap<Uuid, Patient>,
    appointments: HashMap<Uuid, Appointment>,
}

impl Tables {
    fn slot_holder(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
        exclude: Option<Uuid>,
    ) -> Option<Uuid> {
        let time = truncate_to_minute(time);
        self.appointments
            .values()
            .find(|a| {
                Some(a.id) != exclude
                    && a.doctor_id == doctor_id
                    && a.appointment_date == date
                    && truncate_to_minute(a.appointment_time) == time
                    && a.status.is_active()
            })
            .map(|a| a.id)
    }

    fn check_references(&self, patient_id: Uuid, doctor_id: Uuid) -> Result<(), StoreError> {
        if !self.patients.contains_key(&patient_id) {
            return Err(StoreError::NotFound(format!("patient {}", patient_id)));
        }
        if !self.doctors.contains_key(&doctor_id) {
            return Err(StoreError::NotFound(format!("doctor {}", doctor_id)));
        }
        Ok(())
    }

    fn recompute(&mut self, doctor_id: Uuid) -> Result<Doctor, StoreError> {
        let avg = average_rating(
            self.appointments
                .values()
                .filter(|a| a.doctor_id == doctor_id)
                .filter_map(|a| a.doctor_rating),
        );

        let doctor = self
            .doctors
            .get_mut(&doctor_id)
            .ok_or_else(|| StoreError::NotFound(format!("doctor {}", doctor_id)))?;
        doctor.avg_rating = avg;
        Ok(doctor.clone())
    }
}

/// Store kept in process memory.
///
/// All tables sit behind one lock, and each method holds it for the whole
/// check-then-write sequence, so every mutation is atomic with respect to
/// concurrent callers.
#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_department(&self, department: Department) {
        self.tables.lock().await.departments.insert(department.id, department);
    }

    pub async fn insert_doctor(&self, doctor: Doctor) {
        self.tables.lock().await.doctors.insert(doctor.id, doctor);
    }

    pub async fn insert_patient(&self, patient: Patient) {
        self.tables.lock().await.patients.insert(patient.id, patient);
    }

    /// Overwrites a doctor's stored average without touching appointments.
    /// Only useful for simulating drift left behind by older writers.
    pub async fn force_avg_rating(&self, doctor_id: Uuid, avg_rating: Option<f64>) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        let doctor = tables
            .doctors
            .get_mut(&doctor_id)
            .ok_or_else(|| StoreError::NotFound(format!("doctor {}", doctor_id)))?;
        doctor.avg_rating = avg_rating;
        Ok(())
    }
}

fn newest_first(appointments: &mut [Appointment]) {
    appointments.sort_by(|a, b| {
        b.appointment_date
            .cmp(&a.appointment_date)
            .then(b.appointment_time.cmp(&a.appointment_time))
    });
}

#[async_trait]
impl ClinicStore for InMemoryStore {
    async fn list_departments(&self) -> Result<Vec<Department>, StoreError> {
        let tables = self.tables.lock().await;
        let mut departments: Vec<Department> = tables.departments.values().cloned().collect();
        departments.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(departments)
    }

    async fn list_doctors(&self, department_id: Uuid) -> Result<Vec<Doctor>, StoreError> {
        let tables = self.tables.lock().await;
        let mut doctors: Vec<Doctor> = tables
            .doctors
            .values()
            .filter(|d| d.department_id == department_id)
            .cloned()
            .collect();
        doctors.sort_by(|a, b| {
            a.last_name
                .cmp(&b.last_name)
                .then_with(|| a.first_name.cmp(&b.first_name))
        });
        Ok(doctors)
    }

    async fn list_all_doctors(&self) -> Result<Vec<Doctor>, StoreError> {
        let tables = self.tables.lock().await;
        let mut doctors: Vec<Doctor> = tables.doctors.values().cloned().collect();
        doctors.sort_by(|a, b| {
            a.last_name
                .cmp(&b.last_name)
                .then_with(|| a.first_name.cmp(&b.first_name))
        });
        Ok(doctors)
    }

    async fn get_doctor(&self, doctor_id: Uuid) -> Result<Option<Doctor>, StoreError> {
        Ok(self.tables.lock().await.doctors.get(&doctor_id).cloned())
    }

    async fn get_patient(&self, patient_id: Uuid) -> Result<Option<Patient>, StoreError> {
        Ok(self.tables.lock().await.patients.get(&patient_id).cloned())
    }

    async fn get_appointment(&self, appointment_id: Uuid) -> Result<Option<Appointment>, StoreError> {
        Ok(self.tables.lock().await.appointments.get(&appointment_id).cloned())
    }

    async fn list_appointments(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, StoreError> {
        let tables = self.tables.lock().await;
        let mut appointments: Vec<Appointment> = tables
            .appointments
            .values()
            .filter(|a| filter.patient_id.map_or(true, |id| a.patient_id == id))
            .filter(|a| filter.doctor_id.map_or(true, |id| a.doctor_id == id))
            .cloned()
            .collect();
        newest_first(&mut appointments);
        Ok(appointments)
    }

    async fn booked_times(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<Vec<NaiveTime>, StoreError> {
        let tables = self.tables.lock().await;
        let times = tables
            .appointments
            .values()
            .filter(|a| Some(a.id) != exclude_appointment_id)
            .filter(|a| a.doctor_id == doctor_id && a.appointment_date == date && a.status.is_active())
            .map(|a| a.appointment_time)
            .collect();
        Ok(times)
    }

    async fn insert_appointment(&self, appointment: NewAppointment) -> Result<Appointment, StoreError> {
        let mut tables = self.tables.lock().await;
        tables.check_references(appointment.patient_id, appointment.doctor_id)?;

        if appointment.status.is_active()
            && tables
                .slot_holder(
                    appointment.doctor_id,
                    appointment.appointment_date,
                    appointment.appointment_time,
                    None,
                )
                .is_some()
        {
            return Err(StoreError::SlotTaken);
        }

        let row = Appointment {
            id: Uuid::new_v4(),
            patient_id: appointment.patient_id,
            doctor_id: appointment.doctor_id,
            appointment_date: appointment.appointment_date,
            appointment_time: truncate_to_minute(appointment.appointment_time),
            status: appointment.status,
            doctor_rating: appointment.doctor_rating,
            notes: appointment.notes,
        };
        tables.appointments.insert(row.id, row.clone());

        if row.is_rated() {
            tables.recompute(row.doctor_id)?;
        }

        debug!("Inserted appointment {} into memory store", row.id);
        Ok(row)
    }

    async fn update_appointment(
        &self,
        appointment_id: Uuid,
        changes: AppointmentChanges,
    ) -> Result<Appointment, StoreError> {
        let mut tables = self.tables.lock().await;
        let current = tables
            .appointments
            .get(&appointment_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("appointment {}", appointment_id)))?;
        tables.check_references(changes.patient_id, changes.doctor_id)?;

        let doctor_rating = match (current.doctor_rating, changes.doctor_rating) {
            (Some(stored), Some(requested)) if stored != requested => {
                return Err(StoreError::RatingRejected);
            }
            (stored, requested) => stored.or(requested),
        };

        if changes.status.is_active()
            && tables
                .slot_holder(
                    changes.doctor_id,
                    changes.appointment_date,
                    changes.appointment_time,
                    Some(appointment_id),
                )
                .is_some()
        {
            return Err(StoreError::SlotTaken);
        }

        let updated = Appointment {
            id: appointment_id,
            patient_id: changes.patient_id,
            doctor_id: changes.doctor_id,
            appointment_date: changes.appointment_date,
            appointment_time: truncate_to_minute(changes.appointment_time),
            status: changes.status,
            doctor_rating,
            notes: changes.notes,
        };
        tables.appointments.insert(appointment_id, updated.clone());

        if current.doctor_id != updated.doctor_id {
            tables.recompute(current.doctor_id)?;
        }
        tables.recompute(updated.doctor_id)?;

        Ok(updated)
    }

    async fn delete_appointment(&self, appointment_id: Uuid) -> Result<Appointment, StoreError> {
        let mut tables = self.tables.lock().await;
        let removed = tables
            .appointments
            .remove(&appointment_id)
            .ok_or_else(|| StoreError::NotFound(format!("appointment {}", appointment_id)))?;

        if removed.is_rated() {
            tables.recompute(removed.doctor_id)?;
        }
        Ok(removed)
    }

    async fn rate_appointment(
        &self,
        appointment_id: Uuid,
        patient_id: Uuid,
        rating: Rating,
    ) -> Result<Doctor, StoreError> {
        let mut tables = self.tables.lock().await;
        let appointment = tables
            .appointments
            .get_mut(&appointment_id)
            .ok_or_else(|| StoreError::NotFound(format!("appointment {}", appointment_id)))?;

        if appointment.patient_id != patient_id || appointment.doctor_rating.is_some() {
            return Err(StoreError::RatingRejected);
        }
        appointment.doctor_rating = Some(rating);
        let doctor_id = appointment.doctor_id;

        tables.recompute(doctor_id)
    }

    async fn recompute_avg_rating(&self, doctor_id: Uuid) -> Result<Doctor, StoreError> {
        self.tables.lock().await.recompute(doctor_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_models::AppointmentStatus;

    async fn seeded() -> (InMemoryStore, Uuid, Uuid) {
        let store = InMemoryStore::new();
        let department_id = Uuid::new_v4();
        let doctor_id = Uuid::new_v4();
        let patient_id = Uuid::new_v4();

        store
            .insert_doctor(Doctor {
                id: doctor_id,
                first_name: "Ada".to_string(),
                last_name: "Byron".to_string(),
                department_id,
                specialty: None,
                bio: None,
                phone: None,
                email: None,
                avg_rating: None,
            })
            .await;
        store
            .insert_patient(Patient {
                id: patient_id,
                first_name: "Pat".to_string(),
                last_name: "Doe".to_string(),
                gender: None,
                phone: None,
                email: None,
            })
            .await;

        (store, doctor_id, patient_id)
    }

    fn new_row(patient_id: Uuid, doctor_id: Uuid, time: &str, rating: Option<f64>) -> NewAppointment {
        NewAppointment {
            patient_id,
            doctor_id,
            appointment_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            appointment_time: NaiveTime::parse_from_str(time, "%H:%M").unwrap(),
            status: AppointmentStatus::Scheduled,
            doctor_rating: rating.map(|r| Rating::new(r).unwrap()),
            notes: None,
        }
    }

    #[tokio::test]
    async fn insert_rejects_taken_slot() {
        let (store, doctor_id, patient_id) = seeded().await;
        store.insert_appointment(new_row(patient_id, doctor_id, "09:00", None)).await.unwrap();

        let second = store.insert_appointment(new_row(patient_id, doctor_id, "09:00", None)).await;
        assert_eq!(second.unwrap_err(), StoreError::SlotTaken);
    }

    #[tokio::test]
    async fn rated_insert_recomputes_average() {
        let (store, doctor_id, patient_id) = seeded().await;
        store.insert_appointment(new_row(patient_id, doctor_id, "09:00", Some(3.0))).await.unwrap();

        let doctor = store.get_doctor(doctor_id).await.unwrap().unwrap();
        assert_eq!(doctor.avg_rating, Some(3.0));
    }

    #[tokio::test]
    async fn rating_is_conditional_on_owner_and_null() {
        let (store, doctor_id, patient_id) = seeded().await;
        let row = store.insert_appointment(new_row(patient_id, doctor_id, "09:00", None)).await.unwrap();
        let four = Rating::new(4.0).unwrap();

        let stranger = store.rate_appointment(row.id, Uuid::new_v4(), four).await;
        assert_eq!(stranger.unwrap_err(), StoreError::RatingRejected);

        let doctor = store.rate_appointment(row.id, patient_id, four).await.unwrap();
        assert_eq!(doctor.avg_rating, Some(4.0));

        let again = store.rate_appointment(row.id, patient_id, four).await;
        assert_eq!(again.unwrap_err(), StoreError::RatingRejected);
    }

    #[tokio::test]
    async fn cancelled_rows_do_not_hold_slots() {
        let (store, doctor_id, patient_id) = seeded().await;
        let mut row = new_row(patient_id, doctor_id, "10:00", None);
        row.status = AppointmentStatus::Cancelled;
        store.insert_appointment(row).await.unwrap();

        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(store.booked_times(doctor_id, date, None).await.unwrap().is_empty());
        assert!(store.insert_appointment(new_row(patient_id, doctor_id, "10:00", None)).await.is_ok());
    }
}
