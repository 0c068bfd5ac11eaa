// libs/appointment-cell/src/services/desk.rs
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, warn};
use uuid::Uuid;

use doctor_cell::services::calendar::is_bookable_date;
use shared_config::AppConfig;
use shared_database::ClinicStore;
use shared_models::{Appointment, AppointmentFilter, Doctor, Session};

use crate::models::{
    AppointmentError, AppointmentListing, CreateAppointmentRequest, RatingDrift,
    UpdateAppointmentRequest,
};
use crate::services::booking::BookingTransaction;
use crate::services::consistency::RatingConsistencyService;
use crate::services::rating::RatingAggregator;

/// The scheduling engine shared by every caller.
///
/// Holds no per-caller state; the session is passed with each call and
/// decides which patient records the caller may touch.
pub struct FrontDesk {
    booking: BookingTransaction,
    ratings: RatingAggregator,
    consistency: RatingConsistencyService,
    config: Arc<AppConfig>,
}

impl FrontDesk {
    pub fn new(store: Arc<dyn ClinicStore>, config: Arc<AppConfig>) -> Self {
        Self {
            booking: BookingTransaction::new(Arc::clone(&store)),
            ratings: RatingAggregator::new(Arc::clone(&store)),
            consistency: RatingConsistencyService::new(store),
            config,
        }
    }

    /// Book an appointment. Client sessions book for their own patient and
    /// only inside the booking window that starts at `today`.
    pub async fn create(
        &self,
        session: &Session,
        request: CreateAppointmentRequest,
        today: NaiveDate,
    ) -> Result<Appointment, AppointmentError> {
        let patient_id = match (session, request.patient_id) {
            (Session::Admin, Some(patient_id)) => patient_id,
            (Session::Admin, None) => {
                return Err(AppointmentError::ValidationError("patient_id is required".to_string()));
            }
            (Session::Client { patient_id: bound }, requested) => {
                if requested.is_some_and(|id| id != *bound) {
                    warn!("Client {} tried to book for patient {:?}", bound, requested);
                    return Err(AppointmentError::Unauthorized(
                        "clients can only book for themselves".to_string(),
                    ));
                }
                if !is_bookable_date(today, self.config.booking_window_days, request.appointment_date) {
                    return Err(AppointmentError::OutsideBookingWindow(request.appointment_date));
                }
                *bound
            }
        };

        let draft = request.into_draft(patient_id)?;
        self.booking.create(draft).await
    }

    pub async fn update(
        &self,
        session: &Session,
        appointment_id: Uuid,
        request: UpdateAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        require_admin(session, "update appointments")?;
        let changes = request.into_changes()?;
        self.booking.update(appointment_id, changes).await
    }

    pub async fn delete(&self, session: &Session, appointment_id: Uuid) -> Result<(), AppointmentError> {
        require_admin(session, "delete appointments")?;
        self.booking.delete(appointment_id).await
    }

    pub async fn get(&self, session: &Session, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        let appointment = self.booking.get(appointment_id).await?;
        if !session.can_act_for(appointment.patient_id) {
            return Err(AppointmentError::Unauthorized(
                "appointment belongs to another patient".to_string(),
            ));
        }
        Ok(appointment)
    }

    /// Appointments visible to the session. Client sessions always see only
    /// their own, whatever the filter asks for.
    pub async fn list_appointments(
        &self,
        session: &Session,
        filter: AppointmentFilter,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let filter = match session.bound_patient() {
            None => filter,
            Some(bound) => {
                if filter.patient_id.is_some_and(|id| id != bound) {
                    return Err(AppointmentError::Unauthorized(
                        "clients can only list their own appointments".to_string(),
                    ));
                }
                AppointmentFilter {
                    patient_id: Some(bound),
                    ..filter
                }
            }
        };

        debug!("Listing appointments for {:?}", session);
        self.booking.list_appointments(&filter).await
    }

    /// `list_appointments` with display names attached.
    pub async fn list_appointment_listings(
        &self,
        session: &Session,
        filter: AppointmentFilter,
    ) -> Result<Vec<AppointmentListing>, AppointmentError> {
        let appointments = self.list_appointments(session, filter).await?;
        self.booking.describe(appointments).await
    }

    pub async fn rate(
        &self,
        session: &Session,
        patient_id: Uuid,
        appointment_id: Uuid,
        rating: f64,
    ) -> Result<Doctor, AppointmentError> {
        if !session.can_act_for(patient_id) {
            return Err(AppointmentError::Unauthorized(
                "clients can only rate their own appointments".to_string(),
            ));
        }
        self.ratings.rate(appointment_id, patient_id, rating).await
    }

    pub async fn recompute_rating(&self, session: &Session, doctor_id: Uuid) -> Result<Doctor, AppointmentError> {
        require_admin(session, "recompute ratings")?;
        self.ratings.recompute(doctor_id).await
    }

    pub async fn audit_ratings(&self, session: &Session) -> Result<Vec<RatingDrift>, AppointmentError> {
        require_admin(session, "audit ratings")?;
        self.consistency.audit_ratings().await
    }

    pub async fn audit_doctor(
        &self,
        session: &Session,
        doctor_id: Uuid,
    ) -> Result<Option<RatingDrift>, AppointmentError> {
        require_admin(session, "audit ratings")?;
        self.consistency.audit_doctor(doctor_id).await
    }

    pub async fn repair_drift(&self, session: &Session) -> Result<Vec<Doctor>, AppointmentError> {
        require_admin(session, "repair ratings")?;
        self.consistency.repair_drift().await
    }
}

fn require_admin(session: &Session, action: &str) -> Result<(), AppointmentError> {
    if !session.is_admin() {
        warn!("Client session attempted to {}", action);
        return Err(AppointmentError::Unauthorized(format!("only admins can {}", action)));
    }
    Ok(())
}

/// Front desk for clinic staff: every operation, any patient.
#[derive(Clone)]
pub struct AdminDesk {
    desk: Arc<FrontDesk>,
}

impl AdminDesk {
    const SESSION: Session = Session::Admin;

    pub fn new(desk: Arc<FrontDesk>) -> Self {
        Self { desk }
    }

    pub async fn create(
        &self,
        request: CreateAppointmentRequest,
        today: NaiveDate,
    ) -> Result<Appointment, AppointmentError> {
        self.desk.create(&Self::SESSION, request, today).await
    }

    pub async fn update(
        &self,
        appointment_id: Uuid,
        request: UpdateAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        self.desk.update(&Self::SESSION, appointment_id, request).await
    }

    pub async fn delete(&self, appointment_id: Uuid) -> Result<(), AppointmentError> {
        self.desk.delete(&Self::SESSION, appointment_id).await
    }

    pub async fn get(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.desk.get(&Self::SESSION, appointment_id).await
    }

    pub async fn list_appointments(&self, filter: AppointmentFilter) -> Result<Vec<Appointment>, AppointmentError> {
        self.desk.list_appointments(&Self::SESSION, filter).await
    }

    pub async fn list_appointment_listings(
        &self,
        filter: AppointmentFilter,
    ) -> Result<Vec<AppointmentListing>, AppointmentError> {
        self.desk.list_appointment_listings(&Self::SESSION, filter).await
    }

    pub async fn rate(&self, patient_id: Uuid, appointment_id: Uuid, rating: f64) -> Result<Doctor, AppointmentError> {
        self.desk.rate(&Self::SESSION, patient_id, appointment_id, rating).await
    }

    pub async fn recompute_rating(&self, doctor_id: Uuid) -> Result<Doctor, AppointmentError> {
        self.desk.recompute_rating(&Self::SESSION, doctor_id).await
    }

    pub async fn audit_ratings(&self) -> Result<Vec<RatingDrift>, AppointmentError> {
        self.desk.audit_ratings(&Self::SESSION).await
    }

    pub async fn audit_doctor(&self, doctor_id: Uuid) -> Result<Option<RatingDrift>, AppointmentError> {
        self.desk.audit_doctor(&Self::SESSION, doctor_id).await
    }

    pub async fn repair_drift(&self) -> Result<Vec<Doctor>, AppointmentError> {
        self.desk.repair_drift(&Self::SESSION).await
    }
}

/// Front desk for one logged-in patient.
#[derive(Clone)]
pub struct PatientDesk {
    desk: Arc<FrontDesk>,
    patient_id: Uuid,
}

impl PatientDesk {
    pub fn new(desk: Arc<FrontDesk>, patient_id: Uuid) -> Self {
        Self { desk, patient_id }
    }

    pub fn session(&self) -> Session {
        Session::client(self.patient_id)
    }

    pub async fn create(
        &self,
        request: CreateAppointmentRequest,
        today: NaiveDate,
    ) -> Result<Appointment, AppointmentError> {
        self.desk.create(&self.session(), request, today).await
    }

    pub async fn list_appointments(&self) -> Result<Vec<Appointment>, AppointmentError> {
        self.desk
            .list_appointments(&self.session(), AppointmentFilter::default())
            .await
    }

    pub async fn rate(&self, appointment_id: Uuid, rating: f64) -> Result<Doctor, AppointmentError> {
        self.desk
            .rate(&self.session(), self.patient_id, appointment_id, rating)
            .await
    }
}
