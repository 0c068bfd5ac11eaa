pub mod booking;
pub mod consistency;
pub mod desk;
pub mod lifecycle;
pub mod rating;

pub use booking::BookingTransaction;
pub use consistency::RatingConsistencyService;
pub use desk::{AdminDesk, FrontDesk, PatientDesk};
pub use lifecycle::AppointmentLifecycleService;
pub use rating::RatingAggregator;
