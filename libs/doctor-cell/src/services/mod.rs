pub mod calendar;
pub mod directory;
pub mod availability;

pub use directory::DoctorDirectory;
pub use availability::AvailabilityResolver;
