pub mod entities;
pub mod error;
pub mod rating;
pub mod session;

pub use entities::*;
pub use error::{AppError, ErrorKind};
pub use rating::{Rating, RatingError};
pub use session::Session;
