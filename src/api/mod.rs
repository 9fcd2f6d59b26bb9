pub mod conversions;
pub mod error;

pub use error::ApiError;
