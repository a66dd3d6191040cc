pub mod cancellation;
pub mod error;
pub mod logger;
pub mod validation;
