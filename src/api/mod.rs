pub mod response;

pub use response::{health_check, ApiError, ApiResponse, Outcome};
