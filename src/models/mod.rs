//! Request and response models for the request layer
//!
//! Transport-level request/response values and the uniform envelope handed
//! back to callers.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{BatchRequest, HttpRequest, Method};
pub use responses::{ApiResponse, HttpResponse};
