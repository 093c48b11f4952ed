//! Client Module
//!
//! The request orchestrator and the pieces it is built from: options,
//! retry/timeout policy and the transport seam.

mod options;
mod orchestrator;
mod retry;
mod transport;

pub use options::{request_key, RequestOptions};
pub use orchestrator::RequestClient;
pub use retry::{with_timeout, RetryPolicy};
pub use transport::{ReqwestTransport, Transport};
