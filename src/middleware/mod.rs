//! HTTP middleware

pub mod bearer;
pub mod request_id;

pub use bearer::require_bearer;
pub use request_id::{REQUEST_ID_HEADER, RequestId, request_id_middleware};
