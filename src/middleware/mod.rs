pub mod auth;
pub mod request_logger;

pub use auth::{auth_middleware, require_student_access, require_write_role};
pub use request_logger::request_logger_middleware;
