//! Access Logging Module
//!
//! One structured line per handled request:
//! - `AccessLog` - the fields of the line and how it is emitted
//! - `API_LOG_TARGET` - tracing target of the lines, configure a logger
//!   with this name to route them

mod access_log;

pub use access_log::{format_body, is_http_success, AccessLog, API_LOG_TARGET};
