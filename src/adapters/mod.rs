pub mod admin_http;

/// Re-export commonly used types from adapters
pub use admin_http::HttpAdminClient;
