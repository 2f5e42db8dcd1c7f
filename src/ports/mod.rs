pub mod admin_client;

pub use admin_client::{
    AdminClient, AdminClientError, AdminResponse, AdminResult, Headers, PluginQuery, PluginScope,
};
