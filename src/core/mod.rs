pub mod error;
pub mod masking;
pub mod pagination;
pub mod reconciler;
pub mod resource;

pub use error::{KongError, KongResult};
pub use masking::FieldMasker;
pub use reconciler::{ApiLookup, GetApisOptions, KongReconciler, ReconcileSummary, RemovalSummary};
pub use resource::{ApiDefinition, PluginPage, Resource};
