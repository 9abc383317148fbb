pub mod bulk;
pub mod memory;
pub mod permissions;
pub mod query;
pub mod repository;
pub mod users;
pub mod view;

pub use bulk::{BulkOperation, BulkOutcome, Exportable, ExportProjection, StatusBearing};
pub use memory::MemoryRepository;
pub use permissions::{authorize, can_perform, Action, Permission, Principal, Role};
pub use query::{FieldValue, Fields, FilterSpec, Page, PageRequest, SortDirection, SortSpec};
pub use repository::{Record, Repository};
pub use users::{User, UserDraft};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Access denied: {0}")]
    Authorization(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Remote store error: {0}")]
    Remote(String),
}

impl CoreError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found(kind: &str, id: uuid::Uuid) -> Self {
        Self::NotFound(format!("{} {}", kind, id))
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
