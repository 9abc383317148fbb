use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct RecordChangedEvent {
    pub entity: String,
    pub record_id: Uuid,
    pub version: i64,
    pub change: ChangeKind,
    pub actor_id: Uuid,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct AccommodationsTransferredEvent {
    pub organization_name: String,
    pub accommodation_ids: Vec<Uuid>,
    pub sale_ids: Vec<Uuid>,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct SaleDeletedEvent {
    pub sale_id: Uuid,
    pub accommodation_id: Uuid,
    pub returned_to_pool: bool,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct BulkCompletedEvent {
    pub entity: String,
    pub operation: String,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub actor_id: Uuid,
    pub timestamp: i64,
}

pub const TOPIC_RECORDS: &str = "konak.records";
pub const TOPIC_SALES: &str = "konak.sales";
pub const TOPIC_BULK: &str = "konak.bulk";

pub fn now_ts() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Emits a domain event on the structured log stream.
///
/// There is no broker behind this; downstream collectors read the `domain_event` target.
pub fn publish<E: Serialize>(topic: &str, key: &str, event: &E) {
    match serde_json::to_string(event) {
        Ok(payload) => {
            tracing::info!(target: "domain_event", topic, key, %payload, "event published");
        }
        Err(e) => {
            tracing::error!(target: "domain_event", topic, key, "Failed to serialize event: {}", e);
        }
    }
}
