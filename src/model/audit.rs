use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditEventType {
    Reserve,
    Confirm,
    Cancel,
    Expire,
}

impl AuditEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEventType::Reserve => "reserve",
            AuditEventType::Confirm => "confirm",
            AuditEventType::Cancel => "cancel",
            AuditEventType::Expire => "expire",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuditEvent {
    pub id: Uuid,
    pub event_type: String,
    pub user_id: String,
    pub sku: String,
    pub reservation_id: String,
    pub details: Value,
    pub timestamp: DateTime<Utc>,
}
