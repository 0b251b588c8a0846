use serde::{Deserialize, Serialize};

/// The reservation blob persisted in Redis under `reservation:<id>`. Field
/// names are load-bearing: the Lua scripts in [`crate::redis_store`] decode
/// this same JSON shape with `cjson` and read `user_id`/`expires_at` off it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    pub reservation_id: String,
    pub user_id: String,
    pub sku: String,
    pub quantity: i64,
    pub created_at: i64,
    pub expires_at: i64,
}

/// A freshly minted reservation id, prefixed per the data model (`rsv_`).
pub fn new_reservation_id() -> String {
    format!("rsv_{}", uuid::Uuid::new_v4().simple())
}
