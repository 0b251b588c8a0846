use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ReserveRequestDto {
    #[validate(length(min = 1, max = 50, message = "sku must be 1-50 characters"))]
    pub sku: String,
    pub quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReserveResponseDto {
    pub reservation_id: String,
    pub sku: String,
    pub quantity: i32,
    pub expires_at: i64,
    pub ttl_seconds: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InventoryStatusResponseDto {
    pub sku: String,
    pub available: i64,
    pub reserved: i64,
    pub total: i64,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct InitializeQuery {
    pub quantity: i64,
}
