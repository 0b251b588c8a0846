use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::model::order::OrderWithItems;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ConfirmRequestDto {
    #[validate(length(min = 1, message = "reservation_id is required"))]
    pub reservation_id: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CancelRequestDto {
    #[validate(length(min = 1, message = "reservation_id is required"))]
    pub reservation_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderItemResponseDto {
    pub sku: String,
    pub quantity: i32,
    pub price_per_unit: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ConfirmResponseDto {
    pub order_id: String,
    pub status: String,
    pub items: Vec<OrderItemResponseDto>,
    pub total: Decimal,
}

impl From<OrderWithItems> for ConfirmResponseDto {
    fn from(o: OrderWithItems) -> Self {
        Self {
            order_id: o.order.order_id,
            status: o.order.status,
            items: o
                .items
                .into_iter()
                .map(|item| OrderItemResponseDto {
                    sku: item.sku,
                    quantity: item.quantity,
                    price_per_unit: item.price_per_unit,
                })
                .collect(),
            total: o.order.total_amount,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CancelResponseDto {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponseDto {
    pub order_id: String,
    pub user_id: String,
    pub status: String,
    pub total_amount: Decimal,
    pub items: Vec<OrderItemResponseDto>,
}

impl From<OrderWithItems> for OrderResponseDto {
    fn from(o: OrderWithItems) -> Self {
        Self {
            order_id: o.order.order_id,
            user_id: o.order.user_id,
            status: o.order.status,
            total_amount: o.order.total_amount,
            items: o
                .items
                .into_iter()
                .map(|item| OrderItemResponseDto {
                    sku: item.sku,
                    quantity: item.quantity,
                    price_per_unit: item.price_per_unit,
                })
                .collect(),
        }
    }
}
