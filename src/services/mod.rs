pub mod auth_service;
pub mod broadcaster;
pub mod order_promoter;
pub mod price_catalog;
pub mod reservation_service;
