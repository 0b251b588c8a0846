use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify, OpenApi,
};

use crate::dtos::{
    CancelRequestDto, CancelResponseDto, ConfirmRequestDto, ConfirmResponseDto,
    InventoryStatusResponseDto, LoginDto, OrderItemResponseDto, OrderResponseDto, RegisterDto,
    ReserveRequestDto, ReserveResponseDto, TokenResponseDto, UserResponseDto,
};
use crate::routes::health::HealthResponseDto;
use crate::services::broadcaster::{AvailabilityEventKind, AvailabilityMessage};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::auth::register,
        crate::routes::auth::login,

        crate::routes::inventory::get_status,
        crate::routes::inventory::initialize,
        crate::routes::inventory::reserve,
        crate::routes::inventory::ws_subscribe,

        crate::routes::checkout::confirm,
        crate::routes::checkout::cancel,
        crate::routes::checkout::get_order,

        crate::routes::health::health,
    ),
    components(
        schemas(
            RegisterDto, LoginDto, TokenResponseDto, UserResponseDto,
            ReserveRequestDto, ReserveResponseDto, InventoryStatusResponseDto,
            ConfirmRequestDto, ConfirmResponseDto, CancelRequestDto, CancelResponseDto,
            OrderResponseDto, OrderItemResponseDto,
            AvailabilityMessage, AvailabilityEventKind,
            HealthResponseDto,
        )
    ),
    tags(
        (name = "Authentication", description = "Registration and login"),
        (name = "Inventory", description = "Stock availability, reservation and the real-time availability stream"),
        (name = "Checkout", description = "Promoting a reservation into a durable order, or cancelling it"),
        (name = "Health", description = "Liveness and dependency connectivity"),
    ),
    info(
        title = "Holdfast Reservation Engine API",
        version = "1.0.0",
        description = "Inventory reservation engine for flash-sale commerce: atomic check-and-decrement stock, a TTL-bound reservation ledger, an expiry sweeper, and dual-write order promotion.",
        contact(
            name = "API Support",
            email = "support@holdfast.dev"
        ),
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("Authorization"))),
            )
        }
    }
}
