// src/docs.rs

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Orders ---
        handlers::orders::create_order,
        handlers::orders::list_orders,
        handlers::orders::get_order,
        handlers::orders::attach_proof,
        handlers::orders::confirm_payment,
        handlers::orders::reject_order,
        handlers::orders::ship_order,
        handlers::orders::deliver_order,
        handlers::orders::cancel_order,

        // --- RBAC ---
        handlers::rbac::create_role,
        handlers::rbac::update_role,
        handlers::rbac::delete_role,
        handlers::rbac::assign_role,
        handlers::rbac::list_permissions,
    ),
    components(schemas(
        models::orders::Order,
        models::orders::OrderItem,
        models::orders::OrderResponse,
        models::orders::OrderStatus,
        models::orders::CreateOrderPayload,
        models::orders::OrderItemInput,
        models::orders::TransitionPayload,
        models::orders::AttachProofPayload,
        models::rbac::CustomRole,
        models::rbac::CreateRolePayload,
        models::rbac::UpdateRolePayload,
        models::rbac::AssignRolePayload,
        models::rbac::PermissionInfo,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "Orders", description = "Ciclo de vida de pedidos"),
        (name = "RBAC", description = "Cargos customizados e permissões")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_jwt",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}
