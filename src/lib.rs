// src/lib.rs

pub mod common;
pub mod config;
pub mod db;
pub mod docs;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, patch, post},
    Router,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AppState;
use crate::middleware::auth::auth_guard;

/// Monta o router completo. Fica na lib para os testes de integração
/// levantarem a aplicação inteira sem passar pelo main.
pub fn app(app_state: AppState) -> Router {
    // Rotas de autenticação (públicas)
    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login));

    // Rotas de usuário (protegidas)
    let user_routes = Router::new()
        .route("/me", get(handlers::auth::get_me))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let store_routes = Router::new()
        .route(
            "/",
            post(handlers::stores::create_store).get(handlers::stores::list_my_stores),
        )
        .route(
            "/{store_id}",
            get(handlers::stores::get_store).patch(handlers::stores::update_store),
        )
        .route(
            "/{store_id}/members",
            post(handlers::stores::add_member).get(handlers::stores::list_members),
        )
        .route(
            "/{store_id}/members/{user_id}",
            delete(handlers::stores::deactivate_member),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let role_routes = Router::new()
        .route(
            "/",
            post(handlers::rbac::create_role).get(handlers::rbac::list_roles),
        )
        .route(
            "/{role_id}",
            patch(handlers::rbac::update_role).delete(handlers::rbac::delete_role),
        )
        .route("/assign", post(handlers::rbac::assign_role))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let product_routes = Router::new()
        .route(
            "/",
            post(handlers::catalog::create_product).get(handlers::catalog::list_products),
        )
        .route(
            "/{product_id}",
            get(handlers::catalog::get_product)
                .patch(handlers::catalog::update_product)
                .delete(handlers::catalog::delete_product),
        )
        .route("/{product_id}/stock", post(handlers::catalog::adjust_stock))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let order_routes = Router::new()
        .route(
            "/",
            post(handlers::orders::create_order).get(handlers::orders::list_orders),
        )
        .route("/{order_id}", get(handlers::orders::get_order))
        .route("/{order_id}/proof", post(handlers::orders::attach_proof))
        .route(
            "/{order_id}/confirm-payment",
            post(handlers::orders::confirm_payment),
        )
        .route("/{order_id}/reject", post(handlers::orders::reject_order))
        .route("/{order_id}/ship", post(handlers::orders::ship_order))
        .route("/{order_id}/deliver", post(handlers::orders::deliver_order))
        .route("/{order_id}/cancel", post(handlers::orders::cancel_order))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let audit_routes = Router::new()
        .route("/", get(handlers::audit::list_store_audit))
        .route(
            "/{resource_type}/{resource_id}",
            get(handlers::audit::list_resource_audit),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let analytics_routes = Router::new()
        .route("/orders", get(handlers::orders::count_orders))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", docs::ApiDoc::openapi()))
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/permissions", get(handlers::rbac::list_permissions))
        .nest("/api/auth", auth_routes)
        .nest("/api/users", user_routes)
        .nest("/api/stores", store_routes)
        .nest("/api/roles", role_routes)
        .nest("/api/products", product_routes)
        .nest("/api/orders", order_routes)
        .nest("/api/audit", audit_routes)
        .nest("/api/analytics", analytics_routes)
        .with_state(app_state)
}
