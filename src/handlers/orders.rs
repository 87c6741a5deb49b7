// src/handlers/orders.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::tenancy::TenantContext,
    models::orders::{
        AttachProofPayload, CreateOrderPayload, OrderAction, TransitionPayload,
    },
};

// POST /api/orders
#[utoipa::path(
    post,
    path = "/api/orders",
    tag = "Orders",
    request_body = CreateOrderPayload,
    responses(
        (status = 201, description = "Pedido criado aguardando conferência", body = crate::models::orders::OrderResponse)
    ),
    params(
        ("x-store-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_order(
    State(app_state): State<AppState>,
    ctx: TenantContext,
    Json(payload): Json<CreateOrderPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let response = app_state.order_service.create_order(&ctx, payload).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

// GET /api/orders
#[utoipa::path(
    get,
    path = "/api/orders",
    tag = "Orders",
    responses(
        (status = 200, description = "Pedidos visíveis para o ator", body = [crate::models::orders::Order])
    ),
    security(("api_jwt" = []))
)]
pub async fn list_orders(
    State(app_state): State<AppState>,
    ctx: TenantContext,
) -> Result<impl IntoResponse, AppError> {
    let orders = app_state.order_service.list_orders(&ctx).await?;
    Ok(Json(orders))
}

// GET /api/orders/{order_id}
#[utoipa::path(
    get,
    path = "/api/orders/{order_id}",
    tag = "Orders",
    responses(
        (status = 200, description = "Pedido com itens", body = crate::models::orders::OrderResponse),
        (status = 404, description = "Inexistente ou de outra loja")
    ),
    params(
        ("order_id" = Uuid, Path, description = "ID do Pedido")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_order(
    State(app_state): State<AppState>,
    ctx: TenantContext,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let response = app_state.order_service.get_order(&ctx, order_id).await?;
    Ok(Json(response))
}

// POST /api/orders/{order_id}/proof
#[utoipa::path(
    post,
    path = "/api/orders/{order_id}/proof",
    tag = "Orders",
    request_body = AttachProofPayload,
    responses(
        (status = 200, description = "Comprovante anexado", body = crate::models::orders::OrderResponse)
    ),
    params(
        ("order_id" = Uuid, Path, description = "ID do Pedido")
    ),
    security(("api_jwt" = []))
)]
pub async fn attach_proof(
    State(app_state): State<AppState>,
    ctx: TenantContext,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<AttachProofPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let response = app_state
        .order_service
        .attach_payment_proof(&ctx, order_id, &payload.payment_proof)
        .await?;
    Ok(Json(response))
}

// ---
// Transições da máquina de estados
// ---

// POST /api/orders/{order_id}/confirm-payment
// Idempotente: repetir num pedido já pago devolve o pedido como está.
#[utoipa::path(
    post,
    path = "/api/orders/{order_id}/confirm-payment",
    tag = "Orders",
    responses(
        (status = 200, description = "Pedido pago (estoque baixado uma única vez)", body = crate::models::orders::OrderResponse),
        (status = 409, description = "Transição ilegal ou corrida perdida")
    ),
    params(
        ("order_id" = Uuid, Path, description = "ID do Pedido")
    ),
    security(("api_jwt" = []))
)]
pub async fn confirm_payment(
    State(app_state): State<AppState>,
    ctx: TenantContext,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let response = app_state
        .order_service
        .transition(&ctx, order_id, OrderAction::ConfirmPayment)
        .await?;
    Ok(Json(response))
}

// POST /api/orders/{order_id}/reject
#[utoipa::path(
    post,
    path = "/api/orders/{order_id}/reject",
    tag = "Orders",
    request_body = TransitionPayload,
    responses(
        (status = 200, description = "Pedido rejeitado", body = crate::models::orders::OrderResponse)
    ),
    params(
        ("order_id" = Uuid, Path, description = "ID do Pedido")
    ),
    security(("api_jwt" = []))
)]
pub async fn reject_order(
    State(app_state): State<AppState>,
    ctx: TenantContext,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<TransitionPayload>,
) -> Result<impl IntoResponse, AppError> {
    let action = OrderAction::Reject {
        reason: payload.reason.unwrap_or_default(),
    };
    let response = app_state
        .order_service
        .transition(&ctx, order_id, action)
        .await?;
    Ok(Json(response))
}

// POST /api/orders/{order_id}/ship
#[utoipa::path(
    post,
    path = "/api/orders/{order_id}/ship",
    tag = "Orders",
    request_body = TransitionPayload,
    responses(
        (status = 200, description = "Pedido despachado", body = crate::models::orders::OrderResponse)
    ),
    params(
        ("order_id" = Uuid, Path, description = "ID do Pedido")
    ),
    security(("api_jwt" = []))
)]
pub async fn ship_order(
    State(app_state): State<AppState>,
    ctx: TenantContext,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<TransitionPayload>,
) -> Result<impl IntoResponse, AppError> {
    let action = OrderAction::Ship {
        tracking_code: payload.tracking_code,
    };
    let response = app_state
        .order_service
        .transition(&ctx, order_id, action)
        .await?;
    Ok(Json(response))
}

// POST /api/orders/{order_id}/deliver
#[utoipa::path(
    post,
    path = "/api/orders/{order_id}/deliver",
    tag = "Orders",
    responses(
        (status = 200, description = "Pedido entregue", body = crate::models::orders::OrderResponse)
    ),
    params(
        ("order_id" = Uuid, Path, description = "ID do Pedido")
    ),
    security(("api_jwt" = []))
)]
pub async fn deliver_order(
    State(app_state): State<AppState>,
    ctx: TenantContext,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let response = app_state
        .order_service
        .transition(&ctx, order_id, OrderAction::Deliver)
        .await?;
    Ok(Json(response))
}

// POST /api/orders/{order_id}/cancel
// De PAID/SHIPPED o estoque baixado volta, na mesma transação.
#[utoipa::path(
    post,
    path = "/api/orders/{order_id}/cancel",
    tag = "Orders",
    request_body = TransitionPayload,
    responses(
        (status = 200, description = "Pedido cancelado (estoque devolvido se já pago)", body = crate::models::orders::OrderResponse)
    ),
    params(
        ("order_id" = Uuid, Path, description = "ID do Pedido")
    ),
    security(("api_jwt" = []))
)]
pub async fn cancel_order(
    State(app_state): State<AppState>,
    ctx: TenantContext,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<TransitionPayload>,
) -> Result<impl IntoResponse, AppError> {
    let action = OrderAction::Cancel {
        reason: payload.reason.unwrap_or_default(),
    };
    let response = app_state
        .order_service
        .transition(&ctx, order_id, action)
        .await?;
    Ok(Json(response))
}

// GET /api/analytics/orders (contagem simples por status)
pub async fn count_orders(
    State(app_state): State<AppState>,
    ctx: TenantContext,
) -> Result<impl IntoResponse, AppError> {
    let counts = app_state.order_service.count_orders_by_status(&ctx).await?;

    let body: serde_json::Map<String, serde_json::Value> = counts
        .into_iter()
        .map(|(status, count)| (status.as_str().to_string(), json!(count)))
        .collect();
    Ok(Json(serde_json::Value::Object(body)))
}
