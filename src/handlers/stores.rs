// src/handlers/stores.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{auth::AuthenticatedUser, tenancy::TenantContext},
    models::store::{AssignmentRole, StoreStatus},
};

// ---
// Payloads
// ---
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateStorePayload {
    #[validate(length(min = 1, message = "O nome da loja é obrigatório."))]
    pub name: String,

    #[validate(length(equal = 3, message = "A moeda deve ser um código ISO de 3 letras."))]
    pub currency: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStorePayload {
    pub name: Option<String>,
    pub status: Option<StoreStatus>,

    #[validate(length(equal = 3, message = "A moeda deve ser um código ISO de 3 letras."))]
    pub currency: Option<String>,

    pub low_stock_threshold: Option<Decimal>,
    pub bot_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberPayload {
    pub user_id: Uuid,
    pub role: AssignmentRole,
}

// ---
// Handlers
// ---

// POST /api/stores
pub async fn create_store(
    State(app_state): State<AppState>,
    ctx: TenantContext,
    Json(payload): Json<CreateStorePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let store = app_state
        .store_service
        .create_store(&ctx, &payload.name, &payload.currency)
        .await?;

    Ok((StatusCode::CREATED, Json(store)))
}

// GET /api/stores
pub async fn list_my_stores(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let stores = app_state.store_service.list_my_stores(user.0.id).await?;
    Ok(Json(stores))
}

// GET /api/stores/{store_id}
pub async fn get_store(
    State(app_state): State<AppState>,
    ctx: TenantContext,
    Path(store_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let store = app_state.store_service.get_store(&ctx, store_id).await?;
    Ok(Json(store))
}

// PATCH /api/stores/{store_id}
pub async fn update_store(
    State(app_state): State<AppState>,
    ctx: TenantContext,
    Path(store_id): Path<Uuid>,
    Json(payload): Json<UpdateStorePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let store = app_state
        .store_service
        .update_store(
            &ctx,
            store_id,
            payload.name.as_deref(),
            payload.status,
            payload.currency.as_deref(),
            payload.low_stock_threshold,
            payload.bot_token.as_deref(),
        )
        .await?;

    Ok(Json(store))
}

// POST /api/stores/{store_id}/members
pub async fn add_member(
    State(app_state): State<AppState>,
    ctx: TenantContext,
    Path(store_id): Path<Uuid>,
    Json(payload): Json<AddMemberPayload>,
) -> Result<impl IntoResponse, AppError> {
    let member = app_state
        .store_service
        .add_member(&ctx, store_id, payload.user_id, payload.role)
        .await?;

    Ok((StatusCode::CREATED, Json(member)))
}

// DELETE /api/stores/{store_id}/members/{user_id}
pub async fn deactivate_member(
    State(app_state): State<AppState>,
    ctx: TenantContext,
    Path((store_id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    app_state
        .store_service
        .deactivate_member(&ctx, store_id, user_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

// GET /api/stores/{store_id}/members
pub async fn list_members(
    State(app_state): State<AppState>,
    ctx: TenantContext,
    Path(store_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let members = app_state.store_service.list_members(&ctx, store_id).await?;
    Ok(Json(members))
}
