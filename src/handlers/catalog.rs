// src/handlers/catalog.rs

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
    db::catalog_repo::{ProductCreateData, ProductUpdateData},
    middleware::tenancy::TenantContext,
};

// ---
// Payloads
// ---
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductPayload {
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub name: String,

    #[validate(length(min = 1, message = "O SKU é obrigatório."))]
    pub sku: String,

    pub description: Option<String>,

    pub price: Decimal,

    // Vazio = herda a moeda da loja.
    #[serde(default)]
    pub currency: String,

    // Se o JSON não tiver esse campo, assume 0.
    #[serde(default)]
    pub initial_stock: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductPayload {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustStockPayload {
    // Positivo = entrada; negativo = saída/correção.
    pub delta: i32,
    pub note: Option<String>,
}

// ---
// Handlers
// ---

// POST /api/products
pub async fn create_product(
    State(app_state): State<AppState>,
    ctx: TenantContext,
    Json(payload): Json<CreateProductPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    if payload.price < Decimal::ZERO {
        return Err(AppError::ValidationFailed(
            "O preço não pode ser negativo.".to_string(),
        ));
    }

    let product = app_state
        .catalog_service
        .create_product(
            &ctx,
            ProductCreateData {
                name: payload.name,
                sku: payload.sku,
                description: payload.description,
                price: payload.price,
                currency: payload.currency,
                stock_quantity: payload.initial_stock,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(product)))
}

// GET /api/products
pub async fn list_products(
    State(app_state): State<AppState>,
    ctx: TenantContext,
) -> Result<impl IntoResponse, AppError> {
    let products = app_state.catalog_service.list_products(&ctx).await?;
    Ok(Json(products))
}

// GET /api/products/{product_id}
pub async fn get_product(
    State(app_state): State<AppState>,
    ctx: TenantContext,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let product = app_state.catalog_service.get_product(&ctx, product_id).await?;
    Ok(Json(product))
}

// PATCH /api/products/{product_id}
pub async fn update_product(
    State(app_state): State<AppState>,
    ctx: TenantContext,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<UpdateProductPayload>,
) -> Result<impl IntoResponse, AppError> {
    let product = app_state
        .catalog_service
        .update_product(
            &ctx,
            product_id,
            ProductUpdateData {
                name: payload.name,
                description: payload.description,
                price: payload.price,
                is_active: payload.is_active,
            },
        )
        .await?;

    Ok(Json(product))
}

// DELETE /api/products/{product_id}
pub async fn delete_product(
    State(app_state): State<AppState>,
    ctx: TenantContext,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state
        .catalog_service
        .delete_product(&ctx, product_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// POST /api/products/{product_id}/stock
pub async fn adjust_stock(
    State(app_state): State<AppState>,
    ctx: TenantContext,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<AdjustStockPayload>,
) -> Result<impl IntoResponse, AppError> {
    let product = app_state
        .catalog_service
        .adjust_stock(&ctx, product_id, payload.delta, payload.note.as_deref())
        .await?;
    Ok(Json(product))
}
