// src/handlers/audit.rs

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::tenancy::TenantContext,
    models::rbac::Permission,
};

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub limit: Option<i64>,
}

// GET /api/audit (trilha recente da loja)
pub async fn list_store_audit(
    State(app_state): State<AppState>,
    ctx: TenantContext,
    Query(query): Query<AuditQuery>,
) -> Result<impl IntoResponse, AppError> {
    let store_id = ctx.require_store()?;
    app_state
        .permission_engine
        .ensure(&ctx, Permission::AuditRead, store_id)
        .await?;

    let limit = query.limit.unwrap_or(100).clamp(1, 500);
    let entries = app_state.audit_repo.list_for_store(store_id, limit).await?;
    Ok(Json(entries))
}

// GET /api/audit/{resource_type}/{resource_id}
pub async fn list_resource_audit(
    State(app_state): State<AppState>,
    ctx: TenantContext,
    Path((resource_type, resource_id)): Path<(String, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    let store_id = ctx.require_store()?;
    app_state
        .permission_engine
        .ensure(&ctx, Permission::AuditRead, store_id)
        .await?;

    let entries = app_state
        .audit_repo
        .list_for_resource(store_id, &resource_type, resource_id)
        .await?;
    Ok(Json(entries))
}
