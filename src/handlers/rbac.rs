// src/handlers/rbac.rs

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
    models::rbac::{AssignRolePayload, CreateRolePayload, UpdateRolePayload},
    services::rbac_service::RoleDeletionOutcome,
};

// POST /api/roles
#[utoipa::path(
    post,
    path = "/api/roles",
    tag = "RBAC",
    request_body = CreateRolePayload,
    responses(
        (status = 201, description = "Cargo criado", body = crate::models::rbac::CustomRole)
    ),
    params(
        ("x-store-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_role(
    State(app_state): State<AppState>,
    ctx: TenantContext,
    Json(payload): Json<CreateRolePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let role = app_state.rbac_service.create_role(&ctx, payload).await?;
    Ok((StatusCode::CREATED, Json(role)))
}

// PATCH /api/roles/{role_id}
#[utoipa::path(
    patch,
    path = "/api/roles/{role_id}",
    tag = "RBAC",
    request_body = UpdateRolePayload,
    responses(
        (status = 200, description = "Cargo atualizado", body = crate::models::rbac::CustomRole)
    ),
    params(
        ("role_id" = Uuid, Path, description = "ID do Cargo"),
        ("x-store-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_role(
    State(app_state): State<AppState>,
    ctx: TenantContext,
    Path(role_id): Path<Uuid>,
    Json(payload): Json<UpdateRolePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let role = app_state
        .rbac_service
        .update_role(&ctx, role_id, payload)
        .await?;
    Ok(Json(role))
}

// DELETE /api/roles/{role_id}
#[utoipa::path(
    delete,
    path = "/api/roles/{role_id}",
    tag = "RBAC",
    responses(
        (status = 200, description = "Cargo apagado ou desativado")
    ),
    params(
        ("role_id" = Uuid, Path, description = "ID do Cargo"),
        ("x-store-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_role(
    State(app_state): State<AppState>,
    ctx: TenantContext,
    Path(role_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = app_state.rbac_service.delete_role(&ctx, role_id).await?;

    let message = match outcome {
        RoleDeletionOutcome::Deleted => "Cargo apagado.",
        // Em uso: não some do histórico, só para de valer.
        RoleDeletionOutcome::Deactivated => "Cargo em uso: foi desativado, não apagado.",
    };
    Ok(Json(json!({ "message": message })))
}

// POST /api/roles/assign
#[utoipa::path(
    post,
    path = "/api/roles/assign",
    tag = "RBAC",
    request_body = AssignRolePayload,
    responses(
        (status = 204, description = "Cargo atribuído ao membro")
    ),
    params(
        ("x-store-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn assign_role(
    State(app_state): State<AppState>,
    ctx: TenantContext,
    Json(payload): Json<AssignRolePayload>,
) -> Result<impl IntoResponse, AppError> {
    app_state.rbac_service.assign_role(&ctx, payload).await?;
    Ok(StatusCode::NO_CONTENT)
}

// GET /api/roles
pub async fn list_roles(
    State(app_state): State<AppState>,
    ctx: TenantContext,
) -> Result<impl IntoResponse, AppError> {
    let roles = app_state.rbac_service.list_roles(&ctx).await?;
    Ok(Json(roles))
}

// GET /api/permissions (para o frontend saber o que mostrar na tela)
#[utoipa::path(
    get,
    path = "/api/permissions",
    tag = "RBAC",
    responses(
        (status = 200, description = "Registro de permissões", body = [crate::models::rbac::PermissionInfo])
    )
)]
pub async fn list_permissions(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let permissions = app_state.rbac_service.list_permissions();
    Ok(Json(permissions))
}
