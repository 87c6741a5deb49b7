// src/middleware/auth.rs

use axum::{
    extract::State,
    middleware::Next,
    response::Response,
};
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    models::auth::User,
};

// A sessão resolvida: usuário relido do banco + id da sessão (jti).
#[derive(Debug, Clone)]
pub struct AuthenticatedSession {
    pub user: User,
    pub session_id: Uuid,
}

// O middleware em si
pub async fn auth_guard(
    State(app_state): State<AppState>,
    mut request: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AppError> {
    let headers = request.headers();
    let auth_header = headers
        .get("Authorization")
        .and_then(|value| value.to_str().ok());

    if let Some(auth_header) = auth_header {
        if let Some(token) = auth_header.strip_prefix("Bearer ") {
            // `resolve_session` falha com Unauthenticated (token ruim ou
            // expirado) ou AccountDisabled (usuário desativado DEPOIS de
            // emitir o token — a desativação vale imediatamente porque o
            // usuário é relido do banco aqui).
            let session = app_state.auth_service.resolve_session(token).await?;

            // Insere a sessão nos "extensions" da requisição
            request.extensions_mut().insert(session);
            return Ok(next.run(request).await);
        }
    }

    Err(AppError::Unauthenticated)
}

// Extrator para obter o usuário autenticado diretamente nos handlers
pub struct AuthenticatedUser(pub User);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedSession>()
            .cloned()
            .map(|s| AuthenticatedUser(s.user))
            .ok_or(AppError::Unauthenticated)
    }
}
