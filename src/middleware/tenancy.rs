// src/middleware/tenancy.rs

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
};
use uuid::Uuid;

use crate::common::error::AppError;
use crate::middleware::auth::AuthenticatedSession;
use crate::models::auth::GlobalRole;

// O nome do nosso cabeçalho HTTP customizado
const STORE_ID_HEADER: &str = "x-store-id";

// ---
// TenantContext (o "token de capacidade" do núcleo)
// ---
// Construído UMA vez por requisição a partir da sessão verificada, nunca
// a partir do corpo da requisição. Imutável: passa explicitamente por
// todas as chamadas seguintes (motor de permissões, repositórios,
// máquina de estados).
//
// O store_id aqui é ADVISÓRIO (veio do cabeçalho X-Store-ID): o id
// autoritativo é sempre o da linha do recurso, cruzado com este contexto
// pelo repositório escopado.
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub actor_id: Uuid,
    pub role: GlobalRole,
    pub store_id: Option<Uuid>,
    pub session_id: Uuid,
}

impl TenantContext {
    /// Para operações que exigem o escopo de loja já na entrada
    /// (listar catálogo, criar produto, gerir equipe).
    pub fn require_store(&self) -> Result<Uuid, AppError> {
        self.store_id.ok_or_else(|| {
            AppError::ValidationFailed("O cabeçalho X-Store-ID é obrigatório.".to_string())
        })
    }
}

impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        // A sessão precisa ter passado pelo auth_guard antes.
        let session = parts
            .extensions
            .get::<AuthenticatedSession>()
            .cloned()
            .ok_or(AppError::Unauthenticated)?;

        // Cabeçalho opcional: operações cross-loja (OWNER, cliente
        // consultando o próprio pedido) funcionam sem ele.
        let store_id = match parts.headers.get(STORE_ID_HEADER) {
            Some(value) => {
                let value_str = value.to_str().map_err(|_| {
                    AppError::ValidationFailed(
                        "Cabeçalho X-Store-ID contém caracteres inválidos.".to_string(),
                    )
                })?;
                let id = Uuid::parse_str(value_str).map_err(|_| {
                    AppError::ValidationFailed(
                        "Cabeçalho X-Store-ID inválido (não é um UUID).".to_string(),
                    )
                })?;
                Some(id)
            }
            None => None,
        };

        Ok(TenantContext {
            actor_id: session.user.id,
            role: session.user.role,
            store_id,
            session_id: session.session_id,
        })
    }
}
