// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// A taxonomia de erros do núcleo. Cada variante carrega um significado
// preciso para o chamador: "não autenticado", "sem acesso à loja" e
// "não encontrado" são coisas diferentes e NUNCA viram um 500 genérico.
#[derive(Debug, Error)]
pub enum AppError {
    // --- Autenticação / Contexto ---
    #[error("Sessão ausente ou expirada")]
    Unauthenticated,

    #[error("Conta desativada")]
    AccountDisabled,

    // --- Autorização / Tenancy ---
    // O ator não tem vínculo ativo com a loja do recurso.
    #[error("Sem acesso à loja")]
    NoStoreAccess,

    // O vínculo existe, mas não carrega a permissão pedida.
    #[error("Permissão '{0}' não concedida")]
    PermissionNotGranted(&'static str),

    // Recurso inexistente OU de outra loja. Indistinguível de propósito:
    // não vazamos a existência de dados de outros tenants.
    #[error("Recurso não encontrado")]
    NotFound,

    // --- Máquina de estados de pedidos ---
    #[error("Transição ilegal: pedido em '{from}' não aceita '{action}'")]
    IllegalTransition { from: String, action: String },

    // Um UPDATE condicional perdeu a corrida para outra requisição.
    #[error("O pedido foi modificado por outra requisição")]
    ConcurrentModification,

    // --- Validação de entrada ---
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("{0}")]
    ValidationFailed(String),

    #[error("Este e-mail já está em uso")]
    EmailAlreadyExists,

    #[error("E-mail ou senha inválidos")]
    InvalidCredentials,

    #[error("{0}")]
    UniqueConstraintViolation(String),

    // --- Infraestrutura ---
    // Variante para erros de banco de dados (sqlx)
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado.
    // `anyhow::Error` é ótimo para capturar o contexto do erro.
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            // Retorna todos os detalhes da validação, campo a campo.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "Um ou mais campos são inválidos.",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }

            AppError::Unauthenticated => {
                (StatusCode::UNAUTHORIZED, "Sessão ausente ou expirada.".to_string())
            }
            AppError::AccountDisabled => {
                (StatusCode::FORBIDDEN, "Esta conta foi desativada.".to_string())
            }
            AppError::NoStoreAccess => {
                (StatusCode::FORBIDDEN, "Você não tem acesso a esta loja.".to_string())
            }
            AppError::PermissionNotGranted(slug) => (
                StatusCode::FORBIDDEN,
                format!("Você precisa da permissão '{}' para realizar esta ação.", slug),
            ),
            AppError::NotFound => {
                (StatusCode::NOT_FOUND, "Recurso não encontrado.".to_string())
            }
            AppError::IllegalTransition { ref from, ref action } => (
                StatusCode::CONFLICT,
                format!("O pedido está em '{}' e não aceita a ação '{}'.", from, action),
            ),
            AppError::ConcurrentModification => (
                StatusCode::CONFLICT,
                "O pedido foi modificado por outra requisição. Recarregue e tente novamente.".to_string(),
            ),
            AppError::ValidationFailed(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::EmailAlreadyExists => {
                (StatusCode::CONFLICT, "Este e-mail já está em uso.".to_string())
            }
            AppError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "E-mail ou senha inválidos.".to_string())
            }
            AppError::UniqueConstraintViolation(msg) => (StatusCode::CONFLICT, msg),

            // Todos os outros erros (DatabaseError, InternalServerError...) viram 500.
            // O `tracing` registra a mensagem detalhada; o cliente recebe algo opaco.
            ref e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Ocorreu um erro inesperado.".to_string())
            }
        };

        // Resposta padrão para erros simples que só têm uma mensagem.
        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
