// src/models/audit.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

// Registro IMUTÁVEL de auditoria (append-only): quem fez o quê, em qual
// recurso, saindo de qual estado para qual estado. Para mutações de
// pedido a escrita deste registro participa da mesma transação — se a
// auditoria falha, a transição inteira falha.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: Uuid,
    pub store_id: Uuid,
    pub resource_type: String,
    pub resource_id: Uuid,
    pub actor_id: Uuid,
    pub action: String,
    pub from_state: Option<String>,
    pub to_state: Option<String>,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}
