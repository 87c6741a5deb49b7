// src/models/store.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ---
// 1. Store (A "Loja" — a fronteira de tenancy)
// ---
// Tudo no sistema pertence a exatamente uma loja: produtos, pedidos,
// equipe, cargos. Apagar uma loja apaga tudo dentro dela (cascata).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Store {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub status: StoreStatus,
    pub currency: String,
    pub low_stock_threshold: Decimal,

    // Identidade do bot da loja. Guardamos só a referência; o transporte
    // do bot é colaborador externo.
    #[serde(skip_serializing)]
    pub bot_token: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "store_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StoreStatus {
    Active,
    Inactive,
    Suspended,
}

// ---
// 2. StoreMember (A "Ponte" Usuário-Loja)
// ---
// O vínculo de um membro da equipe com uma loja. Nunca é apagado de
// verdade: desativamos (is_active = false) para preservar a auditoria.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StoreMember {
    pub id: Uuid,
    pub store_id: Uuid,
    pub user_id: Uuid,
    pub role: AssignmentRole,

    // Se presente, o cargo customizado SUBSTITUI a tabela fixa de
    // permissões do papel acima.
    pub custom_role_id: Option<Uuid>,

    pub assigned_by: Uuid,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "assignment_role", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentRole {
    Admin,
    Vendor,
}
