// src/models/rbac.rs

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::common::error::AppError;

// ---
// 1. Permission (registro FECHADO de capacidades)
// ---
// Permissões são um enum, não strings soltas: um slug desconhecido falha
// na fronteira da API (erro de validação), nunca vira um "sempre-nega"
// silencioso em runtime. A categoria serve só para agrupar na UI do
// frontend; ela NÃO carrega semântica de autorização.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Permission {
    #[serde(rename = "product.create")]
    ProductCreate,
    #[serde(rename = "product.read")]
    ProductRead,
    #[serde(rename = "product.update")]
    ProductUpdate,
    #[serde(rename = "product.delete")]
    ProductDelete,
    #[serde(rename = "stock.adjust")]
    StockAdjust,

    #[serde(rename = "order.create")]
    OrderCreate,
    #[serde(rename = "order.read")]
    OrderRead,
    // Leitura restrita aos próprios pedidos (clientes).
    #[serde(rename = "order.read_own")]
    OrderReadOwn,
    #[serde(rename = "order.update")]
    OrderUpdate,

    #[serde(rename = "user.create")]
    UserCreate,
    #[serde(rename = "user.read")]
    UserRead,
    #[serde(rename = "user.update")]
    UserUpdate,
    #[serde(rename = "user.delete")]
    UserDelete,

    #[serde(rename = "store.read")]
    StoreRead,
    #[serde(rename = "store.update")]
    StoreUpdate,

    #[serde(rename = "audit.read")]
    AuditRead,
    #[serde(rename = "analytics.view")]
    AnalyticsView,
}

impl Permission {
    pub fn slug(&self) -> &'static str {
        match self {
            Permission::ProductCreate => "product.create",
            Permission::ProductRead => "product.read",
            Permission::ProductUpdate => "product.update",
            Permission::ProductDelete => "product.delete",
            Permission::StockAdjust => "stock.adjust",
            Permission::OrderCreate => "order.create",
            Permission::OrderRead => "order.read",
            Permission::OrderReadOwn => "order.read_own",
            Permission::OrderUpdate => "order.update",
            Permission::UserCreate => "user.create",
            Permission::UserRead => "user.read",
            Permission::UserUpdate => "user.update",
            Permission::UserDelete => "user.delete",
            Permission::StoreRead => "store.read",
            Permission::StoreUpdate => "store.update",
            Permission::AuditRead => "audit.read",
            Permission::AnalyticsView => "analytics.view",
        }
    }

    // Categoria para agrupamento na UI (sem semântica de autorização).
    pub fn category(&self) -> &'static str {
        match self {
            Permission::ProductCreate
            | Permission::ProductRead
            | Permission::ProductUpdate
            | Permission::ProductDelete
            | Permission::StockAdjust => "PRODUCT",
            Permission::OrderCreate
            | Permission::OrderRead
            | Permission::OrderReadOwn
            | Permission::OrderUpdate => "ORDER",
            Permission::UserCreate
            | Permission::UserRead
            | Permission::UserUpdate
            | Permission::UserDelete => "STAFF",
            Permission::StoreRead | Permission::StoreUpdate => "STORE",
            Permission::AuditRead => "AUDIT",
            Permission::AnalyticsView => "ANALYTICS",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Permission> {
        Permission::all().iter().find(|p| p.slug() == slug).copied()
    }

    pub fn all() -> &'static [Permission] {
        &[
            Permission::ProductCreate,
            Permission::ProductRead,
            Permission::ProductUpdate,
            Permission::ProductDelete,
            Permission::StockAdjust,
            Permission::OrderCreate,
            Permission::OrderRead,
            Permission::OrderReadOwn,
            Permission::OrderUpdate,
            Permission::UserCreate,
            Permission::UserRead,
            Permission::UserUpdate,
            Permission::UserDelete,
            Permission::StoreRead,
            Permission::StoreUpdate,
            Permission::AuditRead,
            Permission::AnalyticsView,
        ]
    }

    /// Converte slugs vindos da API (ou do banco) para o enum fechado.
    /// Qualquer slug desconhecido derruba a operação inteira.
    pub fn parse_slugs(slugs: &[String]) -> Result<Vec<Permission>, AppError> {
        slugs
            .iter()
            .map(|s| {
                Permission::from_slug(s).ok_or_else(|| {
                    AppError::ValidationFailed(format!("Permissão desconhecida: '{}'.", s))
                })
            })
            .collect()
    }
}

// ---
// 2. RolePolicy (tabela fixa de permissões por papel)
// ---
// Estrutura IMUTÁVEL, injetada no motor de permissões na construção.
// Não é um singleton global: testes substituem por tabelas alternativas.
#[derive(Debug, Clone)]
pub struct RolePolicy {
    pub admin: HashSet<Permission>,
    pub vendor: HashSet<Permission>,
    // CUSTOMER não tem vínculo com loja; esta whitelist vale em qualquer
    // loja e só contém capacidades de leitura/próprio-escopo.
    pub customer_whitelist: HashSet<Permission>,
}

impl Default for RolePolicy {
    fn default() -> Self {
        Self {
            admin: [
                Permission::ProductCreate,
                Permission::ProductRead,
                Permission::ProductUpdate,
                Permission::ProductDelete,
                Permission::StockAdjust,
                Permission::OrderCreate,
                Permission::OrderRead,
                Permission::OrderUpdate,
                Permission::UserCreate,
                Permission::UserRead,
                Permission::UserUpdate,
                Permission::UserDelete,
                Permission::StoreRead,
                Permission::AuditRead,
                Permission::AnalyticsView,
            ]
            .into_iter()
            .collect(),
            vendor: [
                Permission::ProductCreate,
                Permission::ProductRead,
                Permission::ProductUpdate,
                Permission::StockAdjust,
                Permission::OrderCreate,
                Permission::OrderRead,
                Permission::StoreRead,
            ]
            .into_iter()
            .collect(),
            customer_whitelist: [
                Permission::ProductRead,
                Permission::OrderCreate,
                Permission::OrderReadOwn,
            ]
            .into_iter()
            .collect(),
        }
    }
}

// ---
// 3. CustomRole (cargo customizado, escopado à loja)
// ---
// O que sai do banco (tabela custom_roles). As permissões ficam como
// slugs no banco (TEXT[]) e são parseadas para o enum ao carregar.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomRole {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: Uuid,

    #[schema(ignore)]
    pub store_id: Uuid,

    #[schema(example = "Gerente de Estoque")]
    pub name: String,

    // Campo cosmético (cor do badge na UI)
    pub color: Option<String>,

    #[schema(example = json!(["product.read", "stock.adjust"]))]
    pub permissions: Vec<String>,

    pub is_active: bool,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CustomRole {
    pub fn parsed_permissions(&self) -> Result<HashSet<Permission>, AppError> {
        Ok(Permission::parse_slugs(&self.permissions)?.into_iter().collect())
    }
}

// O Payload para criar um cargo
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRolePayload {
    #[validate(length(min = 1, message = "O nome do cargo é obrigatório."))]
    #[schema(example = "Auxiliar de Estoque")]
    pub name: String,

    pub color: Option<String>,

    #[validate(length(min = 1, message = "O cargo precisa de ao menos uma permissão."))]
    #[schema(example = json!(["product.read", "stock.adjust"]))]
    pub permissions: Vec<String>,
}

// Atualização: campos cosméticos podem vir sozinhos (sem revalidar o
// subconjunto de permissões).
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRolePayload {
    #[validate(length(min = 1, message = "O nome do cargo não pode ficar vazio."))]
    pub name: Option<String>,
    pub color: Option<String>,
    pub permissions: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignRolePayload {
    pub user_id: Uuid,
    // None = volta para a tabela fixa do papel do vínculo
    pub custom_role_id: Option<Uuid>,
}

// Entrada do registro de permissões (GET /api/permissions)
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PermissionInfo {
    #[schema(example = "product.create")]
    pub slug: &'static str,
    #[schema(example = "PRODUCT")]
    pub category: &'static str,
}
