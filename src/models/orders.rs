// src/models/orders.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// ---
// 1. Status do pedido (enum fechado)
// ---
// Fluxo feliz: PENDING_ADMIN -> PAID -> SHIPPED -> DELIVERED.
// PENDING_ADMIN -> REJECTED; qualquer não-terminal -> CANCELLED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "order_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    PendingAdmin,
    Paid,
    Shipped,
    Delivered,
    Rejected,
    Cancelled,
}

impl OrderStatus {
    // Estados terminais não aceitam transição nenhuma.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Delivered | OrderStatus::Rejected | OrderStatus::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::PendingAdmin => "PENDING_ADMIN",
            OrderStatus::Paid => "PAID",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Rejected => "REJECTED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }
}

// ---
// 2. Order (o agregado)
// ---
// Cada transição tem seu próprio timestamp; `status_reason` guarda o
// motivo de rejeição/cancelamento; `payment_proof` é só uma referência
// (caminho) — os bytes do arquivo ficam no storage externo.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,

    #[schema(ignore)]
    pub store_id: Uuid,

    pub customer_id: Uuid,
    pub status: OrderStatus,
    pub total_amount: Decimal,
    pub currency: String,

    pub payment_proof: Option<String>,
    pub status_reason: Option<String>,
    pub tracking_code: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

// Item do pedido. Invariante: o produto pertence à MESMA loja do pedido;
// preço unitário é congelado no momento da criação.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: Uuid,

    #[schema(ignore)]
    pub store_id: Uuid,

    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
}

// ---
// 3. Ações da máquina de estados
// ---
#[derive(Debug, Clone)]
pub enum OrderAction {
    ConfirmPayment,
    Reject { reason: String },
    Ship { tracking_code: Option<String> },
    Deliver,
    Cancel { reason: String },
}

impl OrderAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderAction::ConfirmPayment => "order.confirm_payment",
            OrderAction::Reject { .. } => "order.reject",
            OrderAction::Ship { .. } => "order.ship",
            OrderAction::Deliver => "order.deliver",
            OrderAction::Cancel { .. } => "order.cancel",
        }
    }
}

// ---
// 4. Payloads
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderPayload {
    #[validate(length(min = 1, message = "O pedido precisa de ao menos um item."))]
    pub items: Vec<OrderItemInput>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemInput {
    pub product_id: Uuid,
    #[schema(example = 2)]
    pub quantity: i32,
}

// Motivo obrigatório para reject/cancel; rastreio opcional no ship.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransitionPayload {
    pub reason: Option<String>,
    pub tracking_code: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttachProofPayload {
    #[validate(length(min = 1, message = "A referência do comprovante é obrigatória."))]
    #[schema(example = "uploads/proofs/550e8400.jpg")]
    pub payment_proof: String,
}

// Resposta completa (Pedido + Itens)
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    #[serde(flatten)]
    pub order: Order,

    #[schema(example = json!([]))]
    pub items: Vec<OrderItem>,
}
