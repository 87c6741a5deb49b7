// src/services/order_service.rs

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::db_utils::begin_store_tx,
    common::error::AppError,
    db::audit_repo::NewAuditEntry,
    db::{AuditRepository, OrderRepository, ProductRepository, ScopedRepo, StoreRepository},
    middleware::tenancy::TenantContext,
    models::auth::GlobalRole,
    models::orders::{CreateOrderPayload, Order, OrderAction, OrderResponse, OrderStatus},
    models::rbac::Permission,
    models::store::StoreStatus,
    services::authz::PermissionEngine,
};

// ---
// 1. O plano de transição (núcleo PURO da máquina de estados)
// ---
// Decidir o que uma ação significa é separado de executá-la: o plano é
// calculável sem banco, então a legalidade de CADA par (estado, ação) é
// testável de forma exaustiva.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionPlan {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub stock: StockEffect,
    pub reason: Option<String>,
    pub tracking_code: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockEffect {
    // Nenhum efeito em estoque
    Untouched,
    // Baixa o estoque dos itens (confirmação de pagamento)
    Decrement,
    // Devolve o estoque baixado (cancelamento pós-pagamento)
    Restore,
}

/// `Ok(None)` = chamada idempotente: o pedido já está onde a ação
/// levaria, devolva-o como está sem NENHUM efeito colateral.
pub fn plan_transition(
    order: &Order,
    action: &OrderAction,
) -> Result<Option<TransitionPlan>, AppError> {
    let illegal = || AppError::IllegalTransition {
        from: order.status.as_str().to_string(),
        action: action.as_str().to_string(),
    };

    match action {
        OrderAction::ConfirmPayment => match order.status {
            // Reenvio duplo da UI é esperado; não é erro.
            OrderStatus::Paid => Ok(None),
            OrderStatus::PendingAdmin => Ok(Some(TransitionPlan {
                from: OrderStatus::PendingAdmin,
                to: OrderStatus::Paid,
                stock: StockEffect::Decrement,
                reason: None,
                tracking_code: None,
            })),
            _ => Err(illegal()),
        },

        OrderAction::Reject { reason } => {
            if reason.trim().is_empty() {
                return Err(AppError::ValidationFailed(
                    "O motivo da rejeição é obrigatório.".to_string(),
                ));
            }
            match order.status {
                OrderStatus::PendingAdmin => Ok(Some(TransitionPlan {
                    from: OrderStatus::PendingAdmin,
                    to: OrderStatus::Rejected,
                    stock: StockEffect::Untouched,
                    reason: Some(reason.clone()),
                    tracking_code: None,
                })),
                _ => Err(illegal()),
            }
        }

        OrderAction::Ship { tracking_code } => match order.status {
            OrderStatus::Paid => Ok(Some(TransitionPlan {
                from: OrderStatus::Paid,
                to: OrderStatus::Shipped,
                stock: StockEffect::Untouched,
                reason: None,
                tracking_code: tracking_code.clone(),
            })),
            _ => Err(illegal()),
        },

        OrderAction::Deliver => match order.status {
            OrderStatus::Shipped => Ok(Some(TransitionPlan {
                from: OrderStatus::Shipped,
                to: OrderStatus::Delivered,
                stock: StockEffect::Untouched,
                reason: None,
                tracking_code: None,
            })),
            _ => Err(illegal()),
        },

        OrderAction::Cancel { reason } => {
            if reason.trim().is_empty() {
                return Err(AppError::ValidationFailed(
                    "O motivo do cancelamento é obrigatório.".to_string(),
                ));
            }
            if order.status.is_terminal() {
                return Err(illegal());
            }
            // Depois de PAID o estoque já foi baixado; o cancelamento
            // tem que devolver — na MESMA transação da mudança de status.
            let stock = match order.status {
                OrderStatus::Paid | OrderStatus::Shipped => StockEffect::Restore,
                _ => StockEffect::Untouched,
            };
            Ok(Some(TransitionPlan {
                from: order.status,
                to: OrderStatus::Cancelled,
                stock,
                reason: Some(reason.clone()),
                tracking_code: None,
            }))
        }
    }
}

// ---
// 2. O serviço (a execução transacional do plano)
// ---
#[derive(Clone)]
pub struct OrderService {
    pool: PgPool,
    engine: PermissionEngine,
    scoped_orders: ScopedRepo<Order>,
    order_repo: OrderRepository,
    product_repo: ProductRepository,
    store_repo: StoreRepository,
    audit_repo: AuditRepository,
}

impl OrderService {
    pub fn new(pool: PgPool, engine: PermissionEngine) -> Self {
        Self {
            scoped_orders: ScopedRepo::new(pool.clone(), engine.clone()),
            order_repo: OrderRepository::new(pool.clone()),
            product_repo: ProductRepository::new(pool.clone()),
            store_repo: StoreRepository::new(pool.clone()),
            audit_repo: AuditRepository::new(pool.clone()),
            engine,
            pool,
        }
    }

    // --- CRIAÇÃO ---
    pub async fn create_order(
        &self,
        ctx: &TenantContext,
        payload: CreateOrderPayload,
    ) -> Result<OrderResponse, AppError> {
        let store_id = ctx.require_store()?;
        self.engine
            .ensure(ctx, Permission::OrderCreate, store_id)
            .await?;

        let store = self
            .store_repo
            .find_by_id(store_id)
            .await?
            .ok_or(AppError::NotFound)?;

        if store.status != StoreStatus::Active {
            return Err(AppError::ValidationFailed(
                "A loja não está aceitando pedidos no momento.".to_string(),
            ));
        }

        for item in &payload.items {
            if item.quantity < 1 {
                return Err(AppError::ValidationFailed(
                    "A quantidade de cada item deve ser ao menos 1.".to_string(),
                ));
            }
        }

        let mut tx = begin_store_tx(&self.pool, store_id, ctx.actor_id).await?;

        // Resolve os produtos JÁ escopados à loja: um id de outra loja
        // simplesmente não volta da consulta.
        let ids: Vec<Uuid> = payload.items.iter().map(|i| i.product_id).collect();
        let products = self
            .product_repo
            .find_many_by_ids(&mut *tx, store_id, &ids)
            .await?;

        let mut total = Decimal::ZERO;
        let mut lines = Vec::with_capacity(payload.items.len());
        for item in &payload.items {
            let product = products
                .iter()
                .find(|p| p.id == item.product_id)
                .ok_or_else(|| {
                    AppError::ValidationFailed(
                        "Um dos produtos não existe nesta loja.".to_string(),
                    )
                })?;
            if !product.is_active {
                return Err(AppError::ValidationFailed(format!(
                    "O produto '{}' não está disponível.",
                    product.name
                )));
            }
            // Preço congelado no momento do pedido.
            total += product.price * Decimal::from(item.quantity);
            lines.push((product.id, item.quantity, product.price));
        }

        let order = self
            .order_repo
            .insert_order(&mut *tx, store_id, ctx.actor_id, total, &store.currency)
            .await?;

        let mut items = Vec::with_capacity(lines.len());
        for (product_id, quantity, unit_price) in lines {
            let item = self
                .order_repo
                .insert_item(&mut *tx, store_id, order.id, product_id, quantity, unit_price)
                .await?;
            items.push(item);
        }

        self.audit_repo
            .record(
                &mut *tx,
                NewAuditEntry {
                    store_id,
                    resource_type: "order",
                    resource_id: order.id,
                    actor_id: ctx.actor_id,
                    action: "order.create",
                    from_state: None,
                    to_state: Some(order.status.as_str()),
                    reason: None,
                },
            )
            .await?;

        tx.commit().await?;

        tracing::info!(
            target: "notifications",
            store = %store_id,
            order = %order.id,
            "pedido criado"
        );

        Ok(OrderResponse { order, items })
    }

    // --- LEITURA ---
    pub async fn get_order(
        &self,
        ctx: &TenantContext,
        order_id: Uuid,
    ) -> Result<OrderResponse, AppError> {
        let order = self.load_visible(ctx, order_id).await?;
        let items = self
            .order_repo
            .items_of(&self.pool, order.store_id, order.id)
            .await?;
        Ok(OrderResponse { order, items })
    }

    pub async fn list_orders(&self, ctx: &TenantContext) -> Result<Vec<Order>, AppError> {
        if ctx.role == GlobalRole::Customer {
            // Escopo-próprio: só o que é do cliente, em qualquer loja.
            return self.order_repo.list_for_customer(ctx.actor_id).await;
        }
        let store_id = ctx.require_store()?;
        self.scoped_orders.find_many(ctx, store_id).await
    }

    pub async fn count_orders_by_status(
        &self,
        ctx: &TenantContext,
    ) -> Result<Vec<(OrderStatus, i64)>, AppError> {
        let store_id = ctx.require_store()?;
        self.engine
            .ensure(ctx, Permission::AnalyticsView, store_id)
            .await?;
        self.order_repo.count_by_status(store_id).await
    }

    // --- COMPROVANTE DE PAGAMENTO ---
    // Guardamos só a referência (caminho); os bytes moram no storage
    // externo. O cliente anexa no próprio pedido; a equipe com
    // order.update também pode.
    pub async fn attach_payment_proof(
        &self,
        ctx: &TenantContext,
        order_id: Uuid,
        payment_proof: &str,
    ) -> Result<OrderResponse, AppError> {
        let order = self.load_visible(ctx, order_id).await?;

        if ctx.role != GlobalRole::Customer {
            self.engine
                .ensure(ctx, Permission::OrderUpdate, order.store_id)
                .await?;
        }

        let mut tx = begin_store_tx(&self.pool, order.store_id, ctx.actor_id).await?;
        let updated = self
            .order_repo
            .attach_proof(&mut *tx, order.store_id, order.id, payment_proof)
            .await?
            .ok_or_else(|| {
                AppError::ValidationFailed(
                    "O comprovante só pode ser anexado enquanto o pedido aguarda confirmação."
                        .to_string(),
                )
            })?;

        self.audit_repo
            .record(
                &mut *tx,
                NewAuditEntry {
                    store_id: order.store_id,
                    resource_type: "order",
                    resource_id: order.id,
                    actor_id: ctx.actor_id,
                    action: "order.attach_proof",
                    from_state: Some(updated.status.as_str()),
                    to_state: Some(updated.status.as_str()),
                    reason: None,
                },
            )
            .await?;
        tx.commit().await?;

        let items = self
            .order_repo
            .items_of(&self.pool, updated.store_id, updated.id)
            .await?;
        Ok(OrderResponse {
            order: updated,
            items,
        })
    }

    // --- TRANSIÇÃO (o contrato central da máquina de estados) ---
    pub async fn transition(
        &self,
        ctx: &TenantContext,
        order_id: Uuid,
        action: OrderAction,
    ) -> Result<OrderResponse, AppError> {
        // 1. Carrega pelo repositório escopado: id de outra loja morre
        //    aqui como NotFound, sem confirmar que existe.
        let order = self.scoped_orders.find_unique(ctx, order_id).await?;

        // 2. Toda transição exige a capacidade de mutação de pedidos
        //    (ADMIN/OWNER na tabela fixa).
        self.engine
            .ensure(ctx, Permission::OrderUpdate, order.store_id)
            .await?;

        // 3. Decide o plano (puro).
        let Some(plan) = plan_transition(&order, &action)? else {
            // Idempotência: já está lá. Nenhum efeito colateral refaz.
            tracing::info!(
                order = %order.id,
                status = order.status.as_str(),
                action = action.as_str(),
                "transição idempotente — pedido devolvido como está"
            );
            let items = self
                .order_repo
                .items_of(&self.pool, order.store_id, order.id)
                .await?;
            return Ok(OrderResponse { order, items });
        };

        // 4. Executa: status condicional + estoque + auditoria, TUDO na
        //    mesma transação. Se qualquer parte falhar (inclusive a
        //    auditoria), nada é aplicado.
        let store_id = order.store_id;
        let mut tx = begin_store_tx(&self.pool, store_id, ctx.actor_id).await?;

        let updated = self
            .order_repo
            .transition_status(
                &mut *tx,
                store_id,
                order.id,
                plan.from,
                plan.to,
                plan.reason.as_deref(),
                plan.tracking_code.as_deref(),
            )
            .await?;

        let Some(updated) = updated else {
            // Perdemos a corrida para outra requisição.
            drop(tx);
            return self.resolve_lost_race(ctx, order_id, &action).await;
        };

        let items = self
            .order_repo
            .items_of(&mut *tx, store_id, updated.id)
            .await?;

        match plan.stock {
            StockEffect::Untouched => {}
            StockEffect::Decrement => {
                let store = self.store_repo.find_by_id(store_id).await?;
                for item in &items {
                    let product = self
                        .product_repo
                        .adjust_stock(&mut *tx, store_id, item.product_id, -item.quantity)
                        .await?;
                    let Some(product) = product else {
                        // Sem saldo (ou produto sumiu): aborta a
                        // confirmação inteira.
                        return Err(AppError::ValidationFailed(
                            "Estoque insuficiente para confirmar o pagamento.".to_string(),
                        ));
                    };
                    if let Some(store) = &store {
                        if Decimal::from(product.stock_quantity) <= store.low_stock_threshold {
                            tracing::warn!(
                                target: "notifications",
                                store = %store_id,
                                product = %product.id,
                                stock = product.stock_quantity,
                                "estoque abaixo do limite de alerta"
                            );
                        }
                    }
                }
            }
            StockEffect::Restore => {
                for item in &items {
                    let restored = self
                        .product_repo
                        .adjust_stock(&mut *tx, store_id, item.product_id, item.quantity)
                        .await?;
                    if restored.is_none() {
                        return Err(AppError::InternalServerError(anyhow::anyhow!(
                            "Produto do pedido ausente ao devolver estoque"
                        )));
                    }
                }
            }
        }

        // Auditoria DENTRO da transação: uma mudança privilegiada sem
        // trilha é incidente de segurança, então trilha falhou = nada
        // aconteceu.
        self.audit_repo
            .record(
                &mut *tx,
                NewAuditEntry {
                    store_id,
                    resource_type: "order",
                    resource_id: updated.id,
                    actor_id: ctx.actor_id,
                    action: action.as_str(),
                    from_state: Some(plan.from.as_str()),
                    to_state: Some(plan.to.as_str()),
                    reason: plan.reason.as_deref(),
                },
            )
            .await?;

        tx.commit().await?;

        // Evento "aconteceu uma transição" — entrega é colaborador
        // externo, daqui é fire-and-forget.
        tracing::info!(
            target: "notifications",
            store = %store_id,
            order = %updated.id,
            from = plan.from.as_str(),
            to = plan.to.as_str(),
            "transição de pedido"
        );

        Ok(OrderResponse {
            order: updated,
            items,
        })
    }

    /// O UPDATE condicional não afetou linhas: relê e decide se a
    /// intenção já foi satisfeita por outra requisição (idempotência)
    /// ou se o chamador precisa saber que perdeu a corrida.
    async fn resolve_lost_race(
        &self,
        ctx: &TenantContext,
        order_id: Uuid,
        action: &OrderAction,
    ) -> Result<OrderResponse, AppError> {
        let current = self.scoped_orders.find_unique(ctx, order_id).await?;

        if matches!(action, OrderAction::ConfirmPayment) && current.status == OrderStatus::Paid {
            let items = self
                .order_repo
                .items_of(&self.pool, current.store_id, current.id)
                .await?;
            return Ok(OrderResponse {
                order: current,
                items,
            });
        }

        Err(AppError::ConcurrentModification)
    }

    /// Resolve um pedido visível para o ator: clientes enxergam SÓ os
    /// próprios (em qualquer loja); equipe passa pelo repositório
    /// escopado. Nos dois casos, id alheio = NotFound.
    async fn load_visible(
        &self,
        ctx: &TenantContext,
        order_id: Uuid,
    ) -> Result<Order, AppError> {
        if ctx.role == GlobalRole::Customer {
            let order = sqlx::query_as::<_, Order>(
                "SELECT * FROM orders WHERE id = $1 AND customer_id = $2",
            )
            .bind(order_id)
            .bind(ctx.actor_id)
            .fetch_optional(&self.pool)
            .await?;
            return order.ok_or(AppError::NotFound);
        }
        self.scoped_orders.find_unique(ctx, order_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn make_order(status: OrderStatus) -> Order {
        Order {
            id: Uuid::new_v4(),
            store_id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            status,
            total_amount: Decimal::new(10000, 2),
            currency: "BRL".to_string(),
            payment_proof: None,
            status_reason: None,
            tracking_code: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            paid_at: None,
            shipped_at: None,
            delivered_at: None,
            rejected_at: None,
            cancelled_at: None,
        }
    }

    fn cancel() -> OrderAction {
        OrderAction::Cancel {
            reason: "cliente desistiu".to_string(),
        }
    }

    #[test]
    fn confirm_payment_from_pending_decrements_stock() {
        let order = make_order(OrderStatus::PendingAdmin);
        let plan = plan_transition(&order, &OrderAction::ConfirmPayment)
            .unwrap()
            .unwrap();

        assert_eq!(plan.from, OrderStatus::PendingAdmin);
        assert_eq!(plan.to, OrderStatus::Paid);
        assert_eq!(plan.stock, StockEffect::Decrement);
    }

    #[test]
    fn confirm_payment_on_paid_order_is_an_idempotent_noop() {
        let order = make_order(OrderStatus::Paid);
        let plan = plan_transition(&order, &OrderAction::ConfirmPayment).unwrap();
        // None = devolve como está; nenhum efeito de estoque refaz.
        assert!(plan.is_none());
    }

    #[test]
    fn confirm_payment_is_illegal_from_every_other_state() {
        for status in [
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Rejected,
            OrderStatus::Cancelled,
        ] {
            let order = make_order(status);
            let err = plan_transition(&order, &OrderAction::ConfirmPayment).unwrap_err();
            assert!(matches!(err, AppError::IllegalTransition { .. }));
        }
    }

    #[test]
    fn reject_requires_a_non_empty_reason() {
        let order = make_order(OrderStatus::PendingAdmin);
        let err = plan_transition(
            &order,
            &OrderAction::Reject {
                reason: "   ".to_string(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, AppError::ValidationFailed(_)));
    }

    #[test]
    fn reject_is_only_legal_from_pending_admin() {
        let order = make_order(OrderStatus::PendingAdmin);
        let plan = plan_transition(
            &order,
            &OrderAction::Reject {
                reason: "sem comprovante".to_string(),
            },
        )
        .unwrap()
        .unwrap();
        assert_eq!(plan.to, OrderStatus::Rejected);
        assert_eq!(plan.stock, StockEffect::Untouched);

        for status in [
            OrderStatus::Paid,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Rejected,
            OrderStatus::Cancelled,
        ] {
            let order = make_order(status);
            let err = plan_transition(
                &order,
                &OrderAction::Reject {
                    reason: "sem comprovante".to_string(),
                },
            )
            .unwrap_err();
            assert!(matches!(err, AppError::IllegalTransition { .. }));
        }
    }

    #[test]
    fn ship_and_deliver_follow_the_happy_path_only() {
        let paid = make_order(OrderStatus::Paid);
        let plan = plan_transition(
            &paid,
            &OrderAction::Ship {
                tracking_code: Some("BR123".to_string()),
            },
        )
        .unwrap()
        .unwrap();
        assert_eq!(plan.to, OrderStatus::Shipped);
        assert_eq!(plan.tracking_code.as_deref(), Some("BR123"));

        let shipped = make_order(OrderStatus::Shipped);
        let plan = plan_transition(&shipped, &OrderAction::Deliver).unwrap().unwrap();
        assert_eq!(plan.to, OrderStatus::Delivered);

        // Fora de ordem: tudo ilegal.
        let err = plan_transition(&make_order(OrderStatus::PendingAdmin), &OrderAction::Deliver)
            .unwrap_err();
        assert!(matches!(err, AppError::IllegalTransition { .. }));
        let err = plan_transition(
            &make_order(OrderStatus::PendingAdmin),
            &OrderAction::Ship {
                tracking_code: None,
            },
        )
        .unwrap_err();
        assert!(matches!(err, AppError::IllegalTransition { .. }));
    }

    #[test]
    fn cancel_before_payment_leaves_stock_untouched() {
        let order = make_order(OrderStatus::PendingAdmin);
        let plan = plan_transition(&order, &cancel()).unwrap().unwrap();
        assert_eq!(plan.to, OrderStatus::Cancelled);
        assert_eq!(plan.stock, StockEffect::Untouched);
    }

    #[test]
    fn cancel_after_payment_restores_stock() {
        for status in [OrderStatus::Paid, OrderStatus::Shipped] {
            let order = make_order(status);
            let plan = plan_transition(&order, &cancel()).unwrap().unwrap();
            assert_eq!(plan.to, OrderStatus::Cancelled);
            assert_eq!(plan.stock, StockEffect::Restore, "status {:?}", status);
        }
    }

    #[test]
    fn cancel_requires_a_reason() {
        let order = make_order(OrderStatus::PendingAdmin);
        let err = plan_transition(
            &order,
            &OrderAction::Cancel {
                reason: String::new(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, AppError::ValidationFailed(_)));
    }

    #[test]
    fn terminal_states_accept_no_action_at_all() {
        let actions = [
            OrderAction::ConfirmPayment,
            OrderAction::Reject {
                reason: "x".to_string(),
            },
            OrderAction::Ship {
                tracking_code: None,
            },
            OrderAction::Deliver,
            cancel(),
        ];

        for status in [
            OrderStatus::Delivered,
            OrderStatus::Rejected,
            OrderStatus::Cancelled,
        ] {
            for action in &actions {
                let order = make_order(status);
                let result = plan_transition(&order, action);
                assert!(
                    matches!(result, Err(AppError::IllegalTransition { .. })),
                    "estado {:?} aceitou {:?}",
                    status,
                    action.as_str()
                );
            }
        }
    }

}
