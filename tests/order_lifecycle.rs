// tests/order_lifecycle.rs
// O caminho de mutação mais quente do sistema, de ponta a ponta contra
// um Postgres real: idempotência da confirmação, corrida de dupla
// confirmação, devolução de estoque no cancelamento e a trilha de
// auditoria de cada transição.

mod common;

use uuid::Uuid;

use multiloja_backend::common::error::AppError;
use multiloja_backend::models::auth::GlobalRole;
use multiloja_backend::models::orders::{CreateOrderPayload, OrderAction, OrderItemInput, OrderStatus};

async fn order_fixture(
    state: &multiloja_backend::config::AppState,
) -> (Uuid, Uuid, Uuid, Uuid, Uuid) {
    let pool = &state.db_pool;
    let owner = common::create_user(pool, "OWNER").await;
    let store = common::create_store(pool, owner).await;
    let product = common::create_product(pool, store, 10).await;

    let vendor = common::create_user(pool, "VENDOR").await;
    common::add_member(pool, store, vendor, "VENDOR").await;
    let admin = common::create_user(pool, "ADMIN").await;
    common::add_member(pool, store, admin, "ADMIN").await;

    (owner, store, product, vendor, admin)
}

#[tokio::test]
#[ignore = "exige Postgres em DATABASE_URL"]
async fn confirm_is_idempotent_and_cancel_restores_stock() {
    let state = common::setup().await;
    let pool = &state.db_pool;
    let (_owner, store, product, vendor, admin) = order_fixture(&state).await;

    // VENDOR da loja cria o pedido de 2 unidades.
    let ctx_vendor = common::ctx(vendor, GlobalRole::Vendor, Some(store));
    let order = state
        .order_service
        .create_order(
            &ctx_vendor,
            CreateOrderPayload {
                items: vec![OrderItemInput {
                    product_id: product,
                    quantity: 2,
                }],
            },
        )
        .await
        .unwrap();
    assert_eq!(order.order.status, OrderStatus::PendingAdmin);
    assert_eq!(common::stock_of(pool, product).await, 10);

    // ADMIN confirma: PAID, estoque 10 -> 8.
    let ctx_admin = common::ctx(admin, GlobalRole::Admin, None);
    let paid = state
        .order_service
        .transition(&ctx_admin, order.order.id, OrderAction::ConfirmPayment)
        .await
        .unwrap();
    assert_eq!(paid.order.status, OrderStatus::Paid);
    assert_eq!(common::stock_of(pool, product).await, 8);

    // Confirma DE NOVO: nada muda, nada erra.
    let again = state
        .order_service
        .transition(&ctx_admin, order.order.id, OrderAction::ConfirmPayment)
        .await
        .unwrap();
    assert_eq!(again.order.status, OrderStatus::Paid);
    assert_eq!(common::stock_of(pool, product).await, 8);

    // Cancela: CANCELLED, estoque de volta a 10 — atomicamente.
    let cancelled = state
        .order_service
        .transition(
            &ctx_admin,
            order.order.id,
            OrderAction::Cancel {
                reason: "cliente desistiu".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(cancelled.order.status, OrderStatus::Cancelled);
    assert_eq!(common::stock_of(pool, product).await, 10);

    // Trilha: criação + confirmação + cancelamento (a repetição
    // idempotente NÃO gera transição, logo não gera trilha).
    let entries = state
        .audit_repo
        .list_for_resource(store, "order", order.order.id)
        .await
        .unwrap();
    let actions: Vec<&str> = entries.iter().map(|e| e.action.as_str()).collect();
    assert_eq!(
        actions,
        vec!["order.create", "order.confirm_payment", "order.cancel"]
    );
}

#[tokio::test]
#[ignore = "exige Postgres em DATABASE_URL"]
async fn concurrent_double_confirm_decrements_stock_once() {
    let state = common::setup().await;
    let pool = &state.db_pool;
    let (_owner, store, product, vendor, admin) = order_fixture(&state).await;

    let ctx_vendor = common::ctx(vendor, GlobalRole::Vendor, Some(store));
    let order = state
        .order_service
        .create_order(
            &ctx_vendor,
            CreateOrderPayload {
                items: vec![OrderItemInput {
                    product_id: product,
                    quantity: 2,
                }],
            },
        )
        .await
        .unwrap();

    // Duas confirmações AO MESMO TEMPO: o UPDATE condicional garante um
    // vencedor; o perdedor relê, vê PAID e devolve o pedido sem erro.
    let ctx_admin = common::ctx(admin, GlobalRole::Admin, None);
    let (first, second) = tokio::join!(
        state
            .order_service
            .transition(&ctx_admin, order.order.id, OrderAction::ConfirmPayment),
        state
            .order_service
            .transition(&ctx_admin, order.order.id, OrderAction::ConfirmPayment),
    );

    let first = first.unwrap();
    let second = second.unwrap();
    assert_eq!(first.order.status, OrderStatus::Paid);
    assert_eq!(second.order.status, OrderStatus::Paid);

    // Exatamente UMA baixa de estoque.
    assert_eq!(common::stock_of(pool, product).await, 8);
}

#[tokio::test]
#[ignore = "exige Postgres em DATABASE_URL"]
async fn illegal_transition_leaves_the_order_untouched() {
    let state = common::setup().await;
    let (_owner, store, product, vendor, admin) = order_fixture(&state).await;

    let ctx_vendor = common::ctx(vendor, GlobalRole::Vendor, Some(store));
    let order = state
        .order_service
        .create_order(
            &ctx_vendor,
            CreateOrderPayload {
                items: vec![OrderItemInput {
                    product_id: product,
                    quantity: 1,
                }],
            },
        )
        .await
        .unwrap();

    let ctx_admin = common::ctx(admin, GlobalRole::Admin, None);
    let err = state
        .order_service
        .transition(&ctx_admin, order.order.id, OrderAction::Deliver)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::IllegalTransition { .. }));

    let unchanged = state
        .order_service
        .get_order(&ctx_admin, order.order.id)
        .await
        .unwrap();
    assert_eq!(unchanged.order.status, OrderStatus::PendingAdmin);
}

#[tokio::test]
#[ignore = "exige Postgres em DATABASE_URL"]
async fn cross_tenant_order_resolves_to_not_found() {
    let state = common::setup().await;
    let pool = &state.db_pool;

    // Pedido na loja B...
    let (_owner_b, store_b, product_b, vendor_b, _admin_b) = order_fixture(&state).await;
    let ctx_vendor_b = common::ctx(vendor_b, GlobalRole::Vendor, Some(store_b));
    let order_b = state
        .order_service
        .create_order(
            &ctx_vendor_b,
            CreateOrderPayload {
                items: vec![OrderItemInput {
                    product_id: product_b,
                    quantity: 1,
                }],
            },
        )
        .await
        .unwrap();

    // ...mirado por um ADMIN sem NENHUM vínculo com a loja B.
    let outsider = common::create_user(pool, "ADMIN").await;
    let owner_x = common::create_user(pool, "OWNER").await;
    let store_x = common::create_store(pool, owner_x).await;
    common::add_member(pool, store_x, outsider, "ADMIN").await;

    let ctx_outsider = common::ctx(outsider, GlobalRole::Admin, None);
    let err = state
        .order_service
        .get_order(&ctx_outsider, order_b.order.id)
        .await
        .unwrap_err();
    // NotFound — não "sem permissão": a existência do pedido não vaza.
    assert!(matches!(err, AppError::NotFound));

    let err = state
        .order_service
        .transition(&ctx_outsider, order_b.order.id, OrderAction::ConfirmPayment)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));
}

#[tokio::test]
#[ignore = "exige Postgres em DATABASE_URL"]
async fn customers_see_only_their_own_orders() {
    let state = common::setup().await;
    let pool = &state.db_pool;
    let (_owner, store, product, _vendor, _admin) = order_fixture(&state).await;

    let customer_1 = common::create_user(pool, "CUSTOMER").await;
    let customer_2 = common::create_user(pool, "CUSTOMER").await;

    let ctx_1 = common::ctx(customer_1, GlobalRole::Customer, Some(store));
    let mine = state
        .order_service
        .create_order(
            &ctx_1,
            CreateOrderPayload {
                items: vec![OrderItemInput {
                    product_id: product,
                    quantity: 1,
                }],
            },
        )
        .await
        .unwrap();

    // O outro cliente não lista nem abre o pedido alheio.
    let ctx_2 = common::ctx(customer_2, GlobalRole::Customer, None);
    let listed = state.order_service.list_orders(&ctx_2).await.unwrap();
    assert!(listed.iter().all(|o| o.customer_id == customer_2));

    let err = state
        .order_service
        .get_order(&ctx_2, mine.order.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));
}
