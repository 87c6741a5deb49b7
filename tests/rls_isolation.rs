// tests/rls_isolation.rs
// A camada de isolamento do BANCO, testada por baixo da aplicação:
// statements crus, sem passar por repositório nenhum, têm que continuar
// presos à loja asserida. Defesa em profundidade — não é redundância
// para otimizar fora.

mod common;

use uuid::Uuid;

use multiloja_backend::common::db_utils::begin_store_tx;
use multiloja_backend::common::error::AppError;
use multiloja_backend::db::ScopedRepo;
use multiloja_backend::models::auth::GlobalRole;
use multiloja_backend::models::catalog::Product;

#[tokio::test]
#[ignore = "exige Postgres em DATABASE_URL"]
async fn raw_statements_with_asserted_key_cannot_cross_stores() {
    let state = common::setup().await;
    let pool = &state.db_pool;

    let owner_a = common::create_user(pool, "OWNER").await;
    let owner_b = common::create_user(pool, "OWNER").await;
    let store_a = common::create_store(pool, owner_a).await;
    let store_b = common::create_store(pool, owner_b).await;
    let product_a = common::create_product(pool, store_a, 10).await;
    let product_b = common::create_product(pool, store_b, 10).await;

    // Chave asserida para a loja A...
    let mut tx = begin_store_tx(pool, store_a, owner_a).await.unwrap();

    // ...SELECT cru por id da loja B: zero linhas, mesmo sem WHERE store_id.
    let stolen: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM products WHERE id = $1")
            .bind(product_b)
            .fetch_optional(&mut *tx)
            .await
            .unwrap();
    assert!(stolen.is_none(), "RLS deixou vazar produto de outra loja");

    // ...UPDATE cru na loja B: nenhuma linha afetada.
    let result = sqlx::query("UPDATE products SET stock_quantity = 0 WHERE id = $1")
        .bind(product_b)
        .execute(&mut *tx)
        .await
        .unwrap();
    assert_eq!(result.rows_affected(), 0, "RLS deixou mutar produto de outra loja");

    // ...INSERT forjando store_id da loja B: o WITH CHECK barra.
    let forged = sqlx::query(
        r#"
        INSERT INTO products (store_id, name, sku, price, currency, stock_quantity)
        VALUES ($1, 'forjado', $2, 1.00, 'BRL', 1)
        "#,
    )
    .bind(store_b)
    .bind(format!("SKU-{}", Uuid::new_v4()))
    .execute(&mut *tx)
    .await;
    assert!(forged.is_err(), "RLS aceitou INSERT forjado para outra loja");

    drop(tx);

    // O produto da própria loja continua visível com a chave.
    let mut tx = begin_store_tx(pool, store_a, owner_a).await.unwrap();
    let own: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM products WHERE id = $1")
        .bind(product_a)
        .fetch_optional(&mut *tx)
        .await
        .unwrap();
    assert!(own.is_some());
}

#[tokio::test]
#[ignore = "exige Postgres em DATABASE_URL"]
async fn audit_log_is_append_only_even_for_raw_sql() {
    let state = common::setup().await;
    let pool = &state.db_pool;

    let owner = common::create_user(pool, "OWNER").await;
    let store = common::create_store(pool, owner).await;

    let mut tx = begin_store_tx(pool, store, owner).await.unwrap();
    sqlx::query(
        r#"
        INSERT INTO audit_log (store_id, resource_type, resource_id, actor_id, action)
        VALUES ($1, 'store', $1, $2, 'store.create')
        "#,
    )
    .bind(store)
    .bind(owner)
    .execute(&mut *tx)
    .await
    .unwrap();

    // Sem policy de UPDATE/DELETE, a reescrita é negada na raiz.
    let rewritten = sqlx::query("UPDATE audit_log SET action = 'nada' WHERE store_id = $1")
        .bind(store)
        .execute(&mut *tx)
        .await
        .unwrap();
    assert_eq!(rewritten.rows_affected(), 0);

    let erased = sqlx::query("DELETE FROM audit_log WHERE store_id = $1")
        .bind(store)
        .execute(&mut *tx)
        .await
        .unwrap();
    assert_eq!(erased.rows_affected(), 0);
}

#[tokio::test]
#[ignore = "exige Postgres em DATABASE_URL"]
async fn scoped_repository_hides_rows_of_other_stores() {
    let state = common::setup().await;
    let pool = &state.db_pool;

    let owner_a = common::create_user(pool, "OWNER").await;
    let owner_b = common::create_user(pool, "OWNER").await;
    let store_a = common::create_store(pool, owner_a).await;
    let store_b = common::create_store(pool, owner_b).await;
    let product_b = common::create_product(pool, store_b, 3).await;

    let admin_a = common::create_user(pool, "ADMIN").await;
    common::add_member(pool, store_a, admin_a, "ADMIN").await;

    let repo: ScopedRepo<Product> =
        ScopedRepo::new(pool.clone(), state.permission_engine.clone());

    // Membro da loja A mirando id da loja B: NotFound, nunca "proibido"
    // — a existência do recurso alheio não vaza.
    let ctx = common::ctx(admin_a, GlobalRole::Admin, None);
    let err = repo.find_unique(&ctx, product_b).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    // Dono da loja B enxerga normalmente.
    let ctx_b = common::ctx(owner_b, GlobalRole::Owner, None);
    let found = repo.find_unique(&ctx_b, product_b).await.unwrap();
    assert_eq!(found.id, product_b);
}
