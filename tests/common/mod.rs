#![allow(dead_code)]

// tests/common/mod.rs
// Fixtures compartilhadas pelas suítes de integração. Todas exigem um
// Postgres real apontado por DATABASE_URL (por isso os testes são
// #[ignore] — rode com `cargo test -- --ignored` com o banco de pé).

use sqlx::PgPool;
use uuid::Uuid;

use multiloja_backend::config::AppState;
use multiloja_backend::middleware::tenancy::TenantContext;
use multiloja_backend::models::auth::GlobalRole;

pub async fn setup() -> AppState {
    dotenvy::dotenv().ok();
    let url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL é necessária para os testes de integração");
    let pool = PgPool::connect(&url).await.expect("conexão com o banco");
    sqlx::migrate!().run(&pool).await.expect("migrações");
    AppState::from_pool(pool, "segredo-de-teste".to_string())
}

pub fn ctx(actor_id: Uuid, role: GlobalRole, store_id: Option<Uuid>) -> TenantContext {
    TenantContext {
        actor_id,
        role,
        store_id,
        session_id: Uuid::new_v4(),
    }
}

pub async fn create_user(pool: &PgPool, role: &str) -> Uuid {
    sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO users (email, password_hash, role) VALUES ($1, 'hash', $2::global_role) RETURNING id",
    )
    .bind(format!("{}@teste.dev", Uuid::new_v4()))
    .bind(role)
    .fetch_one(pool)
    .await
    .expect("criar usuário")
}

pub async fn create_store(pool: &PgPool, owner_id: Uuid) -> Uuid {
    sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO stores (owner_id, name, currency) VALUES ($1, $2, 'BRL') RETURNING id",
    )
    .bind(owner_id)
    .bind(format!("Loja {}", Uuid::new_v4()))
    .fetch_one(pool)
    .await
    .expect("criar loja")
}

pub async fn create_product(pool: &PgPool, store_id: Uuid, stock: i32) -> Uuid {
    sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO products (store_id, name, sku, price, currency, stock_quantity)
        VALUES ($1, 'Produto', $2, 50.00, 'BRL', $3)
        RETURNING id
        "#,
    )
    .bind(store_id)
    .bind(format!("SKU-{}", Uuid::new_v4()))
    .bind(stock)
    .fetch_one(pool)
    .await
    .expect("criar produto")
}

pub async fn add_member(pool: &PgPool, store_id: Uuid, user_id: Uuid, role: &str) {
    sqlx::query(
        r#"
        INSERT INTO store_members (store_id, user_id, role, assigned_by)
        VALUES ($1, $2, $3::assignment_role, $2)
        "#,
    )
    .bind(store_id)
    .bind(user_id)
    .bind(role)
    .execute(pool)
    .await
    .expect("vincular membro");
}

pub async fn stock_of(pool: &PgPool, product_id: Uuid) -> i32 {
    sqlx::query_scalar::<_, i32>("SELECT stock_quantity FROM products WHERE id = $1")
        .bind(product_id)
        .fetch_one(pool)
        .await
        .expect("ler estoque")
}
