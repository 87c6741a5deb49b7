// src/config.rs

use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{env, time::Duration};

use crate::{
    db::{AuditRepository, UserRepository},
    models::rbac::RolePolicy,
    services::auth::AuthService,
    services::authz::PermissionEngine,
    services::catalog_service::CatalogService,
    services::order_service::OrderService,
    services::rbac_service::RbacService,
    services::store_service::StoreService,
};

// O estado compartilhado que será acessível em toda a aplicação
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub jwt_secret: String,
    pub auth_service: AuthService,
    pub permission_engine: PermissionEngine,
    pub store_service: StoreService,
    pub rbac_service: RbacService,
    pub catalog_service: CatalogService,
    pub order_service: OrderService,
    pub audit_repo: AuditRepository,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL deve ser definida");
        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET deve ser definido");

        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        Ok(Self::from_pool(db_pool, jwt_secret))
    }

    /// Monta o gráfico de dependências a partir de uma pool já aberta
    /// (os testes de integração usam este caminho).
    pub fn from_pool(db_pool: PgPool, jwt_secret: String) -> Self {
        // A tabela fixa de papéis entra AQUI, por injeção. Um teste que
        // queira outra política monta o motor com outra RolePolicy.
        let permission_engine = PermissionEngine::new(db_pool.clone(), RolePolicy::default());

        let user_repo = UserRepository::new(db_pool.clone());
        let auth_service = AuthService::new(user_repo, jwt_secret.clone(), db_pool.clone());

        let store_service = StoreService::new(db_pool.clone(), permission_engine.clone());
        let rbac_service = RbacService::new(db_pool.clone(), permission_engine.clone());
        let catalog_service = CatalogService::new(db_pool.clone(), permission_engine.clone());
        let order_service = OrderService::new(db_pool.clone(), permission_engine.clone());
        let audit_repo = AuditRepository::new(db_pool.clone());

        Self {
            db_pool,
            jwt_secret,
            auth_service,
            permission_engine,
            store_service,
            rbac_service,
            catalog_service,
            order_service,
            audit_repo,
        }
    }
}
