// src/db/store_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::common::error::AppError;
use crate::models::store::{AssignmentRole, Store, StoreMember, StoreStatus};
use crate::services::authz::StoreAccess;

#[derive(Clone)]
pub struct StoreRepository {
    pool: PgPool,
}

impl StoreRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---
    // Lojas
    // ---

    pub async fn create_store<'e, E>(
        &self,
        executor: E,
        owner_id: Uuid,
        name: &str,
        currency: &str,
    ) -> Result<Store, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Store>(
            r#"
            INSERT INTO stores (owner_id, name, currency)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(owner_id)
        .bind(name)
        .bind(currency)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AppError::UniqueConstraintViolation(
                        "Você já tem uma loja com esse nome.".into(),
                    );
                }
            }
            e.into()
        })
    }

    /// A vista mínima que o motor de permissões precisa: quem é o dono.
    /// É a consulta mais quente do sistema; SELECT enxuto de propósito.
    pub async fn find_access(&self, store_id: Uuid) -> Result<Option<StoreAccess>, AppError> {
        let row = sqlx::query_as::<_, (Uuid, Uuid)>(
            "SELECT id, owner_id FROM stores WHERE id = $1",
        )
        .bind(store_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, owner_id)| StoreAccess { id, owner_id }))
    }

    pub async fn find_by_id(&self, store_id: Uuid) -> Result<Option<Store>, AppError> {
        let store = sqlx::query_as::<_, Store>("SELECT * FROM stores WHERE id = $1")
            .bind(store_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(store)
    }

    /// Lojas que o usuário enxerga: as que ele é dono + as em que é
    /// membro ativo da equipe.
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Store>, AppError> {
        let stores = sqlx::query_as::<_, Store>(
            r#"
            SELECT s.* FROM stores s
            WHERE s.owner_id = $1
               OR EXISTS (
                   SELECT 1 FROM store_members m
                   WHERE m.store_id = s.id AND m.user_id = $1 AND m.is_active = true
               )
            ORDER BY s.created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(stores)
    }

    /// Atualização parcial: só os campos presentes mudam (COALESCE).
    pub async fn update_store<'e, E>(
        &self,
        executor: E,
        store_id: Uuid,
        name: Option<&str>,
        status: Option<StoreStatus>,
        currency: Option<&str>,
        low_stock_threshold: Option<Decimal>,
        bot_token: Option<&str>,
    ) -> Result<Option<Store>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let store = sqlx::query_as::<_, Store>(
            r#"
            UPDATE stores SET
                name = COALESCE($2, name),
                status = COALESCE($3, status),
                currency = COALESCE($4, currency),
                low_stock_threshold = COALESCE($5, low_stock_threshold),
                bot_token = COALESCE($6, bot_token),
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(store_id)
        .bind(name)
        .bind(status)
        .bind(currency)
        .bind(low_stock_threshold)
        .bind(bot_token)
        .fetch_optional(executor)
        .await?;
        Ok(store)
    }

    // ---
    // Equipe (store_members)
    // ---

    /// Vincula (ou revincula) um usuário à loja. O UPSERT cobre o caso
    /// de recontratar alguém que foi desativado: o vínculo antigo volta
    /// à ativa em vez de duplicar a linha.
    pub async fn add_member<'e, E>(
        &self,
        executor: E,
        store_id: Uuid,
        user_id: Uuid,
        role: AssignmentRole,
        assigned_by: Uuid,
    ) -> Result<StoreMember, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let member = sqlx::query_as::<_, StoreMember>(
            r#"
            INSERT INTO store_members (store_id, user_id, role, assigned_by)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (store_id, user_id)
            DO UPDATE SET
                role = EXCLUDED.role,
                assigned_by = EXCLUDED.assigned_by,
                custom_role_id = NULL,
                is_active = true,
                updated_at = now()
            RETURNING *
            "#,
        )
        .bind(store_id)
        .bind(user_id)
        .bind(role)
        .bind(assigned_by)
        .fetch_one(executor)
        .await?;
        Ok(member)
    }

    /// Desativa o vínculo (nunca apaga — o histórico de auditoria
    /// referencia este registro).
    pub async fn deactivate_member<'e, E>(
        &self,
        executor: E,
        store_id: Uuid,
        user_id: Uuid,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE store_members SET is_active = false, updated_at = now()
            WHERE store_id = $1 AND user_id = $2 AND is_active = true
            "#,
        )
        .bind(store_id)
        .bind(user_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn find_member(
        &self,
        store_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<StoreMember>, AppError> {
        let member = sqlx::query_as::<_, StoreMember>(
            "SELECT * FROM store_members WHERE store_id = $1 AND user_id = $2",
        )
        .bind(store_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(member)
    }
}

// O vínculo também assina o contrato escopado (listagens genéricas).
impl crate::db::scoped::StoreOwned for StoreMember {
    const TABLE: &'static str = "store_members";
    const ENTITY: &'static str = "store_member";
    const READ: crate::models::rbac::Permission = crate::models::rbac::Permission::UserRead;
    const CREATE: crate::models::rbac::Permission = crate::models::rbac::Permission::UserCreate;
    const UPDATE: crate::models::rbac::Permission = crate::models::rbac::Permission::UserUpdate;
    const DELETE: crate::models::rbac::Permission = crate::models::rbac::Permission::UserDelete;

    fn store_id(&self) -> Uuid {
        self.store_id
    }
}
