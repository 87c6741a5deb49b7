// src/db/audit_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::common::error::AppError;
use crate::models::audit::AuditEntry;

// Dados de um novo registro. Só referências: quem chama já tem tudo.
pub struct NewAuditEntry<'a> {
    pub store_id: Uuid,
    pub resource_type: &'a str,
    pub resource_id: Uuid,
    pub actor_id: Uuid,
    pub action: &'a str,
    pub from_state: Option<&'a str>,
    pub to_state: Option<&'a str>,
    pub reason: Option<&'a str>,
}

#[derive(Clone)]
pub struct AuditRepository {
    pool: PgPool,
}

impl AuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Grava no livro-razão. Para transições de pedido o executor é a
    /// transação da própria transição: se esta escrita falhar, a
    /// transição inteira sofre rollback. Auditoria não é "best effort".
    pub async fn record<'e, E>(
        &self,
        executor: E,
        entry: NewAuditEntry<'_>,
    ) -> Result<AuditEntry, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let recorded = sqlx::query_as::<_, AuditEntry>(
            r#"
            INSERT INTO audit_log
                (store_id, resource_type, resource_id, actor_id, action, from_state, to_state, reason)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(entry.store_id)
        .bind(entry.resource_type)
        .bind(entry.resource_id)
        .bind(entry.actor_id)
        .bind(entry.action)
        .bind(entry.from_state)
        .bind(entry.to_state)
        .bind(entry.reason)
        .fetch_one(executor)
        .await?;
        Ok(recorded)
    }

    pub async fn list_for_resource(
        &self,
        store_id: Uuid,
        resource_type: &str,
        resource_id: Uuid,
    ) -> Result<Vec<AuditEntry>, AppError> {
        let entries = sqlx::query_as::<_, AuditEntry>(
            r#"
            SELECT * FROM audit_log
            WHERE store_id = $1 AND resource_type = $2 AND resource_id = $3
            ORDER BY created_at ASC
            "#,
        )
        .bind(store_id)
        .bind(resource_type)
        .bind(resource_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    pub async fn list_for_store(
        &self,
        store_id: Uuid,
        limit: i64,
    ) -> Result<Vec<AuditEntry>, AppError> {
        let entries = sqlx::query_as::<_, AuditEntry>(
            r#"
            SELECT * FROM audit_log
            WHERE store_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(store_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }
}
