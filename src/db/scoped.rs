// src/db/scoped.rs

use std::marker::PhantomData;

use sqlx::postgres::PgRow;
use sqlx::query_builder::Separated;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::common::db_utils::begin_store_tx;
use crate::common::error::AppError;
use crate::middleware::tenancy::TenantContext;
use crate::models::rbac::Permission;
use crate::services::authz::{Decision, DenialReason, PermissionEngine};

// ---
// 1. O contrato que toda tabela dona-de-loja assina
// ---
// Cada entidade declara sua tabela e as capacidades exigidas para cada
// verbo. O repositório escopado usa isso para montar as consultas — e
// NUNCA emite um statement sem `store_id = $n` na cláusula (a exceção é
// a resolução id -> loja do find_unique, que devolve NotFound antes de
// entregar qualquer byte ao chamador não autorizado).
pub trait StoreOwned: for<'r> FromRow<'r, PgRow> + Send + Unpin {
    const TABLE: &'static str;
    const ENTITY: &'static str;
    const READ: Permission;
    const CREATE: Permission;
    const UPDATE: Permission;
    const DELETE: Permission;

    fn store_id(&self) -> Uuid;
}

// Entidades com create/update genéricos. A entidade descreve como se
// insere; o repositório decide QUANDO pode inserir.
pub trait StoreOwnedWrite: StoreOwned {
    type Create: Send + Sync;
    type Update: Send + Sync;

    /// Colunas do INSERT, sem `store_id` (ele é sempre a primeira).
    fn insert_columns() -> &'static str;
    fn push_insert_values(sep: &mut Separated<'_, '_, Postgres, &'static str>, data: &Self::Create);
    fn push_update_assignments(qb: &mut QueryBuilder<'_, Postgres>, data: &Self::Update);
}

/// Cruzamento do store_id ADVISÓRIO (cabeçalho) com o autoritativo (da
/// linha/rota). Divergência vira NotFound: não confirmamos nem negamos
/// nada sobre a outra loja.
pub fn check_advisory_store(ctx: &TenantContext, resource_store: Uuid) -> Result<(), AppError> {
    if let Some(ctx_store) = ctx.store_id {
        if ctx_store != resource_store {
            return Err(AppError::NotFound);
        }
    }
    Ok(())
}

// ---
// 2. O repositório escopado genérico
// ---
// TODA operação: valida o contexto, consulta o motor de permissões,
// executa com a chave RLS transacional e registra no log estruturado.
#[derive(Clone)]
pub struct ScopedRepo<E> {
    pool: PgPool,
    engine: PermissionEngine,
    _marker: PhantomData<E>,
}

impl<E: StoreOwned> ScopedRepo<E> {
    pub fn new(pool: PgPool, engine: PermissionEngine) -> Self {
        Self {
            pool,
            engine,
            _marker: PhantomData,
        }
    }

    pub async fn find_many(
        &self,
        ctx: &TenantContext,
        store_id: Uuid,
    ) -> Result<Vec<E>, AppError> {
        check_advisory_store(ctx, store_id)?;
        self.engine.ensure(ctx, E::READ, store_id).await?;

        let mut tx = begin_store_tx(&self.pool, store_id, ctx.actor_id).await?;
        let sql = format!(
            "SELECT * FROM {} WHERE store_id = $1 ORDER BY created_at DESC",
            E::TABLE
        );
        let rows = sqlx::query_as::<_, E>(&sql)
            .bind(store_id)
            .fetch_all(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(
            actor = %ctx.actor_id,
            store = %store_id,
            entity = E::ENTITY,
            count = rows.len(),
            "scoped find_many"
        );
        Ok(rows)
    }

    /// Busca por id. A linha é resolvida primeiro para descobrir a loja
    /// dona; só então o motor decide. Para quem não tem vínculo com a
    /// loja da linha, o resultado é indistinguível de "não existe".
    pub async fn find_unique(&self, ctx: &TenantContext, id: Uuid) -> Result<E, AppError> {
        let sql = format!("SELECT * FROM {} WHERE id = $1", E::TABLE);
        let row: Option<E> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Err(AppError::NotFound);
        };

        let store_id = row.store_id();
        check_advisory_store(ctx, store_id)?;

        match self.engine.authorize(ctx, E::READ, store_id).await? {
            Decision::Allowed => {
                tracing::info!(
                    actor = %ctx.actor_id,
                    store = %store_id,
                    entity = E::ENTITY,
                    id = %id,
                    "scoped find_unique"
                );
                Ok(row)
            }
            // Sem vínculo = a linha "não existe" para este ator.
            Decision::Denied(DenialReason::NoStoreAccess) => Err(AppError::NotFound),
            // Membro da loja sem a capacidade: aqui sim é permissão.
            Decision::Denied(DenialReason::PermissionNotGranted) => {
                Err(AppError::PermissionNotGranted(E::READ.slug()))
            }
        }
    }

    pub async fn delete(
        &self,
        ctx: &TenantContext,
        store_id: Uuid,
        id: Uuid,
    ) -> Result<(), AppError> {
        check_advisory_store(ctx, store_id)?;
        self.engine.ensure(ctx, E::DELETE, store_id).await?;

        let mut tx = begin_store_tx(&self.pool, store_id, ctx.actor_id).await?;
        let sql = format!("DELETE FROM {} WHERE id = $1 AND store_id = $2", E::TABLE);
        let result = sqlx::query(&sql)
            .bind(id)
            .bind(store_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        if result.rows_affected() == 0 {
            // Inexistente ou de outra loja — mesma resposta.
            return Err(AppError::NotFound);
        }

        tracing::info!(
            actor = %ctx.actor_id,
            store = %store_id,
            entity = E::ENTITY,
            id = %id,
            "scoped delete"
        );
        Ok(())
    }
}

impl<E: StoreOwnedWrite> ScopedRepo<E> {
    pub async fn create(
        &self,
        ctx: &TenantContext,
        store_id: Uuid,
        data: &E::Create,
    ) -> Result<E, AppError> {
        check_advisory_store(ctx, store_id)?;
        self.engine.ensure(ctx, E::CREATE, store_id).await?;

        let mut tx = begin_store_tx(&self.pool, store_id, ctx.actor_id).await?;

        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "INSERT INTO {} (store_id, {}) VALUES (",
            E::TABLE,
            E::insert_columns()
        ));
        {
            let mut sep = qb.separated(", ");
            sep.push_bind(store_id);
            E::push_insert_values(&mut sep, data);
        }
        qb.push(") RETURNING *");

        let row = qb
            .build_query_as::<E>()
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db_err) = &e {
                    if db_err.is_unique_violation() {
                        return AppError::UniqueConstraintViolation(format!(
                            "Já existe um registro de {} com esse valor único.",
                            E::ENTITY
                        ));
                    }
                }
                e.into()
            })?;
        tx.commit().await?;

        tracing::info!(
            actor = %ctx.actor_id,
            store = %store_id,
            entity = E::ENTITY,
            "scoped create"
        );
        Ok(row)
    }

    pub async fn update(
        &self,
        ctx: &TenantContext,
        store_id: Uuid,
        id: Uuid,
        data: &E::Update,
    ) -> Result<E, AppError> {
        check_advisory_store(ctx, store_id)?;
        self.engine.ensure(ctx, E::UPDATE, store_id).await?;

        let mut tx = begin_store_tx(&self.pool, store_id, ctx.actor_id).await?;

        let mut qb =
            QueryBuilder::<Postgres>::new(format!("UPDATE {} SET updated_at = now()", E::TABLE));
        E::push_update_assignments(&mut qb, data);
        qb.push(" WHERE id = ");
        qb.push_bind(id);
        qb.push(" AND store_id = ");
        qb.push_bind(store_id);
        qb.push(" RETURNING *");

        let row: Option<E> = qb.build_query_as::<E>().fetch_optional(&mut *tx).await?;
        tx.commit().await?;

        let Some(row) = row else {
            return Err(AppError::NotFound);
        };

        tracing::info!(
            actor = %ctx.actor_id,
            store = %store_id,
            entity = E::ENTITY,
            id = %id,
            "scoped update"
        );
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::auth::GlobalRole;

    fn ctx_with_store(store_id: Option<Uuid>) -> TenantContext {
        TenantContext {
            actor_id: Uuid::new_v4(),
            role: GlobalRole::Admin,
            store_id,
            session_id: Uuid::new_v4(),
        }
    }

    #[test]
    fn advisory_store_mismatch_resolves_to_not_found() {
        let ctx = ctx_with_store(Some(Uuid::new_v4()));
        let other_store = Uuid::new_v4();

        assert!(matches!(
            check_advisory_store(&ctx, other_store),
            Err(AppError::NotFound)
        ));
    }

    #[test]
    fn missing_advisory_store_is_accepted() {
        let ctx = ctx_with_store(None);
        assert!(check_advisory_store(&ctx, Uuid::new_v4()).is_ok());
    }

    #[test]
    fn matching_advisory_store_is_accepted() {
        let store = Uuid::new_v4();
        let ctx = ctx_with_store(Some(store));
        assert!(check_advisory_store(&ctx, store).is_ok());
    }
}
