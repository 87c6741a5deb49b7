// src/common/db_utils.rs

use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::common::error::AppError;

// ---
// Helper RLS: A "Chave" para o Banco de Dados
// ---
// As policies de row-level security comparam store_id com
// current_setting('app.store_id'). A chave é SEMPRE transacional
// (is_local = true): nada fica pendurado na conexão quando ela volta
// para a pool, então um contexto nunca "vaza" entre requisições.
//
// Toda unidade de trabalho escopada a uma loja passa por aqui; quem não
// assere a chave enxerga o banco sem escopo (os repositórios escopados
// são o único caminho que faz isso, e só para resolver id -> loja).

/// Abre uma transação já "temperada" com o contexto RLS da operação.
pub async fn begin_store_tx(
    pool: &PgPool,
    store_id: Uuid,
    actor_id: Uuid,
) -> Result<Transaction<'static, Postgres>, AppError> {
    let mut tx = pool.begin().await?;

    // 1. Define a Loja (a fronteira de isolamento)
    sqlx::query("SELECT set_config('app.store_id', $1, true)")
        .bind(store_id.to_string())
        .execute(&mut *tx)
        .await?;

    // 2. Define o Ator (para as policies de auditoria)
    sqlx::query("SELECT set_config('app.actor_id', $1, true)")
        .bind(actor_id.to_string())
        .execute(&mut *tx)
        .await?;

    Ok(tx)
}
