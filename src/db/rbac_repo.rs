// src/db/rbac_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::common::error::AppError;
use crate::models::rbac::{CustomRole, Permission};
use crate::models::store::AssignmentRole;
use crate::services::authz::{CustomRoleGrant, MembershipView};

#[derive(Clone)]
pub struct RbacRepository {
    pool: PgPool,
}

// Linha intermediária do JOIN vínculo + cargo customizado.
#[derive(sqlx::FromRow)]
struct MembershipRow {
    role: AssignmentRole,
    role_is_active: Option<bool>,
    role_permissions: Option<Vec<String>>,
}

impl RbacRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A consulta que alimenta o `authorize`: o vínculo ATIVO do ator
    /// com a loja, já com o cargo customizado resolvido no mesmo
    /// statement. Lê direto do banco — sem cache — para que desativar um
    /// cargo valha na requisição seguinte ao commit.
    pub async fn find_membership_view(
        &self,
        store_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<MembershipView>, AppError> {
        let row = sqlx::query_as::<_, MembershipRow>(
            r#"
            SELECT
                m.role,
                r.is_active AS role_is_active,
                r.permissions AS role_permissions
            FROM store_members m
            LEFT JOIN custom_roles r ON r.id = m.custom_role_id
            WHERE m.store_id = $1 AND m.user_id = $2 AND m.is_active = true
            "#,
        )
        .bind(store_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else { return Ok(None) };

        let custom_role = match (row.role_is_active, row.role_permissions) {
            (Some(is_active), Some(slugs)) => {
                // Slugs no banco passaram pela fronteira validada; se
                // algo desconhecido aparecer aqui, é corrupção — erro,
                // não um "nega-tudo" silencioso.
                let permissions = Permission::parse_slugs(&slugs)
                    .map_err(|_| {
                        AppError::InternalServerError(anyhow::anyhow!(
                            "Cargo customizado com permissão desconhecida no banco"
                        ))
                    })?
                    .into_iter()
                    .collect();
                Some(CustomRoleGrant {
                    is_active,
                    permissions,
                })
            }
            _ => None,
        };

        Ok(Some(MembershipView {
            role: row.role,
            custom_role,
        }))
    }

    // ---
    // Cargos customizados
    // ---

    pub async fn create_role<'e, E>(
        &self,
        executor: E,
        store_id: Uuid,
        name: &str,
        color: Option<&str>,
        permissions: &[Permission],
        created_by: Uuid,
    ) -> Result<CustomRole, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let slugs: Vec<String> = permissions.iter().map(|p| p.slug().to_string()).collect();

        sqlx::query_as::<_, CustomRole>(
            r#"
            INSERT INTO custom_roles (store_id, name, color, permissions, created_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(store_id)
        .bind(name)
        .bind(color)
        .bind(&slugs)
        .bind(created_by)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AppError::UniqueConstraintViolation(
                        "Já existe um cargo com esse nome.".into(),
                    );
                }
            }
            e.into()
        })
    }

    /// Atualização parcial; `permissions = None` preserva o conjunto
    /// atual (renomear/recolorir não mexe em permissão).
    pub async fn update_role<'e, E>(
        &self,
        executor: E,
        store_id: Uuid,
        role_id: Uuid,
        name: Option<&str>,
        color: Option<&str>,
        permissions: Option<&[Permission]>,
    ) -> Result<Option<CustomRole>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let slugs: Option<Vec<String>> = permissions
            .map(|ps| ps.iter().map(|p| p.slug().to_string()).collect());

        let role = sqlx::query_as::<_, CustomRole>(
            r#"
            UPDATE custom_roles SET
                name = COALESCE($3, name),
                color = COALESCE($4, color),
                permissions = COALESCE($5, permissions),
                updated_at = now()
            WHERE id = $2 AND store_id = $1
            RETURNING *
            "#,
        )
        .bind(store_id)
        .bind(role_id)
        .bind(name)
        .bind(color)
        .bind(slugs)
        .fetch_optional(executor)
        .await?;
        Ok(role)
    }

    pub async fn find_role(
        &self,
        store_id: Uuid,
        role_id: Uuid,
    ) -> Result<Option<CustomRole>, AppError> {
        let role = sqlx::query_as::<_, CustomRole>(
            "SELECT * FROM custom_roles WHERE id = $2 AND store_id = $1",
        )
        .bind(store_id)
        .bind(role_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(role)
    }

    /// Quantos membros ATIVOS ainda carregam este cargo. Decide entre
    /// hard-delete (zero) e desativação (algum).
    pub async fn count_active_holders<'e, E>(
        &self,
        executor: E,
        role_id: Uuid,
    ) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM store_members
            WHERE custom_role_id = $1 AND is_active = true
            "#,
        )
        .bind(role_id)
        .fetch_one(executor)
        .await?;
        Ok(count)
    }

    pub async fn deactivate_role<'e, E>(
        &self,
        executor: E,
        store_id: Uuid,
        role_id: Uuid,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE custom_roles SET is_active = false, updated_at = now()
            WHERE id = $2 AND store_id = $1
            "#,
        )
        .bind(store_id)
        .bind(role_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_role<'e, E>(
        &self,
        executor: E,
        store_id: Uuid,
        role_id: Uuid,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM custom_roles WHERE id = $2 AND store_id = $1")
            .bind(store_id)
            .bind(role_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    /// Troca o cargo do vínculo; NULL volta para a tabela fixa do papel.
    pub async fn set_member_custom_role<'e, E>(
        &self,
        executor: E,
        store_id: Uuid,
        user_id: Uuid,
        custom_role_id: Option<Uuid>,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE store_members SET custom_role_id = $3, updated_at = now()
            WHERE store_id = $1 AND user_id = $2 AND is_active = true
            "#,
        )
        .bind(store_id)
        .bind(user_id)
        .bind(custom_role_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }
}

// Cargos customizados também passam pelo contrato escopado para leitura.
impl crate::db::scoped::StoreOwned for CustomRole {
    const TABLE: &'static str = "custom_roles";
    const ENTITY: &'static str = "custom_role";
    const READ: Permission = Permission::UserRead;
    const CREATE: Permission = Permission::UserCreate;
    const UPDATE: Permission = Permission::UserUpdate;
    const DELETE: Permission = Permission::UserDelete;

    fn store_id(&self) -> Uuid {
        self.store_id
    }
}
