// tests/rbac_roles.rs
// Monotonicidade de permissões de ponta a ponta: cunhagem de cargo
// limitada ao conjunto do criador, e desativação valendo no authorize
// seguinte ao commit.

mod common;

use multiloja_backend::common::error::AppError;
use multiloja_backend::models::auth::GlobalRole;
use multiloja_backend::models::rbac::{AssignRolePayload, CreateRolePayload, Permission};
use multiloja_backend::services::authz::Decision;
use multiloja_backend::services::rbac_service::RoleDeletionOutcome;

#[tokio::test]
#[ignore = "exige Postgres em DATABASE_URL"]
async fn role_deactivation_is_visible_to_the_next_authorize() {
    let state = common::setup().await;
    let pool = &state.db_pool;

    let owner = common::create_user(pool, "OWNER").await;
    let store = common::create_store(pool, owner).await;
    let vendor = common::create_user(pool, "VENDOR").await;
    common::add_member(pool, store, vendor, "VENDOR").await;

    // O dono cunha um cargo enxuto e o atribui ao vendedor.
    let ctx_owner = common::ctx(owner, GlobalRole::Owner, Some(store));
    let role = state
        .rbac_service
        .create_role(
            &ctx_owner,
            CreateRolePayload {
                name: "Só Catálogo".to_string(),
                color: None,
                permissions: vec!["product.read".to_string(), "product.update".to_string()],
            },
        )
        .await
        .unwrap();

    state
        .rbac_service
        .assign_role(
            &ctx_owner,
            AssignRolePayload {
                user_id: vendor,
                custom_role_id: Some(role.id),
            },
        )
        .await
        .unwrap();

    // Com o cargo ativo: product.update permitido; stock.adjust (que a
    // tabela fixa de VENDOR daria) agora negado — o cargo SUBSTITUI.
    let ctx_vendor = common::ctx(vendor, GlobalRole::Vendor, Some(store));
    let decision = state
        .permission_engine
        .authorize(&ctx_vendor, Permission::ProductUpdate, store)
        .await
        .unwrap();
    assert_eq!(decision, Decision::Allowed);

    let decision = state
        .permission_engine
        .authorize(&ctx_vendor, Permission::StockAdjust, store)
        .await
        .unwrap();
    assert!(matches!(decision, Decision::Denied(_)));

    // "Delete" com portador ativo degrada para desativação...
    let outcome = state
        .rbac_service
        .delete_role(&ctx_owner, role.id)
        .await
        .unwrap();
    assert_eq!(outcome, RoleDeletionOutcome::Deactivated);

    // ...e o PRÓXIMO authorize já nega, sem janela de cache.
    let decision = state
        .permission_engine
        .authorize(&ctx_vendor, Permission::ProductUpdate, store)
        .await
        .unwrap();
    assert!(matches!(decision, Decision::Denied(_)));
}

#[tokio::test]
#[ignore = "exige Postgres em DATABASE_URL"]
async fn admins_cannot_mint_roles_above_their_own_permissions() {
    let state = common::setup().await;
    let pool = &state.db_pool;

    let owner = common::create_user(pool, "OWNER").await;
    let store = common::create_store(pool, owner).await;

    // ADMIN que já opera sob um cargo enxuto (user.create incluso, para
    // poder criar cargos; store.update NÃO).
    let admin = common::create_user(pool, "ADMIN").await;
    common::add_member(pool, store, admin, "ADMIN").await;

    let ctx_owner = common::ctx(owner, GlobalRole::Owner, Some(store));
    let narrow = state
        .rbac_service
        .create_role(
            &ctx_owner,
            CreateRolePayload {
                name: "Gestor Limitado".to_string(),
                color: None,
                permissions: vec!["user.create".to_string(), "product.read".to_string()],
            },
        )
        .await
        .unwrap();
    state
        .rbac_service
        .assign_role(
            &ctx_owner,
            AssignRolePayload {
                user_id: admin,
                custom_role_id: Some(narrow.id),
            },
        )
        .await
        .unwrap();

    // Ele tenta cunhar um cargo com store.update — acima do que tem.
    let ctx_admin = common::ctx(admin, GlobalRole::Admin, Some(store));
    let err = state
        .rbac_service
        .create_role(
            &ctx_admin,
            CreateRolePayload {
                name: "Escalada".to_string(),
                color: None,
                permissions: vec!["store.update".to_string()],
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PermissionNotGranted("store.update")));

    // Dentro do próprio conjunto, funciona.
    let ok = state
        .rbac_service
        .create_role(
            &ctx_admin,
            CreateRolePayload {
                name: "Leitura de Catálogo".to_string(),
                color: None,
                permissions: vec!["product.read".to_string()],
            },
        )
        .await;
    assert!(ok.is_ok());
}

#[tokio::test]
#[ignore = "exige Postgres em DATABASE_URL"]
async fn unknown_permission_slug_fails_at_the_boundary() {
    let state = common::setup().await;
    let pool = &state.db_pool;

    let owner = common::create_user(pool, "OWNER").await;
    let store = common::create_store(pool, owner).await;

    let ctx_owner = common::ctx(owner, GlobalRole::Owner, Some(store));
    let err = state
        .rbac_service
        .create_role(
            &ctx_owner,
            CreateRolePayload {
                name: "Inválido".to_string(),
                color: None,
                permissions: vec!["banana.eat".to_string()],
            },
        )
        .await
        .unwrap_err();
    // Slug desconhecido é erro de validação na fronteira, nunca um
    // "sempre-nega" silencioso.
    assert!(matches!(err, AppError::ValidationFailed(_)));
}
