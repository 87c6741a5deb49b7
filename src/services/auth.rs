// src/services/auth.rs

use bcrypt::{hash, verify};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::UserRepository,
    middleware::auth::AuthenticatedSession,
    models::auth::{AccountType, Claims, GlobalRole, User},
};

const TOKEN_TTL_SECONDS: i64 = 60 * 60 * 24; // 24h

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    jwt_secret: String,
    pool: PgPool,
}

impl AuthService {
    pub fn new(user_repo: UserRepository, jwt_secret: String, pool: PgPool) -> Self {
        Self {
            user_repo,
            jwt_secret,
            pool,
        }
    }

    pub async fn register_user(
        &self,
        email: &str,
        password: &str,
        account_type: Option<AccountType>,
    ) -> Result<String, AppError> {
        // O papel global vem do tipo de conta: lojista vira OWNER (dono
        // só das lojas que criar), o resto é CUSTOMER.
        let role = match account_type {
            Some(AccountType::Owner) => GlobalRole::Owner,
            _ => GlobalRole::Customer,
        };

        // Hashing fora do executor async (bcrypt é CPU-pesado).
        let password_clone = password.to_owned();
        let hashed_password = tokio::task::spawn_blocking(move || {
            hash(&password_clone, bcrypt::DEFAULT_COST)
        })
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;

        let new_user = self
            .user_repo
            .create_user(&self.pool, email, &hashed_password, role)
            .await?;

        tracing::info!(user = %new_user.id, "usuário registrado");
        self.generate_token(&new_user)
    }

    pub async fn login_user(&self, email: &str, password: &str) -> Result<String, AppError> {
        let user = self
            .user_repo
            .find_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let password_clone = password.to_owned();
        let hash_clone = user.password_hash.clone();
        let valid = tokio::task::spawn_blocking(move || verify(&password_clone, &hash_clone))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de verificação: {}", e))??;

        if !valid {
            return Err(AppError::InvalidCredentials);
        }

        if !user.is_active {
            return Err(AppError::AccountDisabled);
        }

        self.generate_token(&user)
    }

    /// `resolve(session) -> TenantContext | AuthError`, metade servidor:
    /// valida o token e RELÊ o usuário do banco. Token ruim/expirado =
    /// Unauthenticated; usuário desativado = AccountDisabled, mesmo com
    /// token ainda válido.
    pub async fn resolve_session(&self, token: &str) -> Result<AuthenticatedSession, AppError> {
        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| AppError::Unauthenticated)?
        .claims;

        let user = self
            .user_repo
            .find_by_id(claims.sub)
            .await?
            .ok_or(AppError::Unauthenticated)?;

        if !user.is_active {
            return Err(AppError::AccountDisabled);
        }

        Ok(AuthenticatedSession {
            user,
            session_id: claims.jti,
        })
    }

    fn generate_token(&self, user: &User) -> Result<String, AppError> {
        let claims = Claims {
            sub: user.id,
            jti: Uuid::new_v4(),
            exp: (Utc::now().timestamp() + TOKEN_TTL_SECONDS) as usize,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )?;
        Ok(token)
    }
}
