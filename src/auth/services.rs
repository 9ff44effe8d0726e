use time::{Duration, OffsetDateTime};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::auth::dto::{
    ForgotPasswordRequest, ForgotPasswordResponse, LoginRequest, LoginResponse, RegisterRequest,
    ResetPasswordRequest, UpdateProfileRequest,
};
use crate::auth::password::{
    hash_password, verify_password, DUMMY_PASSWORD_HASH, MIN_PASSWORD_LEN,
};
use crate::auth::repo_types::{ProfileChanges, Session, User};
use crate::auth::store::{StoreError, UserStore};
use crate::auth::token::{generate_token, TOKEN_BYTES};
use crate::config::AuthConfig;
use crate::error::{AppError, AppResult};

pub const FORGOT_PASSWORD_MESSAGE: &str = "if the account exists, a reset token was generated";
pub const RESET_DONE_MESSAGE: &str = "password reset successfully";

const INVALID_CREDENTIALS: &str = "invalid credentials";

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Deliberately loose: non-empty and contains `@`.
pub fn is_valid_email(email: &str) -> bool {
    !email.is_empty() && email.contains('@')
}

fn validated_email(raw: &str) -> AppResult<String> {
    let email = normalize_email(raw);
    if !is_valid_email(&email) {
        return Err(AppError::validation("invalid email"));
    }
    Ok(email)
}

fn validated_password(password: &str) -> AppResult<()> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::validation("password too short"));
    }
    Ok(())
}

fn hashed(password: &str) -> AppResult<String> {
    hash_password(password).map_err(|e| AppError::internal("failed to hash password", e))
}

/// `now + minutes`, or an internal error when the result is out of range.
fn expiry_after(minutes: i64, what: &'static str) -> AppResult<OffsetDateTime> {
    minutes
        .checked_mul(60)
        .map(Duration::seconds)
        .and_then(|ttl| OffsetDateTime::now_utc().checked_add(ttl))
        .ok_or_else(|| {
            AppError::internal(what, anyhow::anyhow!("ttl of {minutes} minutes out of range"))
        })
}

/// Auth flows over an injected [`UserStore`].
pub struct AuthService<'a> {
    store: &'a dyn UserStore,
    config: &'a AuthConfig,
}

impl<'a> AuthService<'a> {
    pub fn new(store: &'a dyn UserStore, config: &'a AuthConfig) -> Self {
        Self { store, config }
    }

    pub async fn register(&self, input: RegisterRequest) -> AppResult<User> {
        let email = validated_email(&input.email)?;
        let name = input.name.trim();
        if name.is_empty() {
            return Err(AppError::validation("name is required"));
        }
        validated_password(&input.password)?;

        let hash = hashed(&input.password)?;
        let user = self
            .store
            .create_user(&email, name, &hash)
            .await
            .map_err(|e| match e {
                StoreError::AlreadyExists => {
                    warn!(%email, "email already registered");
                    AppError::Conflict("email already exists".into())
                }
                other => AppError::internal("failed to create user", other),
            })?;

        info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    pub async fn login(&self, input: LoginRequest) -> AppResult<LoginResponse> {
        let email = validated_email(&input.email)?;

        let user = match self.store.find_user_by_email(&email).await {
            Ok(u) => u,
            Err(StoreError::NotFound) => {
                // Same argon2 cost as a real account.
                let _ = verify_password(&input.password, DUMMY_PASSWORD_HASH);
                warn!("login unknown email");
                return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
            }
            Err(e) => return Err(AppError::internal("failed to load user", e)),
        };

        // An unparseable stored hash rejects exactly like a wrong password.
        let ok = match verify_password(&input.password, &user.password_hash) {
            Ok(ok) => ok,
            Err(e) => {
                error!(user_id = %user.id, error = %e, "stored password hash unusable");
                false
            }
        };
        if !ok {
            warn!(user_id = %user.id, "login invalid password");
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
        }

        let session = self.issue_session(user.id).await?;
        info!(user_id = %user.id, "user logged in");
        Ok(LoginResponse { user, session })
    }

    pub async fn issue_session(&self, user_id: Uuid) -> AppResult<Session> {
        let token = generate_token(TOKEN_BYTES)
            .map_err(|e| AppError::internal("failed to create session", e))?;
        let expires_at =
            expiry_after(self.config.session_ttl_minutes, "failed to create session")?;
        self.store
            .create_session(user_id, &token, expires_at)
            .await
            .map_err(|e| AppError::internal("failed to create session", e))
    }

    pub async fn forgot_password(
        &self,
        input: ForgotPasswordRequest,
    ) -> AppResult<ForgotPasswordResponse> {
        let email = validated_email(&input.email)?;

        let user = match self.store.find_user_by_email(&email).await {
            Ok(u) => u,
            Err(StoreError::NotFound) => {
                return Ok(ForgotPasswordResponse::generic());
            }
            Err(e) => return Err(AppError::internal("failed to create reset token", e)),
        };

        let token = generate_token(TOKEN_BYTES)
            .map_err(|e| AppError::internal("failed to create reset token", e))?;
        let expires_at =
            expiry_after(self.config.reset_ttl_minutes, "failed to create reset token")?;
        self.store
            .create_password_reset(user.id, &token, expires_at)
            .await
            .map_err(|e| AppError::internal("failed to create reset token", e))?;

        info!(user_id = %user.id, "password reset requested");
        Ok(ForgotPasswordResponse {
            token: Some(token),
            expires_at: Some(expires_at),
            ..ForgotPasswordResponse::generic()
        })
    }

    pub async fn reset_password(&self, input: ResetPasswordRequest) -> AppResult<User> {
        let token = input.token.trim();
        if token.is_empty() {
            return Err(AppError::validation("token is required"));
        }
        validated_password(&input.new_password)?;

        let hash = hashed(&input.new_password)?;
        let user = self
            .store
            .consume_password_reset(token, &hash)
            .await
            .map_err(|e| match e {
                StoreError::NotFound => AppError::validation("invalid or expired token"),
                other => AppError::internal("failed to reset password", other),
            })?;

        info!(user_id = %user.id, "password reset");
        Ok(user)
    }

    /// Resolve a bearer token; every failure short of a backend fault is 401.
    pub async fn authenticate(&self, token: &str) -> AppResult<User> {
        if token.is_empty() {
            return Err(AppError::Unauthorized("unauthorized".into()));
        }
        self.store.resolve_session(token).await.map_err(|e| match e {
            StoreError::NotFound => AppError::Unauthorized("unauthorized".into()),
            other => AppError::internal("failed to load session", other),
        })
    }

    pub async fn update_profile(&self, user_id: Uuid, input: UpdateProfileRequest) -> AppResult<User> {
        if input.email.is_none() && input.name.is_none() {
            return Err(AppError::validation("provide email or name"));
        }

        let mut changes = ProfileChanges::default();
        if let Some(raw) = input.email.as_deref() {
            changes.email = Some(validated_email(raw)?);
        }
        if let Some(raw) = input.name.as_deref() {
            let name = raw.trim();
            if name.is_empty() {
                return Err(AppError::validation("name cannot be empty"));
            }
            changes.name = Some(name.to_string());
        }

        let user = self
            .store
            .update_user(user_id, &changes)
            .await
            .map_err(|e| match e {
                StoreError::AlreadyExists => AppError::Conflict("email already exists".into()),
                StoreError::NotFound => AppError::NotFound("user not found".into()),
                other => AppError::internal("failed to update user", other),
            })?;

        info!(user_id = %user.id, "profile updated");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::memory::MemoryUserStore;
    use std::sync::Arc;

    fn register_req(email: &str, password: &str, name: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.into(),
            password: password.into(),
            name: name.into(),
        }
    }

    fn login_req(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.into(),
            password: password.into(),
        }
    }

    #[test]
    fn email_rules() {
        assert_eq!(normalize_email("  A@B.Com "), "a@b.com");
        assert!(is_valid_email("a@b"));
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("ab.com"));
    }

    #[tokio::test]
    async fn register_normalizes_and_rejects_duplicates() {
        let store = MemoryUserStore::new();
        let cfg = AuthConfig::default();
        let svc = AuthService::new(&store, &cfg);

        let user = svc
            .register(register_req("  A@B.com ", "longpassword", " Al "))
            .await
            .unwrap();
        assert_eq!(user.email, "a@b.com");
        assert_eq!(user.name, "Al");

        let err = svc
            .register(register_req("a@b.com", "otherpassword", "Al"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn register_validates_input() {
        let store = MemoryUserStore::new();
        let cfg = AuthConfig::default();
        let svc = AuthService::new(&store, &cfg);

        for (req, expected) in [
            (register_req("nope", "longpassword", "Al"), "invalid email"),
            (register_req("   ", "longpassword", "Al"), "invalid email"),
            (register_req("a@b.com", "longpassword", "   "), "name is required"),
            (register_req("a@b.com", "short", "Al"), "password too short"),
        ] {
            match svc.register(req).await {
                Err(AppError::Validation(msg)) => assert_eq!(msg, expected),
                other => panic!("expected validation error, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn login_masks_unknown_email() {
        let store = MemoryUserStore::new();
        let cfg = AuthConfig::default();
        let svc = AuthService::new(&store, &cfg);
        svc.register(register_req("a@b.com", "longpassword", "Al"))
            .await
            .unwrap();

        let unknown = svc.login(login_req("x@y.com", "longpassword")).await.unwrap_err();
        let wrong = svc.login(login_req("a@b.com", "wrongpassword")).await.unwrap_err();
        assert_eq!(unknown.status(), wrong.status());
        assert_eq!(unknown.to_string(), wrong.to_string());
        assert_eq!(unknown.to_string(), "invalid credentials");
    }

    #[tokio::test]
    async fn unusable_stored_hash_rejects_like_wrong_password() {
        let store = MemoryUserStore::new();
        let cfg = AuthConfig::default();
        let svc = AuthService::new(&store, &cfg);
        store
            .create_user("a@b.com", "Al", "not-a-phc-string")
            .await
            .unwrap();

        let err = svc.login(login_req("a@b.com", "longpassword")).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
        assert_eq!(err.to_string(), "invalid credentials");
    }

    #[tokio::test]
    async fn oversized_ttls_are_internal_errors() {
        let store = MemoryUserStore::new();
        let cfg = AuthConfig {
            session_ttl_minutes: i64::MAX,
            reset_ttl_minutes: i64::MAX / 60,
        };
        let svc = AuthService::new(&store, &cfg);
        svc.register(register_req("a@b.com", "longpassword", "Al"))
            .await
            .unwrap();

        let err = svc.login(login_req("a@b.com", "longpassword")).await.unwrap_err();
        assert!(matches!(err, AppError::Internal { .. }));
        assert_eq!(err.to_string(), "failed to create session");

        let err = svc
            .forgot_password(ForgotPasswordRequest { email: "a@b.com".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Internal { .. }));
        assert_eq!(err.to_string(), "failed to create reset token");
    }

    #[tokio::test]
    async fn login_issues_resolvable_session() {
        let store = MemoryUserStore::new();
        let cfg = AuthConfig::default();
        let svc = AuthService::new(&store, &cfg);
        let user = svc
            .register(register_req("a@b.com", "longpassword", "Al"))
            .await
            .unwrap();

        let res = svc.login(login_req("A@B.COM ", "longpassword")).await.unwrap();
        assert_eq!(res.session.token.len(), TOKEN_BYTES * 2);
        assert!(res.session.expires_at > OffsetDateTime::now_utc() + Duration::hours(23));
        let me = svc.authenticate(&res.session.token).await.unwrap();
        assert_eq!(me.id, user.id);
    }

    #[tokio::test]
    async fn expired_session_is_unauthorized() {
        let store = MemoryUserStore::new();
        let cfg = AuthConfig {
            session_ttl_minutes: -1,
            ..AuthConfig::default()
        };
        let svc = AuthService::new(&store, &cfg);
        svc.register(register_req("a@b.com", "longpassword", "Al"))
            .await
            .unwrap();
        let res = svc.login(login_req("a@b.com", "longpassword")).await.unwrap();

        let expired = svc.authenticate(&res.session.token).await.unwrap_err();
        let unknown = svc.authenticate("deadbeef").await.unwrap_err();
        assert!(matches!(expired, AppError::Unauthorized(_)));
        assert_eq!(expired.to_string(), unknown.to_string());
    }

    #[tokio::test]
    async fn forgot_password_does_not_reveal_accounts() {
        let store = MemoryUserStore::new();
        let cfg = AuthConfig::default();
        let svc = AuthService::new(&store, &cfg);
        svc.register(register_req("a@b.com", "longpassword", "Al"))
            .await
            .unwrap();

        let known = svc
            .forgot_password(ForgotPasswordRequest { email: "a@b.com".into() })
            .await
            .unwrap();
        let unknown = svc
            .forgot_password(ForgotPasswordRequest { email: "x@y.com".into() })
            .await
            .unwrap();
        assert_eq!(known.message, unknown.message);
        assert!(known.token.is_some());
        assert!(unknown.token.is_none());
    }

    #[tokio::test]
    async fn reset_password_swaps_credentials() {
        let store = MemoryUserStore::new();
        let cfg = AuthConfig::default();
        let svc = AuthService::new(&store, &cfg);
        svc.register(register_req("a@b.com", "longpassword", "Al"))
            .await
            .unwrap();
        let token = svc
            .forgot_password(ForgotPasswordRequest { email: "a@b.com".into() })
            .await
            .unwrap()
            .token
            .unwrap();

        svc.reset_password(ResetPasswordRequest {
            token: token.clone(),
            new_password: "newlongpw".into(),
        })
        .await
        .unwrap();

        assert!(svc.login(login_req("a@b.com", "longpassword")).await.is_err());
        assert!(svc.login(login_req("a@b.com", "newlongpw")).await.is_ok());

        let reused = svc
            .reset_password(ResetPasswordRequest {
                token,
                new_password: "thirdlongpw".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(reused.to_string(), "invalid or expired token");
        assert!(matches!(reused, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn concurrent_resets_apply_once() {
        let store: Arc<dyn UserStore> = Arc::new(MemoryUserStore::new());
        let cfg = Arc::new(AuthConfig::default());
        let svc = AuthService::new(store.as_ref(), &cfg);
        svc.register(register_req("a@b.com", "longpassword", "Al"))
            .await
            .unwrap();
        let token = svc
            .forgot_password(ForgotPasswordRequest { email: "a@b.com".into() })
            .await
            .unwrap()
            .token
            .unwrap();

        let attempts = ["firstnewpw", "secondnewpw"].map(|pw| {
            let store = store.clone();
            let cfg = cfg.clone();
            let token = token.clone();
            tokio::spawn(async move {
                AuthService::new(store.as_ref(), &cfg)
                    .reset_password(ResetPasswordRequest {
                        token,
                        new_password: pw.into(),
                    })
                    .await
                    .map(|_| pw)
            })
        });

        let mut winners = Vec::new();
        let mut losers = 0;
        for handle in attempts {
            match handle.await.unwrap() {
                Ok(pw) => winners.push(pw),
                Err(AppError::Validation(msg)) => {
                    assert_eq!(msg, "invalid or expired token");
                    losers += 1;
                }
                Err(other) => panic!("unexpected error {other:?}"),
            }
        }
        assert_eq!(winners.len(), 1);
        assert_eq!(losers, 1);
        assert!(svc.login(login_req("a@b.com", winners[0])).await.is_ok());
    }

    #[tokio::test]
    async fn update_profile_requires_a_field() {
        let store = MemoryUserStore::new();
        let cfg = AuthConfig::default();
        let svc = AuthService::new(&store, &cfg);
        let user = svc
            .register(register_req("a@b.com", "longpassword", "Al"))
            .await
            .unwrap();

        let err = svc
            .update_profile(user.id, UpdateProfileRequest { email: None, name: None })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "provide email or name");

        let err = svc
            .update_profile(
                user.id,
                UpdateProfileRequest {
                    email: Some("B@C.com".into()),
                    name: Some("  ".into()),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "name cannot be empty");

        let updated = svc
            .update_profile(
                user.id,
                UpdateProfileRequest {
                    email: Some(" B@C.com".into()),
                    name: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.email, "b@c.com");
        assert_eq!(updated.name, "Al");
    }
}
