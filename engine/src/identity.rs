//! Registration, login, bearer tokens, and user administration.
//!
//! Passwords are hashed with Argon2id. Tokens are opaque: 32 random bytes,
//! base64url-encoded for the client, stored server-side only as a SHA-256
//! hash, so a leaked token table cannot be replayed.

use crate::ensure_admin;
use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use libreria_core::{
    DomainError, FieldError, Identity, Result, Role, User, UserId,
};
use libreria_store::{types::now, IdentityStore};
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Minimum accepted password length.
const PASSWORD_MIN: usize = 8;

/// Raw registration input.
#[derive(Debug, Clone)]
pub struct RegisterInput {
    /// Display name.
    pub name: String,
    /// Email, unique across users.
    pub email: String,
    /// Plaintext password; hashed before storage.
    pub password: String,
}

/// Raw profile-update input.
#[derive(Debug, Clone)]
pub struct ProfileUpdate {
    /// New display name.
    pub name: String,
    /// New email, unique across users.
    pub email: String,
    /// New plaintext password; absent keeps the current one.
    pub password: Option<String>,
}

/// Login input.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Email.
    pub email: String,
    /// Plaintext password.
    pub password: String,
}

/// A logged-in user together with their fresh bearer token.
#[derive(Debug, Clone)]
pub struct Session {
    /// The authenticated user.
    pub user: User,
    /// Plaintext bearer token. Shown once; only its hash is stored.
    pub token: String,
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| DomainError::internal(format!("hash de contraseña: {e}")))
}

fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash).is_ok_and(|parsed| {
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    })
}

fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn hash_token(token: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(token.as_bytes()))
}

fn validate_registration(input: &RegisterInput) -> Result<(String, String)> {
    let mut errors = Vec::new();

    let name = input.name.trim().to_string();
    if name.is_empty() {
        errors.push(FieldError::new("name", "El nombre es obligatorio"));
    }

    let email = input.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        errors.push(FieldError::new("email", "El email no es válido"));
    }

    if input.password.len() < PASSWORD_MIN {
        errors.push(FieldError::new(
            "password",
            format!("La contraseña debe tener al menos {PASSWORD_MIN} caracteres"),
        ));
    }

    if errors.is_empty() {
        Ok((name, email))
    } else {
        Err(DomainError::InvalidInput { errors })
    }
}

fn validate_profile(input: &ProfileUpdate) -> Result<(String, String)> {
    let mut errors = Vec::new();

    let name = input.name.trim().to_string();
    if name.is_empty() {
        errors.push(FieldError::new("name", "El nombre es obligatorio"));
    }

    let email = input.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        errors.push(FieldError::new("email", "El email no es válido"));
    }

    if let Some(password) = &input.password {
        if password.len() < PASSWORD_MIN {
            errors.push(FieldError::new(
                "password",
                format!("La contraseña debe tener al menos {PASSWORD_MIN} caracteres"),
            ));
        }
    }

    if errors.is_empty() {
        Ok((name, email))
    } else {
        Err(DomainError::InvalidInput { errors })
    }
}

/// Users, sessions, and the admin user-management surface.
#[derive(Clone)]
pub struct IdentityService {
    store: Arc<dyn IdentityStore>,
}

impl IdentityService {
    /// Build the service over a store backend.
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        Self { store }
    }

    /// Register a regular user and open a session.
    pub async fn register(&self, input: RegisterInput) -> Result<Session> {
        self.register_with_role(input, Role::User).await
    }

    /// Register a user with the administrator role. Administrators only.
    pub async fn register_admin(&self, who: &Identity, input: RegisterInput) -> Result<Session> {
        ensure_admin(who)?;
        self.register_with_role(input, Role::Admin).await
    }

    async fn register_with_role(&self, input: RegisterInput, role: Role) -> Result<Session> {
        let user = self.create_with_role(input, role).await?;
        self.open_session(user).await
    }

    async fn create_with_role(&self, input: RegisterInput, role: Role) -> Result<User> {
        let (name, email) = validate_registration(&input)?;
        let user = User {
            id: UserId::new(),
            name,
            email,
            password_hash: hash_password(&input.password)?,
            role,
            avatar: None,
            created_at: now(),
        };
        let user = self.store.create_user(user).await?;
        tracing::info!(user_id = %user.id, role = %user.role, "Usuario registrado");
        Ok(user)
    }

    /// Create the first administrator on an empty deployment.
    ///
    /// Returns `Ok(None)` without touching anything when an administrator
    /// already exists, so it is safe to call on every startup.
    pub async fn bootstrap_admin(&self, input: RegisterInput) -> Result<Option<User>> {
        if self.store.count_admins().await? > 0 {
            return Ok(None);
        }
        let user = self.create_with_role(input, Role::Admin).await?;
        tracing::info!(user_id = %user.id, email = %user.email, "Administrador inicial creado");
        Ok(Some(user))
    }

    /// Update the caller's own name, email, and optionally password.
    ///
    /// Email uniqueness is re-validated by the store; the password hash is
    /// replaced only when a new password is supplied.
    pub async fn update_profile(&self, who: &Identity, input: ProfileUpdate) -> Result<User> {
        let (name, email) = validate_profile(&input)?;
        let mut user = self.store.get_user(who.user_id).await?;
        user.name = name;
        user.email = email;
        if let Some(password) = &input.password {
            user.password_hash = hash_password(password)?;
        }
        let user = self.store.update_user(user).await?;
        tracing::info!(user_id = %user.id, "Perfil actualizado");
        Ok(user)
    }

    /// Verify credentials and open a session.
    ///
    /// Unknown email and wrong password are indistinguishable to the
    /// caller.
    pub async fn login(&self, credentials: Credentials) -> Result<Session> {
        let email = credentials.email.trim().to_lowercase();
        let user = match self.store.get_user_by_email(&email).await {
            Ok(user) => user,
            Err(DomainError::NotFound { .. }) => return Err(DomainError::InvalidCredentials),
            Err(other) => return Err(other),
        };
        if !verify_password(&credentials.password, &user.password_hash) {
            return Err(DomainError::InvalidCredentials);
        }
        tracing::info!(user_id = %user.id, "Sesión iniciada");
        self.open_session(user).await
    }

    async fn open_session(&self, user: User) -> Result<Session> {
        let token = generate_token();
        self.store.insert_token(user.id, hash_token(&token)).await?;
        Ok(Session { user, token })
    }

    /// Invalidate every token of the caller.
    pub async fn logout(&self, who: &Identity) -> Result<()> {
        self.store.delete_tokens(who.user_id).await?;
        tracing::info!(user_id = %who.user_id, "Sesión cerrada");
        Ok(())
    }

    /// Resolve a bearer token to its user, or `Unauthenticated`.
    pub async fn authenticate(&self, token: &str) -> Result<User> {
        self.store.user_by_token_hash(&hash_token(token)).await
    }

    /// Fetch the caller's own profile.
    pub async fn me(&self, who: &Identity) -> Result<User> {
        self.store.get_user(who.user_id).await
    }

    /// List all users. Administrators only.
    pub async fn list_users(&self, who: &Identity) -> Result<Vec<User>> {
        ensure_admin(who)?;
        self.store.list_users().await
    }

    /// Delete a user. Administrators only.
    ///
    /// Two guards: an administrator may not delete their own account, and
    /// the last remaining administrator may not be deleted by anyone.
    pub async fn delete_user(&self, who: &Identity, target: UserId) -> Result<User> {
        ensure_admin(who)?;
        if target == who.user_id {
            return Err(DomainError::forbidden("No puedes eliminar tu propia cuenta"));
        }
        let user = self.store.get_user(target).await?;
        if user.role == Role::Admin && self.store.count_admins().await? <= 1 {
            return Err(DomainError::forbidden(
                "No se puede eliminar el último administrador",
            ));
        }
        let user = self.store.delete_user(target).await?;
        tracing::info!(user_id = %user.id, email = %user.email, "Usuario eliminado");
        Ok(user)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use libreria_store::MemoryStore;

    fn service() -> IdentityService {
        IdentityService::new(Arc::new(MemoryStore::new()))
    }

    fn input(email: &str) -> RegisterInput {
        RegisterInput {
            name: "Ana".to_string(),
            email: email.to_string(),
            password: "contraseña-larga".to_string(),
        }
    }

    fn identity_of(user: &User) -> Identity {
        Identity::new(user.id, user.role)
    }

    #[tokio::test]
    async fn register_then_login_round_trip() {
        let svc = service();
        let session = svc.register(input("ana@ejemplo.com")).await.expect("register");
        assert_eq!(session.user.role, Role::User);
        assert_ne!(session.user.password_hash, "contraseña-larga");

        let session = svc
            .login(Credentials {
                email: "ana@ejemplo.com".to_string(),
                password: "contraseña-larga".to_string(),
            })
            .await
            .expect("login");
        let user = svc.authenticate(&session.token).await.expect("token resolves");
        assert_eq!(user.email, "ana@ejemplo.com");
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_look_the_same() {
        let svc = service();
        svc.register(input("ana@ejemplo.com")).await.expect("register");

        let wrong = svc
            .login(Credentials {
                email: "ana@ejemplo.com".to_string(),
                password: "incorrecta!".to_string(),
            })
            .await
            .expect_err("rejected");
        let unknown = svc
            .login(Credentials {
                email: "nadie@ejemplo.com".to_string(),
                password: "contraseña-larga".to_string(),
            })
            .await
            .expect_err("rejected");
        assert_eq!(wrong, DomainError::InvalidCredentials);
        assert_eq!(unknown, DomainError::InvalidCredentials);
    }

    #[tokio::test]
    async fn duplicate_email_is_a_field_error() {
        let svc = service();
        svc.register(input("ana@ejemplo.com")).await.expect("register");
        let err = svc
            .register(input("ana@ejemplo.com"))
            .await
            .expect_err("duplicate rejected");
        match err {
            DomainError::InvalidInput { errors } => {
                assert_eq!(errors[0].field, "email");
                assert_eq!(errors[0].message, "Este email ya está registrado");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn short_password_is_rejected() {
        let svc = service();
        let err = svc
            .register(RegisterInput {
                password: "corta".to_string(),
                ..input("ana@ejemplo.com")
            })
            .await
            .expect_err("rejected");
        assert!(matches!(err, DomainError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn logout_invalidates_every_token() {
        let svc = service();
        let session = svc.register(input("ana@ejemplo.com")).await.expect("register");
        let who = identity_of(&session.user);

        svc.logout(&who).await.expect("logout");
        let err = svc.authenticate(&session.token).await.expect_err("stale token");
        assert_eq!(err, DomainError::Unauthenticated);
    }

    #[tokio::test]
    async fn admin_registration_requires_admin() {
        let svc = service();
        let session = svc.register(input("ana@ejemplo.com")).await.expect("register");
        let who = identity_of(&session.user);

        let err = svc
            .register_admin(&who, input("eva@ejemplo.com"))
            .await
            .expect_err("non-admin rejected");
        assert!(matches!(err, DomainError::Forbidden { .. }));
    }

    #[tokio::test]
    async fn profile_update_changes_email_and_password() {
        let svc = service();
        let session = svc.register(input("ana@ejemplo.com")).await.expect("register");
        let who = identity_of(&session.user);

        let user = svc
            .update_profile(
                &who,
                ProfileUpdate {
                    name: "Ana María".to_string(),
                    email: "ana.maria@ejemplo.com".to_string(),
                    password: Some("otra-contraseña".to_string()),
                },
            )
            .await
            .expect("update");
        assert_eq!(user.name, "Ana María");
        assert_eq!(user.email, "ana.maria@ejemplo.com");

        // Old credentials are gone, new ones work.
        let err = svc
            .login(Credentials {
                email: "ana@ejemplo.com".to_string(),
                password: "contraseña-larga".to_string(),
            })
            .await
            .expect_err("old email rejected");
        assert_eq!(err, DomainError::InvalidCredentials);
        svc.login(Credentials {
            email: "ana.maria@ejemplo.com".to_string(),
            password: "otra-contraseña".to_string(),
        })
        .await
        .expect("new credentials accepted");
    }

    #[tokio::test]
    async fn profile_update_keeps_password_when_absent() {
        let svc = service();
        let session = svc.register(input("ana@ejemplo.com")).await.expect("register");
        let who = identity_of(&session.user);

        svc.update_profile(
            &who,
            ProfileUpdate {
                name: "Ana".to_string(),
                email: "ana@ejemplo.com".to_string(),
                password: None,
            },
        )
        .await
        .expect("update");

        svc.login(Credentials {
            email: "ana@ejemplo.com".to_string(),
            password: "contraseña-larga".to_string(),
        })
        .await
        .expect("password unchanged");
    }

    #[tokio::test]
    async fn profile_update_rejects_taken_email() {
        let svc = service();
        svc.register(input("ana@ejemplo.com")).await.expect("register");
        let session = svc.register(input("eva@ejemplo.com")).await.expect("register");
        let who = identity_of(&session.user);

        let err = svc
            .update_profile(
                &who,
                ProfileUpdate {
                    name: "Eva".to_string(),
                    email: "ana@ejemplo.com".to_string(),
                    password: None,
                },
            )
            .await
            .expect_err("duplicate rejected");
        match err {
            DomainError::InvalidInput { errors } => {
                assert_eq!(errors[0].field, "email");
                assert_eq!(errors[0].message, "Este email ya está registrado");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        // Keeping one's own email is not a collision.
        svc.update_profile(
            &who,
            ProfileUpdate {
                name: "Eva".to_string(),
                email: "eva@ejemplo.com".to_string(),
                password: None,
            },
        )
        .await
        .expect("own email kept");
    }

    #[tokio::test]
    async fn bootstrap_admin_runs_only_on_empty_deployments() {
        let svc = service();
        let created = svc
            .bootstrap_admin(input("root@ejemplo.com"))
            .await
            .expect("bootstrap");
        let user = created.expect("first call creates the admin");
        assert_eq!(user.role, Role::Admin);

        let repeat = svc
            .bootstrap_admin(input("otro@ejemplo.com"))
            .await
            .expect("bootstrap is idempotent");
        assert!(repeat.is_none());
    }

    #[tokio::test]
    async fn self_deletion_is_forbidden() {
        let store = Arc::new(MemoryStore::new());
        let svc = IdentityService::new(store);
        let admin = seed_admin(&svc, "root@ejemplo.com").await;

        let err = svc
            .delete_user(&admin, admin.user_id)
            .await
            .expect_err("self-delete rejected");
        assert_eq!(
            err,
            DomainError::forbidden("No puedes eliminar tu propia cuenta")
        );
    }

    #[tokio::test]
    async fn last_admin_cannot_be_deleted() {
        let svc = service();
        let only_admin = seed_admin(&svc, "root@ejemplo.com").await;

        // A different admin identity tries to delete the sole stored admin.
        let other = Identity::new(UserId::new(), Role::Admin);
        let err = svc
            .delete_user(&other, only_admin.user_id)
            .await
            .expect_err("last admin protected");
        assert_eq!(
            err,
            DomainError::forbidden("No se puede eliminar el último administrador")
        );
    }

    #[tokio::test]
    async fn spare_admin_may_be_deleted() {
        let svc = service();
        let first = seed_admin(&svc, "root@ejemplo.com").await;
        let second = seed_admin_by(&svc, &first, "segundo@ejemplo.com").await;

        let deleted = svc
            .delete_user(&first, second.user_id)
            .await
            .expect("deleting a spare admin works");
        assert_eq!(deleted.email, "segundo@ejemplo.com");
    }

    async fn seed_admin(svc: &IdentityService, email: &str) -> Identity {
        // First admin is bootstrapped through a synthetic admin identity.
        let bootstrap = Identity::new(UserId::new(), Role::Admin);
        let session = svc
            .register_admin(&bootstrap, input(email))
            .await
            .expect("admin registered");
        identity_of(&session.user)
    }

    async fn seed_admin_by(svc: &IdentityService, who: &Identity, email: &str) -> Identity {
        let session = svc
            .register_admin(who, input(email))
            .await
            .expect("admin registered");
        identity_of(&session.user)
    }
}
