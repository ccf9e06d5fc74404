//! Token issuance, verification and access checks.

use std::sync::Arc;

use chrono::{Duration, Utc};
use cutaway_common::{AppError, AppResult, config::AuthConfig};
use cutaway_db::{
    Session,
    entities::user,
    repositories::{UserLookupKey, UserRepository},
};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

const INVALID_CREDENTIALS: &str = "Could not validate credentials";

/// Signs and checks bearer tokens.
pub trait TokenService: Send + Sync {
    /// Issue a token for `subject`, valid for `ttl`.
    fn issue(&self, subject: &str, ttl: Duration) -> AppResult<String>;

    /// Verify a token and return its subject.
    fn verify(&self, token: &str) -> AppResult<String>;
}

/// JWT claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Username of the token owner.
    pub sub: String,
    /// Issued at (unix seconds).
    pub iat: i64,
    /// Expires at (unix seconds).
    pub exp: i64,
}

/// HS256 JWT implementation of [`TokenService`].
pub struct JwtTokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtTokenService {
    /// Create a token service signing with `secret`.
    #[must_use]
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

impl TokenService for JwtTokenService {
    fn issue(&self, subject: &str, ttl: Duration) -> AppResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {e}")))
    }

    fn verify(&self, token: &str) -> AppResult<String> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            tracing::debug!(error = %e, "Rejected bearer token");
            AppError::Unauthorized(INVALID_CREDENTIALS.to_string())
        })?;

        if data.claims.sub.is_empty() {
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        Ok(data.claims.sub)
    }
}

/// Access control: who is calling, and may they do this.
#[derive(Clone)]
pub struct AuthService {
    tokens: Arc<dyn TokenService>,
    token_ttl: Duration,
    delete_passphrase: String,
}

impl AuthService {
    /// Create a new auth service.
    #[must_use]
    pub fn new(tokens: Arc<dyn TokenService>, config: &AuthConfig) -> Self {
        Self {
            tokens,
            token_ttl: Duration::days(config.token_ttl_days),
            delete_passphrase: config.delete_passphrase.clone(),
        }
    }

    /// Exchange an email and an identity-provider proof for an access token.
    ///
    /// The proof is accepted when it is non-empty.
    pub async fn issue_token(&self, session: &Session, email: &str, proof: &str) -> AppResult<String> {
        if email.is_empty() || proof.is_empty() {
            return Err(AppError::Unauthorized(
                "Incorrect email or google token".to_string(),
            ));
        }

        let user = UserRepository::new(session.conn())
            .find(&UserLookupKey::Email(email.to_string()))
            .await?
            .ok_or_else(|| AppError::Unauthorized("This email is not registered".to_string()))?;

        let token = self.tokens.issue(&user.username, self.token_ttl)?;
        tracing::info!(username = %user.username, "Issued access token");

        Ok(token)
    }

    /// Resolve a bearer token to the user it was issued for.
    pub async fn authenticate(&self, session: &Session, token: &str) -> AppResult<user::Model> {
        let username = self.tokens.verify(token)?;

        UserRepository::new(session.conn())
            .find_by_username(&username)
            .await?
            .ok_or_else(|| AppError::Unauthorized(INVALID_CREDENTIALS.to_string()))
    }

    /// Fail unless `current` is the owner of the profile `username`.
    pub fn ensure_owner(current: &user::Model, username: &str) -> AppResult<()> {
        if current.username == username {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "You cannot edit other profiles".to_string(),
            ))
        }
    }

    /// Fail unless `passphrase` is the configured deletion passphrase.
    ///
    /// An empty configured passphrase disables deletion entirely.
    pub fn check_passphrase(&self, passphrase: &str) -> AppResult<()> {
        if !self.delete_passphrase.is_empty() && passphrase == self.delete_passphrase {
            Ok(())
        } else {
            Err(AppError::Forbidden("You are not allowed".to_string()))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use cutaway_db::test_utils::{TestDatabase, new_user};

    fn auth_config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret".to_string(),
            token_ttl_days: 365,
            delete_passphrase: "let-me-delete".to_string(),
        }
    }

    fn auth_service() -> AuthService {
        AuthService::new(Arc::new(JwtTokenService::new("test-secret")), &auth_config())
    }

    #[test]
    fn test_jwt_issue_then_verify() {
        let tokens = JwtTokenService::new("secret");
        let token = tokens.issue("alice", Duration::days(1)).unwrap();
        assert_eq!(tokens.verify(&token).unwrap(), "alice");
    }

    #[test]
    fn test_jwt_rejects_foreign_signature() {
        let token = JwtTokenService::new("one")
            .issue("alice", Duration::days(1))
            .unwrap();
        let result = JwtTokenService::new("two").verify(&token);
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_jwt_rejects_expired_token() {
        let tokens = JwtTokenService::new("secret");
        let token = tokens.issue("alice", Duration::days(-1)).unwrap();
        assert!(matches!(tokens.verify(&token), Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_jwt_rejects_garbage() {
        let tokens = JwtTokenService::new("secret");
        assert!(tokens.verify("not-a-token").is_err());
        assert!(tokens.verify("").is_err());
    }

    #[tokio::test]
    async fn test_issue_token_for_registered_email() {
        let db = TestDatabase::memory().await.unwrap();
        let session = Session::begin(db.connection()).await.unwrap();
        UserRepository::new(session.conn())
            .create(new_user("alice", "alice@x.com"))
            .await
            .unwrap();

        let auth = auth_service();
        let token = auth
            .issue_token(&session, "alice@x.com", "google-proof")
            .await
            .unwrap();

        let user = auth.authenticate(&session, &token).await.unwrap();
        assert_eq!(user.username, "alice");
    }

    #[tokio::test]
    async fn test_issue_token_rejects_empty_proof_and_unknown_email() {
        let db = TestDatabase::memory().await.unwrap();
        let session = Session::begin(db.connection()).await.unwrap();
        UserRepository::new(session.conn())
            .create(new_user("alice", "alice@x.com"))
            .await
            .unwrap();

        let auth = auth_service();
        let empty_proof = auth.issue_token(&session, "alice@x.com", "").await;
        assert!(matches!(empty_proof, Err(AppError::Unauthorized(_))));

        let unknown = auth.issue_token(&session, "bob@x.com", "proof").await;
        assert!(matches!(unknown, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_authenticate_fails_for_deleted_subject() {
        let db = TestDatabase::memory().await.unwrap();
        let session = Session::begin(db.connection()).await.unwrap();
        let alice = UserRepository::new(session.conn())
            .create(new_user("alice", "alice@x.com"))
            .await
            .unwrap();

        let auth = auth_service();
        let token = auth
            .issue_token(&session, "alice@x.com", "proof")
            .await
            .unwrap();

        UserRepository::new(session.conn())
            .delete(alice.id)
            .await
            .unwrap();

        let result = auth.authenticate(&session, &token).await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_ensure_owner() {
        let now = Utc::now();
        let alice = user::Model {
            id: 1,
            google_id: None,
            email: "alice@x.com".to_string(),
            is_active: true,
            username: "alice".to_string(),
            first_name: "Alice".to_string(),
            last_name: "A".to_string(),
            about: None,
            phone: None,
            user_pic: None,
            bg_pic: None,
            created_at: now.into(),
            updated_at: None,
        };

        assert!(AuthService::ensure_owner(&alice, "alice").is_ok());
        assert!(matches!(
            AuthService::ensure_owner(&alice, "bob"),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn test_check_passphrase() {
        let auth = auth_service();
        assert!(auth.check_passphrase("let-me-delete").is_ok());
        assert!(matches!(
            auth.check_passphrase("wrong"),
            Err(AppError::Forbidden(_))
        ));

        let mut config = auth_config();
        config.delete_passphrase = String::new();
        let locked = AuthService::new(Arc::new(JwtTokenService::new("s")), &config);
        assert!(locked.check_passphrase("").is_err());
    }
}
