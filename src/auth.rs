use std::num::NonZeroU32;

use base64::{engine::general_purpose, Engine};
use ring::{
    digest, pbkdf2,
    rand::{SecureRandom, SystemRandom},
};
use sqlx::SqlitePool;

use crate::{db, error::AppError, model::User, schema::Credentials};

static ALGORITHM: pbkdf2::Algorithm = pbkdf2::PBKDF2_HMAC_SHA256;
const METHOD: &str = "pbkdf2:sha256";
const SALT_LEN: usize = 16;

// Hashes are stored as `pbkdf2:sha256:<iterations>$<salt b64>$<hash b64>`
#[derive(Clone)]
pub struct PasswordHasher {
    iterations: NonZeroU32,
    rng: SystemRandom,
}

impl PasswordHasher {
    pub fn new(iterations: u32) -> Self {
        Self {
            iterations: NonZeroU32::new(iterations).unwrap_or(NonZeroU32::MIN),
            rng: SystemRandom::new(),
        }
    }

    pub fn hash(&self, password: &str) -> Result<String, AppError> {
        let mut salt = [0u8; SALT_LEN];
        self.rng.fill(&mut salt).map_err(|_| AppError::Crypto)?;

        let mut hash = [0u8; digest::SHA256_OUTPUT_LEN];
        pbkdf2::derive(ALGORITHM, self.iterations, &salt, password.as_bytes(), &mut hash);

        Ok(format!(
            "{METHOD}:{}${}${}",
            self.iterations,
            general_purpose::STANDARD.encode(salt),
            general_purpose::STANDARD.encode(hash)
        ))
    }

    pub fn verify(&self, password: &str, stored: &str) -> bool {
        let Some((iterations, salt, hash)) = parse_hash(stored) else {
            return false;
        };
        pbkdf2::verify(ALGORITHM, iterations, &salt, password.as_bytes(), &hash).is_ok()
    }
}

fn parse_hash(stored: &str) -> Option<(NonZeroU32, Vec<u8>, Vec<u8>)> {
    let mut parts = stored.split('$');
    let iterations = parts.next()?.strip_prefix(METHOD)?.strip_prefix(':')?.parse().ok()?;
    let salt = general_purpose::STANDARD.decode(parts.next()?).ok()?;
    let hash = general_purpose::STANDARD.decode(parts.next()?).ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((iterations, salt, hash))
}

pub async fn register(
    pool: &SqlitePool,
    hasher: &PasswordHasher,
    credentials: &Credentials,
) -> Result<User, AppError> {
    if db::find_user_by_email(pool, &credentials.email).await?.is_some() {
        return Err(AppError::DuplicateEmail);
    }

    let password_hash = hasher.hash(&credentials.password)?;
    let user = db::insert_user(pool, &credentials.email, &password_hash).await?;
    tracing::info!(user_id = user.id, "registered new user");
    Ok(user)
}

pub async fn login(
    pool: &SqlitePool,
    hasher: &PasswordHasher,
    credentials: &Credentials,
) -> Result<User, AppError> {
    let Some(user) = db::find_user_by_email(pool, &credentials.email).await? else {
        tracing::debug!("login attempt for unknown email");
        return Err(AppError::UnknownUser);
    };

    if !hasher.verify(&credentials.password, &user.password) {
        tracing::warn!(user_id = user.id, "login attempt with wrong password");
        return Err(AppError::BadPassword);
    }

    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::test_pool;

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(1_000)
    }

    fn credentials(email: &str, password: &str) -> Credentials {
        Credentials {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn hash_is_salted_and_verifies() {
        let hasher = hasher();
        let first = hasher.hash("pw1").unwrap();
        let second = hasher.hash("pw1").unwrap();

        assert!(first.starts_with("pbkdf2:sha256:1000$"));
        assert!(!first.contains("pw1"));
        assert_ne!(first, second);
        assert!(hasher.verify("pw1", &first));
        assert!(!hasher.verify("pw2", &first));
    }

    #[test]
    fn verify_uses_stored_iterations() {
        let stored = PasswordHasher::new(2_000).hash("pw1").unwrap();
        assert!(hasher().verify("pw1", &stored));
    }

    #[test]
    fn malformed_hash_never_verifies() {
        let hasher = hasher();
        assert!(!hasher.verify("pw1", "pw1"));
        assert!(!hasher.verify("pw1", "pbkdf2:sha256:abc$AAAA$AAAA"));
        assert!(!hasher.verify("pw1", "md5:1$AAAA$AAAA"));
    }

    #[tokio::test]
    async fn register_rejects_existing_email_without_writing() {
        let pool = test_pool().await;
        let hasher = hasher();
        let user = register(&pool, &hasher, &credentials("a@x.com", "pw1")).await.unwrap();

        let err = register(&pool, &hasher, &credentials("a@x.com", "other"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateEmail));

        let stored = db::find_user_by_email(&pool, "a@x.com").await.unwrap().unwrap();
        assert_eq!(stored.id, user.id);
        assert!(hasher.verify("pw1", &stored.password));
    }

    #[tokio::test]
    async fn login_checks_email_then_password() {
        let pool = test_pool().await;
        let hasher = hasher();
        let user = register(&pool, &hasher, &credentials("a@x.com", "pw1")).await.unwrap();

        let err = login(&pool, &hasher, &credentials("nobody@x.com", "pw1"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UnknownUser));

        let err = login(&pool, &hasher, &credentials("a@x.com", "wrong"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadPassword));

        let logged_in = login(&pool, &hasher, &credentials("a@x.com", "pw1")).await.unwrap();
        assert_eq!(logged_in.id, user.id);
    }
}
