use base64::{engine::general_purpose, Engine};
use jsonwebtoken::{
    decode, encode, get_current_timestamp, DecodingKey, EncodingKey, Header, Validation,
};
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use sqlx::{query, query_scalar, SqlitePool};
use tower_cookies::{cookie::SameSite, Cookie, Cookies};

use crate::{db, error::AppError, model::CurrentUser};

pub const SESSION_COOKIE: &str = "todo_session";

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    sid: String,
    iat: u64,
    exp: u64,
}

// A token only resolves while its `sessions` row exists
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: u64,
    rng: SystemRandom,
}

impl SessionKeys {
    pub fn new(secret: &str, ttl_hours: u64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_secs: ttl_hours.saturating_mul(3600),
            rng: SystemRandom::new(),
        }
    }

    pub async fn establish(&self, pool: &SqlitePool, user_id: i64) -> Result<String, AppError> {
        let mut id = [0u8; 32];
        self.rng.fill(&mut id).map_err(|_| AppError::Crypto)?;
        let sid = general_purpose::URL_SAFE_NO_PAD.encode(id);

        let iat = get_current_timestamp();
        let exp = iat + self.ttl_secs;

        let expired = query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(iat as i64)
            .execute(pool)
            .await?
            .rows_affected();
        if expired > 0 {
            tracing::debug!(expired, "purged expired sessions");
        }

        query("INSERT INTO sessions (id, user_id, expires_at) VALUES (?, ?, ?)")
            .bind(&sid)
            .bind(user_id)
            .bind(exp as i64)
            .execute(pool)
            .await?;

        let claims = Claims {
            sub: user_id.to_string(),
            sid,
            iat,
            exp,
        };
        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    // Forged, expired and revoked tokens yield `None`
    pub async fn resolve(
        &self,
        pool: &SqlitePool,
        token: &str,
    ) -> Result<Option<CurrentUser>, AppError> {
        let Ok(data) = decode::<Claims>(token, &self.decoding, &Validation::default()) else {
            return Ok(None);
        };
        let Ok(user_id) = data.claims.sub.parse::<i64>() else {
            return Ok(None);
        };

        let live = query_scalar::<_, i64>(
            "SELECT user_id FROM sessions WHERE id = ? AND user_id = ? AND expires_at > ?",
        )
        .bind(&data.claims.sid)
        .bind(user_id)
        .bind(get_current_timestamp() as i64)
        .fetch_optional(pool)
        .await?;
        if live.is_none() {
            return Ok(None);
        }

        Ok(db::find_user(pool, user_id)
            .await?
            .map(|user| CurrentUser::from(&user)))
    }

    pub async fn teardown(&self, pool: &SqlitePool, token: &str) -> Result<(), AppError> {
        let mut validation = Validation::default();
        validation.validate_exp = false;

        if let Ok(data) = decode::<Claims>(token, &self.decoding, &validation) {
            query("DELETE FROM sessions WHERE id = ?")
                .bind(&data.claims.sid)
                .execute(pool)
                .await?;
        }
        Ok(())
    }
}

pub fn set_cookie(cookies: &Cookies, token: String) {
    let mut cookie = Cookie::new(SESSION_COOKIE, token);
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_path("/");
    cookies.add(cookie);
}

pub fn clear_cookie(cookies: &Cookies) {
    let mut cookie = Cookie::new(SESSION_COOKIE, "");
    cookie.set_path("/");
    cookies.remove(cookie);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{insert_user, tests::test_pool};

    #[tokio::test]
    async fn establish_then_resolve() {
        let pool = test_pool().await;
        let user = insert_user(&pool, "a@x.com", "hash").await.unwrap();
        let keys = SessionKeys::new("secret", 1);

        let token = keys.establish(&pool, user.id).await.unwrap();
        let resolved = keys.resolve(&pool, &token).await.unwrap();

        assert_eq!(
            resolved,
            Some(CurrentUser {
                id: user.id,
                email: "a@x.com".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn teardown_revokes_token() {
        let pool = test_pool().await;
        let user = insert_user(&pool, "a@x.com", "hash").await.unwrap();
        let keys = SessionKeys::new("secret", 1);

        let token = keys.establish(&pool, user.id).await.unwrap();
        keys.teardown(&pool, &token).await.unwrap();

        assert!(keys.resolve(&pool, &token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn establish_purges_expired_sessions() {
        let pool = test_pool().await;
        let user = insert_user(&pool, "a@x.com", "hash").await.unwrap();
        query("INSERT INTO sessions (id, user_id, expires_at) VALUES ('stale', ?, ?)")
            .bind(user.id)
            .bind(get_current_timestamp() as i64 - 60)
            .execute(&pool)
            .await
            .unwrap();

        let keys = SessionKeys::new("secret", 1);
        let token = keys.establish(&pool, user.id).await.unwrap();

        let ids = query_scalar::<_, String>("SELECT id FROM sessions")
            .fetch_all(&pool)
            .await
            .unwrap();
        assert_eq!(ids.len(), 1);
        assert_ne!(ids[0], "stale");
        assert!(keys.resolve(&pool, &token).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn foreign_signature_is_rejected() {
        let pool = test_pool().await;
        let user = insert_user(&pool, "a@x.com", "hash").await.unwrap();
        let token = SessionKeys::new("other-secret", 1)
            .establish(&pool, user.id)
            .await
            .unwrap();

        let keys = SessionKeys::new("secret", 1);
        assert!(keys.resolve(&pool, &token).await.unwrap().is_none());
        assert!(keys.resolve(&pool, "not-a-token").await.unwrap().is_none());
    }
}
