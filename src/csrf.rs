use base64::{engine::general_purpose, Engine};
use ring::{
    hmac,
    rand::{SecureRandom, SystemRandom},
};
use tower_cookies::{cookie::SameSite, Cookie, Cookies};

use crate::error::AppError;

pub const CSRF_COOKIE: &str = "csrf";
pub const MISSING_TOKEN: &str = "The CSRF token is missing.";
pub const INVALID_TOKEN: &str = "The CSRF token is invalid.";

// Forms carry an HMAC of the random nonce held in the browser's csrf cookie
pub struct CsrfKey {
    key: hmac::Key,
    rng: SystemRandom,
}

impl CsrfKey {
    pub fn new(secret: &str) -> Self {
        Self {
            key: hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes()),
            rng: SystemRandom::new(),
        }
    }

    pub fn sign(&self, nonce: &str) -> String {
        let msg = [b"csrf:".as_slice(), nonce.as_bytes()].concat();
        let signature = hmac::sign(&self.key, &msg);
        general_purpose::URL_SAFE_NO_PAD.encode(signature.as_ref())
    }

    // Token for the next rendered form, creating the nonce cookie on first use
    pub fn issue(&self, cookies: &Cookies) -> Result<String, AppError> {
        if let Some(cookie) = cookies.get(CSRF_COOKIE).filter(|c| !c.value().is_empty()) {
            return Ok(self.sign(cookie.value()));
        }

        let mut bytes = [0u8; 32];
        self.rng.fill(&mut bytes).map_err(|_| AppError::Crypto)?;
        let nonce = general_purpose::URL_SAFE_NO_PAD.encode(bytes);
        let token = self.sign(&nonce);

        let mut cookie = Cookie::new(CSRF_COOKIE, nonce);
        cookie.set_http_only(true);
        cookie.set_same_site(SameSite::Lax);
        cookie.set_path("/");
        cookies.add(cookie);
        Ok(token)
    }

    pub fn guard(&self, cookies: &Cookies) -> CsrfGuard<'_> {
        let nonce = cookies.get(CSRF_COOKIE).map(|cookie| cookie.value().to_string());
        CsrfGuard::new(self, nonce)
    }
}

pub struct CsrfGuard<'a> {
    key: &'a CsrfKey,
    nonce: Option<String>,
}

impl<'a> CsrfGuard<'a> {
    pub fn new(key: &'a CsrfKey, nonce: Option<String>) -> Self {
        Self { key, nonce }
    }

    // None when the submitted token matches the browser's nonce
    pub fn check(&self, token: &str) -> Option<&'static str> {
        let token = token.trim();
        if token.is_empty() {
            return Some(MISSING_TOKEN);
        }
        let Some(nonce) = self.nonce.as_deref().filter(|nonce| !nonce.is_empty()) else {
            return Some(INVALID_TOKEN);
        };
        let Ok(signature) = general_purpose::URL_SAFE_NO_PAD.decode(token) else {
            return Some(INVALID_TOKEN);
        };

        let msg = [b"csrf:".as_slice(), nonce.as_bytes()].concat();
        hmac::verify(&self.key.key, &msg, &signature)
            .err()
            .map(|_| INVALID_TOKEN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_nonce_passes() {
        let key = CsrfKey::new("secret");
        let guard = CsrfGuard::new(&key, Some("nonce".to_string()));
        assert_eq!(guard.check(&key.sign("nonce")), None);
    }

    #[test]
    fn blank_token_is_missing() {
        let key = CsrfKey::new("secret");
        let guard = CsrfGuard::new(&key, Some("nonce".to_string()));
        assert_eq!(guard.check(""), Some(MISSING_TOKEN));
    }

    #[test]
    fn token_must_match_cookie_and_key() {
        let key = CsrfKey::new("secret");
        let token = key.sign("nonce");

        assert_eq!(CsrfGuard::new(&key, None).check(&token), Some(INVALID_TOKEN));
        assert_eq!(
            CsrfGuard::new(&key, Some("other".to_string())).check(&token),
            Some(INVALID_TOKEN)
        );
        assert_eq!(
            CsrfGuard::new(&key, Some("nonce".to_string())).check("%%%"),
            Some(INVALID_TOKEN)
        );

        let foreign = CsrfKey::new("other-secret").sign("nonce");
        assert_eq!(
            CsrfGuard::new(&key, Some("nonce".to_string())).check(&foreign),
            Some(INVALID_TOKEN)
        );
    }
}
