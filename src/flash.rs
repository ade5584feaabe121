use base64::{engine::general_purpose, Engine};
use tower_cookies::{Cookie, Cookies};

const FLASH_COOKIE: &str = "flash";

pub fn set(cookies: &Cookies, message: &str) {
    let mut cookie = Cookie::new(FLASH_COOKIE, general_purpose::URL_SAFE_NO_PAD.encode(message));
    cookie.set_http_only(true);
    cookie.set_path("/");
    cookies.add(cookie);
}

// Read and clear the pending message
pub fn take(cookies: &Cookies) -> Option<String> {
    let value = cookies.get(FLASH_COOKIE)?.value().to_string();

    let mut cookie = Cookie::new(FLASH_COOKIE, "");
    cookie.set_path("/");
    cookies.remove(cookie);

    general_purpose::URL_SAFE_NO_PAD
        .decode(value)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
}
