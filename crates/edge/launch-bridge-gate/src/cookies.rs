//! Cookie construction for the state cookie and the session cookie.

use axum::http::HeaderMap;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use launch_bridge_core::{SessionGrant, StateCookieConfig};

const FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Whether the request reached the edge over https.
pub fn request_is_https(headers: &HeaderMap) -> bool {
    headers
        .get(FORWARDED_PROTO)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .is_some_and(|proto| proto.trim().eq_ignore_ascii_case("https"))
}

fn bridge_cookie(name: String, value: String, max_age_seconds: i64, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::seconds(max_age_seconds))
        .build()
}

pub fn set_state_cookie(
    jar: CookieJar,
    config: &StateCookieConfig,
    token: String,
    secure: bool,
) -> CookieJar {
    let max_age = i64::try_from(config.ttl_seconds).unwrap_or(i64::MAX);
    jar.add(bridge_cookie(config.name.clone(), token, max_age, secure))
}

/// Schedule deletion of the state cookie: same name and path, `Max-Age=0`.
pub fn clear_state_cookie(jar: CookieJar, config: &StateCookieConfig, secure: bool) -> CookieJar {
    jar.add(bridge_cookie(config.name.clone(), String::new(), 0, secure))
}

pub fn set_session_cookie(jar: CookieJar, grant: SessionGrant, secure: bool) -> CookieJar {
    let max_age = i64::try_from(grant.max_age_seconds).unwrap_or(i64::MAX);
    jar.add(bridge_cookie(grant.cookie_name, grant.cookie_value, max_age, secure))
}

pub fn clear_cookie(jar: CookieJar, name: &str, secure: bool) -> CookieJar {
    jar.add(bridge_cookie(name.to_string(), String::new(), 0, secure))
}
