//! Authentication and authorization middleware for the streaming API.
//!
//! Reelgate does not design an auth protocol of its own; it consumes a
//! verified identity the same way the rest of the product does: either a
//! bearer API key (programmatic access) or a session cookie issued by
//! `login`. Requests without either are rejected with 401 before any file
//! I/O happens.

use crate::config::AuthConfig;
use crate::server::AppContext;
use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
    Json,
};
use axum_extra::{
    extract::cookie::{Cookie, CookieJar},
    headers::{authorization::Bearer, Authorization},
    typed_header::TypedHeader,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

const SESSION_COOKIE_NAME: &str = "reelgate_session";

/// Login request payload
#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Login response
#[derive(Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
}

/// Session data stored in the cookie
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionData {
    username: String,
    expires_at: u64,
}

impl SessionData {
    fn new(username: &str, timeout_hours: u64) -> Self {
        let expires_at = now_unix() + (timeout_hours * 3600);
        Self {
            username: username.to_string(),
            expires_at,
        }
    }

    fn is_valid(&self) -> bool {
        now_unix() < self.expires_at
    }

    fn encode(&self) -> String {
        let json = serde_json::to_string(self).unwrap_or_default();
        STANDARD.encode(json)
    }

    fn decode(encoded: &str) -> Option<Self> {
        let json = STANDARD.decode(encoded).ok()?;
        serde_json::from_slice(&json).ok()
    }
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Check if authentication is required and valid
fn check_auth(
    auth_config: &AuthConfig,
    bearer_token: Option<&str>,
    session_cookie: Option<&str>,
) -> Result<(), (StatusCode, &'static str)> {
    if !auth_config.enabled {
        return Ok(());
    }

    // Check API key first (for programmatic access)
    if let Some(token) = bearer_token {
        if let Some(ref api_key) = auth_config.api_key {
            if token == api_key {
                return Ok(());
            }
        }
    }

    // Check session cookie (for web UI)
    if let Some(cookie_value) = session_cookie {
        if let Some(session) = SessionData::decode(cookie_value) {
            if session.is_valid() {
                return Ok(());
            }
        }
    }

    Err((StatusCode::UNAUTHORIZED, "Authentication required"))
}

/// Middleware guarding the streaming API
pub async fn auth_middleware(
    State(ctx): State<AppContext>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    jar: CookieJar,
    request: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, &'static str)> {
    let bearer_token = bearer.map(|b| b.token().to_string());
    let session_cookie = jar.get(SESSION_COOKIE_NAME).map(|c| c.value().to_string());

    check_auth(
        &ctx.config.server.auth,
        bearer_token.as_deref(),
        session_cookie.as_deref(),
    )?;

    Ok(next.run(request).await)
}

/// Login handler
pub async fn login(
    State(ctx): State<AppContext>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), (StatusCode, Json<LoginResponse>)> {
    let auth_config = &ctx.config.server.auth;

    // Check if password auth is configured
    let (expected_username, password_hash) =
        match (&auth_config.username, &auth_config.password_hash) {
            (Some(u), Some(h)) => (u, h),
            _ => {
                return Err((
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(LoginResponse {
                        success: false,
                        message: "Authentication not configured".to_string(),
                        expires_at: None,
                    }),
                ));
            }
        };

    let password_ok = bcrypt::verify(&payload.password, password_hash).unwrap_or(false);
    if payload.username != *expected_username || !password_ok {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(LoginResponse {
                success: false,
                message: "Invalid username or password".to_string(),
                expires_at: None,
            }),
        ));
    }

    let session = SessionData::new(&payload.username, auth_config.session_timeout_hours);
    let expires_at = session.expires_at;

    let cookie = Cookie::build((SESSION_COOKIE_NAME, session.encode()))
        .path("/")
        .http_only(true)
        .build();

    Ok((
        jar.add(cookie),
        Json(LoginResponse {
            success: true,
            message: "Logged in".to_string(),
            expires_at: Some(expires_at),
        }),
    ))
}

/// Logout handler: clears the session cookie
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<LoginResponse>) {
    (
        jar.remove(Cookie::build(SESSION_COOKIE_NAME).path("/").build()),
        Json(LoginResponse {
            success: true,
            message: "Logged out".to_string(),
            expires_at: None,
        }),
    )
}

/// Auth status response
#[derive(Serialize)]
pub struct AuthStatus {
    pub auth_enabled: bool,
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// Auth status handler
pub async fn auth_status(State(ctx): State<AppContext>, jar: CookieJar) -> Json<AuthStatus> {
    let auth_config = &ctx.config.server.auth;

    if !auth_config.enabled {
        return Json(AuthStatus {
            auth_enabled: false,
            authenticated: true,
            username: None,
        });
    }

    let session = jar
        .get(SESSION_COOKIE_NAME)
        .and_then(|c| SessionData::decode(c.value()))
        .filter(|s| s.is_valid());

    Json(AuthStatus {
        auth_enabled: true,
        authenticated: session.is_some(),
        username: session.map(|s| s.username),
    })
}

/// Generate a bcrypt hash for the given password
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    Ok(bcrypt::hash(password, bcrypt::DEFAULT_COST)?)
}

/// Generate a random API key for programmatic access
pub fn generate_api_key() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled_config() -> AuthConfig {
        AuthConfig {
            enabled: true,
            api_key: Some("test-key".to_string()),
            username: Some("admin".to_string()),
            password_hash: None,
            session_timeout_hours: 24,
        }
    }

    #[test]
    fn disabled_auth_allows_everything() {
        let config = AuthConfig::default();
        assert!(check_auth(&config, None, None).is_ok());
    }

    #[test]
    fn missing_credentials_are_rejected() {
        let config = enabled_config();
        let err = check_auth(&config, None, None).unwrap_err();
        assert_eq!(err.0, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn valid_api_key_is_accepted() {
        let config = enabled_config();
        assert!(check_auth(&config, Some("test-key"), None).is_ok());
        assert!(check_auth(&config, Some("wrong-key"), None).is_err());
    }

    #[test]
    fn valid_session_cookie_is_accepted() {
        let config = enabled_config();
        let session = SessionData::new("admin", 24);
        assert!(check_auth(&config, None, Some(&session.encode())).is_ok());
    }

    #[test]
    fn expired_session_is_rejected() {
        let config = enabled_config();
        let session = SessionData {
            username: "admin".to_string(),
            expires_at: 0,
        };
        assert!(check_auth(&config, None, Some(&session.encode())).is_err());
    }

    #[test]
    fn garbage_cookie_is_rejected() {
        let config = enabled_config();
        assert!(check_auth(&config, None, Some("not-base64-json")).is_err());
    }

    #[test]
    fn session_round_trip() {
        let session = SessionData::new("viewer", 1);
        let decoded = SessionData::decode(&session.encode()).unwrap();
        assert_eq!(decoded.username, "viewer");
        assert!(decoded.is_valid());
    }

    #[test]
    fn api_keys_are_unique() {
        assert_ne!(generate_api_key(), generate_api_key());
        assert_eq!(generate_api_key().len(), 64);
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("hunter2").unwrap();
        assert!(bcrypt::verify("hunter2", &hash).unwrap());
        assert!(!bcrypt::verify("wrong", &hash).unwrap());
    }
}
