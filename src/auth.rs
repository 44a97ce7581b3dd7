//! HTTP Basic Authentication for the admin API

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::sync::Arc;

/// Authentication configuration
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    /// Username for the admin API (None = admin API disabled)
    pub username: Option<String>,
    pub password: Option<String>,
}

impl AuthConfig {
    /// Load auth config from environment variables.
    /// ADMIN_USERNAME and ADMIN_PASSWORD must both be set to enable the admin API.
    pub fn from_env() -> Self {
        let username = crate::config::non_empty_var("ADMIN_USERNAME");
        let password = crate::config::non_empty_var("ADMIN_PASSWORD");

        if username.is_some() && password.is_some() {
            tracing::info!("Admin API enabled");
            Self { username, password }
        } else {
            if username.is_some() || password.is_some() {
                tracing::warn!(
                    "ADMIN_USERNAME and ADMIN_PASSWORD must both be set to enable the admin API"
                );
            }
            tracing::info!("Admin API disabled");
            Self::default()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }

    /// Validate credentials; always false while disabled
    pub fn validate(&self, username: &str, password: &str) -> bool {
        match (&self.username, &self.password) {
            (Some(u), Some(p)) => {
                constant_time_eq(u.as_bytes(), username.as_bytes())
                    && constant_time_eq(p.as_bytes(), password.as_bytes())
            }
            _ => false,
        }
    }

    /// Check a request's `Authorization: Basic ...` header
    pub fn authorized(&self, headers: &HeaderMap) -> bool {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Basic "))
            .and_then(|encoded| STANDARD.decode(encoded.trim()).ok())
            .and_then(|decoded| String::from_utf8(decoded).ok())
            .is_some_and(|credentials| match credentials.split_once(':') {
                Some((username, password)) => self.validate(username, password),
                None => false,
            })
    }
}

/// Constant-time byte comparison
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

/// Middleware guarding the admin routes. Room exports carry the prompts, so
/// the routes stay closed unless credentials are configured.
pub async fn admin_auth_middleware(
    State(auth_config): State<Arc<AuthConfig>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !auth_config.is_enabled() {
        tracing::warn!(
            path = %request.uri().path(),
            "Admin API request refused; set ADMIN_USERNAME and ADMIN_PASSWORD to enable it"
        );
        return (StatusCode::FORBIDDEN, "Admin API disabled").into_response();
    }

    if auth_config.authorized(request.headers()) {
        return next.run(request).await;
    }

    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, "Basic realm=\"PicDuel Admin\"")],
        "Unauthorized",
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn enabled() -> AuthConfig {
        AuthConfig {
            username: Some("admin".to_string()),
            password: Some("secret".to_string()),
        }
    }

    fn basic(credentials: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let value = format!("Basic {}", STANDARD.encode(credentials));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(&value).unwrap());
        headers
    }

    #[test]
    fn test_disabled_config_rejects_everything() {
        let config = AuthConfig {
            username: Some("admin".to_string()),
            password: None,
        };
        assert!(!config.is_enabled());
        assert!(!config.validate("admin", ""));
        assert!(!AuthConfig::default().authorized(&basic("admin:secret")));
    }

    #[test]
    fn test_validate() {
        let config = enabled();
        assert!(config.validate("admin", "secret"));
        assert!(!config.validate("admin", "wrong"));
        assert!(!config.validate("wrong", "secret"));
        assert!(!config.validate("", ""));
    }

    #[test]
    fn test_authorization_header() {
        let config = enabled();
        assert!(config.authorized(&basic("admin:secret")));
        assert!(!config.authorized(&basic("admin:nope")));
        assert!(!config.authorized(&basic("no-colon")));
        assert!(!config.authorized(&HeaderMap::new()));

        let mut bearer = HeaderMap::new();
        bearer.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert!(!config.authorized(&bearer));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"hello", b"hello"));
        assert!(!constant_time_eq(b"hello", b"world"));
        assert!(!constant_time_eq(b"hello", b"hell"));
        assert!(constant_time_eq(b"", b""));
    }
}
