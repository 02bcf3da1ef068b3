//! Basic authentication gate
//!
//! Applied before routing when credentials are configured. Accepts the
//! credential pair from either `Authorization` or `Proxy-Authorization`,
//! and challenges everything else with a 401.

use crate::config::settings::AuthConfig;
use crate::error::{Error, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use hyper::header;
use hyper::{Body, HeaderMap, Response, StatusCode};

#[derive(Debug, Clone)]
pub struct AuthGate {
    credentials: Option<(String, String)>,
}

impl AuthGate {
    /// Build the gate; it is disabled unless both username and password are set
    pub fn from_config(config: &AuthConfig) -> Self {
        let credentials = match (&config.username, &config.password) {
            (Some(username), Some(password)) => Some((username.clone(), password.clone())),
            _ => None,
        };

        Self { credentials }
    }

    pub fn enabled(&self) -> bool {
        self.credentials.is_some()
    }

    /// Verify the request's credentials against the configured pair
    pub fn check(&self, headers: &HeaderMap) -> Result<()> {
        let Some((username, password)) = &self.credentials else {
            return Ok(());
        };

        let header_value = headers
            .get(header::PROXY_AUTHORIZATION)
            .or_else(|| headers.get(header::AUTHORIZATION))
            .ok_or_else(|| Error::Auth("missing credentials".to_string()))?;

        let value = header_value
            .to_str()
            .map_err(|_| Error::Auth("malformed authorization header".to_string()))?;

        let encoded = value
            .strip_prefix("Basic ")
            .ok_or_else(|| Error::Auth("unsupported authentication scheme".to_string()))?;

        let decoded = BASE64
            .decode(encoded.trim())
            .map_err(|_| Error::Auth("invalid base64 encoding".to_string()))?;
        let decoded = String::from_utf8(decoded)
            .map_err(|_| Error::Auth("invalid UTF-8 in credentials".to_string()))?;

        let Some((got_username, got_password)) = decoded.split_once(':') else {
            return Err(Error::Auth("malformed credential pair".to_string()));
        };

        if got_username == username && got_password == password {
            Ok(())
        } else {
            Err(Error::Auth("invalid username or password".to_string()))
        }
    }

    /// The 401 challenge sent when credentials are missing or wrong
    pub fn challenge_response() -> Response<Body> {
        Response::builder()
            .status(StatusCode::UNAUTHORIZED)
            .header(header::WWW_AUTHENTICATE, "Basic realm=\"proxy\"")
            .body(Body::from("Unauthorized: Please provide valid credentials"))
            .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::HeaderValue;

    fn gate() -> AuthGate {
        AuthGate::from_config(&AuthConfig {
            username: Some("admin".to_string()),
            password: Some("secret".to_string()),
        })
    }

    fn headers_with(name: header::HeaderName, value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn disabled_gate_admits_everything() {
        let gate = AuthGate::from_config(&AuthConfig::default());
        assert!(!gate.enabled());
        assert!(gate.check(&HeaderMap::new()).is_ok());
    }

    #[test]
    fn gate_needs_both_username_and_password() {
        let gate = AuthGate::from_config(&AuthConfig {
            username: Some("admin".to_string()),
            password: None,
        });
        assert!(!gate.enabled());
    }

    #[test]
    fn missing_credentials_are_rejected() {
        assert!(matches!(
            gate().check(&HeaderMap::new()),
            Err(Error::Auth(_))
        ));
    }

    #[test]
    fn valid_credentials_pass_via_authorization() {
        let token = BASE64.encode("admin:secret");
        let headers = headers_with(header::AUTHORIZATION, &format!("Basic {}", token));
        assert!(gate().check(&headers).is_ok());
    }

    #[test]
    fn valid_credentials_pass_via_proxy_authorization() {
        let token = BASE64.encode("admin:secret");
        let headers = headers_with(header::PROXY_AUTHORIZATION, &format!("Basic {}", token));
        assert!(gate().check(&headers).is_ok());
    }

    #[test]
    fn wrong_password_is_rejected() {
        let token = BASE64.encode("admin:wrong");
        let headers = headers_with(header::AUTHORIZATION, &format!("Basic {}", token));
        assert!(matches!(gate().check(&headers), Err(Error::Auth(_))));
    }

    #[test]
    fn non_basic_scheme_is_rejected() {
        let headers = headers_with(header::AUTHORIZATION, "Bearer some-token");
        assert!(matches!(gate().check(&headers), Err(Error::Auth(_))));
    }

    #[test]
    fn garbage_base64_is_rejected() {
        let headers = headers_with(header::AUTHORIZATION, "Basic !!not-base64!!");
        assert!(matches!(gate().check(&headers), Err(Error::Auth(_))));
    }

    #[test]
    fn challenge_carries_www_authenticate() {
        let response = AuthGate::challenge_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
    }
}
