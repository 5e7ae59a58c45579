//! Control endpoint authentication.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};

use super::{ControlError, ControlState};

/// Marker placed on requests that arrived over the mutual-TLS listener.
///
/// The TLS verifier rejects handshakes without a valid client certificate,
/// so its presence means the peer was authenticated by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientCertificate;

/// Which credentials a control request must carry.
#[derive(Debug, Clone, Default)]
pub struct AuthPolicy {
    bearer_token: Option<String>,
    require_client_cert: bool,
}

impl AuthPolicy {
    pub fn new(bearer_token: Option<String>, require_client_cert: bool) -> Self {
        Self {
            bearer_token: bearer_token.filter(|token| !token.is_empty()),
            require_client_cert,
        }
    }

    /// No credentials configured: every request is accepted.
    pub fn is_open(&self) -> bool {
        self.bearer_token.is_none() && !self.require_client_cert
    }

    pub fn check(&self, headers: &HeaderMap, client_cert: Option<&ClientCertificate>) -> Result<(), ControlError> {
        if self.require_client_cert && client_cert.is_none() {
            return Err(ControlError::Unauthorized("client certificate required"));
        }

        if let Some(expected) = &self.bearer_token {
            let presented = headers
                .get(AUTHORIZATION)
                .and_then(|h| h.to_str().ok())
                .and_then(|value| value.strip_prefix("Bearer "))
                .ok_or(ControlError::Unauthorized("missing bearer token"))?;
            if !constant_time_eq(presented.as_bytes(), expected.as_bytes()) {
                return Err(ControlError::Unauthorized("invalid bearer token"));
            }
        }

        Ok(())
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b) {
        diff |= x ^ y;
    }
    diff == 0
}

pub async fn require_auth(
    State(state): State<ControlState>,
    request: Request,
    next: Next,
) -> Result<Response, ControlError> {
    let client_cert = request.extensions().get::<ClientCertificate>();
    if let Err(err) = state.auth.check(request.headers(), client_cert) {
        tracing::warn!(error = %err, "Rejected control request");
        return Err(err);
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {token}")).unwrap());
        headers
    }

    #[test]
    fn test_open_policy_accepts_anything() {
        let policy = AuthPolicy::new(None, false);
        assert!(policy.is_open());
        assert!(policy.check(&HeaderMap::new(), None).is_ok());
    }

    #[test]
    fn test_bearer_token() {
        let policy = AuthPolicy::new(Some("s3cret".into()), false);
        assert!(!policy.is_open());
        assert!(policy.check(&bearer("s3cret"), None).is_ok());
        assert!(matches!(
            policy.check(&bearer("s3cres"), None),
            Err(ControlError::Unauthorized("invalid bearer token"))
        ));
        assert!(matches!(
            policy.check(&HeaderMap::new(), None),
            Err(ControlError::Unauthorized("missing bearer token"))
        ));
    }

    #[test]
    fn test_client_certificate_required() {
        let policy = AuthPolicy::new(None, true);
        assert!(policy.check(&HeaderMap::new(), None).is_err());
        assert!(policy.check(&HeaderMap::new(), Some(&ClientCertificate)).is_ok());
    }

    #[test]
    fn test_empty_token_counts_as_unset() {
        assert!(AuthPolicy::new(Some(String::new()), false).is_open());
    }
}
