//! Superset security API as seen by the issuer.
//!
//! The trait is the seam between the issuance sequence and the network; the
//! reqwest-backed [`SupersetClient`] is the production implementation, tests
//! plug in recording stubs.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::IssueResult;
use crate::identity::CallerIdentity;
use crate::rls::RlsClause;

pub mod http;

pub use http::SupersetClient;

pub const LOGIN_PATH: &str = "/api/v1/security/login";
pub const CSRF_PATH: &str = "/api/v1/security/csrf_token";
pub const GUEST_TOKEN_PATH: &str = "/api/v1/security/guest_token";

/// Tokens returned by the admin login. The refresh token is never used.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccessGrant {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
}

/// Anti-forgery token plus the session cookie it is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrfGrant {
    pub csrf_token: String,
    /// `Set-Cookie` value(s) exactly as the platform sent them.
    pub session_cookie: String,
}

#[derive(Serialize)]
pub(crate) struct LoginBody<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub provider: &'static str,
    pub refresh: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CsrfBody {
    pub result: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceRef {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
}

impl ResourceRef {
    pub fn dashboard(id: impl Into<String>) -> Self { Self { kind: "dashboard".into(), id: id.into() } }
}

/// Payload of the guest-token exchange.
#[derive(Debug, Clone, Serialize)]
pub struct GuestTokenRequest<'a> {
    pub resources: Vec<ResourceRef>,
    pub rls: &'a [RlsClause],
    pub user: &'a CallerIdentity,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GuestTokenBody {
    pub token: String,
}

pub trait PlatformClient: Send + Sync {
    /// Authenticate as the service account.
    fn login(&self, username: &str, password: &str) -> impl Future<Output = IssueResult<AccessGrant>> + Send;

    fn fetch_csrf(&self, access_token: &str) -> impl Future<Output = IssueResult<CsrfGrant>> + Send;

    /// Exchange the admin session for a guest token scoped to one dashboard,
    /// the given RLS rules, and the impersonated caller.
    fn exchange_guest_token(
        &self,
        access_token: &str,
        csrf: &CsrfGrant,
        resource_id: &str,
        rls: &[RlsClause],
        identity: &CallerIdentity,
    ) -> impl Future<Output = IssueResult<String>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Role;
    use serde_json::json;

    #[test]
    fn guest_token_request_wire_shape() {
        let id = CallerIdentity::new("jdoe", 1, Role::User).with_names("Jane", "Doe").with_locations("1|||2".parse().unwrap());
        let rls = vec![RlsClause { clause: "organisation_id IN (1)".into() }];
        let req = GuestTokenRequest { resources: vec![ResourceRef::dashboard("abc")], rls: &rls, user: &id };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({
                "resources": [{"type": "dashboard", "id": "abc"}],
                "rls": [{"clause": "organisation_id IN (1)"}],
                "user": {
                    "username": "jdoe", "first_name": "Jane", "last_name": "Doe",
                    "organisation_id": 1, "user_type": "USER", "locations": "1|||2"
                }
            })
        );
    }

    #[test]
    fn login_body_wire_shape() {
        let body = LoginBody { username: "admin", password: "pw", provider: "db", refresh: true };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"username": "admin", "password": "pw", "provider": "db", "refresh": true})
        );
    }
}
