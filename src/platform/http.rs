//! reqwest-backed Superset client.
//!
//! One attempt per call. Transport failures surface as `IssueError::Transport`,
//! 401/403 as `IssueError::Auth`, anything else odd as `IssueError::Unexpected`.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, COOKIE, SET_COOKIE};
use reqwest::{Response, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, error};

use super::{
    AccessGrant, CsrfBody, CsrfGrant, GuestTokenBody, GuestTokenRequest, LoginBody, PlatformClient, ResourceRef,
    CSRF_PATH, GUEST_TOKEN_PATH, LOGIN_PATH,
};
use crate::config::SupersetConfig;
use crate::error::{IssueError, IssueResult};
use crate::identity::CallerIdentity;
use crate::rls::RlsClause;

const CSRF_HEADER: &str = "x-csrftoken";

/// Built once at start-up and shared by every issuance.
#[derive(Clone)]
pub struct SupersetClient {
    base: Url,
    client: reqwest::Client,
}

impl SupersetClient {
    pub fn new(cfg: &SupersetConfig, timeout: Option<Duration>) -> IssueResult<Self> {
        let base = Url::parse(&cfg.url).map_err(|e| IssueError::unexpected(format!("invalid base URL: {}", e)))?;
        let mut builder = reqwest::Client::builder();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let client = builder.build().map_err(|e| IssueError::unexpected(format!("http client init failed: {}", e)))?;
        Ok(Self { base, client })
    }

    pub fn base_url(&self) -> &Url { &self.base }

    /// Paths are appended to the base so a path prefix on the base URL survives.
    fn endpoint(&self, path: &str) -> IssueResult<Url> {
        let raw = format!("{}{}", self.base.as_str().trim_end_matches('/'), path);
        Url::parse(&raw).map_err(|e| IssueError::unexpected(format!("invalid endpoint {}: {}", raw, e)))
    }
}

fn bearer(access_token: &str) -> IssueResult<HeaderValue> {
    HeaderValue::from_str(&format!("Bearer {}", access_token))
        .map_err(|_| IssueError::unexpected("access token is not a valid header value"))
}

/// Turn a non-2xx response into a tagged error, keeping the body for context.
async fn check_status(step: &'static str, resp: Response) -> IssueResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    error!(target: "platform", step, status = status.as_u16(), "platform rejected request: {}", body);
    Err(IssueError::from_status(status.as_u16(), &body))
}

async fn read_json<T: DeserializeOwned>(step: &'static str, resp: Response) -> IssueResult<T> {
    let bytes = resp.bytes().await.map_err(|e| {
        error!(target: "platform", step, "failed reading response body: {}", e);
        IssueError::from(e)
    })?;
    serde_json::from_slice(&bytes).map_err(|e| {
        error!(target: "platform", step, "malformed response body: {}", e);
        IssueError::from(e)
    })
}

fn transport(step: &'static str, e: reqwest::Error) -> IssueError {
    error!(target: "platform", step, "request failed: {}", e);
    IssueError::from(e)
}

impl PlatformClient for SupersetClient {
    async fn login(&self, username: &str, password: &str) -> IssueResult<AccessGrant> {
        let url = self.endpoint(LOGIN_PATH)?;
        let body = LoginBody { username, password, provider: "db", refresh: true };
        let resp = self.client.post(url).json(&body).send().await.map_err(|e| transport("login", e))?;
        let resp = check_status("login", resp).await?;
        let grant: AccessGrant = read_json("login", resp).await?;
        debug!(target: "platform", "admin login succeeded");
        Ok(grant)
    }

    async fn fetch_csrf(&self, access_token: &str) -> IssueResult<CsrfGrant> {
        let url = self.endpoint(CSRF_PATH)?;
        let resp = self
            .client
            .get(url)
            .header(AUTHORIZATION, bearer(access_token)?)
            .send()
            .await
            .map_err(|e| transport("csrf", e))?;
        let resp = check_status("csrf", resp).await?;

        // Forward the cookie untouched; the platform binds the CSRF token to it
        let cookies: Vec<String> = resp
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .collect();
        if cookies.is_empty() {
            error!(target: "platform", step = "csrf", "response carried no session cookie");
            return Err(IssueError::unexpected("csrf response carried no session cookie"));
        }

        let body: CsrfBody = read_json("csrf", resp).await?;
        debug!(target: "platform", "csrf token received");
        Ok(CsrfGrant { csrf_token: body.result, session_cookie: cookies.join("; ") })
    }

    async fn exchange_guest_token(
        &self,
        access_token: &str,
        csrf: &CsrfGrant,
        resource_id: &str,
        rls: &[RlsClause],
        identity: &CallerIdentity,
    ) -> IssueResult<String> {
        let url = self.endpoint(GUEST_TOKEN_PATH)?;
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, bearer(access_token)?);
        headers.insert(
            CSRF_HEADER,
            HeaderValue::from_str(&csrf.csrf_token).map_err(|_| IssueError::unexpected("csrf token is not a valid header value"))?,
        );
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&csrf.session_cookie)
                .map_err(|_| IssueError::unexpected("session cookie is not a valid header value"))?,
        );
        let body = GuestTokenRequest { resources: vec![ResourceRef::dashboard(resource_id)], rls, user: identity };
        let resp = self
            .client
            .post(url)
            .headers(headers)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport("guest_token", e))?;
        let resp = check_status("guest_token", resp).await?;
        let body: GuestTokenBody = read_json("guest_token", resp).await?;
        debug!(target: "platform", resource_id, "guest token issued");
        Ok(body.token)
    }
}
