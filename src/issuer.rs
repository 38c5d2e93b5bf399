//!
//! Guest-token issuance
//! --------------------
//! Runs the full sequence for one caller:
//!
//! 1. validate the requested dashboard name (no network traffic on rejection)
//! 2. log in to Superset as the configured service account
//! 3. fetch a CSRF token and its session cookie
//! 4. derive RLS rules and resolve the dashboard id
//! 5. exchange everything for a guest token impersonating the caller
//!
//! Each step consumes the previous step's output, so nothing runs in parallel.
//! The first failure ends the sequence and is reported once as
//! `IssuanceResult::Failure`; nothing is retried and no session state outlives
//! the call.

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::SupersetConfig;
use crate::error::{IssuanceResult, IssueResult};
use crate::identity::CallerIdentity;
use crate::platform::PlatformClient;
use crate::resource::ResourceTarget;
use crate::rls::{build_rls, ElevatedLocationPolicy};

pub struct TokenIssuer<C> {
    client: C,
    admin: SupersetConfig,
    elevated_locations: ElevatedLocationPolicy,
}

impl<C: PlatformClient> TokenIssuer<C> {
    pub fn new(client: C, admin: SupersetConfig) -> Self {
        Self { client, admin, elevated_locations: ElevatedLocationPolicy::default() }
    }

    pub fn with_elevated_locations(mut self, policy: ElevatedLocationPolicy) -> Self {
        self.elevated_locations = policy;
        self
    }

    pub fn client(&self) -> &C { &self.client }

    /// Issue a guest token for `target` (or the default dashboard) on behalf
    /// of `identity`. Never returns an error; failures are folded into the result.
    pub async fn issue_guest_token(&self, identity: &CallerIdentity, target: Option<&str>) -> IssuanceResult {
        let request_id = Uuid::new_v4();
        let target_name = target.unwrap_or(ResourceTarget::default().name());
        info!(target: "issuer", %request_id, dashboard = target_name, user = %identity.username, "issuing guest token");

        let res = self.try_issue(identity, target).await;
        match &res {
            Ok(_) => info!(target: "issuer", %request_id, dashboard = target_name, "guest token issued"),
            Err(e) => warn!(target: "issuer", %request_id, dashboard = target_name, code = e.code_str(), "guest token issuance failed: {}", e),
        }
        res.into()
    }

    async fn try_issue(&self, identity: &CallerIdentity, target: Option<&str>) -> IssueResult<String> {
        let resource: ResourceTarget = match target {
            Some(name) => name.parse()?,
            None => ResourceTarget::default(),
        };

        let access = self.client.login(&self.admin.username, self.admin.password.expose()).await?;
        let csrf = self.client.fetch_csrf(&access.access_token).await?;

        let rls = build_rls(identity, self.elevated_locations);
        let dashboard_id = resource.dashboard_id();
        debug!(target: "issuer", dashboard_id, clauses = rls.len(), "rls rules built");

        self.client
            .exchange_guest_token(&access.access_token, &csrf, dashboard_id, &rls, identity)
            .await
    }
}
