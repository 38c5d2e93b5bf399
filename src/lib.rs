//! Superset guest-token service: turns one request into admin login, CSRF
//! retrieval and a guest-token exchange against Apache Superset, applying
//! row-level security derived from the caller.

pub mod config;
pub mod error;
pub mod identity;
pub mod issuer;
pub mod platform;
pub mod resource;
pub mod rls;
pub mod server;

pub use error::{IssuanceResult, IssueError, IssueErrorKind};
pub use identity::{CallerIdentity, LocationIds, Role};
pub use issuer::TokenIssuer;
pub use resource::{resolve_resource, ResourceTarget};
pub use rls::{build_rls, ElevatedLocationPolicy, RlsClause};
