//! Error model for the guest-token pipeline.
//! Every failure raised while issuing a token is one of four kinds; the issuer
//! collapses them into an [`IssuanceResult`] at its outer boundary.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueErrorKind {
    Validation,
    Auth,
    Transport,
    Unexpected,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IssueError {
    /// Request rejected before any platform call (unknown target, bad identity).
    #[error("{0}")]
    Validation(String),
    /// Platform refused the admin credential, access token or CSRF token.
    #[error("{0}")]
    Auth(String),
    /// Network failure or timeout while talking to the platform.
    #[error("{0}")]
    Transport(String),
    /// Anything else, including malformed platform responses.
    #[error("{0}")]
    Unexpected(String),
}

impl IssueError {
    pub fn validation<S: Into<String>>(msg: S) -> Self { IssueError::Validation(msg.into()) }
    pub fn auth<S: Into<String>>(msg: S) -> Self { IssueError::Auth(msg.into()) }
    pub fn transport<S: Into<String>>(msg: S) -> Self { IssueError::Transport(msg.into()) }
    pub fn unexpected<S: Into<String>>(msg: S) -> Self { IssueError::Unexpected(msg.into()) }

    pub fn kind(&self) -> IssueErrorKind {
        match self {
            IssueError::Validation(_) => IssueErrorKind::Validation,
            IssueError::Auth(_) => IssueErrorKind::Auth,
            IssueError::Transport(_) => IssueErrorKind::Transport,
            IssueError::Unexpected(_) => IssueErrorKind::Unexpected,
        }
    }

    /// Stable code used in log lines.
    pub fn code_str(&self) -> &'static str {
        match self.kind() {
            IssueErrorKind::Validation => "validation_error",
            IssueErrorKind::Auth => "auth_error",
            IssueErrorKind::Transport => "transport_error",
            IssueErrorKind::Unexpected => "unexpected_error",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            IssueError::Validation(m)
            | IssueError::Auth(m)
            | IssueError::Transport(m)
            | IssueError::Unexpected(m) => m.as_str(),
        }
    }

    /// Classify a non-2xx platform response.
    pub fn from_status(status: u16, body: &str) -> Self {
        let msg = format!("HTTP {}: {}", status, body);
        match status {
            401 | 403 => IssueError::Auth(msg),
            _ => IssueError::Unexpected(msg),
        }
    }
}

pub type IssueResult<T> = Result<T, IssueError>;

impl From<reqwest::Error> for IssueError {
    fn from(err: reqwest::Error) -> Self {
        // Body decode failures are the platform's fault, not the network's
        if err.is_decode() {
            return IssueError::Unexpected(format!("malformed platform response: {}", err));
        }
        if let Some(status) = err.status() {
            return IssueError::from_status(status.as_u16(), &err.to_string());
        }
        IssueError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for IssueError {
    fn from(err: serde_json::Error) -> Self {
        IssueError::Unexpected(format!("malformed platform response: {}", err))
    }
}

/// The only artifact a caller of the pipeline ever sees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IssuanceResult {
    Success { token: String },
    Failure { error: String },
}

impl IssuanceResult {
    pub fn is_success(&self) -> bool { matches!(self, IssuanceResult::Success { .. }) }

    pub fn token(&self) -> Option<&str> {
        match self {
            IssuanceResult::Success { token } => Some(token.as_str()),
            IssuanceResult::Failure { .. } => None,
        }
    }
}

impl From<IssueResult<String>> for IssuanceResult {
    fn from(res: IssueResult<String>) -> Self {
        match res {
            Ok(token) => IssuanceResult::Success { token },
            Err(e) => IssuanceResult::Failure { error: e.message().to_string() },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert_eq!(IssueError::from_status(401, "no").kind(), IssueErrorKind::Auth);
        assert_eq!(IssueError::from_status(403, "csrf").kind(), IssueErrorKind::Auth);
        assert_eq!(IssueError::from_status(500, "boom").kind(), IssueErrorKind::Unexpected);
        assert_eq!(IssueError::from_status(422, "bad").message(), "HTTP 422: bad");
    }

    #[test]
    fn codes_are_stable() {
        assert_eq!(IssueError::validation("x").code_str(), "validation_error");
        assert_eq!(IssueError::auth("x").code_str(), "auth_error");
        assert_eq!(IssueError::transport("x").code_str(), "transport_error");
        assert_eq!(IssueError::unexpected("x").code_str(), "unexpected_error");
    }

    #[test]
    fn result_wire_shape() {
        let ok: IssuanceResult = Ok::<_, IssueError>("G".to_string()).into();
        assert_eq!(serde_json::to_value(&ok).unwrap(), serde_json::json!({"status": "success", "token": "G"}));

        let err: IssuanceResult = Err::<String, _>(IssueError::transport("connection refused")).into();
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            serde_json::json!({"status": "failure", "error": "connection refused"})
        );
        assert!(!err.is_success());
        assert_eq!(err.token(), None);
    }
}
