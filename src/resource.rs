//! Logical dashboard names and the Superset dashboards they embed.

use std::fmt;
use std::str::FromStr;

use crate::error::{IssueError, IssueResult};

const TASK_DASHBOARD: &str = "07761b1b-bf0d-47fb-9416-e25ee85e2bd4";
const ASSESSMENT_DASHBOARD: &str = "1449667a-8a39-4862-a79c-bb40117bcd6d";
const MESSAGING_DASHBOARD: &str = "6fab7c77-4dd7-4471-97ca-b62af012b3a4";
const REFERRAL_DASHBOARD: &str = "bfe106ab-3219-4664-969c-2f2f96fd377a";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ResourceTarget {
    #[default]
    Default,
    Messaging,
    MessagingError,
    Assessment,
    AssessmentError,
    Task,
    Error,
}

impl ResourceTarget {
    pub const ALL: [ResourceTarget; 7] = [
        ResourceTarget::Default,
        ResourceTarget::Messaging,
        ResourceTarget::MessagingError,
        ResourceTarget::Assessment,
        ResourceTarget::AssessmentError,
        ResourceTarget::Task,
        ResourceTarget::Error,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ResourceTarget::Default => "default",
            ResourceTarget::Messaging => "messaging",
            ResourceTarget::MessagingError => "messaging-error",
            ResourceTarget::Assessment => "assessment",
            ResourceTarget::AssessmentError => "assessment-error",
            ResourceTarget::Task => "task",
            ResourceTarget::Error => "error",
        }
    }

    /// Dashboard UUID on the platform. Names without a dedicated dashboard
    /// (including the `*-error` variants) embed the referral dashboard.
    pub fn dashboard_id(self) -> &'static str {
        match self {
            ResourceTarget::Task => TASK_DASHBOARD,
            ResourceTarget::Assessment => ASSESSMENT_DASHBOARD,
            ResourceTarget::Messaging => MESSAGING_DASHBOARD,
            _ => REFERRAL_DASHBOARD,
        }
    }
}

impl fmt::Display for ResourceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

impl FromStr for ResourceTarget {
    type Err = IssueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceTarget::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| IssueError::validation(format!("{} not found", s)))
    }
}

/// Map a logical name to its dashboard id; unknown names are rejected.
pub fn resolve_resource(name: &str) -> IssueResult<&'static str> {
    let target: ResourceTarget = name.parse()?;
    Ok(target.dashboard_id())
}
