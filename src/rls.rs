//! Row-level security rules derived from a caller identity.
//!
//! The platform ANDs every clause into the dashboard's queries. A clause with an
//! empty `IN ()` list would match nothing, so such clauses are never emitted.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::identity::CallerIdentity;

pub const ORGANISATION_COLUMN: &str = "organisation_id";
pub const LOCATION_COLUMN: &str = "practice_location_id";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RlsClause {
    pub clause: String,
}

/// How the location clause is treated for elevated (ADMIN) callers.
/// The organisation clause is always omitted for them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ElevatedLocationPolicy {
    /// Restrict by the caller's own location list, same as regular callers.
    #[default]
    FromIdentity,
    /// No location restriction at all.
    Omit,
}

impl FromStr for ElevatedLocationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "identity" | "from_identity" => Ok(Self::FromIdentity),
            "omit" | "none" => Ok(Self::Omit),
            other => Err(format!("unknown elevated location policy '{}' (expected identity|omit)", other)),
        }
    }
}

fn in_clause<T: ToString>(column: &str, values: &[T]) -> Option<RlsClause> {
    if values.is_empty() { return None; }
    let list = values.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(",");
    Some(RlsClause { clause: format!("{} IN ({})", column, list) })
}

/// Build the ordered `[organisation, location]` rule set for one caller.
pub fn build_rls(identity: &CallerIdentity, policy: ElevatedLocationPolicy) -> Vec<RlsClause> {
    let elevated = identity.user_type.is_elevated();

    let organisations: Vec<u64> = if elevated { Vec::new() } else { vec![identity.organisation_id] };
    let locations: &[u64] = match (elevated, policy) {
        (true, ElevatedLocationPolicy::Omit) => &[],
        _ => identity.locations.as_slice(),
    };

    [in_clause(ORGANISATION_COLUMN, &organisations), in_clause(LOCATION_COLUMN, locations)]
        .into_iter()
        .flatten()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{LocationIds, Role};

    fn caller(role: Role, org: u64, locations: &str) -> CallerIdentity {
        CallerIdentity::new("u", org, role).with_locations(locations.parse().unwrap())
    }

    fn clauses(rules: &[RlsClause]) -> Vec<&str> {
        rules.iter().map(|r| r.clause.as_str()).collect()
    }

    #[test]
    fn regular_caller_gets_org_then_locations() {
        let rules = build_rls(&caller(Role::User, 1, "1|||2"), ElevatedLocationPolicy::default());
        assert_eq!(clauses(&rules), vec!["organisation_id IN (1)", "practice_location_id IN (1,2)"]);
    }

    #[test]
    fn regular_caller_without_locations_gets_org_only() {
        let rules = build_rls(&caller(Role::User, 42, ""), ElevatedLocationPolicy::default());
        assert_eq!(clauses(&rules), vec!["organisation_id IN (42)"]);
    }

    #[test]
    fn admin_never_gets_org_clause() {
        for org in [0u64, 1, 99, u64::MAX] {
            for policy in [ElevatedLocationPolicy::FromIdentity, ElevatedLocationPolicy::Omit] {
                let rules = build_rls(&caller(Role::Admin, org, "3"), policy);
                assert!(rules.iter().all(|r| !r.clause.starts_with(ORGANISATION_COLUMN)));
            }
        }
    }

    #[test]
    fn admin_with_empty_locations_is_unrestricted() {
        let rules = build_rls(&caller(Role::Admin, 1, ""), ElevatedLocationPolicy::FromIdentity);
        assert!(rules.is_empty());
    }

    #[test]
    fn elevated_location_policy_is_honoured() {
        let admin = caller(Role::Admin, 1, "5|||6");
        assert_eq!(
            clauses(&build_rls(&admin, ElevatedLocationPolicy::FromIdentity)),
            vec!["practice_location_id IN (5,6)"]
        );
        assert!(build_rls(&admin, ElevatedLocationPolicy::Omit).is_empty());

        // regular callers ignore the policy
        let user = caller(Role::User, 2, "5");
        assert_eq!(build_rls(&user, ElevatedLocationPolicy::Omit), build_rls(&user, ElevatedLocationPolicy::FromIdentity));
    }

    #[test]
    fn location_clause_preserves_order() {
        let id = CallerIdentity::new("u", 1, Role::User).with_locations(LocationIds::new(vec![9, 3, 7]));
        let rules = build_rls(&id, ElevatedLocationPolicy::default());
        assert_eq!(rules[1].clause, "practice_location_id IN (9,3,7)");
    }

    #[test]
    fn policy_parses() {
        assert_eq!("identity".parse::<ElevatedLocationPolicy>(), Ok(ElevatedLocationPolicy::FromIdentity));
        assert_eq!("OMIT".parse::<ElevatedLocationPolicy>(), Ok(ElevatedLocationPolicy::Omit));
        assert!("sometimes".parse::<ElevatedLocationPolicy>().is_err());
    }

    #[test]
    fn never_emits_empty_in_list() {
        for role in [Role::User, Role::Admin] {
            for locs in ["", "1", "1|||2|||3"] {
                for rule in build_rls(&caller(role, 1, locs), ElevatedLocationPolicy::default()) {
                    assert!(!rule.clause.ends_with("IN ()"));
                }
            }
        }
    }
}
