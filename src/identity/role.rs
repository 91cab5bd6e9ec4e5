use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One role token as carried in a user's role string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Role {
    User,
    Manager,
    Admin,
    /// A token the portal does not know; kept verbatim so the role header round-trips.
    Other(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::User => "USER",
            Role::Manager => "MANAGER",
            Role::Admin => "ADMIN",
            Role::Other(s) => s.as_str(),
        }
    }
}

impl FromStr for Role {
    type Err = std::convert::Infallible;

    // Matching is exact: the API issues upper-case tokens and "admin" is not "ADMIN".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "USER" => Role::User,
            "MANAGER" => Role::Manager,
            "ADMIN" => Role::Admin,
            other => Role::Other(other.to_string()),
        })
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered, duplicate-free set of role tokens.
///
/// On the wire a user's role is a single string which may hold several
/// space-separated tokens (`"MANAGER ADMIN"`). `RoleSet` parses that string
/// once for matching and keeps it verbatim for the `roles` request header.
/// Equality compares the parsed tokens only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct RoleSet {
    roles: Vec<Role>,
    wire: String,
}

impl RoleSet {
    pub fn new() -> Self { Self::default() }

    pub fn parse(raw: &str) -> Self {
        let mut roles: Vec<Role> = Vec::new();
        for tok in raw.split_whitespace() {
            // Role::from_str is infallible
            if let Ok(role) = tok.parse::<Role>() {
                if !roles.contains(&role) { roles.push(role); }
            }
        }
        Self { roles, wire: raw.to_string() }
    }

    /// Add a role, appending its token to the wire string when it is new.
    pub fn insert(&mut self, role: Role) -> bool {
        if self.roles.contains(&role) { return false; }
        if !self.wire.trim().is_empty() { self.wire.push(' '); }
        self.wire.push_str(role.as_str());
        self.roles.push(role);
        true
    }

    pub fn contains(&self, role: &Role) -> bool { self.roles.contains(role) }

    /// True when at least one role is shared. An empty requirement is satisfied by anyone.
    pub fn satisfies(&self, required: &RoleSet) -> bool {
        required.is_empty() || required.roles.iter().any(|r| self.contains(r))
    }

    pub fn is_admin(&self) -> bool { self.contains(&Role::Admin) }

    pub fn is_empty(&self) -> bool { self.roles.is_empty() }

    pub fn len(&self) -> usize { self.roles.len() }

    /// The role string exactly as the API sent it; used for the `roles` header.
    pub fn to_header_value(&self) -> String { self.wire.clone() }
}

impl PartialEq for RoleSet {
    fn eq(&self, other: &Self) -> bool { self.roles == other.roles }
}

impl Eq for RoleSet {}

impl From<String> for RoleSet {
    fn from(raw: String) -> Self { RoleSet::parse(&raw) }
}

impl From<RoleSet> for String {
    fn from(set: RoleSet) -> Self { set.wire }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        let mut out = RoleSet::new();
        for r in iter { out.insert(r); }
        out
    }
}

impl Display for RoleSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.wire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_space_separated_tokens() {
        let set = RoleSet::parse("MANAGER  ADMIN");
        assert_eq!(set.len(), 2);
        assert!(set.is_admin());
        assert!(set.contains(&Role::Manager));
        assert!(!set.contains(&Role::User));
    }

    #[test]
    fn unknown_and_lowercase_tokens_are_not_admin() {
        let set = RoleSet::parse("admin AUDITOR");
        assert!(!set.is_admin());
        assert_eq!(set.to_header_value(), "admin AUDITOR");
    }

    #[test]
    fn duplicates_collapse_but_wire_string_is_verbatim() {
        let set = RoleSet::parse("USER  ADMIN USER");
        assert_eq!(set.len(), 2);
        assert_eq!(set, RoleSet::parse("USER ADMIN"));
        assert_eq!(set.to_header_value(), "USER  ADMIN USER");
    }

    #[test]
    fn insert_extends_the_wire_string() {
        let mut set = RoleSet::parse("USER");
        assert!(set.insert(Role::Admin));
        assert!(!set.insert(Role::User));
        assert_eq!(set.to_header_value(), "USER ADMIN");
        let built: RoleSet = [Role::Manager, Role::Admin].into_iter().collect();
        assert_eq!(built.to_header_value(), "MANAGER ADMIN");
    }

    #[test]
    fn empty_requirement_is_always_satisfied() {
        assert!(RoleSet::new().satisfies(&RoleSet::new()));
        assert!(RoleSet::parse("USER").satisfies(&RoleSet::new()));
        assert!(!RoleSet::new().satisfies(&RoleSet::parse("ADMIN")));
    }

    #[test]
    fn serde_uses_the_wire_string() {
        let set: RoleSet = serde_json::from_value(serde_json::json!("USER MANAGER")).unwrap();
        assert_eq!(set, [Role::User, Role::Manager].into_iter().collect());
        assert_eq!(serde_json::to_value(&set).unwrap(), serde_json::json!("USER MANAGER"));
    }
}
