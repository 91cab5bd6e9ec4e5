use crate::identity::{Role, RoleSet};
use crate::routes::{self, under_prefix};

/// A restricted prefix and the roles that may enter it (any one suffices).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRule {
    pub prefix: String,
    pub roles: RoleSet,
}

/// Static route configuration consulted by the gate.
///
/// Rules are evaluated in order and the first matching prefix wins, so more
/// specific prefixes must be listed before broader ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePolicy {
    pub root: String,
    pub login: String,
    pub dashboard: String,
    pub forbidden: String,
    /// Login/registration pages: open to anonymous visitors, bounced when signed in.
    pub public_auth: Vec<String>,
    /// Pages anyone may see regardless of session (error pages).
    pub public: Vec<String>,
    pub rules: Vec<RouteRule>,
}

impl Default for RoutePolicy {
    fn default() -> Self {
        RoutePolicy::builder()
            .rule(routes::ADMIN_USERS, [Role::Admin])
            .build()
    }
}

impl RoutePolicy {
    pub fn builder() -> RoutePolicyBuilder { RoutePolicyBuilder::new() }

    pub fn is_root(&self, path: &str) -> bool { path == self.root }

    pub fn is_public_auth(&self, path: &str) -> bool {
        self.public_auth.iter().any(|p| under_prefix(path, p))
    }

    pub fn is_public(&self, path: &str) -> bool {
        self.public.iter().any(|p| under_prefix(path, p))
    }

    /// First rule whose prefix covers `path`.
    pub fn rule_for(&self, path: &str) -> Option<&RouteRule> {
        self.rules.iter().find(|r| under_prefix(path, &r.prefix))
    }
}

pub struct RoutePolicyBuilder {
    policy: RoutePolicy,
}

impl RoutePolicyBuilder {
    fn new() -> Self {
        Self {
            policy: RoutePolicy {
                root: routes::ROOT.to_string(),
                login: routes::LOGIN.to_string(),
                dashboard: routes::DASHBOARD.to_string(),
                forbidden: routes::FORBIDDEN.to_string(),
                public_auth: vec![routes::LOGIN.to_string(), routes::REGISTER.to_string()],
                public: vec![routes::ERROR_PAGES.to_string()],
                rules: Vec::new(),
            },
        }
    }

    pub fn rule<I: IntoIterator<Item = Role>>(mut self, prefix: &str, roles: I) -> Self {
        self.policy.rules.push(RouteRule { prefix: prefix.to_string(), roles: roles.into_iter().collect() });
        self
    }

    pub fn build(self) -> RoutePolicy { self.policy }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_guards_user_admin() {
        let p = RoutePolicy::default();
        assert_eq!(p.rules.len(), 1);
        let r = p.rule_for("/admin/users/5").unwrap();
        assert!(r.roles.is_admin());
        assert!(p.rule_for("/admin/students").is_none());
        assert!(p.is_public_auth("/auth/register"));
        assert!(!p.is_public_auth("/auth/logout"));
        assert!(p.is_public("/error/500"));
    }

    #[test]
    fn first_matching_rule_wins() {
        let p = RoutePolicy::builder()
            .rule("/admin/users", [Role::Admin])
            .rule("/admin", [Role::User, Role::Manager, Role::Admin])
            .build();
        assert_eq!(p.rule_for("/admin/users").unwrap().prefix, "/admin/users");
        assert_eq!(p.rule_for("/admin/courses").unwrap().prefix, "/admin");
    }
}
