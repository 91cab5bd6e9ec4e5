use std::sync::Arc;

use tracing::debug;

use super::policy::RoutePolicy;
use crate::identity::{Session, SessionProvider};
use crate::routes::{login_with_return, normalize_path};

/// Outcome of one navigation check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    Redirect(String),
}

impl GateDecision {
    pub fn is_allow(&self) -> bool { matches!(self, GateDecision::Allow) }

    pub fn redirect_target(&self) -> Option<&str> {
        match self {
            GateDecision::Allow => None,
            GateDecision::Redirect(t) => Some(t.as_str()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    AuthenticatedUnprivileged,
    AuthenticatedPrivileged,
}

impl AuthState {
    /// Privileged means the session satisfies whatever rule covers `path` (or no rule does).
    pub fn classify(policy: &RoutePolicy, path: &str, session: Option<&Session>) -> Self {
        let Some(session) = session else { return AuthState::Unauthenticated; };
        match policy.rule_for(path) {
            Some(rule) if !session.user.roles.satisfies(&rule.roles) => AuthState::AuthenticatedUnprivileged,
            _ => AuthState::AuthenticatedPrivileged,
        }
    }
}

/// Split `/path?query` into its parts; an empty query counts as none.
fn split_target(target: &str) -> (&str, Option<&str>) {
    match target.split_once('?') {
        Some((p, q)) if !q.is_empty() => (p, Some(q)),
        Some((p, _)) => (p, None),
        None => (target, None),
    }
}

/// Route authorization gate.
///
/// Evaluated once per navigation with one session lookup; holds no state of its
/// own, so the same (path, session) always yields the same decision.
pub struct RouteGate<P> {
    policy: Arc<RoutePolicy>,
    sessions: P,
}

impl<P: SessionProvider> RouteGate<P> {
    pub fn new(policy: Arc<RoutePolicy>, sessions: P) -> Self {
        Self { policy, sessions }
    }

    /// Check a navigation to `target` (path with optional `?query`).
    pub async fn evaluate(&self, target: &str) -> GateDecision {
        let session = self.sessions.current_session().await;
        decide(&self.policy, target, session.as_ref())
    }
}

/// The gate's decision for `target` under an already-resolved session.
pub fn decide(policy: &RoutePolicy, target: &str, session: Option<&Session>) -> GateDecision {
    let (raw_path, query) = split_target(target);
    // Route parameters reach handlers decoded, so rules match the decoded path.
    let Ok(decoded) = urlencoding::decode(raw_path) else {
        debug!(target: "gate", path = raw_path, "gate.undecodable_path");
        return match session {
            None => GateDecision::Redirect(policy.login.clone()),
            Some(_) => GateDecision::Redirect(policy.forbidden.clone()),
        };
    };
    let path = normalize_path(&decoded);

    let decision = if policy.is_root(path) {
        GateDecision::Redirect(policy.login.clone())
    } else if policy.is_public_auth(path) {
        if session.is_some() { GateDecision::Redirect(policy.dashboard.clone()) } else { GateDecision::Allow }
    } else if policy.is_public(path) {
        GateDecision::Allow
    } else {
        match AuthState::classify(policy, path, session) {
            AuthState::Unauthenticated => GateDecision::Redirect(login_with_return(path, query)),
            AuthState::AuthenticatedUnprivileged => GateDecision::Redirect(policy.forbidden.clone()),
            AuthState::AuthenticatedPrivileged => GateDecision::Allow,
        }
    };
    debug!(target: "gate", path, authenticated = session.is_some(), decision = ?decision, "gate.decide");
    decision
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{RoleSet, User};

    fn session(roles: &str) -> Session {
        Session::new(User::new("1", "x@uni.example", RoleSet::parse(roles)), "tok")
    }

    fn redirect(t: &str) -> GateDecision { GateDecision::Redirect(t.to_string()) }

    #[test]
    fn root_always_goes_to_login() {
        let p = RoutePolicy::default();
        assert_eq!(decide(&p, "/", None), redirect("/auth/login"));
        assert_eq!(decide(&p, "/", Some(&session("ADMIN"))), redirect("/auth/login"));
        assert_eq!(decide(&p, "/?x=1", Some(&session("USER"))), redirect("/auth/login"));
    }

    #[test]
    fn auth_pages_bounce_signed_in_users() {
        let p = RoutePolicy::default();
        assert_eq!(decide(&p, "/auth/login", None), GateDecision::Allow);
        assert_eq!(decide(&p, "/auth/register", None), GateDecision::Allow);
        assert_eq!(decide(&p, "/auth/login?from=%2Fadmin", Some(&session("USER"))), redirect("/admin"));
        assert_eq!(decide(&p, "/auth/register", Some(&session("USER"))), redirect("/admin"));
    }

    #[test]
    fn user_admin_requires_admin_role() {
        let p = RoutePolicy::default();
        assert_eq!(decide(&p, "/admin/users", Some(&session("USER"))), redirect("/error/403"));
        assert_eq!(decide(&p, "/admin/users/12", Some(&session("MANAGER"))), redirect("/error/403"));
        assert_eq!(decide(&p, "/admin/users", Some(&session("MANAGER ADMIN"))), GateDecision::Allow);
        assert_eq!(decide(&p, "/admin/users/", Some(&session("ADMIN"))), GateDecision::Allow);
    }

    #[test]
    fn other_protected_pages_only_need_a_session() {
        let p = RoutePolicy::default();
        assert_eq!(decide(&p, "/admin/students", Some(&session("USER"))), GateDecision::Allow);
        assert_eq!(decide(&p, "/admin", Some(&session(""))), GateDecision::Allow);
        assert_eq!(decide(&p, "/admin/students", None), redirect("/auth/login?from=%2Fadmin%2Fstudents"));
        assert_eq!(
            decide(&p, "/admin/courses?page=2", None),
            redirect("/auth/login?from=%2Fadmin%2Fcourses%3Fpage%3D2")
        );
    }

    #[test]
    fn encoded_segments_are_matched_after_decoding() {
        let p = RoutePolicy::default();
        assert_eq!(decide(&p, "/admin/%75sers", Some(&session("USER"))), redirect("/error/403"));
        assert_eq!(decide(&p, "/admin/%75sers/1", Some(&session("USER"))), redirect("/error/403"));
        assert_eq!(decide(&p, "/admin/user%73", Some(&session("ADMIN"))), GateDecision::Allow);
        assert_eq!(decide(&p, "/%61uth/login", Some(&session("USER"))), redirect("/admin"));
    }

    #[test]
    fn undecodable_paths_are_refused() {
        let p = RoutePolicy::default();
        assert_eq!(decide(&p, "/admin/%ff", Some(&session("ADMIN"))), redirect("/error/403"));
        assert_eq!(decide(&p, "/admin/%ff", None), redirect("/auth/login"));
    }

    #[test]
    fn error_pages_are_open() {
        let p = RoutePolicy::default();
        assert_eq!(decide(&p, "/error/500", None), GateDecision::Allow);
        assert_eq!(decide(&p, "/error/403", Some(&session("USER"))), GateDecision::Allow);
    }

    #[test]
    fn auth_state_classification() {
        let p = RoutePolicy::default();
        assert_eq!(AuthState::classify(&p, "/admin/users", None), AuthState::Unauthenticated);
        assert_eq!(AuthState::classify(&p, "/admin/users", Some(&session("USER"))), AuthState::AuthenticatedUnprivileged);
        assert_eq!(AuthState::classify(&p, "/admin/users", Some(&session("ADMIN"))), AuthState::AuthenticatedPrivileged);
        assert_eq!(AuthState::classify(&p, "/admin/majors", Some(&session("USER"))), AuthState::AuthenticatedPrivileged);
    }

    #[tokio::test]
    async fn evaluate_reads_the_provider_once_per_call() {
        let gate = RouteGate::new(Arc::new(RoutePolicy::default()), Some(session("USER")));
        let first = gate.evaluate("/admin/users").await;
        let second = gate.evaluate("/admin/users").await;
        assert_eq!(first, redirect("/error/403"));
        assert_eq!(first, second);
    }
}
