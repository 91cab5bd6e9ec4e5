//! Route authorization gate: decides allow / redirect for every navigation
//! from the requested path and the session it runs under.

mod policy;
mod decision;
mod middleware;

pub use policy::{RoutePolicy, RoutePolicyBuilder, RouteRule};
pub use decision::{GateDecision, AuthState, RouteGate, decide};
pub use middleware::{GateState, require_gate, parse_cookie, SESSION_COOKIE};
