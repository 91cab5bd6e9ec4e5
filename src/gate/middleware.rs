use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};

use super::decision::{GateDecision, RouteGate};
use super::policy::RoutePolicy;
use crate::identity::{SessionHandle, SessionStore};

pub const SESSION_COOKIE: &str = "registrar_session";

/// Everything the gate needs per request.
#[derive(Clone)]
pub struct GateState {
    pub policy: Arc<RoutePolicy>,
    pub sessions: SessionStore,
}

pub fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    for cookie in headers.get_all(axum::http::header::COOKIE).iter() {
        let Ok(s) = cookie.to_str() else { continue; };
        for part in s.split(';') {
            if let Some((k, v)) = part.trim().split_once('=') {
                if k == name && !v.is_empty() { return Some(v.to_string()); }
            }
        }
    }
    None
}

/// Run the route gate before every handler.
///
/// Allowed requests carry the browser's [`SessionHandle`] as a request extension
/// so handlers dispatch under the same session the gate checked.
pub async fn require_gate(State(state): State<GateState>, mut req: Request, next: Next) -> Response {
    let sid = parse_cookie(req.headers(), SESSION_COOKIE);
    let handle = state.sessions.handle(sid);
    let target = req.uri().path_and_query().map(|pq| pq.as_str().to_string()).unwrap_or_else(|| req.uri().path().to_string());
    let gate = RouteGate::new(state.policy.clone(), handle.clone());
    match gate.evaluate(&target).await {
        GateDecision::Allow => {
            req.extensions_mut().insert::<SessionHandle>(handle);
            next.run(req).await
        }
        GateDecision::Redirect(to) => Redirect::to(&to).into_response(),
    }
}
