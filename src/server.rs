//!
//! registrar front-end server
//! ---------------------------
//! Axum front-end for the student-records portal. Every request passes the
//! route gate first; page handlers then talk to the records API through the
//! session-aware dispatcher and turn its navigation effects into redirects.
//!
//! Responsibilities:
//! - Session cookie issue/clear around the login and logout flows.
//! - Login and registration forms backed by the records API.
//! - One JSON screen per resource kind with list/get/create/update/delete.
//! - Error pages the dispatcher redirects to.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::header::{CONTENT_TYPE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{middleware, Extension, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::config::PortalConfig;
use crate::dispatch::{Dispatched, Dispatcher, EffectSink, FormField, HttpTransport, NavigationEffect, Transport};
use crate::error::{AppError, AppResult};
use crate::gate::{decide, require_gate, GateDecision, GateState, RoutePolicy, SESSION_COOKIE};
use crate::identity::{
    AuthFailure, AuthProvider, LoginCredentials, Registration, RemoteAuthProvider, SessionHandle, SessionProvider, SessionStore,
};
use crate::resources::{ResourceClient, ResourceKind};
use crate::routes;

/// Header naming an uploaded file; the request body is the file itself.
pub const FILE_NAME_HEADER: &str = "x-file-name";

/// Shared server state injected into all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<PortalConfig>,
    pub policy: Arc<RoutePolicy>,
    pub sessions: SessionStore,
    pub transport: Arc<dyn Transport>,
    pub auth: Arc<dyn AuthProvider>,
}

impl AppState {
    /// State wired to the records API named in `config`.
    pub fn from_config(config: PortalConfig) -> AppResult<Self> {
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(&config.api_base_url(), config.request_timeout)?);
        Ok(Self::with_transport(config, transport))
    }

    pub fn with_transport(config: PortalConfig, transport: Arc<dyn Transport>) -> Self {
        let sessions = SessionStore::new(config.session_ttl);
        Self {
            config: Arc::new(config),
            policy: Arc::new(RoutePolicy::default()),
            sessions,
            auth: Arc::new(RemoteAuthProvider::new(transport.clone())),
            transport,
        }
    }

    pub fn with_policy(mut self, policy: RoutePolicy) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    fn dispatcher(&self, handle: SessionHandle) -> Dispatcher<SessionHandle> {
        Dispatcher::new(self.transport.clone(), handle)
    }

    /// Resolve the `{resource}` segment and check its screen against the route policy.
    ///
    /// The gate sees the request path; handlers see the decoded segment. Checking
    /// the resolved kind again keeps both views under the same rule.
    async fn screen(&self, handle: &SessionHandle, resource: &str) -> Result<ResourceKind, Response> {
        let kind = resource.parse::<ResourceKind>().map_err(IntoResponse::into_response)?;
        let session = handle.current_session().await;
        match decide(&self.policy, &kind.admin_path(), session.as_ref()) {
            GateDecision::Allow => Ok(kind),
            GateDecision::Redirect(to) => Err(Redirect::to(&to).into_response()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(json!({"status": "error", "code": self.code_str(), "message": self.message()}))).into_response()
    }
}

/// Build the router with the gate mounted in front of every route.
pub fn router(state: AppState) -> Router {
    let gate = GateState { policy: state.policy.clone(), sessions: state.sessions.clone() };
    Router::new()
        .route("/", get(|| async { Redirect::to(routes::LOGIN) }))
        .route("/auth/login", get(login_page).post(login))
        .route("/auth/register", get(register_page).post(register))
        .route("/auth/logout", post(logout))
        .route("/admin", get(dashboard))
        .route("/admin/{resource}", get(list).post(create))
        .route("/admin/{resource}/{id}", get(get_one).put(update).delete(remove))
        .route("/admin/{resource}/{id}/avatar", post(upload_avatar))
        .route("/error/403", get(forbidden_page))
        .route("/error/500", get(server_error_page))
        .layer(middleware::from_fn_with_state(gate, require_gate))
        .with_state(state)
}

/// Start the front-end server on the configured port.
pub async fn run(config: PortalConfig) -> anyhow::Result<()> {
    info!(
        target: "startup",
        "registrar starting: http_port={}, api={}, session_ttl_secs={}, request_timeout={:?}",
        config.http_port, config.api_base_url(), config.session_ttl.as_secs(), config.request_timeout
    );
    let addr: SocketAddr = format!("0.0.0.0:{}", config.http_port).parse()?;
    let state = AppState::from_config(config).context("While building server state")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Starting server on {}", addr);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

fn session_cookie(sid: &str, max_age_secs: u64) -> Option<HeaderValue> {
    // HttpOnly cookie scoped to path / with SameSite=Strict
    HeaderValue::from_str(&format!("{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}", SESSION_COOKIE, sid, max_age_secs)).ok()
}

fn clear_session_cookie() -> HeaderValue {
    HeaderValue::from_static("registrar_session=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0")
}

/// Executes dispatcher effects against the browser's session and the response being built.
struct PageEffects<'a> {
    handle: &'a SessionHandle,
    signed_out: bool,
    redirect: Option<String>,
}

impl EffectSink for PageEffects<'_> {
    fn sign_out(&mut self) {
        self.handle.sign_out();
        self.signed_out = true;
    }

    fn redirect(&mut self, path: &str) {
        self.redirect = Some(path.to_string());
    }
}

/// Run `effect` against the browser session; `Some` redirect response if it navigates.
fn effect_response(effect: &NavigationEffect, handle: &SessionHandle) -> Option<Response> {
    let mut fx = PageEffects { handle, signed_out: false, redirect: None };
    effect.apply(&mut fx);
    let to = fx.redirect?;
    let mut resp = Redirect::to(&to).into_response();
    if fx.signed_out {
        resp.headers_mut().insert(SET_COOKIE, clear_session_cookie());
    }
    Some(resp)
}

/// Turn a dispatch outcome into a response: a redirect if the effect navigates, else the envelope.
fn outcome_response(out: Dispatched, handle: &SessionHandle) -> Response {
    if let Some(resp) = effect_response(&out.effect, handle) {
        return resp;
    }
    let status = StatusCode::from_u16(out.envelope.status).unwrap_or(StatusCode::BAD_GATEWAY);
    (status, Json(out.envelope)).into_response()
}

#[derive(Debug, Default, Deserialize)]
struct ReturnQuery {
    from: Option<String>,
}

async fn login_page(Query(q): Query<ReturnQuery>) -> impl IntoResponse {
    Json(json!({"page": "login", "from": routes::safe_return_target(q.from.as_deref())}))
}

/// Refusals stay on the form as an error body; faults follow the failure's redirect.
fn auth_failure_response(failure: AuthFailure, handle: &SessionHandle) -> Response {
    effect_response(&failure.effect, handle).unwrap_or_else(|| failure.error.into_response())
}

async fn login(
    State(state): State<AppState>,
    Extension(handle): Extension<SessionHandle>,
    Query(q): Query<ReturnQuery>,
    Json(creds): Json<LoginCredentials>,
) -> Response {
    let session = match state.auth.login(&creds).await {
        Ok(s) => s,
        Err(f) => {
            warn!(target: "session", email = %creds.email, code = f.error.code_str(), effect = ?f.effect, "login rejected");
            return auth_failure_response(f, &handle);
        }
    };
    let sid = match state.sessions.issue(session) {
        Ok(sid) => sid,
        Err(e) => return e.into_response(),
    };
    let Some(cookie) = session_cookie(&sid, state.sessions.ttl().as_secs()) else {
        state.sessions.sign_out(&sid);
        return AppError::internal("cookie", "could not encode session cookie").into_response();
    };
    let to = routes::safe_return_target(q.from.as_deref()).unwrap_or_else(|| state.policy.dashboard.clone());
    let mut resp = Redirect::to(&to).into_response();
    resp.headers_mut().insert(SET_COOKIE, cookie);
    resp
}

async fn register_page() -> impl IntoResponse {
    Json(json!({"page": "register"}))
}

async fn register(
    State(state): State<AppState>,
    Extension(handle): Extension<SessionHandle>,
    Json(form): Json<Registration>,
) -> Response {
    match state.auth.register(&form).await {
        Ok(_) => Redirect::to(routes::LOGIN).into_response(),
        Err(f) => auth_failure_response(f, &handle),
    }
}

async fn logout(Extension(handle): Extension<SessionHandle>) -> Response {
    handle.sign_out();
    let mut resp = Redirect::to(routes::LOGIN).into_response();
    resp.headers_mut().insert(SET_COOKIE, clear_session_cookie());
    resp
}

async fn dashboard(Extension(handle): Extension<SessionHandle>) -> Response {
    let Some(session) = handle.current_session().await else {
        return Redirect::to(routes::LOGIN).into_response();
    };
    let screens: Vec<Value> = ResourceKind::ALL
        .iter()
        .filter(|k| **k != ResourceKind::Users || session.user.roles.is_admin())
        .map(|k| json!({"resource": k.as_str(), "path": k.admin_path()}))
        .collect();
    Json(json!({"page": "dashboard", "user": session.user, "screens": screens})).into_response()
}

async fn list(
    State(state): State<AppState>,
    Extension(handle): Extension<SessionHandle>,
    Path(resource): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
) -> Response {
    let kind = match state.screen(&handle, &resource).await { Ok(k) => k, Err(resp) => return resp };
    let d = state.dispatcher(handle.clone());
    let out = ResourceClient::new(&d).list(kind, &params).await;
    outcome_response(out, &handle)
}

async fn get_one(
    State(state): State<AppState>,
    Extension(handle): Extension<SessionHandle>,
    Path((resource, id)): Path<(String, String)>,
) -> Response {
    let kind = match state.screen(&handle, &resource).await { Ok(k) => k, Err(resp) => return resp };
    let d = state.dispatcher(handle.clone());
    let out = ResourceClient::new(&d).get(kind, &id).await;
    outcome_response(out, &handle)
}

async fn create(
    State(state): State<AppState>,
    Extension(handle): Extension<SessionHandle>,
    Path(resource): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let kind = match state.screen(&handle, &resource).await { Ok(k) => k, Err(resp) => return resp };
    let d = state.dispatcher(handle.clone());
    let out = ResourceClient::new(&d).create(kind, body).await;
    outcome_response(out, &handle)
}

async fn update(
    State(state): State<AppState>,
    Extension(handle): Extension<SessionHandle>,
    Path((resource, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Response {
    let kind = match state.screen(&handle, &resource).await { Ok(k) => k, Err(resp) => return resp };
    let d = state.dispatcher(handle.clone());
    let out = ResourceClient::new(&d).update(kind, &id, body).await;
    outcome_response(out, &handle)
}

async fn remove(
    State(state): State<AppState>,
    Extension(handle): Extension<SessionHandle>,
    Path((resource, id)): Path<(String, String)>,
) -> Response {
    let kind = match state.screen(&handle, &resource).await { Ok(k) => k, Err(resp) => return resp };
    let d = state.dispatcher(handle.clone());
    let out = ResourceClient::new(&d).remove(kind, &id).await;
    if kind == ResourceKind::Users && out.ok() {
        // a deleted account must not stay signed in elsewhere
        state.sessions.revoke_user(&id);
    }
    outcome_response(out, &handle)
}

async fn upload_avatar(
    State(state): State<AppState>,
    Extension(handle): Extension<SessionHandle>,
    Path((resource, id)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let kind = match state.screen(&handle, &resource).await { Ok(k) => k, Err(resp) => return resp };
    if !kind.accepts_upload() {
        return AppError::user("upload_not_supported".to_string(), format!("{} do not take uploads", kind)).into_response();
    }
    if body.is_empty() {
        return AppError::user("empty_upload", "No file was sent").into_response();
    }
    let header_str = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string);
    let file_name = header_str(FILE_NAME_HEADER).unwrap_or_else(|| "upload".to_string());
    let content_type = header_str(CONTENT_TYPE.as_str());
    let file = FormField::file("file", file_name, content_type, body.to_vec());
    let d = state.dispatcher(handle.clone());
    let out = ResourceClient::new(&d).upload_avatar(kind, &id, file).await;
    outcome_response(out, &handle)
}

async fn forbidden_page() -> impl IntoResponse {
    (StatusCode::FORBIDDEN, Json(json!({"page": "forbidden", "message": "You do not have access to this page"})))
}

async fn server_error_page() -> impl IntoResponse {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"page": "server_error", "message": "Something went wrong, please try again later"})))
}
