use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use super::effect::{classify, NavigationEffect};
use super::envelope::ResponseEnvelope;
use super::request::{FormField, RequestDescriptor};
use super::transport::{AuthHeaders, HttpTransport, Transport};
use crate::config::PortalConfig;
use crate::error::AppResult;
use crate::identity::SessionProvider;

/// Result of one dispatch: the normalized envelope plus the navigation it implies.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatched {
    pub envelope: ResponseEnvelope,
    pub effect: NavigationEffect,
}

impl Dispatched {
    pub fn ok(&self) -> bool { self.envelope.ok }
    pub fn status(&self) -> u16 { self.envelope.status }
}

/// Session-aware request dispatcher.
///
/// Each call looks the session up once, attaches `Authorization: Bearer <token>`
/// and the `roles` header when a session exists, sends through the transport and
/// normalizes whatever happens into a [`Dispatched`]. It never returns an error.
pub struct Dispatcher<P> {
    transport: Arc<dyn Transport>,
    sessions: P,
}

impl<P: SessionProvider> Dispatcher<P> {
    pub fn new(transport: Arc<dyn Transport>, sessions: P) -> Self {
        Self { transport, sessions }
    }

    /// Dispatcher over the reqwest transport configured for the records API.
    pub fn http(config: &PortalConfig, sessions: P) -> AppResult<Self> {
        let transport = HttpTransport::new(&config.api_base_url(), config.request_timeout)?;
        Ok(Self::new(Arc::new(transport), sessions))
    }

    pub async fn dispatch(&self, req: RequestDescriptor) -> Dispatched {
        let auth = self.sessions.current_session().await.as_ref().map(AuthHeaders::for_session);
        let (envelope, effect) = match self.transport.send(&req, auth.as_ref()).await {
            Ok(raw) => {
                let effect = classify(Some(raw.status));
                (ResponseEnvelope::from_parts(raw.status, raw.body), effect)
            }
            Err(e) => {
                warn!(target: "dispatch", method = %req.method, url = %req.url, error = %e, "request failed without a response");
                (ResponseEnvelope::network_failure(e.to_string()), classify(None))
            }
        };
        debug!(
            target: "dispatch",
            method = %req.method,
            url = %req.url,
            authenticated = auth.is_some(),
            status = envelope.status,
            effect = ?effect,
            "dispatched"
        );
        Dispatched { envelope, effect }
    }

    pub async fn post(&self, url: &str, body: Value) -> Dispatched {
        self.dispatch(RequestDescriptor::post(url).with_json(body)).await
    }

    pub async fn put(&self, url: &str, body: Value) -> Dispatched {
        self.dispatch(RequestDescriptor::put(url).with_json(body)).await
    }

    pub async fn get(&self, url: &str, params: &[(&str, &str)]) -> Dispatched {
        self.dispatch(RequestDescriptor::get(url).with_params(params.iter().copied())).await
    }

    pub async fn delete(&self, url: &str) -> Dispatched {
        self.dispatch(RequestDescriptor::delete(url)).await
    }

    pub async fn upload(&self, url: &str, fields: Vec<FormField>) -> Dispatched {
        self.dispatch(RequestDescriptor::upload(url).with_form(fields)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::transport::{RawResponse, TransportError};
    use crate::dispatch::Method;
    use crate::identity::{RoleSet, Session, User};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;

    /// Replies with a scripted status/body and records what it was asked to send.
    struct Scripted {
        reply: Option<RawResponse>,
        seen: Mutex<Vec<(RequestDescriptor, Option<AuthHeaders>)>>,
    }

    impl Scripted {
        fn status(status: u16, body: Value) -> Arc<Self> {
            Arc::new(Self { reply: Some(RawResponse { status, body }), seen: Mutex::new(Vec::new()) })
        }
        fn unreachable() -> Arc<Self> {
            Arc::new(Self { reply: None, seen: Mutex::new(Vec::new()) })
        }
    }

    #[async_trait]
    impl Transport for Scripted {
        async fn send(&self, req: &RequestDescriptor, auth: Option<&AuthHeaders>) -> Result<RawResponse, TransportError> {
            self.seen.lock().push((req.clone(), auth.cloned()));
            self.reply.clone().ok_or_else(|| TransportError::NoResponse { url: req.url.clone(), message: "connection refused".into() })
        }
    }

    fn session(roles: &str) -> Option<Session> {
        Some(Session::new(User::new("9", "reg@uni.example", RoleSet::parse(roles)), "jwt-123"))
    }

    #[tokio::test]
    async fn attaches_bearer_and_roles_when_signed_in() {
        let t = Scripted::status(200, json!({"items": []}));
        let d = Dispatcher::new(t.clone(), session("MANAGER ADMIN"));
        let out = d.get("/students", &[("page", "1")]).await;
        assert!(out.ok());
        let seen = t.seen.lock();
        let (req, auth) = &seen[0];
        assert_eq!(req.method, Method::Get);
        assert_eq!(req.params, vec![("page".to_string(), "1".to_string())]);
        let auth = auth.as_ref().unwrap();
        assert_eq!(auth.authorization, "Bearer jwt-123");
        assert_eq!(auth.roles, "MANAGER ADMIN");
    }

    #[tokio::test]
    async fn anonymous_call_proceeds_without_headers() {
        let t = Scripted::status(200, json!({}));
        let d = Dispatcher::new(t.clone(), None::<Session>);
        let out = d.post("/auth/register", json!({"email": "x@y.z"})).await;
        assert!(out.ok());
        assert!(t.seen.lock()[0].1.is_none());
    }

    #[tokio::test]
    async fn unauthorized_signs_out_and_still_returns_envelope() {
        let t = Scripted::status(401, json!({"message": "jwt expired"}));
        let d = Dispatcher::new(t, session("USER"));
        let out = d.delete("/courses/3").await;
        assert_eq!(out.status(), 401);
        assert!(!out.ok());
        assert_eq!(out.envelope.message().as_deref(), Some("jwt expired"));
        assert_eq!(out.effect, NavigationEffect::SignOut { then: "/auth/login".into() });
    }

    #[tokio::test]
    async fn forbidden_and_server_error_redirect() {
        let d = Dispatcher::new(Scripted::status(403, Value::Null), session("USER"));
        assert_eq!(d.get("/users", &[]).await.effect, NavigationEffect::RedirectTo("/error/403".into()));
        let d = Dispatcher::new(Scripted::status(500, Value::Null), session("USER"));
        assert_eq!(d.get("/users", &[]).await.effect, NavigationEffect::RedirectTo("/error/500".into()));
    }

    #[tokio::test]
    async fn network_failure_becomes_envelope() {
        let d = Dispatcher::new(Scripted::unreachable(), None::<Session>);
        let out = d.get("/majors", &[]).await;
        assert_eq!(out.status(), 0);
        assert!(!out.ok());
        assert!(out.envelope.message().unwrap().contains("connection refused"));
        assert_eq!(out.effect, NavigationEffect::RedirectTo("/error/500".into()));
    }

    #[tokio::test]
    async fn login_body_is_merged_into_envelope() {
        let d = Dispatcher::new(Scripted::status(200, json!({"accessToken": "abc.def"})), None::<Session>);
        let out = d.post("/auth/login", json!({"email": "a@b.c", "password": "pw"})).await;
        assert_eq!(serde_json::to_value(&out.envelope).unwrap(), json!({"status": 200, "ok": true, "accessToken": "abc.def"}));
        assert!(out.effect.is_none());
    }

    #[tokio::test]
    async fn upload_uses_the_upload_strategy() {
        let t = Scripted::status(201, json!({"avatar": "/files/a.png"}));
        let d = Dispatcher::new(t.clone(), session("ADMIN"));
        let out = d.upload("/users/9/avatar", vec![FormField::file("file", "a.png", Some("image/png".into()), vec![1, 2, 3])]).await;
        assert!(out.ok());
        let seen = t.seen.lock();
        assert_eq!(seen[0].0.method, Method::Upload);
        assert!(matches!(seen[0].0.payload, Some(crate::dispatch::Payload::Form(ref f)) if f.len() == 1));
    }
}
