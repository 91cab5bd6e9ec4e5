//! CRUD access to the records the portal administers.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde_json::Value;

use crate::dispatch::{Dispatched, Dispatcher, FormField, RequestDescriptor};
use crate::error::AppError;
use crate::identity::SessionProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Students,
    Classes,
    Faculties,
    Majors,
    Courses,
    Users,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 6] = [
        ResourceKind::Students,
        ResourceKind::Classes,
        ResourceKind::Faculties,
        ResourceKind::Majors,
        ResourceKind::Courses,
        ResourceKind::Users,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Students => "students",
            ResourceKind::Classes => "classes",
            ResourceKind::Faculties => "faculties",
            ResourceKind::Majors => "majors",
            ResourceKind::Courses => "courses",
            ResourceKind::Users => "users",
        }
    }

    /// Collection endpoint on the records API.
    pub fn api_path(&self) -> String { format!("/{}", self.as_str()) }

    pub fn item_path(&self, id: &str) -> String {
        format!("/{}/{}", self.as_str(), urlencoding::encode(id))
    }

    /// Admin screen listing this resource.
    pub fn admin_path(&self) -> String { format!("/admin/{}", self.as_str()) }

    /// Only people and users carry an uploadable picture.
    pub fn accepts_upload(&self) -> bool {
        matches!(self, ResourceKind::Students | ResourceKind::Users)
    }
}

impl Display for ResourceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for ResourceKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| AppError::not_found("unknown_resource".to_string(), format!("no resource named '{}'", s)))
    }
}

/// Typed CRUD calls over a dispatcher. Every call returns the dispatch outcome untouched.
pub struct ResourceClient<'a, P> {
    dispatcher: &'a Dispatcher<P>,
}

impl<'a, P: SessionProvider> ResourceClient<'a, P> {
    pub fn new(dispatcher: &'a Dispatcher<P>) -> Self { Self { dispatcher } }

    pub async fn list(&self, kind: ResourceKind, params: &[(String, String)]) -> Dispatched {
        let req = RequestDescriptor::get(kind.api_path()).with_params(params.iter().cloned());
        self.dispatcher.dispatch(req).await
    }

    pub async fn get(&self, kind: ResourceKind, id: &str) -> Dispatched {
        self.dispatcher.dispatch(RequestDescriptor::get(kind.item_path(id))).await
    }

    pub async fn create(&self, kind: ResourceKind, body: Value) -> Dispatched {
        self.dispatcher.dispatch(RequestDescriptor::post(kind.api_path()).with_json(body)).await
    }

    pub async fn update(&self, kind: ResourceKind, id: &str, body: Value) -> Dispatched {
        self.dispatcher.dispatch(RequestDescriptor::put(kind.item_path(id)).with_json(body)).await
    }

    pub async fn remove(&self, kind: ResourceKind, id: &str) -> Dispatched {
        self.dispatcher.dispatch(RequestDescriptor::delete(kind.item_path(id))).await
    }

    /// Upload a picture for one record as `multipart/form-data`.
    pub async fn upload_avatar(&self, kind: ResourceKind, id: &str, file: FormField) -> Dispatched {
        let url = format!("{}/avatar", kind.item_path(id));
        self.dispatcher.dispatch(RequestDescriptor::upload(url).with_form(vec![file])).await
    }
}
