use std::fmt::{Display, Formatter};

use serde_json::Value;

/// The five send strategies the dispatcher knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Post,
    Put,
    Get,
    Delete,
    /// POST with a `multipart/form-data` body.
    Upload,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Get => "GET",
            Method::Delete => "DELETE",
            Method::Upload => "UPLOAD",
        }
    }

    /// HTTP verb the strategy is sent with.
    pub fn http_method(&self) -> reqwest::Method {
        match self {
            Method::Post | Method::Upload => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Get => reqwest::Method::GET,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

impl Display for Method {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormValue {
    Text(String),
    File { file_name: String, content_type: Option<String>, bytes: Vec<u8> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormField {
    pub name: String,
    pub value: FormValue,
}

impl FormField {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: FormValue::Text(value.into()) }
    }

    pub fn file(name: impl Into<String>, file_name: impl Into<String>, content_type: Option<String>, bytes: Vec<u8>) -> Self {
        Self { name: name.into(), value: FormValue::File { file_name: file_name.into(), content_type, bytes } }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Form(Vec<FormField>),
}

impl Payload {
    /// Flatten into form fields; JSON objects become one text field per key.
    pub fn into_form_fields(self) -> Vec<FormField> {
        match self {
            Payload::Form(fields) => fields,
            Payload::Json(Value::Object(map)) => map
                .into_iter()
                .map(|(k, v)| match v {
                    Value::String(s) => FormField::text(k, s),
                    other => FormField::text(k, other.to_string()),
                })
                .collect(),
            Payload::Json(Value::Null) => Vec::new(),
            Payload::Json(other) => vec![FormField::text("data", other.to_string())],
        }
    }
}

/// Description of one outbound call.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub method: Method,
    pub url: String,
    pub payload: Option<Payload>,
    pub params: Vec<(String, String)>,
}

impl RequestDescriptor {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self { method, url: url.into(), payload: None, params: Vec::new() }
    }

    pub fn post(url: impl Into<String>) -> Self { Self::new(Method::Post, url) }
    pub fn put(url: impl Into<String>) -> Self { Self::new(Method::Put, url) }
    pub fn get(url: impl Into<String>) -> Self { Self::new(Method::Get, url) }
    pub fn delete(url: impl Into<String>) -> Self { Self::new(Method::Delete, url) }
    pub fn upload(url: impl Into<String>) -> Self { Self::new(Method::Upload, url) }

    pub fn with_json(mut self, body: Value) -> Self {
        self.payload = Some(Payload::Json(body));
        self
    }

    pub fn with_form(mut self, fields: Vec<FormField>) -> Self {
        self.payload = Some(Payload::Form(fields));
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn with_params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.params.extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }
}
