//! Session-aware request dispatch against the records API.
//! Requests are described as data, sent through a [`Transport`], and every
//! outcome is normalized into a [`ResponseEnvelope`] plus a [`NavigationEffect`].

mod request;
mod envelope;
mod effect;
mod transport;
mod dispatcher;

pub use request::{Method, Payload, FormField, FormValue, RequestDescriptor};
pub use envelope::{ResponseEnvelope, is_ok_status, NO_RESPONSE};
pub use effect::{NavigationEffect, EffectSink, classify};
pub use transport::{Transport, HttpTransport, AuthHeaders, RawResponse, TransportError, ROLES_HEADER};
pub use dispatcher::{Dispatcher, Dispatched};
