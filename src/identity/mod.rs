//! Identity and session management for the portal.
//! Keep the public surface thin and split implementation across sub-modules.

mod role;
mod principal;
mod session;
mod grant;
mod provider;

pub use role::{Role, RoleSet};
pub use principal::{User, Gender};
pub use session::{Session, SessionId, SessionProvider, SessionStore, SessionHandle};
pub use grant::{LoginCredentials, Registration, SessionGrant, MIN_PASSWORD_LEN};
pub use provider::{AuthFailure, AuthProvider, AuthResult, RemoteAuthProvider, LOGIN_ENDPOINT, REGISTER_ENDPOINT, PROFILE_ENDPOINT};
