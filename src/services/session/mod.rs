pub mod provider;
pub mod secure_token;
pub mod static_token;

pub use provider::{Principal, RealmSessionProvider, SessionError};
pub use secure_token::{SecureTokenPrincipal, SecureTokenSession};
pub use static_token::{StaticPrincipal, StaticSession};
