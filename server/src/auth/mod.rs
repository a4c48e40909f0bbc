//! Request authentication.

mod middleware;

pub use middleware::{AuthToken, AUTH_TOKEN_HEADER};
