//! Request handlers for the test API.

mod implementation;

pub use implementation::*;
