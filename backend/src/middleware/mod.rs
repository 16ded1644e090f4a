//! Request middleware.
//!
//! Request lifecycle concerns: trace identifiers and bearer authentication.

pub mod authenticate;
pub mod trace;

pub use authenticate::Authenticate;
pub use trace::Trace;
