//! HTTP inbound adapter exposing the `/api/v1` REST surface.

pub mod auth;
pub mod courses;
pub mod error;
pub mod health;
pub mod materials;
pub mod multipart;
pub mod schemas;
pub mod state;
#[cfg(test)]
pub mod test_utils;
pub mod token_config;
pub mod users;

pub use error::ApiResult;
