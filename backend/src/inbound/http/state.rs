//! Shared HTTP adapter state.
//!
//! Handlers accept this state via `actix_web::web::Data` so they only depend
//! on domain ports and remain testable without I/O.

use std::sync::Arc;

use crate::domain::ports::{
    AccountService, CourseCommand, CourseQuery, MaterialCommand, MaterialQuery,
};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub accounts: Arc<dyn AccountService>,
    pub courses: Arc<dyn CourseCommand>,
    pub course_query: Arc<dyn CourseQuery>,
    pub materials: Arc<dyn MaterialCommand>,
    pub material_query: Arc<dyn MaterialQuery>,
}
