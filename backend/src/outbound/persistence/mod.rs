//! PostgreSQL persistence adapters using Diesel.
//!
//! Implementations of the identity, course and material repository ports
//! backed by PostgreSQL through `diesel-async` and a `bb8` pool.
//!
//! - **Thin adapters**: repositories only translate between Diesel rows and
//!   domain types.
//! - **Internal models**: row structs (`models.rs`) and table definitions
//!   (`schema.rs`) never leave this module.
//! - **Conditional writes**: course mutations filter on `(id, owner_id)` and
//!   material writes lock the course row, so stale callers see `None`.
//!
//! # Example
//!
//! ```ignore
//! use course_market::outbound::persistence::{DbPool, DieselCourseRepository, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/market")).await?;
//! let courses = DieselCourseRepository::new(pool);
//! ```

mod diesel_basic_error_mapping;
mod diesel_course_repository;
mod diesel_identity_repository;
mod diesel_material_repository;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_course_repository::DieselCourseRepository;
pub use diesel_identity_repository::DieselIdentityRepository;
pub use diesel_material_repository::DieselMaterialRepository;
pub use migrations::{MIGRATIONS, MigrationError, run_pending_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
