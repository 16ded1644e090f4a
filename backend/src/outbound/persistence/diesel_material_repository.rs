//! PostgreSQL-backed `MaterialRepository` using Diesel.
//!
//! Appends and removals take `SELECT ... FOR UPDATE` on the owning course
//! row inside a transaction. Concurrent writers to the same course queue on
//! that lock, and each inserts or deletes only its own child rows, so no
//! writer can overwrite another's materials.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::result::Error as DieselError;
use diesel_async::AsyncConnection as _;
use diesel_async::RunQueryDsl;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use tracing::debug;

use crate::domain::ports::{MaterialRemoval, MaterialRepository, MaterialRepositoryError};
use crate::domain::{CourseId, IdentityId, MaterialKey, MaterialRef};

use super::diesel_basic_error_mapping::{
    collect_rows, map_basic_diesel_error, map_basic_pool_error,
};
use super::models::{MaterialRow, NewMaterialRow};
use super::pool::{DbPool, PoolError};
use super::schema::{course_materials, courses};

/// Diesel-backed implementation of the `MaterialRepository` port.
#[derive(Clone)]
pub struct DieselMaterialRepository {
    pool: DbPool,
}

impl DieselMaterialRepository {
    /// Repository drawing connections from `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> MaterialRepositoryError {
    map_basic_pool_error(error, MaterialRepositoryError::connection)
}

fn map_diesel_error(error: DieselError) -> MaterialRepositoryError {
    map_basic_diesel_error(
        error,
        MaterialRepositoryError::query,
        MaterialRepositoryError::connection,
    )
}

fn to_materials(rows: Vec<MaterialRow>) -> Result<Vec<MaterialRef>, MaterialRepositoryError> {
    collect_rows(
        rows.into_iter().map(MaterialRow::into_material),
        MaterialRepositoryError::query,
    )
}

/// Lock the course row when it still exists with this owner.
async fn lock_course<C>(conn: &mut C, course_id: i64, owner: i64) -> Result<bool, DieselError>
where
    C: diesel_async::AsyncConnection<Backend = diesel::pg::Pg> + Send,
{
    let locked: Option<i64> = courses::table
        .filter(courses::id.eq(course_id))
        .filter(courses::owner_id.eq(owner))
        .select(courses::id)
        .for_update()
        .first(conn)
        .await
        .optional()?;
    Ok(locked.is_some())
}

async fn ordered_rows<C>(conn: &mut C, course_id: i64) -> Result<Vec<MaterialRow>, DieselError>
where
    C: diesel_async::AsyncConnection<Backend = diesel::pg::Pg> + Send,
{
    course_materials::table
        .filter(course_materials::course_id.eq(course_id))
        .order_by(course_materials::seq.asc())
        .select(MaterialRow::as_select())
        .load(conn)
        .await
}

#[async_trait]
impl MaterialRepository for DieselMaterialRepository {
    async fn append(
        &self,
        course_id: CourseId,
        owner: IdentityId,
        materials: &[MaterialRef],
    ) -> Result<Option<Vec<MaterialRef>>, MaterialRepositoryError> {
        let new_rows: Vec<NewMaterialRow<'_>> = materials
            .iter()
            .map(|material| NewMaterialRow::from_material(course_id, material))
            .collect();
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows = conn
            .transaction(|conn| {
                async move {
                    if !lock_course(conn, course_id.get(), owner.get()).await? {
                        return Ok::<_, DieselError>(None);
                    }
                    diesel::insert_into(course_materials::table)
                        .values(&new_rows)
                        .execute(conn)
                        .await?;
                    Ok(Some(ordered_rows(conn, course_id.get()).await?))
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;
        debug!(course_id = %course_id, inserted = materials.len(), "material rows appended");
        rows.map(to_materials).transpose()
    }

    async fn remove(
        &self,
        course_id: CourseId,
        owner: IdentityId,
        key: &MaterialKey,
    ) -> Result<Option<MaterialRemoval>, MaterialRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let outcome = conn
            .transaction(|conn| {
                async move {
                    if !lock_course(conn, course_id.get(), owner.get()).await? {
                        return Ok::<_, DieselError>(None);
                    }
                    let scoped = course_materials::table
                        .filter(course_materials::course_id.eq(course_id.get()));
                    let removed: Vec<MaterialRow> = match key {
                        MaterialKey::Id(id) => {
                            diesel::delete(scoped.filter(course_materials::id.eq(*id.as_uuid())))
                                .returning(MaterialRow::as_returning())
                                .get_results(conn)
                                .await?
                        }
                        MaterialKey::Name(name) => {
                            diesel::delete(scoped.filter(course_materials::name.eq(name)))
                                .returning(MaterialRow::as_returning())
                                .get_results(conn)
                                .await?
                        }
                    };
                    let remaining = ordered_rows(conn, course_id.get()).await?;
                    Ok(Some((removed, remaining)))
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;

        let Some((removed, remaining)) = outcome else {
            return Ok(None);
        };
        Ok(Some(MaterialRemoval {
            removed: to_materials(removed)?,
            remaining: to_materials(remaining)?,
        }))
    }

    async fn list(
        &self,
        course_id: CourseId,
    ) -> Result<Option<Vec<MaterialRef>>, MaterialRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let exists: Option<i64> = courses::table
            .filter(courses::id.eq(course_id.get()))
            .select(courses::id)
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        if exists.is_none() {
            return Ok(None);
        }
        let rows = ordered_rows(&mut conn, course_id.get())
            .await
            .map_err(map_diesel_error)?;
        to_materials(rows).map(Some)
    }

    async fn clear(
        &self,
        course_id: CourseId,
    ) -> Result<Vec<MaterialRef>, MaterialRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<MaterialRow> = diesel::delete(
            course_materials::table.filter(course_materials::course_id.eq(course_id.get())),
        )
        .returning(MaterialRow::as_returning())
        .get_results(&mut conn)
        .await
        .map_err(map_diesel_error)?;
        to_materials(rows)
    }
}
