//! PostgreSQL-backed `CourseRepository` using Diesel.
//!
//! Updates and deletes filter on both `id` and `owner_id`, so a course that
//! disappeared after the caller loaded it is reported as missing instead of
//! being written.

use std::collections::HashMap;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{CourseRepository, CourseRepositoryError};
use crate::domain::{Course, CourseId, CoursePatch, IdentityId, MaterialRef, NewCourse};

use super::diesel_basic_error_mapping::{
    collect_rows, map_basic_diesel_error, map_basic_pool_error,
};
use super::models::{CourseChanges, CourseRow, MaterialRow, NewCourseRow};
use super::pool::{DbPool, PoolError};
use super::schema::{course_materials, courses};

/// Diesel-backed implementation of the `CourseRepository` port.
#[derive(Clone)]
pub struct DieselCourseRepository {
    pool: DbPool,
}

impl DieselCourseRepository {
    /// Repository drawing connections from `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> CourseRepositoryError {
    map_basic_pool_error(error, CourseRepositoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> CourseRepositoryError {
    map_basic_diesel_error(
        error,
        CourseRepositoryError::query,
        CourseRepositoryError::connection,
    )
}

fn price_minor(units: u64) -> Result<i64, CourseRepositoryError> {
    i64::try_from(units).map_err(|_| CourseRepositoryError::query("price out of range"))
}

fn to_materials(rows: Vec<MaterialRow>) -> Result<Vec<MaterialRef>, CourseRepositoryError> {
    collect_rows(
        rows.into_iter().map(MaterialRow::into_material),
        CourseRepositoryError::query,
    )
}

/// Load a course's materials in insertion order.
async fn load_materials<C>(conn: &mut C, id: i64) -> Result<Vec<MaterialRef>, CourseRepositoryError>
where
    C: diesel_async::AsyncConnection<Backend = diesel::pg::Pg> + Send,
{
    let rows = course_materials::table
        .filter(course_materials::course_id.eq(id))
        .order_by(course_materials::seq.asc())
        .select(MaterialRow::as_select())
        .load(conn)
        .await
        .map_err(map_diesel_error)?;
    to_materials(rows)
}

fn assemble(row: CourseRow, materials: Vec<MaterialRef>) -> Result<Course, CourseRepositoryError> {
    row.into_course(materials).map_err(CourseRepositoryError::query)
}

#[async_trait]
impl CourseRepository for DieselCourseRepository {
    async fn insert(&self, course: &NewCourse) -> Result<Course, CourseRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let details = &course.details;
        let new_row = NewCourseRow {
            owner_id: course.owner_id.get(),
            name: &details.name,
            description: &details.description,
            category: &details.category,
            price_minor: price_minor(details.price.minor_units())?,
            delivery_mode: &details.delivery_mode,
            schedule: &details.schedule,
            cover_image_ref: course.cover_image_ref.as_deref(),
        };
        let row = diesel::insert_into(courses::table)
            .values(&new_row)
            .returning(CourseRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        assemble(row, Vec::new())
    }

    async fn find_by_id(&self, id: CourseId) -> Result<Option<Course>, CourseRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = courses::table
            .filter(courses::id.eq(id.get()))
            .select(CourseRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        let Some(row) = row else {
            return Ok(None);
        };
        let materials = load_materials(&mut conn, row.id).await?;
        assemble(row, materials).map(Some)
    }

    async fn list(&self) -> Result<Vec<Course>, CourseRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<CourseRow> = courses::table
            .order_by((courses::created_at.asc(), courses::id.asc()))
            .select(CourseRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        let ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
        let material_rows: Vec<MaterialRow> = course_materials::table
            .filter(course_materials::course_id.eq_any(ids))
            .order_by(course_materials::seq.asc())
            .select(MaterialRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        let mut grouped: HashMap<i64, Vec<MaterialRow>> = HashMap::new();
        for material in material_rows {
            grouped.entry(material.course_id).or_default().push(material);
        }
        rows.into_iter()
            .map(|row| {
                let materials = to_materials(grouped.remove(&row.id).unwrap_or_default())?;
                assemble(row, materials)
            })
            .collect()
    }

    async fn update_owned(
        &self,
        id: CourseId,
        owner: IdentityId,
        patch: &CoursePatch,
    ) -> Result<Option<Course>, CourseRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let owned = courses::table
            .filter(courses::id.eq(id.get()))
            .filter(courses::owner_id.eq(owner.get()));
        let row = if patch.is_empty() {
            owned
                .select(CourseRow::as_select())
                .first(&mut conn)
                .await
                .optional()
                .map_err(map_diesel_error)?
        } else {
            let changes = CourseChanges {
                name: patch.name.as_deref(),
                description: patch.description.as_deref(),
                category: patch.category.as_deref(),
                price_minor: patch
                    .price
                    .map(|price| price_minor(price.minor_units()))
                    .transpose()?,
                delivery_mode: patch.delivery_mode.as_deref(),
                schedule: patch.schedule.as_deref(),
                cover_image_ref: patch.cover_image_ref.as_deref(),
            };
            diesel::update(owned)
                .set(&changes)
                .returning(CourseRow::as_returning())
                .get_result(&mut conn)
                .await
                .optional()
                .map_err(map_diesel_error)?
        };
        let Some(row) = row else {
            return Ok(None);
        };
        let materials = load_materials(&mut conn, row.id).await?;
        assemble(row, materials).map(Some)
    }

    async fn delete_owned(
        &self,
        id: CourseId,
        owner: IdentityId,
    ) -> Result<bool, CourseRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let deleted = diesel::delete(
            courses::table
                .filter(courses::id.eq(id.get()))
                .filter(courses::owner_id.eq(owner.get())),
        )
        .execute(&mut conn)
        .await
        .map_err(map_diesel_error)?;
        Ok(deleted > 0)
    }
}
