//! PostgreSQL-backed `IdentityRepository` using Diesel.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{
    IdentityRepository, IdentityRepositoryError, NewIdentity, StoredCredentials,
};
use crate::domain::{Email, Identity, IdentityId, ProfilePatch, Role};

use super::diesel_basic_error_mapping::{
    is_unique_violation, map_basic_diesel_error, map_basic_pool_error,
};
use super::models::{IdentityProfileChanges, IdentityRow, NewIdentityRow};
use super::pool::{DbPool, PoolError};
use super::schema::identities;

/// Diesel-backed implementation of the `IdentityRepository` port.
#[derive(Clone)]
pub struct DieselIdentityRepository {
    pool: DbPool,
}

impl DieselIdentityRepository {
    /// Repository drawing connections from `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> IdentityRepositoryError {
    map_basic_pool_error(error, IdentityRepositoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> IdentityRepositoryError {
    map_basic_diesel_error(
        error,
        IdentityRepositoryError::query,
        IdentityRepositoryError::connection,
    )
}

fn to_identity(row: &IdentityRow) -> Result<Identity, IdentityRepositoryError> {
    row.to_identity().map_err(IdentityRepositoryError::query)
}

#[async_trait]
impl IdentityRepository for DieselIdentityRepository {
    async fn insert(&self, identity: &NewIdentity) -> Result<Identity, IdentityRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let new_row = NewIdentityRow {
            display_name: identity.display_name.as_ref(),
            email: identity.email.as_ref(),
            role: identity.role.as_str(),
            phone: identity.phone.as_ref().map(AsRef::as_ref),
            password_hash: &identity.password_hash,
        };
        let row = diesel::insert_into(identities::table)
            .values(&new_row)
            .returning(IdentityRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(|err| {
                if is_unique_violation(&err) {
                    IdentityRepositoryError::duplicate_email(identity.email.as_ref())
                } else {
                    map_diesel_error(err)
                }
            })?;
        to_identity(&row)
    }

    async fn find_by_id(
        &self,
        id: IdentityId,
    ) -> Result<Option<Identity>, IdentityRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = identities::table
            .filter(identities::id.eq(id.get()))
            .select(IdentityRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.as_ref().map(to_identity).transpose()
    }

    async fn find_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<StoredCredentials>, IdentityRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = identities::table
            .filter(identities::email.eq(email.as_ref()))
            .select(IdentityRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(|row| {
            Ok(StoredCredentials {
                identity: to_identity(&row)?,
                password_hash: row.password_hash,
            })
        })
        .transpose()
    }

    async fn update_profile(
        &self,
        id: IdentityId,
        patch: &ProfilePatch,
    ) -> Result<Option<Identity>, IdentityRepositoryError> {
        if patch.is_empty() {
            return self.find_by_id(id).await;
        }
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let changes = IdentityProfileChanges {
            display_name: patch.display_name.as_ref().map(AsRef::as_ref),
            phone: patch
                .phone
                .as_ref()
                .map(|phone| phone.as_ref().map(AsRef::as_ref)),
        };
        let row = diesel::update(identities::table.filter(identities::id.eq(id.get())))
            .set(&changes)
            .returning(IdentityRow::as_returning())
            .get_result(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.as_ref().map(to_identity).transpose()
    }

    async fn update_role(
        &self,
        id: IdentityId,
        role: Role,
    ) -> Result<Option<Identity>, IdentityRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = diesel::update(identities::table.filter(identities::id.eq(id.get())))
            .set(identities::role.eq(role.as_str()))
            .returning(IdentityRow::as_returning())
            .get_result(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.as_ref().map(to_identity).transpose()
    }
}
