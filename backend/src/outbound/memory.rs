//! In-process repositories used when no database is configured.
//!
//! One mutex guards identities, courses and material rows together, which
//! gives the same guarantees the PostgreSQL adapters get from row locks:
//! conditional writes see a consistent `(id, owner_id)` and concurrent
//! appends to one course are serialised.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use mockable::{Clock, DefaultClock};

use crate::domain::ports::{
    CourseRepository, CourseRepositoryError, IdentityRepository, IdentityRepositoryError,
    MaterialRemoval, MaterialRepository, MaterialRepositoryError, NewIdentity, StoredCredentials,
};
use crate::domain::{
    Course, CourseId, CoursePatch, Email, Identity, IdentityId, MaterialKey, MaterialRef,
    NewCourse, ProfilePatch, Rating, Role,
};

const POISONED: &str = "in-memory store lock poisoned";

#[derive(Default)]
struct State {
    next_identity: i64,
    next_course: i64,
    identities: BTreeMap<i64, StoredCredentials>,
    courses: BTreeMap<i64, Course>,
    materials: Vec<(CourseId, MaterialRef)>,
}

impl State {
    fn materials_of(&self, course_id: CourseId) -> Vec<MaterialRef> {
        self.materials
            .iter()
            .filter(|(owner, _)| *owner == course_id)
            .map(|(_, material)| material.clone())
            .collect()
    }

    fn course_with_materials(&self, course_id: CourseId) -> Option<Course> {
        self.courses.get(&course_id.get()).map(|course| Course {
            materials: self.materials_of(course_id),
            ..course.clone()
        })
    }

    fn owns(&self, course_id: CourseId, owner: IdentityId) -> bool {
        self.courses
            .get(&course_id.get())
            .is_some_and(|course| course.owner_id == owner)
    }
}

/// Shared in-memory implementation of the identity, course and material
/// repository ports.
pub struct InMemoryStore {
    state: Mutex<State>,
    clock: Arc<dyn Clock>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new(Arc::new(DefaultClock))
    }
}

impl InMemoryStore {
    /// Empty store stamping rows with `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(State::default()),
            clock,
        }
    }

    fn lock<E>(
        &self,
        poisoned: impl FnOnce(&'static str) -> E,
    ) -> Result<MutexGuard<'_, State>, E> {
        self.state.lock().map_err(|_| poisoned(POISONED))
    }
}

#[async_trait]
impl IdentityRepository for InMemoryStore {
    async fn insert(&self, identity: &NewIdentity) -> Result<Identity, IdentityRepositoryError> {
        let mut state = self.lock(IdentityRepositoryError::query)?;
        if state
            .identities
            .values()
            .any(|stored| stored.identity.email == identity.email)
        {
            return Err(IdentityRepositoryError::duplicate_email(
                identity.email.as_ref(),
            ));
        }
        state.next_identity += 1;
        let created = Identity {
            id: IdentityId::new(state.next_identity),
            display_name: identity.display_name.clone(),
            email: identity.email.clone(),
            role: identity.role,
            phone: identity.phone.clone(),
            created_at: self.clock.utc(),
        };
        let key = created.id.get();
        state.identities.insert(
            key,
            StoredCredentials {
                identity: created.clone(),
                password_hash: identity.password_hash.clone(),
            },
        );
        Ok(created)
    }

    async fn find_by_id(
        &self,
        id: IdentityId,
    ) -> Result<Option<Identity>, IdentityRepositoryError> {
        let state = self.lock(IdentityRepositoryError::query)?;
        Ok(state
            .identities
            .get(&id.get())
            .map(|stored| stored.identity.clone()))
    }

    async fn find_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<StoredCredentials>, IdentityRepositoryError> {
        let state = self.lock(IdentityRepositoryError::query)?;
        Ok(state
            .identities
            .values()
            .find(|stored| stored.identity.email == *email)
            .cloned())
    }

    async fn update_profile(
        &self,
        id: IdentityId,
        patch: &ProfilePatch,
    ) -> Result<Option<Identity>, IdentityRepositoryError> {
        let mut state = self.lock(IdentityRepositoryError::query)?;
        let Some(stored) = state.identities.get_mut(&id.get()) else {
            return Ok(None);
        };
        if let Some(name) = &patch.display_name {
            stored.identity.display_name = name.clone();
        }
        if let Some(phone) = &patch.phone {
            stored.identity.phone = phone.clone();
        }
        Ok(Some(stored.identity.clone()))
    }

    async fn update_role(
        &self,
        id: IdentityId,
        role: Role,
    ) -> Result<Option<Identity>, IdentityRepositoryError> {
        let mut state = self.lock(IdentityRepositoryError::query)?;
        Ok(state.identities.get_mut(&id.get()).map(|stored| {
            stored.identity.role = role;
            stored.identity.clone()
        }))
    }
}

#[async_trait]
impl CourseRepository for InMemoryStore {
    async fn insert(&self, course: &NewCourse) -> Result<Course, CourseRepositoryError> {
        let mut state = self.lock(CourseRepositoryError::query)?;
        state.next_course += 1;
        let created = Course {
            id: CourseId::new(state.next_course),
            owner_id: course.owner_id,
            details: course.details.clone(),
            cover_image_ref: course.cover_image_ref.clone(),
            rating: Rating::ZERO,
            reviews: Vec::new(),
            materials: Vec::new(),
            created_at: self.clock.utc(),
        };
        state.courses.insert(created.id.get(), created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: CourseId) -> Result<Option<Course>, CourseRepositoryError> {
        let state = self.lock(CourseRepositoryError::query)?;
        Ok(state.course_with_materials(id))
    }

    async fn list(&self) -> Result<Vec<Course>, CourseRepositoryError> {
        let state = self.lock(CourseRepositoryError::query)?;
        Ok(state
            .courses
            .keys()
            .filter_map(|id| state.course_with_materials(CourseId::new(*id)))
            .collect())
    }

    async fn update_owned(
        &self,
        id: CourseId,
        owner: IdentityId,
        patch: &CoursePatch,
    ) -> Result<Option<Course>, CourseRepositoryError> {
        let mut state = self.lock(CourseRepositoryError::query)?;
        if !state.owns(id, owner) {
            return Ok(None);
        }
        if let Some(course) = state.courses.get_mut(&id.get()) {
            patch.apply_to(&mut course.details);
            if let Some(cover) = &patch.cover_image_ref {
                course.cover_image_ref = Some(cover.clone());
            }
        }
        Ok(state.course_with_materials(id))
    }

    async fn delete_owned(
        &self,
        id: CourseId,
        owner: IdentityId,
    ) -> Result<bool, CourseRepositoryError> {
        let mut state = self.lock(CourseRepositoryError::query)?;
        if !state.owns(id, owner) {
            return Ok(false);
        }
        state.courses.remove(&id.get());
        state.materials.retain(|(course_id, _)| *course_id != id);
        Ok(true)
    }
}

#[async_trait]
impl MaterialRepository for InMemoryStore {
    async fn append(
        &self,
        course_id: CourseId,
        owner: IdentityId,
        materials: &[MaterialRef],
    ) -> Result<Option<Vec<MaterialRef>>, MaterialRepositoryError> {
        let mut state = self.lock(MaterialRepositoryError::query)?;
        if !state.owns(course_id, owner) {
            return Ok(None);
        }
        state
            .materials
            .extend(materials.iter().cloned().map(|material| (course_id, material)));
        Ok(Some(state.materials_of(course_id)))
    }

    async fn remove(
        &self,
        course_id: CourseId,
        owner: IdentityId,
        key: &MaterialKey,
    ) -> Result<Option<MaterialRemoval>, MaterialRepositoryError> {
        let mut state = self.lock(MaterialRepositoryError::query)?;
        if !state.owns(course_id, owner) {
            return Ok(None);
        }
        let mut removed = Vec::new();
        state.materials.retain(|(owner_course, material)| {
            let hit = *owner_course == course_id && key.matches(material);
            if hit {
                removed.push(material.clone());
            }
            !hit
        });
        Ok(Some(MaterialRemoval {
            removed,
            remaining: state.materials_of(course_id),
        }))
    }

    async fn list(
        &self,
        course_id: CourseId,
    ) -> Result<Option<Vec<MaterialRef>>, MaterialRepositoryError> {
        let state = self.lock(MaterialRepositoryError::query)?;
        if !state.courses.contains_key(&course_id.get()) {
            return Ok(None);
        }
        Ok(Some(state.materials_of(course_id)))
    }

    async fn clear(
        &self,
        course_id: CourseId,
    ) -> Result<Vec<MaterialRef>, MaterialRepositoryError> {
        let mut state = self.lock(MaterialRepositoryError::query)?;
        let mut removed = Vec::new();
        state.materials.retain(|(owner_course, material)| {
            if *owner_course == course_id {
                removed.push(material.clone());
                false
            } else {
                true
            }
        });
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::test_fixtures::{course_fields, durable_material, fixed_clock};
    use crate::domain::{DisplayName, RawCoursePatch};
    use rstest::{fixture, rstest};

    #[fixture]
    fn store() -> InMemoryStore {
        InMemoryStore::new(fixed_clock())
    }

    fn new_identity(email: &str) -> NewIdentity {
        NewIdentity {
            display_name: DisplayName::new("Ana").expect("valid name"),
            email: Email::new(email).expect("valid email"),
            role: Role::Instructor,
            phone: None,
            password_hash: "hash".into(),
        }
    }

    async fn seeded_course(store: &InMemoryStore, owner: i64) -> Course {
        CourseRepository::insert(
            store,
            &NewCourse {
                owner_id: IdentityId::new(owner),
                details: course_fields().validate().expect("valid fields"),
                cover_image_ref: None,
            },
        )
        .await
        .expect("insert succeeds")
    }

    #[rstest]
    #[tokio::test]
    async fn duplicate_emails_are_rejected(store: InMemoryStore) {
        IdentityRepository::insert(&store, &new_identity("ana@example.com"))
            .await
            .expect("first insert");
        let err = IdentityRepository::insert(&store, &new_identity("ana@example.com"))
            .await
            .expect_err("duplicate");
        assert!(matches!(err, IdentityRepositoryError::DuplicateEmail { .. }));
    }

    #[rstest]
    #[tokio::test]
    async fn new_courses_start_empty(store: InMemoryStore) {
        let course = seeded_course(&store, 7).await;
        assert_eq!(course.rating, Rating::ZERO);
        assert!(course.reviews.is_empty());
        assert!(course.materials.is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn writes_against_the_wrong_owner_are_refused(store: InMemoryStore) {
        let course = seeded_course(&store, 7).await;
        let patch = CoursePatch::from_raw(
            RawCoursePatch {
                name: Some("Renamed".into()),
                ..RawCoursePatch::default()
            },
            None,
        )
        .expect("valid patch");

        let updated = store
            .update_owned(course.id, IdentityId::new(8), &patch)
            .await
            .expect("query succeeds");
        assert!(updated.is_none());
        assert!(
            !store
                .delete_owned(course.id, IdentityId::new(8))
                .await
                .expect("query succeeds")
        );
    }

    #[rstest]
    #[tokio::test]
    async fn materials_keep_insertion_order_across_removal(store: InMemoryStore) {
        let course = seeded_course(&store, 7).await;
        let owner = IdentityId::new(7);
        let batch = vec![
            durable_material("a.pdf", 7),
            durable_material("b.pdf", 7),
            durable_material("a.pdf", 7),
            durable_material("c.pdf", 7),
        ];
        store
            .append(course.id, owner, &batch)
            .await
            .expect("append succeeds");

        let removal = store
            .remove(course.id, owner, &MaterialKey::Name("a.pdf".into()))
            .await
            .expect("remove succeeds")
            .expect("course exists");
        assert_eq!(removal.removed.len(), 2);
        let names: Vec<_> = removal.remaining.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["b.pdf", "c.pdf"]);
    }

    #[rstest]
    #[tokio::test]
    async fn deleting_a_course_drops_its_materials(store: InMemoryStore) {
        let course = seeded_course(&store, 7).await;
        let owner = IdentityId::new(7);
        store
            .append(course.id, owner, &[durable_material("a.pdf", 7)])
            .await
            .expect("append succeeds");

        assert!(store.delete_owned(course.id, owner).await.expect("delete"));
        assert_eq!(MaterialRepository::list(&store, course.id).await, Ok(None));
        assert_eq!(store.clear(course.id).await, Ok(Vec::new()));
    }
}
