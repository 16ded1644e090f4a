//! Course authorization policy.
//!
//! Ownership plus an administrator override. Decisions are pure and made
//! fresh on every call.

use std::fmt;

use super::{Course, Identity};

/// Operations a caller may attempt on a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CourseAction {
    Create,
    Read,
    Update,
    Delete,
    AddMaterial,
    RemoveMaterial,
}

impl CourseAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::AddMaterial => "add_material",
            Self::RemoveMaterial => "remove_material",
        }
    }
}

impl fmt::Display for CourseAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The caller may not perform `action`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("not permitted to {action} this course")]
pub struct Forbidden {
    pub action: CourseAction,
}

/// Decide whether `identity` may perform `action` on `course`.
///
/// Anyone may read. Creating needs a resolved identity. Everything else
/// needs the owner or an administrator.
///
/// ```
/// use course_market::domain::authorization::{authorize, CourseAction};
/// # use course_market::domain::*;
/// # use chrono::Utc;
/// # let course = Course {
/// #     id: CourseId::new(1),
/// #     owner_id: IdentityId::new(7),
/// #     details: CourseFields {
/// #         name: "Pottery".into(), category: "Art".into(), price: "0".into(),
/// #         delivery_mode: "in person".into(), ..CourseFields::default()
/// #     }.validate().unwrap(),
/// #     cover_image_ref: None, rating: Rating::ZERO, reviews: vec![],
/// #     materials: vec![], created_at: Utc::now(),
/// # };
/// assert!(authorize(None, &course, CourseAction::Read));
/// assert!(!authorize(None, &course, CourseAction::Delete));
/// ```
#[must_use]
pub fn authorize(identity: Option<&Identity>, course: &Course, action: CourseAction) -> bool {
    match (action, identity) {
        (CourseAction::Read, _) => true,
        (_, None) => false,
        (CourseAction::Create, Some(_)) => true,
        (_, Some(identity)) => identity.id == course.owner_id || identity.is_admin(),
    }
}

/// [`authorize`], failing with [`Forbidden`] on denial.
pub fn require(
    identity: Option<&Identity>,
    course: &Course,
    action: CourseAction,
) -> Result<(), Forbidden> {
    if authorize(identity, course, action) {
        Ok(())
    } else {
        Err(Forbidden { action })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::test_fixtures::{course_owned_by, identity_with};
    use crate::domain::Role;
    use rstest::rstest;

    const OWNER: i64 = 7;
    const OTHER: i64 = 9;

    #[rstest]
    #[case(CourseAction::Update)]
    #[case(CourseAction::Delete)]
    #[case(CourseAction::AddMaterial)]
    #[case(CourseAction::RemoveMaterial)]
    fn mutations_allowed_for_owner_and_admin_only(#[case] action: CourseAction) {
        let course = course_owned_by(OWNER);
        let owner = identity_with(OWNER, Role::Instructor);
        let stranger = identity_with(OTHER, Role::Instructor);
        let admin = identity_with(1, Role::Admin);

        assert!(authorize(Some(&owner), &course, action));
        assert!(!authorize(Some(&stranger), &course, action));
        assert!(authorize(Some(&admin), &course, action));
        assert!(!authorize(None, &course, action));
    }

    #[rstest]
    #[case(None)]
    #[case(Some(Role::Student))]
    #[case(Some(Role::Admin))]
    fn reading_is_always_allowed(#[case] role: Option<Role>) {
        let course = course_owned_by(OWNER);
        let caller = role.map(|r| identity_with(OTHER, r));
        assert!(authorize(caller.as_ref(), &course, CourseAction::Read));
    }

    #[rstest]
    fn creating_requires_an_identity() {
        let course = course_owned_by(OWNER);
        let student = identity_with(OTHER, Role::Student);
        assert!(authorize(Some(&student), &course, CourseAction::Create));
        assert!(!authorize(None, &course, CourseAction::Create));
    }

    #[rstest]
    fn require_reports_the_denied_action() {
        let course = course_owned_by(OWNER);
        let stranger = identity_with(OTHER, Role::Student);
        assert_eq!(
            require(Some(&stranger), &course, CourseAction::Delete),
            Err(Forbidden {
                action: CourseAction::Delete
            })
        );
    }

    #[rstest]
    fn owner_role_does_not_matter() {
        let course = course_owned_by(OWNER);
        let student_owner = identity_with(OWNER, Role::Student);
        assert!(authorize(Some(&student_owner), &course, CourseAction::Update));
    }
}
