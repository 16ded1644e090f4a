//! Shared builders for domain unit tests.

use chrono::{TimeZone, Utc};

use super::{
    ContentType, Course, CourseFields, CourseId, DisplayName, Email, Identity, IdentityId,
    MaterialId, MaterialRef, MaterialSource, Rating, Role,
};

pub(crate) fn identity_with(id: i64, role: Role) -> Identity {
    Identity {
        id: IdentityId::new(id),
        display_name: DisplayName::new(format!("User {id}")).expect("valid name"),
        email: Email::new(format!("user{id}@example.com")).expect("valid email"),
        role,
        phone: None,
        created_at: Utc
            .with_ymd_and_hms(2026, 1, 1, 0, 0, 0)
            .single()
            .expect("valid timestamp"),
    }
}

pub(crate) fn course_fields() -> CourseFields {
    CourseFields {
        name: "Intro to pottery".into(),
        description: "Wheel throwing for beginners".into(),
        category: "Art".into(),
        price: "25.00".into(),
        delivery_mode: "in person".into(),
        schedule: "Tuesdays 18:00".into(),
    }
}

pub(crate) fn course_owned_by(owner: i64) -> Course {
    Course {
        id: CourseId::new(100),
        owner_id: IdentityId::new(owner),
        details: course_fields().validate().expect("valid fields"),
        cover_image_ref: None,
        rating: Rating::ZERO,
        reviews: Vec::new(),
        materials: Vec::new(),
        created_at: Utc
            .with_ymd_and_hms(2026, 1, 2, 0, 0, 0)
            .single()
            .expect("valid timestamp"),
    }
}

pub(crate) fn durable_material(name: &str, owner: i64) -> MaterialRef {
    let id = MaterialId::random();
    MaterialRef {
        id,
        name: name.to_owned(),
        source: MaterialSource::Durable {
            uri: format!("courses/100/{id}-{name}"),
        },
        content_type: ContentType::classify(name),
        size_bytes: 3,
        uploaded_at: Utc::now(),
        uploaded_by: IdentityId::new(owner),
    }
}

/// Clock frozen at a fixed instant.
pub(crate) struct FixedClock(pub(crate) chrono::DateTime<Utc>);

impl mockable::Clock for FixedClock {
    fn local(&self) -> chrono::DateTime<chrono::Local> {
        self.0.with_timezone(&chrono::Local)
    }

    fn utc(&self) -> chrono::DateTime<Utc> {
        self.0
    }
}

pub(crate) fn fixed_clock() -> std::sync::Arc<dyn mockable::Clock> {
    std::sync::Arc::new(FixedClock(
        Utc.with_ymd_and_hms(2026, 2, 1, 9, 30, 0)
            .single()
            .expect("valid timestamp"),
    ))
}
