//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `backend/migrations` exactly. When a
//! migration changes the schema, regenerate with `diesel print-schema` or
//! update by hand.

diesel::table! {
    /// Registered identities.
    identities (id) {
        id -> Int8,
        display_name -> Varchar,
        /// Lower-cased, unique.
        email -> Varchar,
        /// One of `student`, `instructor`, `admin`.
        role -> Varchar,
        phone -> Nullable<Varchar>,
        password_hash -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Published courses. `owner_id` is guarded by a trigger and never
    /// changes after insert.
    courses (id) {
        id -> Int8,
        owner_id -> Int8,
        name -> Varchar,
        description -> Text,
        category -> Varchar,
        /// Price in minor currency units.
        price_minor -> Int8,
        delivery_mode -> Varchar,
        schedule -> Text,
        cover_image_ref -> Nullable<Text>,
        rating -> Float8,
        reviews -> Array<Text>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Materials attached to a course, ordered by `seq`.
    course_materials (id) {
        id -> Uuid,
        seq -> Int8,
        course_id -> Int8,
        name -> Text,
        /// `durable` or `cached`.
        source_kind -> Varchar,
        /// Blob path for durable materials, cache key for cached ones.
        location -> Text,
        content_type -> Varchar,
        size_bytes -> Int8,
        uploaded_at -> Timestamptz,
        uploaded_by -> Int8,
    }
}

diesel::joinable!(courses -> identities (owner_id));
diesel::joinable!(course_materials -> courses (course_id));

diesel::allow_tables_to_appear_in_same_query!(identities, courses, course_materials);
