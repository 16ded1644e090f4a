//! Course data model.
//!
//! A course is owned by the identity that created it. `owner_id` is fixed at
//! creation and no operation in this crate changes it.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{IdentityId, MaterialRef};

/// Validation failures for course fields.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CourseValidationError {
    #[error("{field} must not be empty")]
    EmptyField { field: &'static str },
    #[error("{field} must be at most {max} characters")]
    FieldTooLong { field: &'static str, max: usize },
    #[error("price must be a non-negative amount with at most two decimal places")]
    InvalidPrice,
    #[error("rating must be between 0 and 5")]
    InvalidRating,
}

/// Numeric course key assigned by storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CourseId(i64);

impl CourseId {
    /// Wrap a stored course key.
    #[must_use]
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// The raw database key.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for CourseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Non-negative price held in minor currency units.
///
/// ```
/// use course_market::domain::Price;
///
/// let price: Price = "19.9".parse().unwrap();
/// assert_eq!(price.minor_units(), 1990);
/// assert_eq!(price.to_string(), "19.90");
/// assert!("-1".parse::<Price>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Price(u64);

impl Price {
    /// Largest amount storable as a signed 64-bit column.
    pub const MAX_MINOR_UNITS: u64 = i64::MAX.unsigned_abs();

    /// Wrap an amount already expressed in minor units.
    #[must_use]
    pub const fn from_minor_units(units: u64) -> Self {
        Self(units)
    }

    /// The amount in minor units (cents).
    #[must_use]
    pub const fn minor_units(self) -> u64 {
        self.0
    }
}

impl FromStr for Price {
    type Err = CourseValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (whole, fraction) = trimmed.split_once('.').unwrap_or((trimmed, ""));
        let digits_only = |part: &str| part.chars().all(|c| c.is_ascii_digit());
        if whole.is_empty() || !digits_only(whole) || !digits_only(fraction) || fraction.len() > 2
        {
            return Err(CourseValidationError::InvalidPrice);
        }
        let whole: u64 = whole
            .parse()
            .map_err(|_| CourseValidationError::InvalidPrice)?;
        let cents: u64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<u64>().map(|tenths| tenths * 10).unwrap_or(0),
            _ => fraction.parse().unwrap_or(0),
        };
        whole
            .checked_mul(100)
            .and_then(|units| units.checked_add(cents))
            .filter(|units| *units <= Self::MAX_MINOR_UNITS)
            .map(Self)
            .ok_or(CourseValidationError::InvalidPrice)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl Serialize for Price {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Average review score in `[0, 5]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Rating(f64);

impl Rating {
    pub const ZERO: Self = Self(0.0);

    /// Rating in the inclusive range 0 to 5.
    pub fn new(value: f64) -> Result<Self, CourseValidationError> {
        if value.is_finite() && (0.0..=5.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(CourseValidationError::InvalidRating)
        }
    }

    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Rating {
    type Error = CourseValidationError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for f64 {
    fn from(value: Rating) -> Self {
        value.0
    }
}

/// Trimmed, non-empty, length-bounded text field.
fn required_text(
    field: &'static str,
    raw: &str,
    max: usize,
) -> Result<String, CourseValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CourseValidationError::EmptyField { field });
    }
    if trimmed.chars().count() > max {
        return Err(CourseValidationError::FieldTooLong { field, max });
    }
    Ok(trimmed.to_owned())
}

const NAME_MAX: usize = 120;
const SHORT_TEXT_MAX: usize = 80;
const DESCRIPTION_MAX: usize = 5_000;

/// Descriptive fields shared by creation and patching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseDetails {
    pub name: String,
    pub description: String,
    pub category: String,
    pub price: Price,
    pub delivery_mode: String,
    pub schedule: String,
}

/// Raw, unvalidated course fields as received from a caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CourseFields {
    pub name: String,
    pub description: String,
    pub category: String,
    pub price: String,
    pub delivery_mode: String,
    pub schedule: String,
}

impl CourseFields {
    /// Validate every field, producing the details stored for a new course.
    pub fn validate(&self) -> Result<CourseDetails, CourseValidationError> {
        Ok(CourseDetails {
            name: required_text("name", &self.name, NAME_MAX)?,
            description: self.description.trim().chars().take(DESCRIPTION_MAX).collect(),
            category: required_text("category", &self.category, SHORT_TEXT_MAX)?,
            price: self.price.parse()?,
            delivery_mode: required_text("deliveryMode", &self.delivery_mode, SHORT_TEXT_MAX)?,
            schedule: self.schedule.trim().to_owned(),
        })
    }
}

/// Partial update; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoursePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Option<Price>,
    pub delivery_mode: Option<String>,
    pub schedule: Option<String>,
    pub cover_image_ref: Option<String>,
}

impl CoursePatch {
    /// Build a patch from raw optional inputs, validating whichever are set.
    pub fn from_raw(
        fields: RawCoursePatch,
        cover_image_ref: Option<String>,
    ) -> Result<Self, CourseValidationError> {
        let RawCoursePatch {
            name,
            description,
            category,
            price,
            delivery_mode,
            schedule,
        } = fields;
        Ok(Self {
            name: name
                .map(|v| required_text("name", &v, NAME_MAX))
                .transpose()?,
            description: description.map(|v| v.trim().chars().take(DESCRIPTION_MAX).collect()),
            category: category
                .map(|v| required_text("category", &v, SHORT_TEXT_MAX))
                .transpose()?,
            price: price.map(|v| v.parse()).transpose()?,
            delivery_mode: delivery_mode
                .map(|v| required_text("deliveryMode", &v, SHORT_TEXT_MAX))
                .transpose()?,
            schedule: schedule.map(|v| v.trim().to_owned()),
            cover_image_ref,
        })
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.price.is_none()
            && self.delivery_mode.is_none()
            && self.schedule.is_none()
            && self.cover_image_ref.is_none()
    }

    /// Apply the set fields onto `details`.
    pub fn apply_to(&self, details: &mut CourseDetails) {
        if let Some(name) = &self.name {
            details.name.clone_from(name);
        }
        if let Some(description) = &self.description {
            details.description.clone_from(description);
        }
        if let Some(category) = &self.category {
            details.category.clone_from(category);
        }
        if let Some(price) = self.price {
            details.price = price;
        }
        if let Some(mode) = &self.delivery_mode {
            details.delivery_mode.clone_from(mode);
        }
        if let Some(schedule) = &self.schedule {
            details.schedule.clone_from(schedule);
        }
    }
}

/// Unvalidated optional fields of a patch request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawCoursePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Option<String>,
    pub delivery_mode: Option<String>,
    pub schedule: Option<String>,
}

/// A course listing together with its ordered materials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: CourseId,
    pub owner_id: IdentityId,
    #[serde(flatten)]
    pub details: CourseDetails,
    pub cover_image_ref: Option<String>,
    pub rating: Rating,
    pub reviews: Vec<String>,
    pub materials: Vec<MaterialRef>,
    pub created_at: DateTime<Utc>,
}

/// Everything storage needs to insert a new course row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCourse {
    pub owner_id: IdentityId,
    pub details: CourseDetails,
    pub cover_image_ref: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("0", 0)]
    #[case("10", 1000)]
    #[case("19.9", 1990)]
    #[case("19.99", 1999)]
    #[case(" 7.05 ", 705)]
    #[case("92233720368547758.07", Price::MAX_MINOR_UNITS)]
    fn price_parses_decimal_amounts(#[case] raw: &str, #[case] minor: u64) {
        assert_eq!(raw.parse::<Price>().map(Price::minor_units), Ok(minor));
    }

    #[rstest]
    #[case("")]
    #[case("-1")]
    #[case("1.999")]
    #[case("abc")]
    #[case(".5")]
    #[case("1e3")]
    #[case("92233720368547758.08")]
    #[case("184467440737095516.15")]
    fn price_rejects_invalid_amounts(#[case] raw: &str) {
        assert_eq!(raw.parse::<Price>(), Err(CourseValidationError::InvalidPrice));
    }

    #[rstest]
    fn price_serialises_as_two_decimal_string() {
        let price = Price::from_minor_units(5);
        assert_eq!(serde_json::to_value(price).expect("serialise"), "0.05");
    }

    #[rstest]
    #[case(0.0, true)]
    #[case(4.5, true)]
    #[case(5.0, true)]
    #[case(5.1, false)]
    #[case(-0.1, false)]
    #[case(f64::NAN, false)]
    fn rating_stays_in_range(#[case] value: f64, #[case] ok: bool) {
        assert_eq!(Rating::new(value).is_ok(), ok);
    }

    fn fields() -> CourseFields {
        CourseFields {
            name: " Guitar basics ".into(),
            description: "Chords and rhythm".into(),
            category: "Music".into(),
            price: "49.90".into(),
            delivery_mode: "online".into(),
            schedule: "Saturdays".into(),
        }
    }

    #[rstest]
    fn fields_validate_and_trim() {
        let details = fields().validate().expect("valid fields");
        assert_eq!(details.name, "Guitar basics");
        assert_eq!(details.price.minor_units(), 4990);
    }

    #[rstest]
    fn fields_reject_blank_name() {
        let mut raw = fields();
        raw.name = "  ".into();
        assert_eq!(
            raw.validate(),
            Err(CourseValidationError::EmptyField { field: "name" })
        );
    }

    #[rstest]
    fn patch_applies_only_present_fields() {
        let mut details = fields().validate().expect("valid fields");
        let patch = CoursePatch::from_raw(
            RawCoursePatch {
                price: Some("10".into()),
                ..RawCoursePatch::default()
            },
            None,
        )
        .expect("valid patch");
        patch.apply_to(&mut details);
        assert_eq!(details.price.minor_units(), 1000);
        assert_eq!(details.name, "Guitar basics");
        assert_eq!(details.category, "Music");
    }

    #[rstest]
    fn empty_patch_is_detected() {
        assert!(CoursePatch::default().is_empty());
        let patch = CoursePatch {
            cover_image_ref: Some("covers/x.png".into()),
            ..CoursePatch::default()
        };
        assert!(!patch.is_empty());
    }
}
