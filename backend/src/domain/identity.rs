//! Identity data model.
//!
//! An [`Identity`] is created at registration and never deleted. Its display
//! name and phone are changed only by the identity itself; its role only by
//! an administrator.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Validation failures for identity fields.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityValidationError {
    #[error("display name must not be empty")]
    EmptyDisplayName,
    #[error("display name must be at most {max} characters")]
    DisplayNameTooLong { max: usize },
    #[error("display name may only contain letters, numbers, spaces, apostrophes, dots, hyphens or underscores")]
    DisplayNameInvalidCharacters,
    #[error("email address must contain a local part and a domain")]
    InvalidEmail,
    #[error("phone number must contain between {min} and {max} digits")]
    InvalidPhone { min: usize, max: usize },
    #[error("unknown role `{0}`")]
    UnknownRole(String),
}

/// Numeric identity key assigned by storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityId(i64);

impl IdentityId {
    /// Wrap a stored identity key.
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

impl fmt::Display for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Maximum allowed length for a display name.
pub const DISPLAY_NAME_MAX: usize = 64;

/// Human-readable name shown next to courses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DisplayName(String);

impl DisplayName {
    /// Trim and validate a display name.
    ///
    /// ```
    /// use course_market::domain::DisplayName;
    ///
    /// assert_eq!(DisplayName::new("  Ana Souza ").unwrap().as_ref(), "Ana Souza");
    /// assert!(DisplayName::new("   ").is_err());
    /// ```
    pub fn new(raw: impl Into<String>) -> Result<Self, IdentityValidationError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(IdentityValidationError::EmptyDisplayName);
        }
        if trimmed.chars().count() > DISPLAY_NAME_MAX {
            return Err(IdentityValidationError::DisplayNameTooLong {
                max: DISPLAY_NAME_MAX,
            });
        }
        let allowed = |c: char| c.is_alphanumeric() || matches!(c, ' ' | '_' | '-' | '\'' | '.');
        if !trimmed.chars().all(allowed) {
            return Err(IdentityValidationError::DisplayNameInvalidCharacters);
        }
        Ok(Self(trimmed.to_owned()))
    }
}

impl AsRef<str> for DisplayName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<DisplayName> for String {
    fn from(value: DisplayName) -> Self {
        value.0
    }
}

impl TryFrom<String> for DisplayName {
    type Error = IdentityValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Login email, stored lower-cased so uniqueness is case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    pub fn new(raw: impl AsRef<str>) -> Result<Self, IdentityValidationError> {
        let normalised = raw.as_ref().trim().to_lowercase();
        let Some((local, domain)) = normalised.split_once('@') else {
            return Err(IdentityValidationError::InvalidEmail);
        };
        let domain_ok = !domain.is_empty()
            && !domain.contains('@')
            && domain.contains('.')
            && !domain.starts_with('.')
            && !domain.ends_with('.');
        if local.is_empty() || !domain_ok || normalised.chars().any(char::is_whitespace) {
            return Err(IdentityValidationError::InvalidEmail);
        }
        Ok(Self(normalised))
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Email> for String {
    fn from(value: Email) -> Self {
        value.0
    }
}

impl TryFrom<String> for Email {
    type Error = IdentityValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

const PHONE_DIGITS_MIN: usize = 7;
const PHONE_DIGITS_MAX: usize = 15;

/// Contact phone number as entered, restricted to dialable characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PhoneNumber(String);

impl PhoneNumber {
    pub fn new(raw: impl AsRef<str>) -> Result<Self, IdentityValidationError> {
        let trimmed = raw.as_ref().trim();
        let invalid = IdentityValidationError::InvalidPhone {
            min: PHONE_DIGITS_MIN,
            max: PHONE_DIGITS_MAX,
        };
        let dialable = |c: char| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')');
        if !trimmed.chars().all(dialable) {
            return Err(invalid);
        }
        let digits = trimmed.chars().filter(char::is_ascii_digit).count();
        if !(PHONE_DIGITS_MIN..=PHONE_DIGITS_MAX).contains(&digits) {
            return Err(invalid);
        }
        Ok(Self(trimmed.to_owned()))
    }
}

impl AsRef<str> for PhoneNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<PhoneNumber> for String {
    fn from(value: PhoneNumber) -> Self {
        value.0
    }
}

impl TryFrom<String> for PhoneNumber {
    type Error = IdentityValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Closed set of marketplace roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Instructor,
    Admin,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Instructor => "instructor",
            Self::Admin => "admin",
        }
    }

    /// Roles a caller may pick for themselves at registration.
    #[must_use]
    pub const fn is_self_assignable(self) -> bool {
        matches!(self, Self::Student | Self::Instructor)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = IdentityValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "student" => Ok(Self::Student),
            "instructor" => Ok(Self::Instructor),
            "admin" => Ok(Self::Admin),
            _ => Err(IdentityValidationError::UnknownRole(s.to_owned())),
        }
    }
}

/// A registered marketplace participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: IdentityId,
    pub display_name: DisplayName,
    pub email: Email,
    pub role: Role,
    pub phone: Option<PhoneNumber>,
    pub created_at: DateTime<Utc>,
}

impl Identity {
    /// Whether this identity bypasses ownership checks.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Fields an identity may change about itself.
///
/// `phone: Some(None)` clears the stored number.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfilePatch {
    pub display_name: Option<DisplayName>,
    pub phone: Option<Option<PhoneNumber>>,
}

impl ProfilePatch {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.phone.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Ana", true)]
    #[case("O'Neil-Smith Jr.", true)]
    #[case("", false)]
    #[case("   ", false)]
    #[case("<script>", false)]
    fn display_name_validation(#[case] raw: &str, #[case] ok: bool) {
        assert_eq!(DisplayName::new(raw).is_ok(), ok, "input: {raw:?}");
    }

    #[rstest]
    fn display_name_rejects_overlong_input() {
        let raw = "a".repeat(DISPLAY_NAME_MAX + 1);
        assert_eq!(
            DisplayName::new(raw),
            Err(IdentityValidationError::DisplayNameTooLong {
                max: DISPLAY_NAME_MAX
            })
        );
    }

    #[rstest]
    #[case("Ana@Example.COM", Some("ana@example.com"))]
    #[case("  bob@mail.co  ", Some("bob@mail.co"))]
    #[case("no-at-sign", None)]
    #[case("@example.com", None)]
    #[case("ana@localhost", None)]
    #[case("ana@@example.com", None)]
    #[case("a b@example.com", None)]
    fn email_normalises_and_validates(#[case] raw: &str, #[case] expected: Option<&str>) {
        let parsed = Email::new(raw).ok();
        assert_eq!(parsed.as_ref().map(AsRef::as_ref), expected);
    }

    #[rstest]
    #[case("+55 (11) 98765-4321", true)]
    #[case("12345", false)]
    #[case("call me", false)]
    fn phone_validation(#[case] raw: &str, #[case] ok: bool) {
        assert_eq!(PhoneNumber::new(raw).is_ok(), ok);
    }

    #[rstest]
    #[case("student", Role::Student)]
    #[case("INSTRUCTOR", Role::Instructor)]
    #[case(" admin ", Role::Admin)]
    fn role_parses_case_insensitively(#[case] raw: &str, #[case] expected: Role) {
        assert_eq!(raw.parse::<Role>(), Ok(expected));
    }

    #[rstest]
    fn unknown_role_is_rejected() {
        assert_eq!(
            "superuser".parse::<Role>(),
            Err(IdentityValidationError::UnknownRole("superuser".to_owned()))
        );
    }

    #[rstest]
    fn only_admin_is_not_self_assignable() {
        assert!(Role::Student.is_self_assignable());
        assert!(Role::Instructor.is_self_assignable());
        assert!(!Role::Admin.is_self_assignable());
    }
}
