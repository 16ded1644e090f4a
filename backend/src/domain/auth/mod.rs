//! Authentication primitives: bearer tokens, credentials and their failures.
//!
//! Inbound adapters parse raw strings into the validated types here before a
//! port or service sees them.

pub mod token;

use zeroize::Zeroizing;

use super::{
    DisplayName, Email, Error, ErrorCode, IdentityId, IdentityValidationError, PhoneNumber, Role,
};

pub use token::{
    CredentialVerifier, IssuedToken, SigningSecret, TokenIssuer, DEFAULT_TOKEN_VALIDITY,
    MIN_SECRET_BYTES,
};

/// Why a request could not be tied to a registered identity.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("bearer token required")]
    Missing,
    #[error("bearer token is malformed: {reason}")]
    Malformed { reason: &'static str },
    #[error("bearer token has expired")]
    Expired,
    #[error("identity {id} is not registered")]
    UnknownIdentity { id: IdentityId },
    #[error("identity store unavailable: {message}")]
    Unavailable { message: String },
}

impl From<AuthError> for Error {
    fn from(value: AuthError) -> Self {
        let code = match &value {
            AuthError::Missing => ErrorCode::TokenMissing,
            AuthError::Malformed { .. } => ErrorCode::TokenMalformed,
            AuthError::Expired => ErrorCode::TokenExpired,
            AuthError::UnknownIdentity { .. } => ErrorCode::Unauthorized,
            AuthError::Unavailable { .. } => ErrorCode::Transient,
        };
        match value {
            AuthError::UnknownIdentity { .. } => Self::new(code, "unknown identity"),
            AuthError::Unavailable { .. } => Self::new(code, "identity store unavailable"),
            other => Self::new(code, other.to_string()),
        }
    }
}

/// Minimum accepted password length at registration.
pub const PASSWORD_MIN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialValidationError {
    #[error("password must not be empty")]
    EmptyPassword,
    #[error("password must be at least {min} characters")]
    PasswordTooShort { min: usize },
    #[error("role `{role}` cannot be chosen at registration")]
    RoleNotSelfAssignable { role: Role },
    #[error(transparent)]
    Identity(#[from] IdentityValidationError),
}

impl From<CredentialValidationError> for Error {
    fn from(value: CredentialValidationError) -> Self {
        Self::invalid_request(value.to_string())
    }
}

/// Email and password presented at login.
///
/// ```
/// use course_market::domain::auth::LoginCredentials;
///
/// let creds = LoginCredentials::try_from_parts("Ana@Example.com", "hunter22").unwrap();
/// assert_eq!(creds.email().as_ref(), "ana@example.com");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    email: Email,
    password: Zeroizing<String>,
}

impl LoginCredentials {
    pub fn try_from_parts(email: &str, password: &str) -> Result<Self, CredentialValidationError> {
        let email = Email::new(email)?;
        if password.is_empty() {
            return Err(CredentialValidationError::EmptyPassword);
        }
        Ok(Self {
            email,
            password: Zeroizing::new(password.to_owned()),
        })
    }

    #[must_use]
    pub const fn email(&self) -> &Email {
        &self.email
    }

    #[must_use]
    pub fn password(&self) -> &str {
        self.password.as_str()
    }
}

/// Validated sign-up request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub display_name: DisplayName,
    pub email: Email,
    pub role: Role,
    pub phone: Option<PhoneNumber>,
    password: Zeroizing<String>,
}

/// Raw sign-up fields as supplied by a caller.
#[derive(Debug, Clone, Default)]
pub struct RegistrationForm<'a> {
    pub display_name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub role: Option<&'a str>,
    pub phone: Option<&'a str>,
}

impl Registration {
    /// Validate a sign-up form. The role defaults to student; admin is refused.
    pub fn try_from_form(form: &RegistrationForm<'_>) -> Result<Self, CredentialValidationError> {
        let role = form
            .role
            .map(str::parse::<Role>)
            .transpose()?
            .unwrap_or(Role::Student);
        if !role.is_self_assignable() {
            return Err(CredentialValidationError::RoleNotSelfAssignable { role });
        }
        if form.password.chars().count() < PASSWORD_MIN {
            return Err(CredentialValidationError::PasswordTooShort { min: PASSWORD_MIN });
        }
        Ok(Self {
            display_name: DisplayName::new(form.display_name)?,
            email: Email::new(form.email)?,
            role,
            phone: form
                .phone
                .filter(|raw| !raw.trim().is_empty())
                .map(PhoneNumber::new)
                .transpose()?,
            password: Zeroizing::new(form.password.to_owned()),
        })
    }

    #[must_use]
    pub fn password(&self) -> &str {
        self.password.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn form<'a>(role: Option<&'a str>, password: &'a str) -> RegistrationForm<'a> {
        RegistrationForm {
            display_name: "Ana",
            email: "ana@example.com",
            password,
            role,
            phone: None,
        }
    }

    #[rstest]
    #[case(None, Role::Student)]
    #[case(Some("student"), Role::Student)]
    #[case(Some("Instructor"), Role::Instructor)]
    fn registration_accepts_self_assignable_roles(
        #[case] role: Option<&str>,
        #[case] expected: Role,
    ) {
        let registration =
            Registration::try_from_form(&form(role, "longenough")).expect("valid form");
        assert_eq!(registration.role, expected);
    }

    #[rstest]
    fn registration_refuses_admin() {
        let err = Registration::try_from_form(&form(Some("admin"), "longenough"))
            .expect_err("admin is not self-assignable");
        assert_eq!(
            err,
            CredentialValidationError::RoleNotSelfAssignable { role: Role::Admin }
        );
    }

    #[rstest]
    fn registration_requires_minimum_password_length() {
        let err = Registration::try_from_form(&form(None, "short")).expect_err("too short");
        assert_eq!(
            err,
            CredentialValidationError::PasswordTooShort { min: PASSWORD_MIN }
        );
    }

    #[rstest]
    fn login_rejects_empty_password() {
        assert_eq!(
            LoginCredentials::try_from_parts("ana@example.com", ""),
            Err(CredentialValidationError::EmptyPassword)
        );
    }

    #[rstest]
    #[case(AuthError::Missing, ErrorCode::TokenMissing)]
    #[case(AuthError::Malformed { reason: "x" }, ErrorCode::TokenMalformed)]
    #[case(AuthError::Expired, ErrorCode::TokenExpired)]
    #[case(AuthError::UnknownIdentity { id: IdentityId::new(4) }, ErrorCode::Unauthorized)]
    #[case(AuthError::Unavailable { message: "pool".into() }, ErrorCode::Transient)]
    fn auth_errors_map_to_stable_codes(#[case] error: AuthError, #[case] code: ErrorCode) {
        assert_eq!(Error::from(error).code(), code);
    }
}
