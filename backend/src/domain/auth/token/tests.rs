//! Issuance and verification behaviour for bearer tokens.

use super::*;
use chrono::Local;
use rstest::{fixture, rstest};

struct FixedClock(DateTime<Utc>);

impl Clock for FixedClock {
    fn local(&self) -> DateTime<Local> {
        self.0.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.0
    }
}

fn at(seconds: i64) -> Arc<dyn Clock> {
    let instant = Utc
        .timestamp_opt(1_767_225_600 + seconds, 0)
        .single()
        .expect("valid timestamp");
    Arc::new(FixedClock(instant))
}

#[fixture]
fn secret() -> Arc<SigningSecret> {
    Arc::new(SigningSecret::from_bytes(b"0123456789abcdef0123456789abcdef".to_vec()))
}

fn issue(secret: &Arc<SigningSecret>, id: i64) -> IssuedToken {
    TokenIssuer::new(Arc::clone(secret), Duration::from_secs(3600), at(0))
        .issue(IdentityId::new(id))
        .expect("token issues")
}

#[rstest]
fn issued_token_verifies_to_its_identity(secret: Arc<SigningSecret>) {
    let issued = issue(&secret, 42);
    let verifier = CredentialVerifier::new(secret, at(60));
    assert_eq!(verifier.verify(&issued.token), Ok(IdentityId::new(42)));
    assert_eq!(issued.token.split('.').count(), 3);
}

#[rstest]
fn expiry_is_one_validity_window_after_issue(secret: Arc<SigningSecret>) {
    let issued = issue(&secret, 1);
    assert_eq!(issued.expires_at, at(3600).utc());
}

#[rstest]
#[case(3599, true)]
#[case(3600, false)]
#[case(7200, false)]
fn tokens_expire_at_exp(secret: Arc<SigningSecret>, #[case] now: i64, #[case] valid: bool) {
    let issued = issue(&secret, 9);
    let outcome = CredentialVerifier::new(secret, at(now)).verify(&issued.token);
    if valid {
        assert_eq!(outcome, Ok(IdentityId::new(9)));
    } else {
        assert_eq!(outcome, Err(AuthError::Expired));
    }
}

#[rstest]
fn token_signed_with_another_secret_is_malformed(secret: Arc<SigningSecret>) {
    let issued = issue(&secret, 5);
    let other = Arc::new(SigningSecret::from_bytes(vec![9; 32]));
    let outcome = CredentialVerifier::new(other, at(1)).verify(&issued.token);
    assert!(matches!(outcome, Err(AuthError::Malformed { .. })));
}

#[rstest]
fn tampered_claims_fail_signature_check(secret: Arc<SigningSecret>) {
    let issued = issue(&secret, 5);
    let mut parts: Vec<&str> = issued.token.split('.').collect();
    let forged = URL_SAFE_NO_PAD.encode(br#"{"sub":1,"iat":0,"exp":9999999999}"#);
    parts[1] = &forged;
    let outcome = CredentialVerifier::new(secret, at(1)).verify(&parts.join("."));
    assert_eq!(
        outcome,
        Err(AuthError::Malformed {
            reason: "signature does not match"
        })
    );
}

#[rstest]
fn unsigned_algorithm_is_rejected(secret: Arc<SigningSecret>) {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none"}"#);
    let claims = URL_SAFE_NO_PAD.encode(br#"{"sub":1,"iat":0,"exp":9999999999}"#);
    let outcome = CredentialVerifier::new(secret, at(1)).verify(&format!("{header}.{claims}."));
    assert_eq!(
        outcome,
        Err(AuthError::Malformed {
            reason: "unsupported signing algorithm"
        })
    );
}

#[rstest]
#[case("abc")]
#[case("a.b")]
#[case("a.b.c.d")]
#[case("!!!.???.***")]
fn structurally_invalid_tokens_are_malformed(secret: Arc<SigningSecret>, #[case] token: &str) {
    let outcome = CredentialVerifier::new(secret, at(1)).verify(token);
    assert!(matches!(outcome, Err(AuthError::Malformed { .. })), "{token}");
}

#[rstest]
#[case(None)]
#[case(Some(""))]
#[case(Some("   "))]
#[case(Some("Bearer "))]
fn absent_or_empty_header_is_missing(secret: Arc<SigningSecret>, #[case] header: Option<&str>) {
    let outcome = CredentialVerifier::new(secret, at(1)).verify_header(header);
    assert_eq!(outcome, Err(AuthError::Missing));
}

#[rstest]
fn non_bearer_scheme_is_malformed(secret: Arc<SigningSecret>) {
    let outcome = CredentialVerifier::new(secret, at(1)).verify_header(Some("Basic dXNlcjpwYXNz"));
    assert_eq!(
        outcome,
        Err(AuthError::Malformed {
            reason: "expected the Bearer scheme"
        })
    );
}

#[rstest]
fn bearer_scheme_is_case_insensitive(secret: Arc<SigningSecret>) {
    let issued = issue(&secret, 3);
    let header = format!("bearer {}", issued.token);
    let outcome = CredentialVerifier::new(secret, at(1)).verify_header(Some(&header));
    assert_eq!(outcome, Ok(IdentityId::new(3)));
}

#[rstest]
fn secret_debug_output_hides_key_material() {
    let secret = SigningSecret::from_bytes(b"super-secret-key-material-000000".to_vec());
    let rendered = format!("{secret:?}");
    assert!(!rendered.contains("super-secret"));
    assert!(rendered.contains(&secret.fingerprint()));
}

#[rstest]
fn generated_secrets_are_long_and_distinct() {
    let first = SigningSecret::generate();
    let second = SigningSecret::generate();
    assert_eq!(first.len(), 64);
    assert!(first.len() >= MIN_SECRET_BYTES);
    assert_ne!(first.fingerprint(), second.fingerprint());
}
