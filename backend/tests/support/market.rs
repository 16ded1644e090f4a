//! In-process marketplace used by the HTTP integration suites.
//!
//! Services run over the in-memory store and a temporary blob root. The
//! application is rebuilt from the same shared services for every request so
//! state carries across calls, as it would across workers.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use actix_web::http::StatusCode;
use actix_web::http::header::{AUTHORIZATION, CONTENT_TYPE, WWW_AUTHENTICATE};
use actix_web::{test, web};
use chrono::{TimeZone, Utc};
use serde_json::{Value, json};
use tempfile::TempDir;

use course_market::domain::auth::SigningSecret;
use course_market::domain::ports::IdentityRepository;
use course_market::domain::{IdentityId, Role};
use course_market::inbound::http::health::HealthState;
use course_market::outbound::memory::InMemoryStore;
use course_market::server::{
    Adapters, AppDependencies, ServiceSettings, build_app, wire_services,
};
use course_market::test_support::clock::SteppingClock;
use course_market::test_support::multipart::{multipart_body, multipart_content_type};
use course_market::test_support::temp_blob_store;

/// Token lifetime used by the suites.
pub const TOKEN_VALIDITY: Duration = Duration::from_secs(3600);

/// A registered identity and its `Authorization` header value.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: i64,
    pub bearer: String,
}

/// Status, bearer challenge and decoded JSON body (`Value::Null` when
/// empty).
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: StatusCode,
    pub challenge: Option<String>,
    pub body: Value,
}

impl Reply {
    pub fn code(&self) -> Option<&str> {
        self.body.get("code").and_then(Value::as_str)
    }
}

pub struct TestMarket {
    deps: AppDependencies,
    store: Arc<InMemoryStore>,
    clock: Arc<SteppingClock>,
    blobs: TempDir,
}

impl TestMarket {
    pub fn new() -> Self {
        let clock = Arc::new(SteppingClock::new(
            Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0)
                .single()
                .expect("valid start"),
        ));
        let (blob_store, blobs) = temp_blob_store().expect("blob root");
        let store = Arc::new(InMemoryStore::new(clock.clone()));
        let settings = ServiceSettings::new(
            Arc::new(SigningSecret::from_bytes(vec![42; 32])),
            TOKEN_VALIDITY,
        )
        .with_clock(clock.clone());
        let services = wire_services(
            Adapters {
                identities: Arc::clone(&store),
                courses: Arc::clone(&store),
                materials: Arc::clone(&store),
                blobs: blob_store,
            },
            &settings,
        );
        Self {
            deps: AppDependencies {
                health_state: web::Data::new(HealthState::new()),
                services,
            },
            store,
            clock,
            blobs,
        }
    }

    pub fn clock(&self) -> &SteppingClock {
        &self.clock
    }

    pub fn blob_root(&self) -> &Path {
        self.blobs.path()
    }

    pub fn course_blob_dir(&self, course_id: i64) -> PathBuf {
        self.blob_root().join(format!("courses/{course_id}"))
    }

    pub async fn send(&self, request: test::TestRequest) -> Reply {
        let app = test::init_service(build_app(self.deps.clone())).await;
        let response = test::call_service(&app, request.to_request()).await;
        let status = response.status();
        let challenge = response
            .headers()
            .get(WWW_AUTHENTICATE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let bytes = test::read_body(response).await;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        Reply {
            status,
            challenge,
            body,
        }
    }

    /// Register and log in, returning the new identity's bearer header.
    pub async fn sign_up(&self, display_name: &str, role: &str) -> Account {
        let email = format!("{}@example.com", display_name.to_lowercase());
        let registered = self
            .send(test::TestRequest::post().uri("/api/v1/register").set_json(json!({
                "displayName": display_name,
                "email": email,
                "password": "correct horse battery",
                "role": role,
            })))
            .await;
        assert_eq!(registered.status, StatusCode::CREATED, "{:?}", registered.body);
        let id = registered.body["id"].as_i64().expect("identity id");

        let login = self
            .send(test::TestRequest::post().uri("/api/v1/login").set_json(json!({
                "email": email,
                "password": "correct horse battery",
            })))
            .await;
        assert_eq!(login.status, StatusCode::OK, "{:?}", login.body);
        let token = login.body["token"].as_str().expect("token");
        Account {
            id,
            bearer: format!("Bearer {token}"),
        }
    }

    /// Registration never grants ADMIN, so administrators are seeded through
    /// the store.
    pub async fn sign_up_admin(&self, display_name: &str) -> Account {
        let account = self.sign_up(display_name, "student").await;
        self.store
            .update_role(IdentityId::new(account.id), Role::Admin)
            .await
            .expect("role updated")
            .expect("identity exists");
        account
    }

    pub async fn create_course(&self, owner: &Account, name: &str) -> i64 {
        let reply = self
            .send(
                test::TestRequest::post()
                    .uri("/api/v1/courses")
                    .insert_header((AUTHORIZATION, owner.bearer.as_str()))
                    .set_json(json!({
                        "name": name,
                        "category": "Crafts",
                        "price": "40.00",
                        "deliveryMode": "online",
                    })),
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED, "{:?}", reply.body);
        reply.body["id"].as_i64().expect("course id")
    }

    pub fn upload_request(
        account: &Account,
        course_id: i64,
        files: &[(&str, &[u8])],
    ) -> test::TestRequest {
        let parts: Vec<_> = files
            .iter()
            .map(|(name, content)| ("files", Some(*name), *content))
            .collect();
        test::TestRequest::post()
            .uri(&format!("/api/v1/courses/{course_id}/materials"))
            .insert_header((AUTHORIZATION, account.bearer.as_str()))
            .insert_header((CONTENT_TYPE, multipart_content_type()))
            .set_payload(multipart_body(&parts))
    }

    pub async fn upload(
        &self,
        account: &Account,
        course_id: i64,
        files: &[(&str, &[u8])],
    ) -> Reply {
        self.send(Self::upload_request(account, course_id, files))
            .await
    }

    pub async fn get(&self, path: &str, account: Option<&Account>) -> Reply {
        let mut request = test::TestRequest::get().uri(path);
        if let Some(account) = account {
            request = request.insert_header((AUTHORIZATION, account.bearer.as_str()));
        }
        self.send(request).await
    }

    pub async fn delete(&self, path: &str, account: &Account) -> Reply {
        self.send(
            test::TestRequest::delete()
                .uri(path)
                .insert_header((AUTHORIZATION, account.bearer.as_str())),
        )
        .await
    }

    pub async fn patch_json(&self, path: &str, account: &Account, body: Value) -> Reply {
        self.send(
            test::TestRequest::patch()
                .uri(path)
                .insert_header((AUTHORIZATION, account.bearer.as_str()))
                .set_json(body),
        )
        .await
    }
}
