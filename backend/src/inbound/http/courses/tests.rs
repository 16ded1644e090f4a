//! Tests for the course handlers.

use super::*;
use crate::domain::test_fixtures::{course_owned_by, identity_with};
use crate::domain::{CourseAction, Forbidden, OwnershipError, Role};
use crate::inbound::http::test_utils::{
    MockPorts, TestAuth, multipart_body, multipart_content_type,
};
use crate::middleware::Authenticate;
use actix_web::http::StatusCode;
use actix_web::http::header::{AUTHORIZATION, CONTENT_TYPE};
use actix_web::{App, test as actix_test};
use rstest::rstest;
use serde_json::{Value, json};

fn test_app(
    ports: MockPorts,
    authenticate: Authenticate,
) -> App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse<impl actix_web::body::MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(web::Data::new(ports.into_state()))
        .app_data(crate::inbound::http::multipart::form_config())
        .service(
            web::scope("/api/v1")
                .wrap(authenticate)
                .service(list_courses)
                .service(get_course)
                .service(create_course_multipart)
                .service(create_course)
                .service(update_course_multipart)
                .service(update_course)
                .service(delete_course),
        )
}

#[rstest]
#[actix_web::test]
async fn catalogue_is_public() {
    let mut ports = MockPorts::default();
    ports
        .course_query
        .expect_list()
        .times(1)
        .returning(|| Ok(vec![course_owned_by(2)]));
    let app = actix_test::init_service(test_app(ports, TestAuth::new(vec![]).middleware())).await;

    let request = actix_test::TestRequest::get()
        .uri("/api/v1/courses")
        .to_request();
    let body: Value = actix_test::call_and_read_body_json(&app, request).await;

    assert_eq!(body[0]["id"], 100);
    assert_eq!(body[0]["ownerId"], 2);
    assert_eq!(body[0]["price"], "25.00");
    assert_eq!(body[0]["deliveryMode"], "in person");
}

#[rstest]
#[actix_web::test]
async fn missing_course_is_not_found() {
    let mut ports = MockPorts::default();
    ports.course_query.expect_get().returning(|_| Ok(None));
    let app = actix_test::init_service(test_app(ports, TestAuth::new(vec![]).middleware())).await;

    let request = actix_test::TestRequest::get()
        .uri("/api/v1/courses/404")
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[rstest]
#[actix_web::test]
async fn creating_requires_a_token() {
    let mut ports = MockPorts::default();
    ports.courses.expect_create().times(0);
    let app = actix_test::init_service(test_app(ports, TestAuth::new(vec![]).middleware())).await;

    let request = actix_test::TestRequest::post()
        .uri("/api/v1/courses")
        .set_json(json!({
            "name": "Pottery",
            "category": "Art",
            "price": "25.00",
            "deliveryMode": "in person"
        }))
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[rstest]
#[case(json!("25.00"), "25.00")]
#[case(json!(25.5), "25.5")]
#[actix_web::test]
async fn json_create_accepts_string_or_number_prices(
    #[case] price: Value,
    #[case] expected: &'static str,
) {
    let auth = TestAuth::new(vec![identity_with(2, Role::Instructor)]);
    let mut ports = MockPorts::default();
    ports
        .courses
        .expect_create()
        .withf(move |identity, submission| {
            identity.id.get() == 2
                && submission.fields.price == expected
                && submission.cover.is_none()
        })
        .times(1)
        .returning(|identity, _| Ok(course_owned_by(identity.id.get())));
    let app = actix_test::init_service(test_app(ports, auth.middleware())).await;

    let request = actix_test::TestRequest::post()
        .uri("/api/v1/courses")
        .insert_header((AUTHORIZATION, auth.bearer(2)))
        .set_json(json!({
            "name": "Pottery",
            "category": "Art",
            "price": price,
            "deliveryMode": "in person"
        }))
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(
        response
            .headers()
            .get("Location")
            .and_then(|value| value.to_str().ok()),
        Some("/api/v1/courses/100")
    );
}

#[rstest]
#[actix_web::test]
async fn multipart_create_carries_the_cover() {
    let auth = TestAuth::new(vec![identity_with(2, Role::Instructor)]);
    let mut ports = MockPorts::default();
    ports
        .courses
        .expect_create()
        .withf(|_, submission| {
            submission.fields.name == "Pottery"
                && submission.fields.delivery_mode == "online"
                && submission
                    .cover
                    .as_ref()
                    .is_some_and(|cover| cover.name() == "cover.png" && cover.bytes() == b"png")
        })
        .times(1)
        .returning(|identity, _| Ok(course_owned_by(identity.id.get())));
    let app = actix_test::init_service(test_app(ports, auth.middleware())).await;

    let body = multipart_body(&[
        ("name", None, &b"Pottery"[..]),
        ("category", None, &b"Art"[..]),
        ("price", None, &b"25"[..]),
        ("deliveryMode", None, &b"online"[..]),
        ("cover", Some("cover.png"), &b"png"[..]),
    ]);
    let request = actix_test::TestRequest::post()
        .uri("/api/v1/courses")
        .insert_header((AUTHORIZATION, auth.bearer(2)))
        .insert_header((CONTENT_TYPE, multipart_content_type()))
        .set_payload(body)
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::CREATED);
}

#[rstest]
#[actix_web::test]
async fn multipart_patch_passes_only_the_sent_fields() {
    let auth = TestAuth::new(vec![identity_with(2, Role::Instructor)]);
    let mut ports = MockPorts::default();
    ports
        .courses
        .expect_update()
        .withf(|_, course_id, revision| {
            course_id.get() == 100
                && revision.fields
                    == RawCoursePatch {
                        price: Some("30.00".into()),
                        ..RawCoursePatch::default()
                    }
                && revision.cover.is_none()
        })
        .times(1)
        .returning(|_, _, _| Ok(course_owned_by(2)));
    let app = actix_test::init_service(test_app(ports, auth.middleware())).await;

    let request = actix_test::TestRequest::patch()
        .uri("/api/v1/courses/100")
        .insert_header((AUTHORIZATION, auth.bearer(2)))
        .insert_header((CONTENT_TYPE, multipart_content_type()))
        .set_payload(multipart_body(&[("price", None, &b"30.00"[..])]))
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[rstest]
#[case(Ok(()), StatusCode::NO_CONTENT)]
#[case(
    Err(OwnershipError::Forbidden(Forbidden { action: CourseAction::Delete })),
    StatusCode::FORBIDDEN
)]
#[case(
    Err(OwnershipError::NotFound { course_id: CourseId::new(100) }),
    StatusCode::NOT_FOUND
)]
#[actix_web::test]
async fn delete_reports_the_gateway_outcome(
    #[case] outcome: Result<(), OwnershipError>,
    #[case] expected: StatusCode,
) {
    let auth = TestAuth::new(vec![identity_with(3, Role::Student)]);
    let mut ports = MockPorts::default();
    ports
        .courses
        .expect_delete()
        .times(1)
        .returning(move |_, _| outcome.clone());
    let app = actix_test::init_service(test_app(ports, auth.middleware())).await;

    let request = actix_test::TestRequest::delete()
        .uri("/api/v1/courses/100")
        .insert_header((AUTHORIZATION, auth.bearer(3)))
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert_eq!(response.status(), expected);
}
