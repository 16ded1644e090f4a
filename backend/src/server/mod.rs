//! Server construction and middleware wiring.

mod config;
mod state_builders;

pub use config::{MarketSettings, ServerConfig, SettingsError};
pub use state_builders::{
    Adapters, AppServices, ServiceSettings, build_services, wire_services,
};

use std::sync::Arc;

use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};
use tracing::info;
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

use crate::Trace;
#[cfg(debug_assertions)]
use crate::doc::ApiDoc;
use crate::domain::Error;
use crate::inbound::http::courses::{
    create_course, create_course_multipart, delete_course, get_course, list_courses,
    update_course, update_course_multipart,
};
use crate::inbound::http::health::{HealthState, live, ready};
use crate::inbound::http::materials::{
    append_materials, list_materials, remove_material, remove_materials_by_name,
};
use crate::inbound::http::multipart;
use crate::inbound::http::users::{
    assign_role, current_user, login, register, update_current_user,
};
use crate::middleware::Authenticate;
use crate::outbound::blob::CapStdBlobStore;

/// Shared state cloned into every worker's `App`.
#[derive(Clone)]
pub struct AppDependencies {
    pub health_state: web::Data<HealthState>,
    pub services: AppServices,
}

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req| Error::invalid_request(err.to_string()).into())
}

fn query_config() -> web::QueryConfig {
    web::QueryConfig::default()
        .error_handler(|err, _req| Error::invalid_request(err.to_string()).into())
}

fn path_config() -> web::PathConfig {
    web::PathConfig::default()
        .error_handler(|err, _req| Error::invalid_request(err.to_string()).into())
}

/// Assemble the application: `Trace` outermost, bearer authentication on
/// `/api/v1`, health checks outside it.
pub fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl actix_web::body::MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let AppDependencies {
        health_state,
        services,
    } = deps;

    let api = web::scope("/api/v1")
        .wrap(Authenticate::new(services.authenticator))
        .service(register)
        .service(login)
        .service(current_user)
        .service(update_current_user)
        .service(assign_role)
        .service(list_courses)
        .service(get_course)
        .service(create_course_multipart)
        .service(create_course)
        .service(update_course_multipart)
        .service(update_course)
        .service(delete_course)
        .service(list_materials)
        .service(append_materials)
        .service(remove_material)
        .service(remove_materials_by_name);

    let app = App::new()
        .app_data(health_state)
        .app_data(web::Data::new(services.http_state))
        .app_data(json_config())
        .app_data(query_config())
        .app_data(path_config())
        .app_data(multipart::form_config())
        .wrap(Trace)
        .service(api)
        .service(ready)
        .service(live);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));

    app
}

/// Construct an Actix HTTP server using the provided health state and
/// configuration.
///
/// # Errors
/// Propagates [`std::io::Error`] when the blob root cannot be opened or the
/// socket cannot be bound.
pub fn create_server(
    health_state: web::Data<HealthState>,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let blobs = Arc::new(CapStdBlobStore::open(&config.blob_root)?);
    let settings = ServiceSettings::new(Arc::clone(&config.secret), config.token_validity)
        .with_policy(config.policy.clone());
    let services = build_services(config.db_pool.as_ref(), blobs, &settings);
    info!(
        bind_addr = %config.bind_addr,
        blob_root = %config.blob_root.display(),
        persistence = if config.db_pool.is_some() { "postgres" } else { "memory" },
        "starting HTTP server"
    );

    let deps = AppDependencies {
        health_state: health_state.clone(),
        services,
    };
    let server = HttpServer::new(move || build_app(deps.clone()))
        .bind(config.bind_addr)?
        .run();

    health_state.mark_ready();
    Ok(server)
}
