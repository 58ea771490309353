mod auth;
mod home;
mod upload;
mod users;
mod videos;

pub use users::register;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::StorageConfig;
use crate::middleware::auth::auth_middleware;
use crate::services::local::ASSETS_ROUTE;
use crate::state::AppState;

/// Room for multipart boundaries and headers on top of the payload cap.
const MULTIPART_OVERHEAD: u64 = 1 << 20;

#[derive(OpenApi)]
#[openapi(
    paths(
        home::root,
        home::healthz,
        users::create_user,
        auth::login,
        videos::create_video,
        videos::list_videos,
        videos::get_video,
        upload::upload_thumbnail,
        upload::upload_video,
    ),
    components(
        schemas(
            auth::LoginRequest,
            auth::LoginResponse,
            users::CreateUserRequest,
            users::UserResponse,
            videos::CreateVideoRequest,
            crate::models::VideoResponse,
            crate::models::AssetReference,
        )
    ),
    tags(
        (name = "General", description = "General API information"),
        (name = "Users", description = "Account creation"),
        (name = "Authentication", description = "Login and token issuance"),
        (name = "Videos", description = "Video records owned by the caller"),
        (name = "Uploads", description = "Thumbnail and video file uploads")
    ),
    info(
        title = "Tubekit API",
        version = "0.1.0",
        description = "Video metadata and asset upload service",
    ),
    modifiers(&SecurityAddon)
)]
struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::Http::new(
                        utoipa::openapi::security::HttpAuthScheme::Bearer,
                    ),
                ),
            );
        }
    }
}

fn body_limit(payload_cap: u64) -> DefaultBodyLimit {
    let limit = payload_cap.saturating_add(MULTIPART_OVERHEAD);
    DefaultBodyLimit::max(usize::try_from(limit).unwrap_or(usize::MAX))
}

pub fn create_routes(state: AppState) -> Router {
    let swagger_router: Router = SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .into();

    // Routes that need a bearer token
    let protected_routes = Router::new()
        .route(
            "/api/videos",
            post(videos::create_video).get(videos::list_videos),
        )
        .route("/api/videos/{video_id}", get(videos::get_video))
        .route(
            "/api/thumbnail_upload/{video_id}",
            post(upload::upload_thumbnail).layer(body_limit(state.config.thumbnail_max_bytes)),
        )
        .route(
            "/api/video_upload/{video_id}",
            post(upload::upload_video).layer(body_limit(state.config.video_max_bytes)),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let mut app_routes = Router::new()
        .route("/", get(home::root))
        .route("/api/healthz", get(home::healthz))
        .route("/api/users", post(users::create_user))
        .route("/api/login", post(auth::login))
        .merge(protected_routes)
        .with_state(state.clone());

    if let StorageConfig::Local { assets_root, .. } = &state.config.storage {
        app_routes = app_routes.nest_service(ASSETS_ROUTE, ServeDir::new(assets_root));
    }

    Router::new()
        .merge(swagger_router)
        .merge(app_routes)
        .layer(TraceLayer::new_for_http())
}
