//! API Router with Swagger UI

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::FromRef,
    middleware,
    routing::{get, post},
    Router,
};
use sea_orm::DatabaseConnection;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::application::UserService;
use crate::infrastructure::crypto::jwt::JwtConfig;
use crate::interfaces::http::error::{translate_api_errors, ErrorMessage};
use crate::interfaces::http::middleware::auth_middleware;
use crate::interfaces::http::modules::{auth, health, users};

/// Unified state for every route. Axum extracts the specific handler state
/// via `FromRef`.
#[derive(Clone)]
pub struct ApiState {
    pub user_service: Arc<UserService>,
    pub jwt_config: JwtConfig,
    pub db: Option<DatabaseConnection>,
    pub started_at: Arc<Instant>,
}

impl ApiState {
    pub fn new(
        user_service: Arc<UserService>,
        jwt_config: JwtConfig,
        db: Option<DatabaseConnection>,
    ) -> Self {
        Self {
            user_service,
            jwt_config,
            db,
            started_at: Arc::new(Instant::now()),
        }
    }
}

// -- FromRef implementations so each handler keeps its own State<T> extractor --

impl FromRef<ApiState> for users::UserHandlerState {
    fn from_ref(s: &ApiState) -> Self {
        users::UserHandlerState {
            user_service: Arc::clone(&s.user_service),
        }
    }
}

impl FromRef<ApiState> for auth::AuthHandlerState {
    fn from_ref(s: &ApiState) -> Self {
        auth::AuthHandlerState {
            user_service: Arc::clone(&s.user_service),
            jwt_config: s.jwt_config.clone(),
        }
    }
}

impl FromRef<ApiState> for health::HealthState {
    fn from_ref(s: &ApiState) -> Self {
        health::HealthState {
            db: s.db.clone(),
            started_at: Arc::clone(&s.started_at),
        }
    }
}

/// Security scheme modifier for OpenAPI
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("JWT Bearer token from POST /api/v1/auth"))
                        .build(),
                ),
            );
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::login,
        users::create_user,
        users::list_users,
        users::get_user,
        users::change_password,
    ),
    components(
        schemas(
            ErrorMessage,
            health::HealthResponse,
            health::ComponentHealth,
            auth::LoginRequest,
            auth::TokenResponse,
            users::UserResponse,
            users::CreateUserRequest,
            users::ChangePasswordRequest,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Server health check endpoints"),
        (name = "Authentication", description = "Login with username and password (JWT)"),
        (name = "Users", description = "User registration, lookup and password change"),
    ),
    info(
        title = "Parking Service API",
        version = "1.0.0",
        description = "User accounts for the parking management backend",
        license(name = "MIT")
    )
)]
pub struct ApiDoc;

/// Create the API router with all routes
pub fn create_api_router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/auth", post(auth::login))
        .route("/users", post(users::create_user).get(users::list_users))
        .route(
            "/users/{id}",
            get(users::get_user).patch(users::change_password),
        );

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/v1", api_routes)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(middleware::from_fn_with_state(
            state.jwt_config.clone(),
            auth_middleware,
        ))
        .layer(middleware::from_fn(translate_api_errors))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
