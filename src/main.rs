use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use skyport::cloud::Region;
use skyport::config::Config;
use skyport::handlers::{
    AuthResponse, AwsCredentialsInput, CatalogEntryResponse, CreateWebAppRequest, CreateWebAppResponse,
    DeploymentLogListResponse, DeploymentLogResponse, DeploymentStatusResponse, DeploymentSummary,
    EnvVarInput, EnvironmentResponse, HealthResponse, InstanceResponse, LoginRequest,
    PlanResponse, RegionResponse, RegisterRequest, RepositoryInput, StartDeploymentBody,
    StartDeploymentResponse, WebAppDetailResponse, WebAppListResponse, WebAppResponse,
};
use skyport::models::{DeploymentStatus, InstanceStatus, LogLevel, UserResponse};
use skyport::state::AppState;
use skyport::{build_router, handlers};

/// Security scheme for Bearer token
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
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::common::health,
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::me,
        handlers::catalog::list_plans,
        handlers::catalog::list_regions,
        handlers::catalog::list_frameworks,
        handlers::catalog::list_database_types,
        handlers::webapp::create_webapp,
        handlers::webapp::list_webapps,
        handlers::webapp::get_webapp,
        handlers::deployment::start_deployment,
        handlers::deployment::get_deployment_status,
        handlers::deployment::get_deployment_logs,
    ),
    components(schemas(
        HealthResponse,
        RegisterRequest,
        LoginRequest,
        AuthResponse,
        UserResponse,
        PlanResponse,
        RegionResponse,
        Region,
        CatalogEntryResponse,
        CreateWebAppRequest,
        RepositoryInput,
        EnvVarInput,
        CreateWebAppResponse,
        WebAppResponse,
        WebAppListResponse,
        WebAppDetailResponse,
        EnvironmentResponse,
        InstanceResponse,
        DeploymentSummary,
        StartDeploymentBody,
        AwsCredentialsInput,
        StartDeploymentResponse,
        DeploymentStatusResponse,
        DeploymentLogResponse,
        DeploymentLogListResponse,
        DeploymentStatus,
        InstanceStatus,
        LogLevel,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Catalog", description = "Plans and supported regions"),
        (name = "Web Apps", description = "Web application management"),
        (name = "Deployments", description = "Start deployments and follow their progress")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env().expect("Failed to load configuration");
    let addr = config.server_addr();

    tracing::info!(
        provider = ?config.cloud.provider,
        region = %config.cloud.region,
        "Connecting to database..."
    );
    let state = AppState::new(config)
        .await
        .expect("Failed to initialize application state");
    tracing::info!("Database connection established");

    let app = build_router(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind listen address");

    tracing::info!("Server started on http://{}", addr);
    tracing::info!("Swagger UI: http://{}/swagger-ui/", addr);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await
    .expect("Server error");
}
