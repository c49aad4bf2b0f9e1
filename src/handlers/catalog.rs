use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::cloud::Region;
use crate::plans::{Plan, PLANS};

#[derive(Debug, Serialize, ToSchema)]
pub struct PlanResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub cpu: i32,
    /// Memory in MB
    pub ram: i32,
    /// Disk in GB
    pub storage: i32,
    pub bandwidth: String,
    pub monthly_cost: String,
    pub price_per_hour: String,
    pub instance_type: String,
}

impl From<&Plan> for PlanResponse {
    fn from(plan: &Plan) -> Self {
        Self {
            id: plan.id.to_string(),
            name: plan.name.to_string(),
            description: plan.description.to_string(),
            cpu: plan.cpu,
            ram: plan.ram,
            storage: plan.storage,
            bandwidth: plan.bandwidth.to_string(),
            monthly_cost: plan.monthly_cost.to_string(),
            price_per_hour: plan.price_per_hour.to_string(),
            instance_type: plan.instance_type.to_string(),
        }
    }
}

/// Frameworks offered when creating a web app; display data only
pub static FRAMEWORKS: [(&str, &str); 6] = [
    ("react", "React"),
    ("vue", "Vue.js"),
    ("node", "Node.js"),
    ("next", "Next.js"),
    ("angular", "Angular"),
    ("svelte", "Svelte"),
];

pub static DATABASE_TYPES: [(&str, &str); 3] = [
    ("postgresql", "PostgreSQL"),
    ("mysql", "MySQL"),
    ("mongodb", "MongoDB"),
];

#[derive(Debug, Serialize, ToSchema)]
pub struct CatalogEntryResponse {
    pub id: String,
    pub name: String,
}

fn entries(table: &[(&str, &str)]) -> Vec<CatalogEntryResponse> {
    table
        .iter()
        .map(|(id, name)| CatalogEntryResponse {
            id: id.to_string(),
            name: name.to_string(),
        })
        .collect()
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RegionResponse {
    pub id: Region,
    pub name: String,
    pub country: String,
}

/// List the plan catalogue
#[utoipa::path(
    get,
    path = "/api/plans",
    responses(
        (status = 200, description = "Available plans", body = Vec<PlanResponse>),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Catalog"
)]
pub async fn list_plans() -> Json<Vec<PlanResponse>> {
    Json(PLANS.iter().map(PlanResponse::from).collect())
}

/// List the supported regions
#[utoipa::path(
    get,
    path = "/api/regions",
    responses(
        (status = 200, description = "Supported regions", body = Vec<RegionResponse>),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Catalog"
)]
pub async fn list_regions() -> Json<Vec<RegionResponse>> {
    Json(
        Region::ALL
            .iter()
            .map(|region| RegionResponse {
                id: *region,
                name: region.display_name().to_string(),
                country: region.country().to_string(),
            })
            .collect(),
    )
}

/// List the frameworks shown in the web app form
#[utoipa::path(
    get,
    path = "/api/frameworks",
    responses(
        (status = 200, description = "Known frameworks", body = Vec<CatalogEntryResponse>),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Catalog"
)]
pub async fn list_frameworks() -> Json<Vec<CatalogEntryResponse>> {
    Json(entries(&FRAMEWORKS))
}

/// List the database types shown in the web app form
#[utoipa::path(
    get,
    path = "/api/database-types",
    responses(
        (status = 200, description = "Known database types", body = Vec<CatalogEntryResponse>),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Catalog"
)]
pub async fn list_database_types() -> Json<Vec<CatalogEntryResponse>> {
    Json(entries(&DATABASE_TYPES))
}
