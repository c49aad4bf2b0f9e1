use sea_orm::DatabaseConnection;
use uuid::Uuid;

use crate::cloud::Region;
use crate::error::{AppError, AppResult};
use crate::models::{CreateWebApp, CreatedWebApp};
use crate::plans::{self, Plan};
use crate::repositories::WebAppRepository;

const MIN_NAME_LEN: usize = 3;
const PORT_RANGE: std::ops::RangeInclusive<i32> = 1024..=65535;

pub struct WebAppService;

impl WebAppService {
    /// Check a creation request, returning the plan it resolves to
    pub fn validate(input: &CreateWebApp) -> AppResult<&'static Plan> {
        if input.name.trim().chars().count() < MIN_NAME_LEN {
            return Err(AppError::Validation(format!(
                "Name must be at least {} characters",
                MIN_NAME_LEN
            )));
        }

        input.region.parse::<Region>()?;
        let plan = plans::require_plan(&input.plan)?;

        let required = [
            ("Framework", &input.framework),
            ("Repository provider", &input.repository.provider),
            ("Repository owner", &input.repository.owner),
            ("Repository name", &input.repository.repo),
            ("Branch", &input.repository.branch),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(AppError::Validation(format!("{} is required", field)));
            }
        }

        if !PORT_RANGE.contains(&input.port) {
            return Err(AppError::Validation(format!(
                "Port must be between {} and {}",
                PORT_RANGE.start(),
                PORT_RANGE.end()
            )));
        }

        if input.env_vars.iter().any(|var| var.key.trim().is_empty()) {
            return Err(AppError::Validation(
                "Environment variable keys must not be empty".to_string(),
            ));
        }

        Ok(plan)
    }

    pub async fn create(
        db: &DatabaseConnection,
        user_id: Uuid,
        input: &CreateWebApp,
    ) -> AppResult<CreatedWebApp> {
        let plan = Self::validate(input)?;
        let created = WebAppRepository::create(db, user_id, input, plan).await?;

        tracing::info!(
            web_app_id = %created.web_app_id,
            deployment_id = %created.deployment_id,
            plan = plan.id,
            region = %input.region,
            "Web app created"
        );
        Ok(created)
    }
}
