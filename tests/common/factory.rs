use time::OffsetDateTime;
use uuid::Uuid;

use skyport::config::Config;
use skyport::models::{
    CreateUser, CreateWebApp, CreatedWebApp, Deployment, DeploymentEnvironment, DeploymentStatus,
    DeploymentWebApp, EnvVar, Instance, InstanceStatus, RepositoryRef, User,
};
use skyport::repositories::UserRepository;
use skyport::services::{AuthService, WebAppService};
use skyport::state::AppState;
use skyport::store::InMemoryDeploymentStore;

use super::TestApp;

/// Authentication info for tests
pub struct TestAuth {
    pub user_id: Uuid,
    pub email: String,
    pub token: String,
}

impl TestAuth {
    /// Get the Authorization header value
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

/// Ids of a seeded web app / environment / instance / deployment chain
#[derive(Debug, Clone, Copy)]
pub struct SeededDeployment {
    pub user_id: Uuid,
    pub web_app_id: Uuid,
    pub environment_id: Uuid,
    pub deployment_id: Uuid,
}

/// Seeds the in-memory store and issues tokens
pub struct Factory<'a> {
    store: &'a InMemoryDeploymentStore,
    config: &'a Config,
}

impl<'a> Factory<'a> {
    pub fn new(app: &'a TestApp) -> Self {
        Self {
            store: &app.store,
            config: &app.state.config,
        }
    }

    pub fn for_store(store: &'a InMemoryDeploymentStore, config: &'a Config) -> Self {
        Self { store, config }
    }

    /// A token for a fresh user id; the store does not track users
    pub fn user(&self) -> TestAuth {
        let user_id = Uuid::new_v4();
        let email = format!("test-{}@example.com", user_id);
        let token = AuthService::generate_token(user_id, &email, self.config).unwrap();

        TestAuth {
            user_id,
            email,
            token,
        }
    }

    /// `starter` plan in `us-east-1`, deployment `pending`
    pub async fn deployment(&self, user_id: Uuid) -> SeededDeployment {
        self.deployment_with(user_id, "starter", "us-east-1", DeploymentStatus::Pending)
            .await
    }

    pub async fn deployment_with(
        &self,
        user_id: Uuid,
        plan: &str,
        region: &str,
        status: DeploymentStatus,
    ) -> SeededDeployment {
        self.seed(user_id, plan, region, status, true).await
    }

    /// Pending deployment whose environment has no instance row
    pub async fn deployment_without_instance(&self, user_id: Uuid) -> SeededDeployment {
        self.seed(user_id, "starter", "us-east-1", DeploymentStatus::Pending, false)
            .await
    }

    async fn seed(
        &self,
        user_id: Uuid,
        plan: &str,
        region: &str,
        status: DeploymentStatus,
        with_instance: bool,
    ) -> SeededDeployment {
        let now = OffsetDateTime::now_utc();
        let web_app_id = Uuid::new_v4();
        let environment_id = Uuid::new_v4();
        let deployment_id = Uuid::new_v4();

        self.store
            .insert_web_app(DeploymentWebApp {
                id: web_app_id,
                user_id,
                name: format!("app-{}", &web_app_id.simple().to_string()[..8]),
                plan: plan.to_string(),
                region: region.to_string(),
            })
            .await;
        self.store
            .insert_environment(
                web_app_id,
                DeploymentEnvironment {
                    id: environment_id,
                    name: "production".to_string(),
                    branch: "main".to_string(),
                    port: 3000,
                },
            )
            .await;
        if with_instance {
            self.store
                .insert_instance(Instance {
                    id: Uuid::new_v4(),
                    environment_id,
                    cpu: 1,
                    ram: 1024,
                    storage: 10,
                    instance_type: "t2.micro".to_string(),
                    status: InstanceStatus::Pending,
                    public_ip: None,
                    provider_instance_id: None,
                    created_at: now,
                    updated_at: now,
                })
                .await;
        }
        self.store
            .insert_deployment(Deployment {
                id: deployment_id,
                web_app_id,
                environment_id,
                status,
                started_at: status.is_in_progress().then_some(now),
                finished_at: None,
                error_message: None,
                created_at: now,
                updated_at: now,
            })
            .await;

        SeededDeployment {
            user_id,
            web_app_id,
            environment_id,
            deployment_id,
        }
    }
}

/// Creates rows through the real repositories (PostgreSQL tests)
pub struct DbFactory<'a> {
    state: &'a AppState,
}

impl<'a> DbFactory<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    pub async fn create_user(&self) -> TestAuth {
        let unique_id = Uuid::new_v4();
        let email = format!("test-{}@example.com", unique_id);
        let user = self.create_user_with_email(&email, "TestPassword123!").await;
        let token = AuthService::generate_token(user.id, &email, &self.state.config).unwrap();

        TestAuth {
            user_id: user.id,
            email,
            token,
        }
    }

    pub async fn create_user_with_email(&self, email: &str, password: &str) -> User {
        let input = CreateUser {
            email: email.to_string(),
            name: "Test User".to_string(),
        };

        let password_hash = AuthService::hash_password(password).unwrap();
        UserRepository::create(&self.state.db, &input, &password_hash)
            .await
            .unwrap()
    }

    pub async fn create_web_app(&self, user_id: Uuid) -> CreatedWebApp {
        let input = CreateWebApp {
            name: format!("app-{}", Uuid::new_v4()),
            region: "us-east-1".to_string(),
            plan: "starter".to_string(),
            framework: "nextjs".to_string(),
            repository: RepositoryRef {
                provider: "github".to_string(),
                owner: "acme".to_string(),
                repo: "storefront".to_string(),
                branch: "main".to_string(),
            },
            port: 3000,
            env_vars: vec![EnvVar {
                key: "NODE_ENV".to_string(),
                value: "production".to_string(),
            }],
        };

        WebAppService::create(&self.state.db, user_id, &input)
            .await
            .unwrap()
    }
}
