//! Infrastructure repository
//!
//! Creates the Azure resources hosting an application:
//! - Function apps: resource group, storage account, function app, app settings
//! - Web apps: resource group, app service plan, web app

use anyhow::{Context, Result};
use async_trait::async_trait;
use migr8_core::domain::manifest::{AppKind, ApplicationSpec};
use tracing::{info, warn};

use crate::repository::az::AzCli;

/// Repository trait for application infrastructure
#[async_trait]
pub trait InfrastructureRepository: Send + Sync {
    /// Creates every resource the application needs
    async fn create_infrastructure(&self, app: &ApplicationSpec) -> Result<()>;
}

/// Azure CLI implementation of InfrastructureRepository
pub struct AzInfrastructureRepository {
    az: AzCli,
}

impl AzInfrastructureRepository {
    pub fn new(az: AzCli) -> Self {
        Self { az }
    }

    async fn create_resource_group(&self, app: &ApplicationSpec) -> Result<()> {
        self.az
            .run([
                "group",
                "create",
                "--name",
                app.resource_group.as_str(),
                "--location",
                app.location.as_str(),
                "--output",
                "none",
            ])
            .await
            .context("Azure resource group")?;
        Ok(())
    }

    async fn create_function_app(&self, app: &ApplicationSpec) -> Result<()> {
        info!("[FUNCAPP {}] Creating Azure function app", app.name);

        self.create_resource_group(app).await?;

        self.az
            .run([
                "storage",
                "account",
                "create",
                "--name",
                app.storage_account.as_str(),
                "--resource-group",
                app.resource_group.as_str(),
                "--location",
                app.location.as_str(),
                "--sku",
                "Standard_LRS",
                "--output",
                "none",
            ])
            .await
            .context("Azure storage account")?;

        let mut create = vec![
            "functionapp",
            "create",
            "--name",
            app.name.as_str(),
            "--resource-group",
            app.resource_group.as_str(),
            "--storage-account",
            app.storage_account.as_str(),
            "--consumption-plan-location",
            app.location.as_str(),
            "--functions-version",
            "4",
            "--output",
            "none",
        ];
        if !app.runtime.is_empty() {
            create.extend(["--runtime", app.runtime.as_str()]);
        }
        if !app.os.is_empty() {
            create.extend(["--os-type", app.os.as_str()]);
        }

        self.az.run(create).await.context("Azure function app")?;

        if app.settings.is_empty() {
            warn!(
                "[FUNCAPP {}] No settings to update, skipping settings configuration",
                app.name
            );
            return Ok(());
        }

        let mut args = vec![
            "functionapp".to_string(),
            "config".to_string(),
            "appsettings".to_string(),
            "set".to_string(),
            "--name".to_string(),
            app.name.clone(),
            "--resource-group".to_string(),
            app.resource_group.clone(),
            "--output".to_string(),
            "none".to_string(),
        ];

        let (slot, regular): (Vec<_>, Vec<_>) = app.settings.iter().partition(|s| s.slot_setting);
        if !regular.is_empty() {
            args.push("--settings".to_string());
            args.extend(regular.iter().map(|s| format!("{}={}", s.name, s.value)));
        }
        if !slot.is_empty() {
            args.push("--slot-settings".to_string());
            args.extend(slot.iter().map(|s| format!("{}={}", s.name, s.value)));
        }

        self.az
            .run(args)
            .await
            .context("Azure function app settings")?;

        Ok(())
    }

    async fn create_web_app(&self, app: &ApplicationSpec) -> Result<()> {
        info!("[WEBAPP {}] Creating Azure web app", app.name);

        self.create_resource_group(app).await?;

        let mut plan = vec![
            "appservice",
            "plan",
            "create",
            "--name",
            app.app_service_plan.as_str(),
            "--resource-group",
            app.resource_group.as_str(),
            "--location",
            app.location.as_str(),
            "--output",
            "none",
        ];
        if app.os.eq_ignore_ascii_case("linux") {
            plan.push("--is-linux");
        }

        self.az.run(plan).await.context("Azure app service plan")?;

        let mut create = vec![
            "webapp",
            "create",
            "--name",
            app.name.as_str(),
            "--resource-group",
            app.resource_group.as_str(),
            "--plan",
            app.app_service_plan.as_str(),
            "--output",
            "none",
        ];
        if !app.runtime.is_empty() {
            create.extend(["--runtime", app.runtime.as_str()]);
        }

        self.az.run(create).await.context("Azure web app")?;

        Ok(())
    }
}

#[async_trait]
impl InfrastructureRepository for AzInfrastructureRepository {
    async fn create_infrastructure(&self, app: &ApplicationSpec) -> Result<()> {
        let result = match app.kind {
            AppKind::Function => self.create_function_app(app).await,
            AppKind::WebApp => self.create_web_app(app).await,
        };

        result.with_context(|| format!("Failed to create {} {}", app.kind, app.name))
    }
}
