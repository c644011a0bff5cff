//! Application assembly shared by the binaries and the HTTP tests.

use anyhow::Context;
use axum::Router;
use catalog_db::Database;
use catalog_kernel::{settings::Settings, InitCtx, ModuleRegistry};

use crate::modules;

/// A fully initialized application: database, modules, and router.
pub struct App {
    pub settings: Settings,
    pub db: Database,
    pub registry: ModuleRegistry,
}

impl App {
    /// Open the database, register every module, and run init/start.
    pub async fn bootstrap(settings: Settings) -> anyhow::Result<Self> {
        let db = Database::connect(&settings.database.endpoint, &settings.database.namespace)
            .await
            .with_context(|| format!("failed to open database '{}'", settings.database.endpoint))?;

        let mut registry = ModuleRegistry::new();
        modules::register_all(&mut registry, &db);

        let ctx = InitCtx {
            settings: &settings,
            db: &db,
        };
        registry.init_modules(&ctx).await?;
        registry.start_modules(&ctx).await?;

        tracing::info!(
            env = ?settings.environment,
            db = %settings.database.endpoint,
            modules = registry.module_count(),
            "catalog bootstrap complete"
        );

        Ok(Self {
            settings,
            db,
            registry,
        })
    }

    pub fn router(&self) -> Router {
        catalog_http::build_router(&self.registry, &self.settings)
    }

    /// Serve HTTP until interrupted, then shut down.
    pub async fn serve(self) -> anyhow::Result<()> {
        let served = catalog_http::start_server(&self.registry, &self.settings).await;
        self.shutdown().await?;
        served
    }

    /// Stop modules in reverse order and close the database.
    pub async fn shutdown(self) -> anyhow::Result<()> {
        self.registry.stop_modules().await?;
        self.db.close();
        Ok(())
    }
}
