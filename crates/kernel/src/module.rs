use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;

/// Typed map of shared handles (database pools, clients) made available to modules.
pub type Resources = axum::http::Extensions;

/// Context provided to modules during initialization
pub struct InitCtx<'a> {
    pub settings: &'a crate::settings::Settings,
    pub resources: &'a Resources,
}

impl<'a> InitCtx<'a> {
    /// Fetch a shared resource registered by the host, failing if it is missing.
    pub fn resource<T>(&self) -> anyhow::Result<&'a T>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.resources.get::<T>().ok_or_else(|| {
            anyhow::anyhow!(
                "resource '{}' was not registered by the host",
                std::any::type_name::<T>()
            )
        })
    }
}

/// Migration definition for modules
#[derive(Debug, Clone)]
pub struct Migration {
    pub id: &'static str,
    pub up: &'static str,
}

/// Core module trait that all Folio modules must implement
#[async_trait]
pub trait Module: Sync + Send {
    /// Unique name for this module
    fn name(&self) -> &'static str;

    /// Initialize the module with the provided context
    /// Called during application startup after migrations
    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Return the Axum router for this module's routes
    /// Routes will be mounted under `/api/{module_name}`
    fn routes(&self) -> Router {
        Router::new()
    }

    /// Routes merged at the server root instead of under `/api/{module_name}`
    fn root_routes(&self) -> Router {
        Router::new()
    }

    /// Return OpenAPI specification fragment for this module as JSON
    /// Will be merged with other modules' specs
    fn openapi(&self) -> Option<serde_json::Value> {
        None
    }

    /// Return migrations contributed by this module
    /// Migrations are executed in the order returned
    fn migrations(&self) -> Vec<Migration> {
        vec![]
    }

    /// Start background tasks for this module
    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Stop the module and clean up resources
    /// Called during application shutdown
    async fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Link-time registration entry for a custom module.
///
/// Modules submit one of these with `inventory::submit!` and the registry
/// instantiates the ones enabled in settings.
pub struct ModuleFactory {
    pub name: &'static str,
    pub create: fn() -> Arc<dyn Module>,
}

inventory::collect!(ModuleFactory);
