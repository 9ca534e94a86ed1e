//! Application wiring: module discovery, migrations, lifecycle, and serving.

use anyhow::Context;
use folio_db::sqlite::Database;
use folio_kernel::{settings::Settings, InitCtx, ModuleRegistry, Resources};

/// Open the configured SQLite database
pub fn open_database(settings: &Settings) -> anyhow::Result<Database> {
    let db = if settings.database.is_in_memory() {
        Database::open_in_memory()
    } else {
        Database::open(&settings.database.path)
    };
    db.with_context(|| format!("failed to open database '{}'", settings.database.path))
}

/// Apply pending migrations of every enabled module; returns how many ran.
pub async fn migrate(settings: &Settings) -> anyhow::Result<usize> {
    let registry = ModuleRegistry::discover(&settings.modules.enabled)?;
    let db = open_database(settings)?;
    run_migrations(&registry, &db).await
}

async fn run_migrations(registry: &ModuleRegistry, db: &Database) -> anyhow::Result<usize> {
    let migrations = registry.collect_migrations();
    let total = migrations.len();
    let applied = db.migrate(migrations).await.context("migrations failed")?;
    tracing::info!(applied, total, "migrations complete");
    Ok(applied)
}

/// Discover, migrate, and initialize the enabled modules.
pub async fn prepare(settings: &Settings) -> anyhow::Result<ModuleRegistry> {
    let registry = ModuleRegistry::discover(&settings.modules.enabled)?;
    let mut resources = Resources::new();

    if !registry.collect_migrations().is_empty() {
        let db = open_database(settings)?;
        run_migrations(&registry, &db).await?;
        resources.insert(db);
    }

    let ctx = InitCtx {
        settings,
        resources: &resources,
    };
    registry.init_modules(&ctx).await?;
    registry.start_modules(&ctx).await?;

    tracing::info!(
        modules = registry.module_count(),
        environment = ?settings.environment,
        "application ready"
    );
    Ok(registry)
}

/// Run the HTTP server until Ctrl-C, then stop modules in reverse order.
pub async fn serve(settings: Settings) -> anyhow::Result<()> {
    let registry = prepare(&settings).await?;

    let served = folio_http::start_server(&registry, &settings, shutdown_signal()).await;
    let stopped = registry.stop_modules().await;

    served?;
    stopped
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
