use dotenvy::dotenv;
use storefront::{
    api::{self, AppState},
    config::{database, server::ServerConfig, store},
    core::{auth::JwtService, device_lock::DeviceLockCipher, maintenance::TransitionPolicy, seed},
    errors::Result,
};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Load .env file; variables may also come from the environment
    dotenv().ok();

    // 3. Server settings and secrets
    let server = ServerConfig::from_env()
        .inspect_err(|e| error!("Invalid server configuration: {}", e))?;

    // 4. Database
    let db = database::create_connection(&server.database_url)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 5. Seed store data from config.toml
    let config = store::load_config_or_default(&server.store_config_path)?;
    seed::seed_from_config(&db, &config)
        .await
        .inspect_err(|e| error!("Failed to seed store data: {}", e))?;

    let policy = TransitionPolicy::from(config.maintenance);
    info!(?policy, "Maintenance transition policy");

    let state = AppState {
        db,
        jwt: JwtService::new(server.jwt),
        cipher: DeviceLockCipher::new(&server.device_lock_key)?,
        policy,
    };

    // 6. Serve
    let addr = format!("{}:{}", server.bind_address, server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Storefront listening on {}", addr);

    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}
