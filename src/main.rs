use tracing_subscriber::EnvFilter;
use urbandrive::{connect_store, serve, service::UserService, AppError, AppState, Config};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("urbandrive=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;
    tracing::info!(
        environment = ?config.environment,
        storage = ?config.storage,
        "starting urbandrive"
    );

    let store = connect_store(&config).await?;
    let seeded = UserService::seed_admins(store.as_ref(), &config.admin_emails).await?;
    if seeded > 0 {
        tracing::info!(count = seeded, "admin accounts created");
    }

    serve(AppState::new(store, config)).await?;
    Ok(())
}
