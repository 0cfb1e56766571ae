use nutri_bot::bot::{Bot, Services};
use nutri_bot::channels::{ChannelManager, CliChannel, TelegramChannel};
use nutri_bot::config::{BotConfig, TelegramConfig};
use nutri_bot::error::ConfigError;
use nutri_bot::plan::PlanConfig;
use nutri_bot::registration::registration_routes;
use secrecy::ExposeSecret;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| "Failed to install rustls crypto provider")?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = BotConfig::from_env()?;
    let plan_config = PlanConfig::from_env()?;

    let Some(model) = plan_config.as_ref().map(|p| p.model.clone()) else {
        eprintln!("Error: ANTHROPIC_API_KEY not set");
        eprintln!("  export ANTHROPIC_API_KEY=sk-ant-...");
        return Err(ConfigError::MissingEnvVar("ANTHROPIC_API_KEY".into()).into());
    };

    eprintln!("🥗 Nutri Bot v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {model}");
    eprintln!(
        "   Admin API: http://0.0.0.0:{}/api/health",
        config.http_port
    );

    // ── Storage, generator and engine ───────────────────────────────────
    let services = Services::open(&config, plan_config).await.map_err(|e| {
        eprintln!("Error: {e}");
        e
    })?;
    let profiles = services.store.count().await?;
    eprintln!(
        "   Database: {} ({} profiles)",
        config.db_path.display(),
        profiles
    );

    // Spawn Axum REST server for inspection
    let app = registration_routes(services.route_state());
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.http_port)).await?;
    let http_port = config.http_port;
    tokio::spawn(async move {
        tracing::info!(port = http_port, "Admin REST server started");
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "Admin REST server stopped");
        }
    });

    // Set up channels
    let mut channels = ChannelManager::new();
    let mut active_channels = Vec::new();

    let telegram = TelegramConfig::from_env();
    if let Some(ref telegram) = telegram {
        eprintln!(
            "   Telegram: enabled (allowed: {})",
            if telegram.allows_everyone() {
                "everyone".to_string()
            } else {
                telegram.allowed_users.join(", ")
            }
        );
        channels.add(Box::new(TelegramChannel::new(
            telegram.bot_token.expose_secret().to_string(),
            telegram.allowed_users.clone(),
        )));
        active_channels.push("telegram");
    }

    if config.cli_enabled(telegram.is_some()) {
        channels.add(Box::new(CliChannel::new(config.cli_user_id)));
        active_channels.push("cli");
        eprintln!("   CLI: speaking as user {}", config.cli_user_id);
        eprintln!("   Type /start and press Enter.");
    }

    eprintln!("   Channels: {}\n", active_channels.join(", "));

    Bot::new(config, services.engine, channels).run().await?;

    Ok(())
}
