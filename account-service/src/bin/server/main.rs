use std::sync::Arc;

use account_service::config::Config;
use account_service::domain::crud::service::CrudService;
use account_service::domain::user::models::User;
use account_service::domain::user::resource::UserResourceStore;
use account_service::domain::user::service::AccountService;
use account_service::domain::user::service::ResetSettings;
use account_service::inbound::http::cookie::SessionCookie;
use account_service::inbound::http::router::create_router;
use account_service::outbound::email::spawn_outbox_relay;
use account_service::outbound::email::LogEmailSender;
use account_service::outbound::email::OutboxCipher;
use account_service::outbound::email::PostgresEmailOutbox;
use account_service::outbound::repositories::PostgresUserRepository;
use auth::Authenticator;
use chrono::Duration;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "account_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        service = "account-service",
        version = env!("CARGO_PKG_VERSION"),
        "Service starting"
    );

    let config = Config::load()?;

    tracing::info!(
        http_port = config.server.http_port,
        environment = ?config.environment,
        token_ttl_minutes = config.jwt.expires_in_minutes,
        reset_ttl_minutes = config.reset.token_ttl_minutes,
        "Configuration loaded"
    );

    let pg_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await?;
    tracing::info!(
        max_connections = config.database.max_connections,
        database = "postgresql",
        "Database connection pool created"
    );

    sqlx::migrate!("./migrations").run(&pg_pool).await?;
    tracing::info!(database = "postgresql", "Database migrations completed");

    let authenticator = Arc::new(Authenticator::new(
        config.jwt.secret.as_bytes(),
        Duration::minutes(config.jwt.expires_in_minutes),
    ));
    let user_repository = Arc::new(PostgresUserRepository::new(pg_pool.clone()));
    let outbox_cipher = Arc::new(OutboxCipher::from_base64(&config.email.outbox_key)?);
    let mailer = Arc::new(PostgresEmailOutbox::new(
        pg_pool.clone(),
        config.email.from.clone(),
        Arc::clone(&outbox_cipher),
    ));

    // TODO: swap LogEmailSender for an SMTP transport once relay credentials are provisioned.
    let _relay = spawn_outbox_relay(
        pg_pool,
        outbox_cipher,
        Arc::new(LogEmailSender),
        config.email.relay(),
    );
    tracing::info!(
        max_attempts = config.email.relay_max_attempts,
        "Email outbox relay started"
    );

    let account_service = Arc::new(AccountService::new(
        Arc::clone(&user_repository),
        mailer,
        authenticator,
        ResetSettings {
            token_ttl: Duration::minutes(config.reset.token_ttl_minutes),
            url_base: config.reset.url_base.clone(),
            conceal_unknown_accounts: config.reset.conceal_unknown_accounts,
        },
    ));
    let users = Arc::new(CrudService::<User, _>::new(Arc::new(
        UserResourceStore::new(user_repository),
    )));

    let session_cookie = SessionCookie {
        max_age_days: config.jwt.cookie_expires_in_days,
        secure: config.environment.is_production(),
    };

    let http_address = format!("0.0.0.0:{}", config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_address).await?;
    tracing::info!(
        address = %http_address,
        port = config.server.http_port,
        protocol = "http",
        "Http server listening"
    );

    let http_application = create_router(account_service, users, session_cookie);

    if let Err(e) = axum::serve(http_listener, http_application).await {
        tracing::error!(error = %e, "Server error");
        return Err(e.into());
    }

    tracing::info!("Server exited successfully");
    Ok(())
}
