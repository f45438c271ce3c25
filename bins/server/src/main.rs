//! Expensa API Server
//!
//! Main entry point for the Expensa expense service.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use expensa_api::notifications::EmailNotificationDispatcher;
use expensa_api::{AppState, create_router};
use expensa_core::expense::{
    ExpenseService, NotificationDispatcher, NotificationRelay, ThresholdPolicy, TracingDispatcher,
};
use expensa_db::{ActorRepository, ExpenseRepository, connect_with_pool};
use expensa_shared::{AppConfig, EmailService, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "expensa=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let db = connect_with_pool(
        &config.database.url,
        config.database.max_connections,
        config.database.min_connections,
    )
    .await?;
    info!("Connected to database");

    let jwt_service = JwtService::new(&config.jwt);

    let actors = ActorRepository::new(db.clone());
    let expenses = ExpenseService::new(
        Arc::new(ExpenseRepository::new(db)),
        Arc::new(actors.clone()),
    )
    .with_policy(Arc::new(ThresholdPolicy::new(
        config.expense.auto_approval_threshold,
    )))
    .with_max_page_size(config.expense.max_page_size);
    info!(
        threshold = %config.expense.auto_approval_threshold,
        max_page_size = config.expense.max_page_size,
        "Expense engine configured"
    );

    let dispatcher: Arc<dyn NotificationDispatcher> = if config.email.enabled {
        info!(
            smtp_host = %config.email.smtp_host,
            smtp_port = %config.email.smtp_port,
            "Email notifications enabled"
        );
        Arc::new(EmailNotificationDispatcher::new(
            EmailService::new(config.email.clone()),
            actors,
        ))
    } else {
        info!("Email notifications disabled, logging them instead");
        Arc::new(TracingDispatcher)
    };
    let notifications = NotificationRelay::new(dispatcher)
        .with_timeout(Duration::from_millis(config.expense.notification_timeout_ms));

    let state = AppState {
        jwt_service: Arc::new(jwt_service),
        expenses: Arc::new(expenses),
        notifications: Arc::new(notifications),
    };

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
