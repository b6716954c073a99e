use rusty_library_lending::{
    adapters::{
        SystemClock, mock::EventPublisher as LoggingEventPublisher,
        postgres::PostgresLendingStore,
    },
    application::lending::{ServiceDependencies, get_overdue_loans, publish_pending_events},
    config::AppConfig,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rusty_library_lending=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    tracing::info!(
        max_connections = config.database_max_connections,
        "Connecting to database"
    );

    // Initialize database connection pool
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    // Initialize adapters
    let store = Arc::new(PostgresLendingStore::new(pool));
    let service_deps = ServiceDependencies {
        store: store.clone(),
        loan_read_model: store,
        event_publisher: Arc::new(LoggingEventPublisher::new()),
        clock: Arc::new(SystemClock),
    };

    // 前回の実行で配信できなかったイベント
    let republished = publish_pending_events(&service_deps).await?;
    tracing::info!(count = republished, "Outbox drained");

    // 延滞レポート
    let overdue = get_overdue_loans(&service_deps).await?;
    tracing::info!(count = overdue.len(), "Overdue loan report");
    for loan in &overdue {
        tracing::info!(
            loan_id = %loan.loan_id.value(),
            borrower_id = %loan.borrower_id.value(),
            item_id = %loan.item_id.value(),
            due = %loan.period_end,
            status = loan.status.as_str(),
            "Overdue loan"
        );
    }

    Ok(())
}
