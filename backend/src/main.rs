//! Coffee Shop Material Ledger - Backend Server

use std::{sync::Arc, time::Duration};

use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use coffee_shop_backend::{
    cache::{RedisStore, ReportCache},
    create_app,
    queue::{ConsumptionConsumer, InMemoryMessageQueue, MessageQueue, RedisMessageQueue},
    services::ConsumptionService,
    AppState, Config,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "pos_ledger_server=debug,coffee_shop_backend=debug,tower_http=debug,sqlx=warn".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::load()?;

    tracing::info!("Starting Coffee Shop Material Ledger");
    tracing::info!("Environment: {}", config.environment);

    tracing::info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&config.database.url)
        .await?;

    tracing::info!("Database connection established");

    // Run migrations in development
    if config.environment == "development" {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&db_pool).await?;
        tracing::info!("Migrations completed");
    }

    let cache = match (&config.cache.redis_url, config.cache.enabled) {
        (Some(url), true) => match RedisStore::connect(url).await {
            Ok(store) => {
                tracing::info!("Report cache connected");
                ReportCache::new(Arc::new(store), config.cache.namespace.clone())
            }
            Err(e) => {
                tracing::warn!("Report cache unavailable, computing every report: {}", e);
                ReportCache::disabled()
            }
        },
        _ => {
            tracing::warn!("Report cache disabled");
            ReportCache::disabled()
        }
    };

    let queue: Arc<dyn MessageQueue> = match config.queue_redis_url() {
        Some(url) => Arc::new(RedisMessageQueue::connect(url).await?),
        None => {
            tracing::warn!("No Redis URL for the message queue, using an in-process queue");
            Arc::new(InMemoryMessageQueue::new())
        }
    };

    if config.queue.enabled {
        let consumer = ConsumptionConsumer::new(
            queue.clone(),
            Arc::new(ConsumptionService::new(db_pool.clone())),
            config.queue.consumption_topic.clone(),
            config.queue.max_retries,
        );
        consumer.spawn(Duration::from_millis(config.queue.poll_interval_ms));
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);

    let state = AppState {
        db: db_pool,
        config: Arc::new(config),
        cache,
        queue,
    };

    let app = create_app(state);

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
