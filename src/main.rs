//! Payment Reconciler server entry point.

use std::sync::Arc;
use std::time::Duration;

use http::HeaderName;
use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use payment_reconciler::adapters::http::{payments_router, PaymentsAppState};
use payment_reconciler::adapters::memory::{
    InMemoryLedgers, InMemoryOrderStore, InMemoryTransactionRepository,
    InMemoryWebhookLogRepository,
};
use payment_reconciler::adapters::paypal::{
    PayPalConfig, PayPalStatusClient, LIVE_BASE_URL, SANDBOX_BASE_URL,
};
use payment_reconciler::adapters::postgres::{
    PostgresLedgers, PostgresOrderStatusUpdater, PostgresTransactionRepository,
    PostgresWebhookLogRepository,
};
use payment_reconciler::adapters::stripe::{StripeConfig, StripeStatusClient};
use payment_reconciler::adapters::ConfigGatewaySource;
use payment_reconciler::application::handlers::{
    EventLog, ReceiveWebhookHandler, ReconciliationEngine, VerifyPaymentHandler,
};
use payment_reconciler::config::{AppConfig, DatabaseConfig, GatewaysConfig, ServerConfig};
use payment_reconciler::domain::foundation::Timestamp;
use payment_reconciler::ports::{
    LedgerCapabilities, OrderStatusUpdater, TransactionRepository, WebhookLogRepository,
};

const REQUEST_ID_HEADER: &str = "x-request-id";
const RETENTION_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Port implementations chosen at startup.
struct Storage {
    transactions: Arc<dyn TransactionRepository>,
    ledgers: Arc<dyn LedgerCapabilities>,
    orders: Arc<dyn OrderStatusUpdater>,
    webhook_logs: Arc<dyn WebhookLogRepository>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    init_tracing(&config.server);
    config.validate()?;

    let storage = connect_storage(&config.database).await?;

    let engine = Arc::new(ReconciliationEngine::new(
        storage.transactions.clone(),
        storage.ledgers.clone(),
        storage.orders.clone(),
    ));
    let event_log = EventLog::new(storage.webhook_logs.clone());
    let config_source = ConfigGatewaySource::new(&config.gateways);
    tracing::info!(gateways = ?config_source.configured(), "Webhook gateways configured");

    let state = PaymentsAppState {
        webhook_handler: Arc::new(ReceiveWebhookHandler::new(
            Arc::new(config_source),
            engine,
            event_log.clone(),
        )),
        verify_handler: Arc::new(verification_handler(
            &config.gateways,
            storage.transactions.clone(),
        )),
    };

    if config.server.webhook_log_retention_days > 0 {
        spawn_retention_sweep(event_log, config.server.webhook_log_retention_days);
    }

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);
    let app = payments_router().with_state(state).layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::new(request_id))
            .layer(TimeoutLayer::new(config.server.request_timeout())),
    );

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, environment = ?config.server.environment, "Payment reconciler listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn init_tracing(server: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&server.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    if server.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn connect_storage(database: &DatabaseConfig) -> anyhow::Result<Storage> {
    let Some(url) = database.postgres_url() else {
        tracing::warn!("No database URL configured, using in-memory storage");
        return Ok(Storage {
            transactions: Arc::new(InMemoryTransactionRepository::new()),
            ledgers: Arc::new(InMemoryLedgers::installed()),
            orders: Arc::new(InMemoryOrderStore::new()),
            webhook_logs: Arc::new(InMemoryWebhookLogRepository::new()),
        });
    };

    let pool = PgPoolOptions::new()
        .min_connections(database.min_connections)
        .max_connections(database.max_connections)
        .acquire_timeout(database.acquire_timeout())
        .idle_timeout(database.idle_timeout())
        .max_lifetime(database.max_lifetime())
        .connect(url)
        .await?;

    if database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    Ok(Storage {
        transactions: Arc::new(PostgresTransactionRepository::new(pool.clone())),
        ledgers: Arc::new(PostgresLedgers::new(pool.clone())),
        orders: Arc::new(PostgresOrderStatusUpdater::new(pool.clone())),
        webhook_logs: Arc::new(PostgresWebhookLogRepository::new(pool)),
    })
}

fn verification_handler(
    gateways: &GatewaysConfig,
    transactions: Arc<dyn TransactionRepository>,
) -> VerifyPaymentHandler {
    let mut handler =
        VerifyPaymentHandler::new(transactions).with_gateway_timeout(gateways.request_timeout());

    if let Some(api_key) = gateways.stripe.api_key.as_ref() {
        let mut stripe = StripeConfig::new(api_key.expose_secret().clone());
        if let Some(url) = gateways.stripe.api_base_url.as_ref() {
            stripe = stripe.with_base_url(url.clone());
        }
        handler = handler.with_client(Arc::new(StripeStatusClient::new(stripe)));
    }

    if let (Some(client_id), Some(client_secret)) = (
        gateways.paypal.client_id.as_ref(),
        gateways.paypal.client_secret.as_ref(),
    ) {
        let default_url = if gateways.paypal.mode.is_live() {
            LIVE_BASE_URL
        } else {
            SANDBOX_BASE_URL
        };
        let url = gateways
            .paypal
            .api_base_url
            .clone()
            .unwrap_or_else(|| default_url.to_string());
        let paypal = PayPalConfig::new(client_id.clone(), client_secret.expose_secret().clone())
            .with_base_url(url);
        handler = handler.with_client(Arc::new(PayPalStatusClient::new(paypal)));
    }

    handler
}

fn spawn_retention_sweep(event_log: EventLog, retention_days: u32) {
    let retention_secs = i64::from(retention_days) * 24 * 60 * 60;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(RETENTION_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            let cutoff = Timestamp::now().minus_secs(retention_secs);
            if let Err(e) = event_log.purge_before(cutoff).await {
                tracing::warn!(error = %e, "Webhook log retention sweep failed");
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutting down");
}
