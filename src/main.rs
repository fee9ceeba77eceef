use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use sea_orm_migration::MigratorTrait;
use tokio::net::TcpListener;
use tower::limit::ConcurrencyLimitLayer;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use matchday_booking::{
    cache::InMemoryCache,
    config::Config,
    db,
    gateways::{
        HttpPaymentGateway, LogNotifier, MockPaymentGateway, NotificationSink, PaymentGateway,
        WebhookNotifier,
    },
    middleware::rate_limit::log_request,
    policy::UserRole,
    routes,
    utils::jwt::create_token,
    AppState,
};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "matchday_booking=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env();
    tracing::info!("Starting server at {}", config.server_addr());

    // Connect to database
    let db = db::connect(&config)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Connected to database");

    // Run migrations
    migration::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    tracing::info!("Migrations complete");

    if config.bootstrap_admin_token {
        issue_bootstrap_token(&config);
    }

    let state = AppState {
        db,
        config: config.clone(),
        gateway: payment_gateway(&config),
        notifier: notifier(&config),
        cache: Arc::new(InMemoryCache::new()),
    };

    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(ConcurrencyLimitLayer::new(config.max_concurrent_requests));

    let app = routes::create_router(state)
        .layer(axum::middleware::from_fn(log_request))
        .layer(middleware);

    // Start server with socket address for rate limiting
    let addr: SocketAddr = config.server_addr().parse().expect("Invalid address");
    let listener = TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Failed to start server");
}

fn payment_gateway(config: &Config) -> Arc<dyn PaymentGateway> {
    match &config.payment_gateway_url {
        Some(url) => {
            let gateway = HttpPaymentGateway::new(
                url.clone(),
                config.payment_gateway_api_key.clone(),
                Duration::from_secs(config.payment_gateway_timeout_secs),
            )
            .expect("Failed to build payment gateway client");
            tracing::info!(url = %url, "Using HTTP payment gateway");
            Arc::new(gateway)
        }
        None => {
            tracing::warn!("PAYMENT_GATEWAY_URL not set, payments are approved by a mock gateway");
            MockPaymentGateway::shared()
        }
    }
}

fn notifier(config: &Config) -> Arc<dyn NotificationSink> {
    match &config.notification_webhook_url {
        Some(url) => Arc::new(
            WebhookNotifier::new(url.clone()).expect("Failed to build notification client"),
        ),
        None => Arc::new(LogNotifier),
    }
}

/// Logs a short-lived admin token so a fresh deployment can be configured
/// before an identity provider issues real ones.
fn issue_bootstrap_token(config: &Config) {
    let token = create_token(
        Uuid::nil(),
        "bootstrap@localhost",
        UserRole::Admin,
        None,
        &config.jwt_secret,
        1,
    )
    .expect("Failed to issue bootstrap token");
    tracing::warn!(token = %token, "Bootstrap admin token issued, valid for one hour");
}
