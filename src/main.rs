//! Roll-a-Bike - Bicycle storefront backend
//! Mission: Serve the catalog, orders, reviews, and accounts API

use std::{env, path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use axum::middleware;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rollabike_backend::{
    api::{create_router, AppState, PaymentGateway},
    auth::{JwtHandler, UserStore},
    middleware::request_logging,
    store::ShopStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    load_env();
    init_tracing();

    info!("🚴 Roll-a-Bike backend starting");

    let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
        warn!("JWT_SECRET not set; using insecure dev default");
        "dev-secret-change-in-production-minimum-32-characters".to_string()
    });

    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .context("Failed to build HTTP client")?;

    let users_db_path = resolve_data_path(env::var("USERS_DB_PATH").ok(), "rollabike_users.db");
    let shop_db_path = resolve_data_path(env::var("SHOP_DB_PATH").ok(), "rollabike_shop.db");

    let users = Arc::new(UserStore::new(&users_db_path)?);
    let shop = Arc::new(ShopStore::new(&shop_db_path)?);
    let jwt = Arc::new(JwtHandler::new(jwt_secret));

    info!("💾 User store at: {}", users_db_path);
    info!("💾 Shop store at: {}", shop_db_path);

    let payment_base_url = env::var("PAYMENT_GATEWAY_URL")
        .unwrap_or_else(|_| "https://api.stripe.com".to_string());
    let payment_secret = env::var("PAYMENT_SECRET_KEY").unwrap_or_default();
    if payment_secret.trim().is_empty() {
        warn!("PAYMENT_SECRET_KEY not set - payment intents disabled");
    }
    let payments = Arc::new(PaymentGateway::new(
        http_client,
        payment_base_url,
        payment_secret,
    ));

    let state = AppState {
        shop,
        users,
        jwt,
        payments,
    };

    let app = create_router(state)
        .layer(middleware::from_fn(request_logging))
        .layer(CorsLayer::permissive());

    let port = env::var("PORT")
        .ok()
        .and_then(|v| v.parse::<u16>().ok())
        .unwrap_or(5000);
    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await?;
    info!("🎯 API server listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rollabike_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_env() {
    // Standard dotenv search (cwd + parents), plus the manifest dir for
    // runs started from elsewhere with --manifest-path.
    let _ = dotenv();

    let manifest_dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR"));
    let candidate = manifest_dir.join(".env");
    if candidate.exists() {
        let _ = dotenv::from_path(&candidate);
    }
}

/// Resolve a data-file path; relative paths are anchored at the manifest
/// dir so running from another working directory doesn't create a second
/// empty database.
fn resolve_data_path(env_value: Option<String>, default_filename: &str) -> String {
    let base = PathBuf::from(env!("CARGO_MANIFEST_DIR"));

    let Some(raw) = env_value.filter(|v| !v.trim().is_empty()) else {
        return base.join(default_filename).to_string_lossy().to_string();
    };

    let p = PathBuf::from(raw);
    if p.is_absolute() {
        return p.to_string_lossy().to_string();
    }

    base.join(p).to_string_lossy().to_string()
}
