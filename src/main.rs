//! vidtube - video sharing REST backend

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use vidtube::{
    auth::TokenIssuer,
    config::Args,
    db::{MongoClient, Store},
    media::CloudinaryClient,
    server::{self, AppState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    // Initialize tracing/logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("vidtube={},info", args.log_level).into());
    let fmt_layer = if args.log_json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  vidtube {}", env!("CARGO_PKG_VERSION"));
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("MongoDB database: {}", args.mongodb_db);
    info!("Media host: {} ({})", args.media.base_url, args.media.cloud_name);
    info!("Dependency timeout: {:?}", args.dependency_timeout());
    info!("Media upload timeout: {:?}", args.media_upload_timeout());
    info!("Max page limit: {}", args.max_page_limit);
    info!("======================================");

    let mongo = MongoClient::new(&args.mongodb_uri, &args.mongodb_db, args.dependency_timeout())
        .await
        .map_err(|e| anyhow::anyhow!("MongoDB connection failed: {}", e))?;
    let store = Store::open(mongo).await?;
    info!("Collections and indexes ready");

    let media = CloudinaryClient::new(
        &args.media,
        args.dependency_timeout(),
        args.media_upload_timeout(),
    )?;
    let tokens = TokenIssuer::from_args(&args)?;

    let state = Arc::new(AppState {
        args,
        store,
        media: Arc::new(media),
        tokens,
    });

    server::run(state).await?;

    Ok(())
}
