use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use stowage::config::Args;
use stowage::upload::Uploads;
use stowage::{Server, routes};

#[tokio::main]
async fn main() -> Result<(), stowage::Error> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    tracing::debug!(?args, "starting stowage");

    let uploads = Arc::new(Uploads::open(args.upload_config()).await?);

    Server::bind(args.addr).serve(routes::app(uploads)).await
}
