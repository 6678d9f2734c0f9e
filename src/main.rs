/// Petaldrop - photo drop map service
///
/// Visitors drop photos onto a shared city map. The server resolves a
/// location for each photo (embedded GPS, vision inference, geocoding,
/// or a jittered city-center fallback) and persists the drop for
/// everyone to see.

mod api;
mod blob_store;
mod config;
mod context;
mod drops;
mod error;
mod location;
mod record_store;
mod retry;
mod server;

use config::ServerConfig;
use context::AppContext;
use error::DropResult;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> DropResult<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "petaldrop=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    print_banner();

    // Load configuration
    let config = ServerConfig::from_env()?;

    // Create application context
    let ctx = AppContext::new(config).await?;

    // Start server
    server::serve(ctx).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
    ____       __        __    __
   / __ \___  / /_____ _/ /___/ /________  ____
  / /_/ / _ \/ __/ __ `/ / __  / ___/ __ \/ __ \
 / ____/  __/ /_/ /_/ / / /_/ / /  / /_/ / /_/ /
/_/    \___/\__/\__,_/_/\__,_/_/   \____/ .___/
                                       /_/
        Photo drop map server v{}
        "#,
        env!("CARGO_PKG_VERSION")
    );
}
