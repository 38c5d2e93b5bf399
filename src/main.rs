use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use superset_guest_token::config::ServiceConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        println!("{}", ServiceConfig::usage());
        return Ok(());
    }

    let cfg = ServiceConfig::load(&args)?;
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    info!(target: "startup", "RUST_LOG='{}'", rust_log);

    superset_guest_token::server::run(cfg).await
}
