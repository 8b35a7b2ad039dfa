use clap::Parser;
use soulbrowser_cli::cli::Args;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() {
    init_logging();
    let args = Args::parse();

    match soulbrowser_cli::app::run(args).await {
        Ok(()) => std::process::exit(0),
        Err(err) => {
            tracing::error!(%err, "soulbrowser exited with an error");
            std::process::exit(err.exit_code());
        }
    }
}
