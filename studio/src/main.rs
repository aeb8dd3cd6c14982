use clap::Parser;
use std::sync::Arc;
use studio::config::{Cli, Config, LogFormat};
use studio::pipeline::ContentPipeline;
use studio::{Result, web};
use tracing::{info, warn};

fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "studio=info,agent=info",
        1 => "studio=debug,agent=debug",
        _ => "studio=trace,agent=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => fmt().with_env_filter(env_filter).with_target(false).init(),
        LogFormat::Json => fmt().json().with_env_filter(env_filter).init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env must be loaded before clap reads its env fallbacks
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(&cli);

    let config = Config::try_from(&cli)?;
    info!(model = %config.model, api_base = %config.api_base, "configuration loaded");

    let pipeline = Arc::new(ContentPipeline::from_config(&config));
    let app = web::router(pipeline);

    let listener = tokio::net::TcpListener::bind(&config.addr).await?;
    info!(addr = %listener.local_addr()?, "content studio listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = %err, "failed to listen for ctrl-c, graceful shutdown disabled");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    Ok(())
}
