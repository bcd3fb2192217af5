use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Use JSON logs in production (PAGESMITH_LOG_JSON=1), human-readable otherwise
    let json_logs = std::env::var("PAGESMITH_LOG_JSON").unwrap_or_default() == "1";
    let filter = EnvFilter::from_default_env()
        .add_directive("pagesmith_server=info".parse()?)
        .add_directive("pagesmith_core=info".parse()?);
    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let config = pagesmith_server::config::ServerConfig::parse();
    tracing::info!(
        owner = %config.github_owner,
        model = %config.llm_model,
        "Starting pagesmith on {}",
        config.listen_addr
    );

    let server = pagesmith_server::server::Server::new(config);
    server.run().await
}
