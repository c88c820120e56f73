//! casa binary entry point.

use casa::agent::{CommunityAgentFactory, ModelSettings};
use casa::cli::Cli;
use casa::config::Secrets;
use casa::session::ChatSession;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse_args();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> casa::error::Result<()> {
    let secrets = Secrets::from_env()?;

    let settings = ModelSettings::new(secrets.openai_api_key.clone())
        .with_model(cli.model)
        .with_temperature(cli.temperature)
        .with_max_steps(cli.max_steps);

    // Token fetch happens here; bad credentials abort startup.
    let factory = CommunityAgentFactory::new(secrets, settings).await?;

    let mut session = ChatSession::with_history_window(Box::new(factory), cli.history_window);
    casa::shell::run(&mut session).await
}
