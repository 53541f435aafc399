use std::sync::Arc;

use anyhow::Context as _;
use kyc_wallet::cli::Console;
use kyc_wallet::config::FlowConfig;
use kyc_wallet::context::FlowContext;
use kyc_wallet::navigation::RouteLog;
use kyc_wallet::services::HttpApiClient;
use kyc_wallet::session::Session;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = FlowConfig::from_env().context("invalid configuration")?;

    let session = Arc::new(match std::env::var("KYC_WALLET_TOKEN") {
        Ok(token) if !token.trim().is_empty() => Session::with_token(token.trim()),
        _ => Session::new(),
    });

    eprintln!("KYC Wallet v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   API: {}", config.api_base_url);
    eprintln!(
        "   Session: {}",
        if session.token().is_some() {
            "signed in"
        } else {
            "signed out (use 'login <token>')"
        }
    );
    eprintln!("   Type 'help' for commands, 'quit' to exit.\n");

    let client = Arc::new(
        HttpApiClient::new(&config, session.clone()).context("failed to build HTTP client")?,
    );
    let ctx = FlowContext::new(
        session.clone(),
        client.clone(),
        client,
        Arc::new(RouteLog::new()),
        config,
    );

    Console::new(ctx, session).run().await?;
    Ok(())
}
