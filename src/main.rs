use anyhow::Context;
use casecrafter::cli::output::Output;
use casecrafter::cli::{Cli, Commands, commands};
use casecrafter::{AppContext, AppError, ClientConfig};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing(cli: &Cli, config_level: &str) {
    let filter = if cli.verbose {
        EnvFilter::new("casecrafter=debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("casecrafter={}", config_level)))
    };

    let registry = tracing_subscriber::registry().with(filter);
    if cli.log_json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse_args();
    let out = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    let config = ClientConfig::load(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    init_tracing(&cli, &config.log_level);
    tracing::debug!(base_url = %config.api.base_url, "configuration loaded");

    let ctx = AppContext::from_config(config).context("Failed to initialize client")?;

    // Sign-in commands start from a clean slate; everything else resumes
    // the stored session
    if !matches!(cli.command, Commands::Login { .. } | Commands::Register { .. }) {
        ctx.auth.restore_session();
    }

    let result = commands::run(&ctx, cli.command, &out).await;

    if ctx.login_required() {
        out.warning("Your session has expired");
        out.hint("Sign in again with:");
        out.command("casecrafter login <email>");
    }

    match result {
        Ok(()) => Ok(()),
        Err(AppError::Cancelled) => {
            out.warning("Cancelled");
            Ok(())
        }
        Err(e) => {
            out.error(&e.user_message());
            std::process::exit(1);
        }
    }
}
