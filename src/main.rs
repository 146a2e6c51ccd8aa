use kbchat::app::App;
use kbchat::cli::{parse_args, run_command, CliCommand, USAGE};
use kbchat::config::ClientConfig;

use color_eyre::Result;
use tracing_subscriber::EnvFilter;

/// Log filter used when `RUST_LOG` is unset or invalid
const DEFAULT_LOG_FILTER: &str = "kbchat=info";

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_FILTER))
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_logging();

    let args = match parse_args(std::env::args()) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {}\n\n{}", e, USAGE);
            std::process::exit(2);
        }
    };

    // No config or network needed for these
    if matches!(args.command, CliCommand::Version | CliCommand::Help) {
        return run_version_or_help(args.command);
    }

    // Flags override the config file and environment
    let mut config = ClientConfig::load()?;
    if let Some(url) = args.api_url {
        config = config.with_base_url(url);
    }
    if let Some(policy) = args.submit_policy {
        config = config.with_submit_policy(policy);
    }
    if let Some(policy) = args.failure_policy {
        config = config.with_failure_policy(policy);
    }
    tracing::debug!(base_url = %config.base_url, "Using API");

    let mut app = App::from_config(&config)?;
    if let Err(e) = run_command(&mut app, args.command).await {
        tracing::debug!("Command failed: {:?}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run_version_or_help(command: CliCommand) -> Result<()> {
    match command {
        CliCommand::Version => println!("{}", kbchat::cli::version_line()),
        _ => println!("{}", USAGE),
    }
    Ok(())
}
