use anyhow::Result;
use clap::Parser;
use console::style;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tubedigest::cli::{Cli, Commands, KeysCommand};
use tubedigest::credentials::{self, CredentialStore};
use tubedigest::digest::{self, DigestPipeline, DigestResult};
use tubedigest::{output, Config, OutputFormat};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose { "tubedigest=debug" } else { "tubedigest=info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());
    let registry = tracing_subscriber::registry().with(filter);
    if cli.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    let config = Config::load(cli.config.as_deref()).await?;
    let show_progress = !cli.quiet;

    match cli.command {
        Commands::Transcript {
            url,
            output,
            format,
        } => {
            let pipeline = DigestPipeline::new(config, cli.keys_file, show_progress)?;
            tracing::info!("Fetching transcript for URL: {}", url);
            let result = pipeline.transcript(&url).await?;
            emit(&result, output, &format).await?;
        }
        Commands::Summarize {
            url,
            action,
            language,
            output,
            format,
        } => {
            let pipeline = DigestPipeline::new(config, cli.keys_file, show_progress)?;
            let result = pipeline
                .summarize(&url, action.as_deref(), language.as_deref())
                .await?;
            emit(&result, output, &format).await?;
        }
        Commands::Ask {
            url,
            question,
            output,
            format,
        } => {
            let pipeline = DigestPipeline::new(config, cli.keys_file, show_progress)?;
            let result = pipeline.ask(&url, &question).await?;
            emit(&result, output, &format).await?;
        }
        Commands::Keys { command } => {
            let store = digest::open_store(&config, cli.keys_file)?;
            run_keys(&store, command).await?;
        }
        Commands::Actions => {
            for action in config.actions() {
                let marker = if action.name == config.app.default_action {
                    " (default)"
                } else {
                    ""
                };
                println!("  • {}{}", style(&action.name).bold(), marker);
            }
        }
        Commands::Config { show } => {
            if show {
                config.display();
            } else {
                println!("Edit the config file to change settings:");
                match cli.config {
                    Some(path) => println!("  {}", path.display()),
                    None => println!("  {}", Config::config_path()?.display()),
                }
            }
        }
    }

    Ok(())
}

async fn emit(
    result: &DigestResult,
    path: Option<std::path::PathBuf>,
    format: &OutputFormat,
) -> Result<()> {
    match path {
        Some(path) => {
            output::save_to_file(result, &path, format).await?;
            println!("Saved to: {}", path.display());
        }
        None => output::print_to_console(result, format)?,
    }
    Ok(())
}

async fn run_keys(store: &dyn CredentialStore, command: KeysCommand) -> Result<()> {
    match command {
        KeysCommand::List => {
            let snapshot = store.get().await?;
            if snapshot.pool.is_empty() {
                println!("No Supadata API keys added yet.");
                return Ok(());
            }
            for cred in &snapshot.pool {
                let active = snapshot.active_id.as_deref() == Some(cred.id.as_str());
                let marker = if active { style("*").green().bold() } else { style(" ") };
                let status = if cred.degraded {
                    style("degraded").red().to_string()
                } else {
                    style("ok").green().to_string()
                };
                println!("{} {}  {}  [{}]", marker, cred.id, cred.label(), status);
            }
        }
        KeysCommand::Add { secret, name } => {
            let secret = match secret {
                Some(secret) => secret,
                None => credentials::read_secret(std::io::stdin().lock())?,
            };
            let cred = credentials::add_credential(store, &secret, name).await?;
            println!("Added key {} ({})", cred.id, cred.label());
        }
        KeysCommand::Remove { id } => {
            let cred = credentials::remove_credential(store, &id).await?;
            println!("Removed key {}", cred.label());
        }
        KeysCommand::Activate { id } => {
            credentials::activate_credential(store, &id).await?;
            println!("Activated key {}", id);
        }
        KeysCommand::Reset => {
            let cleared = credentials::reset_degraded(store).await?;
            println!("Cleared {} degraded flag(s)", cleared);
        }
    }
    Ok(())
}
