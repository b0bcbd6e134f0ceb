use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use rezerwacje::captcha::CommandSolver;
use rezerwacje::config::{form, Config, UserConfig};
use rezerwacje::pipeline::Pipeline;
use rezerwacje::session::{HttpTransport, Session};

#[derive(Parser)]
#[command(
    name = "rezerwacje",
    version,
    about = "Appointment slot hunter for the DUW reservation service",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Application configuration file
    #[arg(long, global = true, default_value = "application.toml")]
    config: PathBuf,

    /// User configuration file
    #[arg(long, global = true, default_value = "user.toml")]
    user: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); the config file decides when omitted
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Reservation of a visit for making a legalization of foreigners
    Application {
        /// City short code (repeatable); every configured city when omitted
        #[arg(long = "city", value_name = "CODE")]
        cities: Vec<String>,
    },

    /// Reservation of a visit to a head of department
    Headof {
        /// Department short code
        #[arg(long, value_name = "CODE")]
        department: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::from_file(&cli.config)?;
    config.validate()?;
    let user = UserConfig::from_file(&cli.user)?;
    user.validate()?;

    let log_format = cli.log_format.as_deref().unwrap_or(&config.logging.format);
    setup_tracing(log_format, &config.logging.level, cli.verbose)?;

    tracing::info!("rezerwacje starting");

    // Resolve everything local before the first request
    let (entities, rows) = match &cli.command {
        Commands::Application { cities } => {
            tracing::info!(cities = ?cities, "Starting application command");
            (
                config.select_cities(cities)?,
                form::application_form(&user, &config.strings),
            )
        }
        Commands::Headof { department } => {
            tracing::info!(department = %department, "Starting headof command");
            (
                vec![config.select_department(department)?],
                form::head_of_department_form(&user, &config.strings)?,
            )
        }
    };

    let transport =
        HttpTransport::new(&config.service).context("Failed to create HTTP transport")?;
    let session = Session::new(Arc::new(transport)).with_retry_policy(config.pipeline.retry_policy());
    let solver = Arc::new(CommandSolver::from_config(&config.captcha));
    let pipeline = Pipeline::new(config.pipeline.clone(), session, solver);

    let stop = pipeline.shutdown_handle();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Shutdown signal received, stopping...");
                let _ = stop.send(true);
            }
            Err(e) => {
                tracing::error!("Failed to wait for Ctrl+C: {}", e);
            }
        }
    });

    tracing::info!(login = %user.login, "Logging in...");
    match pipeline.service().login(&user.login, &user.password).await {
        Ok(()) => {}
        Err(e) if e.is_cancelled() => {
            tracing::info!("Stopped before logging in");
            return Ok(());
        }
        Err(e) => return Err(e).context("Invalid login or password"),
    }

    let active = match pipeline.discover(&entities).await {
        Ok(active) => active,
        Err(e) if e.is_cancelled() => {
            tracing::info!("Stopped during discovery");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    if active.is_empty() {
        tracing::warn!("No entity has an acceptable open date, nothing to do");
        return Ok(());
    }

    let stats = pipeline.run(active, Arc::new(rows)).await?;

    tracing::info!(
        reserved = stats.reserved,
        attempts = stats.attempts,
        lock_win_rate = stats.lock_win_rate(),
        "rezerwacje completed"
    );
    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| {
        if verbose {
            EnvFilter::try_new("rezerwacje=debug,info")
        } else {
            EnvFilter::try_new(format!("rezerwacje={level},warn"))
        }
    })?;

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}
