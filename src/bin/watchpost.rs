use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use watchpost::config::load_config;
use watchpost::monitor::scheduler::run_window;
use watchpost::monitor::OBSERVATION_WINDOW_SECS;
use watchpost::notifications::senders::telegram::TelegramSender;
use watchpost::notifications::senders::NotificationSender;
use watchpost::report::build_report;
use watchpost::version::VERSION;

const CONFIG_PATH: &str = "watchpost.toml";
const LOG_ROOT: &str = "logs";

#[derive(Parser, Debug)]
#[command(name = "watchpost", version = VERSION, about = "Probes configured endpoints for one 24-hour window and delivers a daily uptime report")]
struct Cli {
    /// Identifier of the observation window; selects the per-day log
    /// directory and the report file name.
    #[arg(long, default_value_t = 1)]
    day: u32,
}

fn init_logging() {
    // Log to a file: JSON format, daily rotation
    let file_appender = rolling::daily("logs", "watchpost.log");
    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .json();

    // Log to stdout: human-readable format
    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    // Default to `info` level if RUST_LOG is not set.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging();
    info!(version = VERSION, day = cli.day, "starting watchpost");

    let config = match load_config(Path::new(CONFIG_PATH)) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Critical error loading configuration. Exiting.");
            return Err(e.into());
        }
    };
    if config.targets.is_empty() {
        warn!("no targets configured; the daily report will be empty");
    }

    let sender: Arc<dyn NotificationSender> = Arc::new(TelegramSender::new(config.telegram.clone()));
    let log_root = Path::new(LOG_ROOT);
    let window = Duration::from_secs(OBSERVATION_WINDOW_SECS);

    run_window(&config, sender.clone(), log_root, cli.day, window).await?;

    let report = build_report(&config.targets, log_root, cli.day, OBSERVATION_WINDOW_SECS)?;
    let report_path = PathBuf::from(format!("report_{}.csv", cli.day));
    report.write_csv(&report_path)?;
    info!(path = %report_path.display(), targets = report.rows.len(), "daily report written");

    let caption = format!("Daily availability report (day {})", cli.day);
    if let Err(e) = sender.deliver(&report_path, &caption).await {
        warn!(error = %e, "failed to deliver daily report");
    }

    Ok(())
}
