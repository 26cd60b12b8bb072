use anyhow::{Context, Result};
use clap::Parser;
use gcloudssh::cache::{InstanceCache, CACHE_DIR_NAME};
use gcloudssh::config::Config;
use gcloudssh::gcp::GcloudCli;
use gcloudssh::shell::ShellResult;
use gcloudssh::Session;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, e.g. `GCLOUDSSH_LOG=debug`
const LOG_ENV: &str = "GCLOUDSSH_LOG";

/// SSH into a Compute Engine instance by name
#[derive(Parser, Debug)]
#[command(name = "gcloudssh", version, about, long_about = None)]
struct Args {
    /// The name of the instance you wish to connect to
    instance_name: String,

    /// Force refreshing the instances list cache
    #[arg(short, long, alias = "refresh_instances_cache")]
    refresh_instances_cache: bool,
}

fn setup_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let directive = std::env::var(LOG_ENV).ok().filter(|d| !d.is_empty())?;

    let filter = match EnvFilter::try_new(&directive) {
        Ok(filter) => filter,
        Err(e) => {
            eprintln!("Ignoring invalid {}={:?}: {}", LOG_ENV, directive, e);
            return None;
        }
    };

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Failed to open log file {:?}: {}", log_path, e);
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("gcloudssh started with log filter: {}", directive);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("gcloudssh").join("gcloudssh.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(CACHE_DIR_NAME).join("gcloudssh.log");
    }
    PathBuf::from("gcloudssh.log")
}

fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging();

    let config = Config::load();
    tracing::debug!("Config: {:?}", config);

    let cache_dir = config
        .effective_cache_dir()
        .context("Failed to locate the instance cache directory")?;

    let mut session = Session::new(
        GcloudCli::new(config.effective_gcloud()),
        InstanceCache::new(cache_dir),
    );

    session
        .load_directory(
            config.effective_use_cache(),
            config.effective_cache_expiration(),
            args.refresh_instances_cache,
        )
        .context("Failed to load the instance directory")?;

    let result = session
        .connect(&args.instance_name)
        .with_context(|| format!("Failed to connect to {}", args.instance_name))?;

    if result != ShellResult::Success {
        tracing::debug!("Remote session exit status ignored: {:?}", result);
    }

    Ok(())
}
