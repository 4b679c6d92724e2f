use chrono::Local;
use dotenv::dotenv;
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;

mod campaign;
mod config;
mod credentials;
mod pipeline;
mod state;
mod twitter;

use campaign::CampaignConfig;
use config::Config;
use credentials::TwitterCredentials;
use pipeline::RunError;
use state::StateStore;
use twitter::TwitterClient;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenv().ok();
    let config = Config::from_env();

    if let Err(e) = init_logging(config.log_file.as_deref()) {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    match run(&config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// `info` unless RUST_LOG says otherwise; with a log file the file is
/// truncated and gets one `<time> - <target> - <LEVEL> - <message>` line per record
fn init_logging(log_file: Option<&Path>) -> Result<(), String> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));

    if let Some(path) = log_file {
        let file = std::fs::File::create(path)
            .map_err(|e| format!("Failed to open log file {}: {}", path.display(), e))?;
        builder
            .target(env_logger::Target::Pipe(Box::new(file)))
            .format(|buf, record| {
                writeln!(
                    buf,
                    "{} - {} - {} - {}",
                    Local::now().format("%Y-%m-%d %H:%M:%S,%3f"),
                    record.target(),
                    record.level(),
                    record.args()
                )
            });
    }

    builder.init();
    Ok(())
}

async fn run(config: &Config) -> Result<(), String> {
    let campaign = CampaignConfig::load(&config.config_dir)?;
    let credentials = TwitterCredentials::from_env()?;

    let client = TwitterClient::authenticate(credentials, &config.api_base)
        .await
        .map_err(|e| {
            if e.is_auth_failure() {
                format!("Twitter rejected the credentials: {}", e)
            } else {
                format!("Failed to authenticate: {}", e)
            }
        })?;
    log::info!("Running as @{}", client.username());

    let store = StateStore::new(&config.state_path);
    log::info!("Using state file {}", store.path().display());
    let mut state = store.load_or_seed(&client).await?;

    let mut rng = rand::thread_rng();
    match pipeline::run_once(&client, &mut state, &campaign, &mut rng).await {
        Ok(summary) => {
            store.save(&state)?;
            log::info!(
                "Run complete: {} fetched, {} replied, {} skipped",
                summary.fetched,
                summary.replied,
                summary.skipped
            );
            Ok(())
        }
        Err(e @ RunError::Action { .. }) => {
            // Replies that already went out must not be sent again next run
            store.save(&state)?;
            Err(e.to_string())
        }
        Err(e) => Err(e.to_string()),
    }
}
