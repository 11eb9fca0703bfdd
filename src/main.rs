#![allow(clippy::result_large_err)]

use ebook_manager::{
    commands::{self, Command, USAGE},
    config::{self, AppConfig, database::get_database_url},
    core::{error_log::ErrorLog, session::Session},
    errors::{Error, Result},
};
use dotenvy::dotenv;
use std::io::{self, Write};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    // 2. Load .env file; env vars can be set externally as well
    dotenv().ok();

    // 3. Parse the command line before touching anything on disk
    let command = match Command::parse(std::env::args().skip(1)) {
        Ok(command) => command,
        Err(message) => {
            eprintln!("error: {message}\n\n{USAGE}");
            return ExitCode::from(2);
        }
    };
    if command == Command::Help {
        println!("{USAGE}");
        return ExitCode::SUCCESS;
    }

    // 4. Load configuration and make sure the data directories exist
    let app_config = match config::load_default_config().and_then(|config| {
        config.ensure_directories()?;
        Ok(config)
    }) {
        Ok(config) => config,
        Err(e) => {
            error!("Critical error loading application configuration: {}", e);
            eprintln!("{}", e.user_message());
            return ExitCode::FAILURE;
        }
    };
    let error_log = ErrorLog::new(app_config.logs_dir());
    install_panic_hook(error_log.clone());

    // 5. Run the command against a freshly opened session
    match run(command, &app_config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_failure(&e, &error_log);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, app_config: &AppConfig) -> Result<()> {
    let mut session = Session::new();
    if std::env::var_os("DATABASE_URL").is_some() {
        session
            .connect_url(&get_database_url(&app_config.database_path()))
            .await?;
    } else {
        session.connect(app_config.database_path()).await?;
    }
    info!("Database ready");

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut stdout = io::stdout();
    let result = commands::execute(command, &session, app_config, &mut input, &mut stdout).await;
    stdout.flush()?;

    session.disconnect().await?;
    result
}

/// Shows the user-facing message; unexpected failures also get an error-log file.
fn report_failure(e: &Error, error_log: &ErrorLog) {
    error!("Command failed: {}", e);
    if !e.is_unexpected() {
        eprintln!("{}", e.user_message());
        return;
    }

    match error_log.record(e) {
        Ok(path) => eprintln!(
            "{} Detailed information can be found in {}",
            e.user_message(),
            path.display()
        ),
        Err(log_err) => eprintln!(
            "{} Writing the error log failed as well: {}",
            e.user_message(),
            log_err
        ),
    }
}

/// Last-resort handler: a panic is written to an error log before the default hook
/// reports it and the process ends.
fn install_panic_hook(error_log: ErrorLog) {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        if let Some(path) = error_log.record_panic(&info.to_string()) {
            eprintln!(
                "An unexpected error occurred. Detailed information can be found in {}",
                path.display()
            );
        }
        default_hook(info);
    }));
}
