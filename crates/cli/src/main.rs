use std::process::ExitCode;

use kdbx_dav_cli::{http_client, App, Command, Config, Outcome, LOG_ENV, PASSWORD_ENV, USAGE};
use tracing::warn;
use tracing_subscriber::EnvFilter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> anyhow::Result<Outcome> {
    let mut cli = kdbx_dav_cli::parse(std::env::args().skip(1))?;
    init_tracing(cli.verbose);

    match cli.command {
        Command::Help => {
            print!("{USAGE}");
            return Ok(Outcome::Success);
        }
        Command::Version => {
            println!("kdbx-dav {VERSION}");
            return Ok(Outcome::Success);
        }
        _ => {}
    }

    if cli.password.is_none() {
        cli.password = std::env::var(PASSWORD_ENV).ok();
    }

    let config_path = match cli.config.take() {
        Some(path) => path,
        None => {
            let path = Config::default_config_path();
            if let Err(e) = Config::create_default_if_missing(&path) {
                warn!("could not create default config: {e:#}");
            }
            path
        }
    };
    let config = Config::load_from_path(&config_path)?;
    let client = http_client(&config.transport)?;

    // Ctrl+C aborts the request in flight; a save still removes its temp file
    let cancel = client.cancellation().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, aborting");
            cancel.cancel();
        }
    });

    let mut app = App::new(client, config, config_path).with_overrides(cli.user, cli.password);
    let mut stdout = std::io::stdout().lock();
    app.run(&cli.command, &mut stdout).await
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(outcome) => ExitCode::from(outcome.code()),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
