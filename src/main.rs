use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use battle_mitra::csv::{read_commands, write_balances};
use battle_mitra::{Config, Platform};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let Some(path) = env::args().nth(1) else {
        eprintln!("usage: battle-mitra <journal.csv>");
        return ExitCode::FAILURE;
    };

    if !path.ends_with(".csv") {
        warn!(path, "input file seems to not be a csv file");
    }

    let config = Config::from_env();

    // owned, so the reader can move into the feeding task
    let commands = match read_commands(PathBuf::from(&path)) {
        Ok(commands) => commands,
        Err(e) => {
            error!(path, "{e}");
            return ExitCode::FAILURE;
        }
    };

    let (command_sender, command_receiver) = tokio::sync::mpsc::channel(config.channel_capacity);
    let mut platform = Platform::new(config);

    tokio::spawn(async move {
        for result in commands {
            match result {
                Ok(command) => {
                    if command_sender.send(command).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("{e}");
                }
            }
        }
    });

    platform.run(ReceiverStream::new(command_receiver)).await;

    if let Err(e) = write_balances(platform.balances(), std::io::stdout().lock()) {
        error!("failed to write balances: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
