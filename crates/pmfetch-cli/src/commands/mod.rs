mod fetch;
mod generate;
mod locations;
mod stations;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::cli::{Cli, Command};
use crate::error::CliError;

/// JSON report for stdout plus an optional failure decided after the report
/// was produced (e.g. `--require-live`).
pub struct CommandOutcome {
    pub report: Value,
    pub failure: Option<CliError>,
}

impl CommandOutcome {
    pub fn ok(report: Value) -> Self {
        Self {
            report,
            failure: None,
        }
    }

    pub fn with_failure(mut self, failure: Option<CliError>) -> Self {
        self.failure = failure;
        self
    }
}

pub async fn run(cli: &Cli) -> Result<CommandOutcome, CliError> {
    match &cli.command {
        Command::Fetch(args) => fetch::run(args, &interrupt_token()).await,
        Command::Generate(args) => generate::run(args),
        Command::Stations => stations::run(),
        Command::Locations(args) => locations::run(args, &interrupt_token()).await,
    }
}

/// Token cancelled on Ctrl-C so in-flight backoff and page delays stop early.
fn interrupt_token() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling fetch");
            child.cancel();
        }
    });
    token
}
