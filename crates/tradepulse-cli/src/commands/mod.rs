mod report;
mod sync;

use serde_json::Value;

use crate::cli::{Cli, Command};
use crate::error::CliError;

pub async fn run(cli: &Cli) -> Result<Value, CliError> {
    match &cli.command {
        Command::Sync(args) => sync::run(args, &cli.db).await,
        Command::Report { report } => report::run(report, &cli.db),
    }
}
