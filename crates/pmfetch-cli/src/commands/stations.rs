use pmfetch_core::StationTable;

use crate::error::CliError;

use super::CommandOutcome;

pub fn run() -> Result<CommandOutcome, CliError> {
    let table = StationTable::india_reference();
    Ok(CommandOutcome::ok(serde_json::to_value(table.stations())?))
}
