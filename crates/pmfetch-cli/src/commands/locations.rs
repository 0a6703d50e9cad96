use tokio_util::sync::CancellationToken;
use tracing::info;

use pmfetch_core::{FallbackChainBuilder, FetchRequest, Parameter};

use crate::cli::LocationsArgs;
use crate::error::CliError;

use super::CommandOutcome;

pub async fn run(
    args: &LocationsArgs,
    cancel: &CancellationToken,
) -> Result<CommandOutcome, CliError> {
    // Listings cover every parameter; the request's own parameter is ignored.
    let mut builder = FetchRequest::builder(Parameter::Pm25)
        .country_code(args.country.as_str())
        .page_size(args.page_size)
        .max_records(args.max_records);
    if let Some(city) = &args.city {
        builder = builder.city(city.as_str());
    }
    let request = builder.build()?;

    let chain = FallbackChainBuilder::from_env()?.build()?;
    let discovery = chain.discover_locations(&request, cancel).await?;

    info!(
        source = discovery.source.as_deref().unwrap_or("none"),
        locations = discovery.locations.len(),
        "location listing finished"
    );
    Ok(CommandOutcome::ok(serde_json::to_value(&discovery)?))
}
