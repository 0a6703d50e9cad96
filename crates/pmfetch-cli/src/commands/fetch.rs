use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use pmfetch_core::export::country_name;
use pmfetch_core::{
    export_dataset, ExportOptions, ExportedFile, FallbackChainBuilder, FetchRequest, Parameter,
    ParameterReport,
};

use crate::cli::FetchArgs;
use crate::error::CliError;

use super::CommandOutcome;

#[derive(Debug, Serialize)]
struct FetchReport<'a> {
    records: usize,
    any_synthetic: bool,
    parameters: &'a [ParameterReport],
    files: Vec<ExportedFile>,
    latency_ms: u64,
}

pub async fn run(args: &FetchArgs, cancel: &CancellationToken) -> Result<CommandOutcome, CliError> {
    let parameters = if args.parameters.is_empty() {
        Parameter::ALL.to_vec()
    } else {
        args.parameters.iter().copied().map(Parameter::from).collect()
    };

    let mut builder = FetchRequest::builder(parameters[0])
        .country_code(args.country.as_str())
        .page_size(args.page_size)
        .max_records(args.max_records);
    if let Some(city) = &args.city {
        builder = builder.city(city.as_str());
    }
    if let Some(location_id) = &args.location_id {
        builder = builder.location_id(location_id.as_str());
    }
    let request = builder.build()?;

    let mut chain = FallbackChainBuilder::from_env()?;
    if let Some(seed) = args.seed {
        chain = chain.with_seed(seed);
    }
    if args.offline {
        chain = chain.offline();
    }
    let chain = chain.build()?;

    let combined = chain
        .fetch_parameters(&request, &parameters, cancel)
        .await?;

    let files = match &args.output_dir {
        Some(dir) => export_dataset(
            dir,
            &combined.measurements,
            &ExportOptions {
                prefix: &args.prefix,
                country: country_name(request.country_code()),
                split_parameters: false,
                include_analysis: false,
            },
        )?,
        None => Vec::new(),
    };

    info!(
        records = combined.measurements.len(),
        latency_ms = combined.latency_ms,
        "fetch finished"
    );

    let report = serde_json::to_value(FetchReport {
        records: combined.measurements.len(),
        any_synthetic: combined.any_synthetic(),
        parameters: &combined.reports,
        files,
        latency_ms: combined.latency_ms,
    })?;

    let failure = (args.require_live && combined.any_synthetic()).then(|| {
        let parameters = combined
            .reports
            .iter()
            .filter(|report| report.provenance.is_synthetic())
            .map(|report| report.parameter.label())
            .collect::<Vec<_>>()
            .join(", ");
        CliError::LiveRequired { parameters }
    });

    Ok(CommandOutcome::ok(report).with_failure(failure))
}
