//! Entry point: CLI wiring, engine selection and result printing.

use std::process;

use clap::Parser;

use hybrid_plant_sim::cli::{Cli, Extraction};
use hybrid_plant_sim::report::Summary;
use hybrid_plant_sim::results::{ResultHandle, ResultValue};
use hybrid_plant_sim::sim::{ExternalEngine, ScreeningEngine, SimulationEngine};
use hybrid_plant_sim::{Result, logging, runner};

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        tracing::error!(error = %e, "run failed");
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let manifest = cli.to_manifest()?;
    logging::init(manifest.run.verbose);
    if let Some(path) = &cli.scenario {
        tracing::info!(scenario = %path.display(), "loaded scenario manifest");
    }

    let aggregate = manifest.build_aggregate()?;
    let engine: Box<dyn SimulationEngine> = match &manifest.engine {
        Some(spec) => Box::new(ExternalEngine::from(spec)),
        None => Box::new(ScreeningEngine),
    };

    let (results, aggregate) = runner::invoke(&engine, &aggregate, manifest.run_only)?;

    let summary = Summary::new(&results, &aggregate);
    if !summary.is_empty() {
        println!("{summary}");
    }
    for request in &cli.extract {
        print_extraction(&results, request)?;
    }
    Ok(())
}

fn print_extraction(results: &ResultHandle, request: &Extraction) -> Result<()> {
    let value = results.extract(&request.key, &request.unit)?;
    let shown = match value {
        ResultValue::Scalar(v) => v.to_string(),
        ResultValue::Series(vs) => vs.iter().map(f64::to_string).collect::<Vec<_>>().join(","),
    };
    println!("{}={shown} {}", request.key, request.unit);
    Ok(())
}
