//! Simulation invoker: runs an engine on an aggregate and exports results.

use std::fs;
use std::time::Instant;

use crate::config::ConfigurationAggregate;
use crate::error::{PlantError, Result};
use crate::io::export::export_all;
use crate::results::ResultHandle;
use crate::sim::optimize::optimize;
use crate::sim::{RunMode, SimulationEngine};

/// Runs one simulation.
///
/// With `run_only` the configured design is evaluated once; otherwise the
/// design variables declared in the plant config are searched and the best
/// design is returned. The output directory is created first, and results
/// are exported there when `post_processing` is set.
///
/// # Errors
///
/// `Output` if the output directory or an export cannot be written, plus
/// whatever the engine or the search reports.
pub fn invoke<E: SimulationEngine + ?Sized>(
    engine: &E,
    aggregate: &ConfigurationAggregate,
    run_only: bool,
) -> Result<(ResultHandle, ConfigurationAggregate)> {
    let dir = aggregate.output_dir();
    fs::create_dir_all(dir).map_err(|source| PlantError::Output {
        path: dir.to_path_buf(),
        source,
    })?;

    let mode = RunMode::from_run_only(run_only);
    tracing::info!(engine = engine.name(), %mode, output_dir = %dir.display(), "starting run");
    let started = Instant::now();

    let (results, aggregate) = match mode {
        RunMode::Evaluate => engine.evaluate(aggregate)?,
        RunMode::Optimize => optimize(engine, aggregate)?,
    };

    tracing::info!(
        engine = engine.name(),
        results = results.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "run complete"
    );

    if aggregate.options().post_processing {
        export_all(&results, aggregate.output_dir())?;
    }
    Ok((results, aggregate))
}
