//! Out-of-process engine speaking a JSON file protocol.
//!
//! The aggregate is written to `<output_dir>/engine_input.json` and the
//! program is run as `program [args..] --input <in> --output <out>`. The
//! program writes `{"results": {...}, "plant": {...}}`, where `plant` is
//! optional and replaces the plant config in the returned aggregate.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Deserialize;

use crate::config::{ConfigurationAggregate, EngineSpec, SourceConfig, SourceKind};
use crate::error::{PlantError, Result};
use crate::results::ResultHandle;

use super::SimulationEngine;

const INPUT_FILE: &str = "engine_input.json";
const OUTPUT_FILE: &str = "engine_output.json";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EngineOutput {
    results: ResultHandle,
    #[serde(default)]
    plant: Option<serde_yaml::Mapping>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExternalEngine {
    program: PathBuf,
    args: Vec<String>,
}

impl ExternalEngine {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn write_input(&self, aggregate: &ConfigurationAggregate, path: &Path) -> Result<()> {
        let body = serde_json::to_vec_pretty(aggregate).map_err(|e| {
            PlantError::SimulationFailure(format!("cannot serialize aggregate: {e}"))
        })?;
        fs::write(path, body).map_err(|source| PlantError::Output {
            path: path.to_path_buf(),
            source,
        })
    }

    fn read_output(&self, path: &Path) -> Result<EngineOutput> {
        let body = fs::read(path).map_err(|e| {
            PlantError::SimulationFailure(format!(
                "{} wrote no output at \"{}\": {e}",
                self.program.display(),
                path.display()
            ))
        })?;
        serde_json::from_slice(&body).map_err(|e| {
            PlantError::SimulationFailure(format!(
                "malformed engine output \"{}\": {e}",
                path.display()
            ))
        })
    }
}

impl From<&EngineSpec> for ExternalEngine {
    fn from(spec: &EngineSpec) -> Self {
        ExternalEngine::new(spec.program.clone()).with_args(spec.args.iter().cloned())
    }
}

impl SimulationEngine for ExternalEngine {
    fn name(&self) -> &str {
        "external"
    }

    fn evaluate(
        &self,
        aggregate: &ConfigurationAggregate,
    ) -> Result<(ResultHandle, ConfigurationAggregate)> {
        let dir = aggregate.output_dir();
        fs::create_dir_all(dir).map_err(|source| PlantError::Output {
            path: dir.to_path_buf(),
            source,
        })?;
        let input = dir.join(INPUT_FILE);
        let output = dir.join(OUTPUT_FILE);
        self.write_input(aggregate, &input)?;
        // A stale file from an earlier run must not pass for this run's output.
        if output.exists() {
            fs::remove_file(&output).map_err(|source| PlantError::Output {
                path: output.clone(),
                source,
            })?;
        }

        tracing::debug!(program = %self.program.display(), args = ?self.args, "spawning engine");
        let out = Command::new(&self.program)
            .args(&self.args)
            .arg("--input")
            .arg(&input)
            .arg("--output")
            .arg(&output)
            .output()
            .map_err(|e| {
                PlantError::SimulationFailure(format!(
                    "cannot start {}: {e}",
                    self.program.display()
                ))
            })?;

        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            return Err(PlantError::SimulationFailure(format!(
                "{} exited with {}: {}",
                self.program.display(),
                out.status,
                stderr.trim()
            )));
        }

        let parsed = self.read_output(&output)?;
        let aggregate = match parsed.plant {
            None => aggregate.clone(),
            Some(mapping) => {
                let origin = format!("{} (engine output)", output.display());
                let plant = SourceConfig::from_mapping(SourceKind::Plant, origin, mapping)?;
                aggregate.with_source(plant)?
            }
        };
        Ok((parsed.results, aggregate))
    }
}
