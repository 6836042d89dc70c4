//! TOML scenario manifest naming the YAML inputs and run options of one run.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::aggregate::{AggregateBuilder, ConfigurationAggregate, RunOptions};
use super::source::SourceKind;
use crate::error::{PlantError, Result};

/// Paths of the five YAML inputs. Relative paths resolve against the
/// manifest's directory.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputPaths {
    pub generation: Option<PathBuf>,
    pub plant: Option<PathBuf>,
    pub turbine: Option<PathBuf>,
    pub wake_model: Option<PathBuf>,
    pub installation: Option<PathBuf>,
}

impl InputPaths {
    pub fn get(&self, kind: SourceKind) -> Option<&Path> {
        match kind {
            SourceKind::Generation => self.generation.as_deref(),
            SourceKind::Plant => self.plant.as_deref(),
            SourceKind::Turbine => self.turbine.as_deref(),
            SourceKind::WakeModel => self.wake_model.as_deref(),
            SourceKind::Installation => self.installation.as_deref(),
        }
    }

    /// Loads every configured path into a builder.
    ///
    /// # Errors
    ///
    /// The first loader error encountered.
    pub fn load_into(&self, mut builder: AggregateBuilder) -> Result<AggregateBuilder> {
        for kind in SourceKind::ALL {
            if let Some(path) = self.get(kind) {
                builder = builder.load(kind, path)?;
            }
        }
        Ok(builder)
    }

    fn resolve(&mut self, base: &Path) {
        for path in [
            &mut self.generation,
            &mut self.plant,
            &mut self.turbine,
            &mut self.wake_model,
            &mut self.installation,
        ]
        .into_iter()
        .flatten()
        {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}

/// External engine program and its extra arguments.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineSpec {
    pub program: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
}

/// Top-level scenario manifest.
///
/// ```toml
/// run_only = true
///
/// [inputs]
/// generation = "generation.yaml"
/// plant = "plant.yaml"
///
/// [run]
/// plant_design_scenario = 9
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioManifest {
    /// Evaluate the given design (`true`) or search design variables.
    #[serde(default = "default_run_only")]
    pub run_only: bool,
    pub inputs: InputPaths,
    #[serde(default)]
    pub run: RunOptions,
    #[serde(default)]
    pub engine: Option<EngineSpec>,
}

fn default_run_only() -> bool {
    true
}

impl ScenarioManifest {
    /// Parses a manifest file and resolves relative paths against its
    /// directory.
    ///
    /// # Errors
    ///
    /// `ConfigNotFound` if unreadable, `Manifest` if the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| PlantError::ConfigNotFound {
            path: path.to_path_buf(),
            source,
        })?;
        let mut manifest = Self::from_toml_str(&content).map_err(|e| match e {
            PlantError::Manifest { message, .. } => PlantError::Manifest {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        manifest.inputs.resolve(base);
        if manifest.run.output_dir.is_relative() {
            manifest.run.output_dir = base.join(&manifest.run.output_dir);
        }
        if let Some(engine) = manifest.engine.as_mut() {
            if engine.program.components().count() > 1 && engine.program.is_relative() {
                engine.program = base.join(&engine.program);
            }
        }
        Ok(manifest)
    }

    /// Parses a manifest from a TOML string; paths are kept as written.
    ///
    /// # Errors
    ///
    /// `Manifest` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| PlantError::Manifest {
            path: PathBuf::from("<inline>"),
            message: e.to_string(),
        })
    }

    /// Loads every input and builds the aggregate.
    ///
    /// # Errors
    ///
    /// Loader and builder errors.
    pub fn build_aggregate(&self) -> Result<ConfigurationAggregate> {
        self.inputs
            .load_into(AggregateBuilder::new(self.run.clone()))?
            .build()
    }
}
