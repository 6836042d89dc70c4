//! Configuration loading, typed section views and the run aggregate.

pub mod aggregate;
pub mod install;
pub mod manifest;
pub mod sections;
pub mod source;

pub use aggregate::{AggregateBuilder, ConfigurationAggregate, PlantModel, RunOptions};
pub use install::{InstallPhase, InstallationSchedule, PhaseStart};
pub use manifest::{EngineSpec, InputPaths, ScenarioManifest};
pub use source::{SourceConfig, SourceKind};
