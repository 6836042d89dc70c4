//! Config-driven techno-economic runs for hybrid renewable energy plants
//! producing hydrogen and ammonia.
//!
//! YAML inputs are loaded into [`config::SourceConfig`]s, validated into a
//! [`config::ConfigurationAggregate`], run through a [`sim::SimulationEngine`]
//! by [`runner::invoke`] and read back from a [`results::ResultHandle`] by
//! key and unit.

pub mod cli;
pub mod config;
pub mod error;
pub mod io;
pub mod logging;
pub mod report;
pub mod results;
pub mod runner;
/// Simulation engines, annualization and design search.
pub mod sim;

pub use config::{AggregateBuilder, ConfigurationAggregate, RunOptions, SourceConfig, SourceKind};
pub use error::{PlantError, Result};
pub use results::ResultHandle;
pub use runner::invoke;
