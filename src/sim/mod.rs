//! Simulation engines and design search.

pub mod external;
pub mod finance;
pub mod optimize;
pub mod screening;

use std::fmt;

use crate::config::ConfigurationAggregate;
use crate::error::Result;
use crate::results::ResultHandle;

pub use external::ExternalEngine;
pub use screening::ScreeningEngine;

/// Evaluate the given design, or search the declared design variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Evaluate,
    Optimize,
}

impl RunMode {
    pub fn from_run_only(run_only: bool) -> Self {
        if run_only {
            RunMode::Evaluate
        } else {
            RunMode::Optimize
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Evaluate => f.write_str("evaluate"),
            RunMode::Optimize => f.write_str("optimize"),
        }
    }
}

/// A techno-economic engine that evaluates one fully-formed design.
///
/// `evaluate` blocks until the engine finishes and may take minutes for
/// external engines. It returns the results together with the aggregate as
/// the engine left it; engines that do not adjust the design return a copy
/// of their input.
pub trait SimulationEngine {
    fn name(&self) -> &str;

    /// # Errors
    ///
    /// `SimulationFailure` for engine-side failures; engines may also
    /// surface `InvalidConfig` when the design they hand back does not
    /// validate.
    fn evaluate(
        &self,
        aggregate: &ConfigurationAggregate,
    ) -> Result<(ResultHandle, ConfigurationAggregate)>;
}

impl<E: SimulationEngine + ?Sized> SimulationEngine for Box<E> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn evaluate(
        &self,
        aggregate: &ConfigurationAggregate,
    ) -> Result<(ResultHandle, ConfigurationAggregate)> {
        (**self).evaluate(aggregate)
    }
}
