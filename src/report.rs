//! Human-readable run summary.
//!
//! The summary is advisory; scripts should extract results by key instead
//! of parsing it. Lines for results an engine did not report are omitted.

use std::fmt;

use crate::config::ConfigurationAggregate;
use crate::results::ResultHandle;

/// Levelized costs from level 1.
pub const LEVEL_COSTS: u8 = 1;
/// Production and capacity factors from level 4.
pub const LEVEL_PRODUCTION: u8 = 4;
/// Cost breakdown and installation order from level 7.
pub const LEVEL_DETAIL: u8 = 7;

/// Summary of one run, rendered according to `output_level`.
pub struct Summary<'a> {
    results: &'a ResultHandle,
    aggregate: &'a ConfigurationAggregate,
    level: u8,
}

impl<'a> Summary<'a> {
    pub fn new(results: &'a ResultHandle, aggregate: &'a ConfigurationAggregate) -> Self {
        Self {
            results,
            aggregate,
            level: aggregate.options().output_level,
        }
    }

    pub fn with_level(mut self, level: u8) -> Self {
        self.level = level;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.level < LEVEL_COSTS
    }

    fn value(&self, key: &str, unit: &str) -> Option<f64> {
        self.results.scalar(key, unit).ok()
    }

    fn line(
        &self,
        f: &mut fmt::Formatter<'_>,
        label: &str,
        key: &str,
        unit: &str,
        shown_unit: &str,
        precision: usize,
    ) -> fmt::Result {
        match self.value(key, unit) {
            Some(v) => writeln!(f, "{label:<23}{v:.precision$} {shown_unit}"),
            None => Ok(()),
        }
    }
}

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return Ok(());
        }
        let opts = self.aggregate.options();
        let design = &self.aggregate.model().design;

        writeln!(f, "--- Plant Summary ---")?;
        writeln!(
            f,
            "{:<23}{} (electrolyzer {}, {})",
            "Design scenario:",
            opts.plant_design_scenario,
            design.electrolyzer_location,
            design.transportation
        )?;
        writeln!(f, "{:<23}{}", "Incentive option:", opts.incentive_option)?;
        self.line(f, "LCOE:", "lcoe", "USD/(MW*h)", "USD/MWh", 2)?;
        self.line(f, "LCOH:", "lcoh", "USD/kg", "USD/kg", 3)?;
        self.line(f, "LCOA:", "lcoa", "USD/kg", "USD/kg", 3)?;

        if self.level >= LEVEL_PRODUCTION {
            self.line(f, "Annual energy:", "annual_energy", "MW*h/yr", "MWh/yr", 0)?;
            self.line(f, "H2 production:", "h2_production", "t/yr", "t/yr", 1)?;
            self.line(f, "NH3 production:", "nh3_production", "t/yr", "t/yr", 1)?;
            for tech in ["wind", "pv", "electrolyzer"] {
                if let Some(cf) = self.value(&format!("capacity_factor.{tech}"), "percent") {
                    writeln!(f, "{:<23}{cf:.1}%", format!("Capacity factor {tech}:"))?;
                }
            }
        }

        if self.level >= LEVEL_DETAIL {
            for part in ["wind", "pv", "battery", "installation", "electrolyzer"] {
                if let Some(c) = self.value(&format!("capex.{part}"), "USD") {
                    writeln!(f, "{:<23}{:.2} MUSD", format!("Capex {part}:"), c / 1e6)?;
                }
            }
            if let Some(c) = self.value("capex.total", "USD") {
                writeln!(f, "{:<23}{:.2} MUSD", "Total capex:", c / 1e6)?;
            }
            if let Some(o) = self.value("opex.total", "USD/yr") {
                writeln!(f, "{:<23}{:.2} MUSD/yr", "Total opex:", o / 1e6)?;
            }
            if let Some(order) = self
                .aggregate
                .model()
                .installation
                .as_ref()
                .and_then(|s| s.start_order())
            {
                writeln!(f, "Install phases:")?;
                for (i, phase) in order.iter().enumerate() {
                    writeln!(f, "  {}. {} ({})", i + 1, phase.name, phase.start)?;
                }
            }
        }
        write!(f, "{:<23}{}", "Output directory:", opts.output_dir.display())
    }
}
