//! Closed-form levelized-cost screening.
//!
//! Capacity factors and unit costs come straight from the configs; nothing
//! here models wakes, electrolyzer degradation or cash-flow timing. The
//! engine exists so the pipeline runs end to end without the external
//! toolchain, and it is deterministic: identical aggregates give identical
//! results.

use std::fmt;

use crate::config::sections::WindLocation;
use crate::config::ConfigurationAggregate;
use crate::error::{PlantError, Result};
use crate::results::ResultHandle;

use super::finance::annualization_factor;
use super::SimulationEngine;

const HOURS_PER_YEAR: f64 = 8760.0;

/// Per-technology annual figures (kW, kWh/yr, USD, USD/yr).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TechnologyEconomics {
    pub capacity_kw: f64,
    pub annual_energy_kwh: f64,
    pub capex: f64,
    pub opex: f64,
}

impl TechnologyEconomics {
    pub fn capacity_factor(&self) -> f64 {
        if self.capacity_kw > 0.0 {
            self.annual_energy_kwh / (self.capacity_kw * HOURS_PER_YEAR)
        } else {
            0.0
        }
    }
}

/// Everything the screening pass computes, before it is flattened into a
/// [`ResultHandle`].
#[derive(Debug, Clone, PartialEq)]
pub struct ScreeningReport {
    pub wind: Option<TechnologyEconomics>,
    pub pv: Option<TechnologyEconomics>,
    pub battery_capex: f64,
    pub battery_opex: f64,
    pub installation_capex: f64,
    pub annualization_factor: f64,
    /// USD/kWh.
    pub lcoe: f64,
    pub electrolyzer: TechnologyEconomics,
    pub h2_kg_per_year: f64,
    /// USD/kg.
    pub lcoh: f64,
    pub nh3_kg_per_year: Option<f64>,
    /// USD/kg.
    pub lcoa: Option<f64>,
}

impl ScreeningReport {
    pub fn generation_energy_kwh(&self) -> f64 {
        self.wind.map_or(0.0, |w| w.annual_energy_kwh)
            + self.pv.map_or(0.0, |p| p.annual_energy_kwh)
    }

    pub fn total_capex(&self) -> f64 {
        self.wind.map_or(0.0, |w| w.capex)
            + self.pv.map_or(0.0, |p| p.capex)
            + self.battery_capex
            + self.installation_capex
            + self.electrolyzer.capex
    }

    pub fn total_opex(&self) -> f64 {
        self.wind.map_or(0.0, |w| w.opex)
            + self.pv.map_or(0.0, |p| p.opex)
            + self.battery_opex
            + self.electrolyzer.opex
    }

    /// Flattens the report into result keys with units.
    pub fn to_results(&self) -> ResultHandle {
        let mut r = ResultHandle::new();
        r.insert("lcoe", self.lcoe * 1000.0, "USD/(MW*h)");
        r.insert("lcoh", self.lcoh, "USD/kg");
        if let Some(lcoa) = self.lcoa {
            r.insert("lcoa", lcoa, "USD/kg");
        }
        r.insert("annual_energy", self.generation_energy_kwh() / 1000.0, "MW*h/yr");
        r.insert("h2_production", self.h2_kg_per_year, "kg/yr");
        if let Some(nh3) = self.nh3_kg_per_year {
            r.insert("nh3_production", nh3, "kg/yr");
        }
        for (name, tech) in [("wind", self.wind), ("pv", self.pv)] {
            if let Some(t) = tech {
                r.insert(format!("capacity.{name}"), t.capacity_kw, "kW");
                r.insert(format!("capacity_factor.{name}"), t.capacity_factor(), "1");
                r.insert(format!("annual_energy.{name}"), t.annual_energy_kwh / 1000.0, "MW*h/yr");
                r.insert(format!("capex.{name}"), t.capex, "USD");
                r.insert(format!("opex.{name}"), t.opex, "USD/yr");
            }
        }
        if self.battery_capex > 0.0 || self.battery_opex > 0.0 {
            r.insert("capex.battery", self.battery_capex, "USD");
            r.insert("opex.battery", self.battery_opex, "USD/yr");
        }
        if self.installation_capex > 0.0 {
            r.insert("capex.installation", self.installation_capex, "USD");
        }
        r.insert("capacity.electrolyzer", self.electrolyzer.capacity_kw, "kW");
        r.insert(
            "capacity_factor.electrolyzer",
            self.electrolyzer.capacity_factor(),
            "1",
        );
        r.insert("capex.electrolyzer", self.electrolyzer.capex, "USD");
        r.insert("opex.electrolyzer", self.electrolyzer.opex, "USD/yr");
        r.insert("capex.total", self.total_capex(), "USD");
        r.insert("opex.total", self.total_opex(), "USD/yr");
        r.insert("annualization_factor", self.annualization_factor, "1/yr");
        r
    }
}

impl fmt::Display for ScreeningReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LCOE {:.2} USD/MWh, LCOH {:.3} USD/kg",
            self.lcoe * 1000.0,
            self.lcoh
        )?;
        if let Some(lcoa) = self.lcoa {
            write!(f, ", LCOA {lcoa:.3} USD/kg")?;
        }
        Ok(())
    }
}

/// Built-in closed-form engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScreeningEngine;

impl ScreeningEngine {
    /// Runs the screening arithmetic on a validated aggregate.
    ///
    /// # Errors
    ///
    /// `SimulationFailure` when the design produces no electricity or no
    /// hydrogen, or when the levelized costs overflow.
    pub fn screen(&self, aggregate: &ConfigurationAggregate) -> Result<ScreeningReport> {
        let opts = aggregate.options();
        let model = aggregate.model();
        let process = &model.process;
        let policy = &model.policy;

        if opts.show_plots || opts.save_plots {
            tracing::info!("screening engine produces no plots; plot options ignored");
        }

        let factor = annualization_factor(
            opts.use_financial_engine,
            process.finance.discount_rate,
            process.plant.plant_life,
        );

        let mut installation_capex = 0.0;
        let wind = match &model.technologies.wind {
            None => None,
            Some(spec) => {
                let capacity_kw = match spec.system_capacity_kw {
                    Some(kw) => kw,
                    None => {
                        let rating_mw = model.turbine.as_ref().map_or(0.0, |t| t.turbine_rating);
                        f64::from(spec.num_turbines) * rating_mw * 1000.0
                    }
                };
                if model.design.wind_location == WindLocation::Offshore {
                    let per_kw = model
                        .installation
                        .as_ref()
                        .map_or(0.0, |s| s.installation_cost_per_kw);
                    installation_capex = per_kw * capacity_kw;
                }
                Some(TechnologyEconomics {
                    capacity_kw,
                    annual_energy_kwh: capacity_kw
                        * HOURS_PER_YEAR
                        * spec.capacity_factor
                        * (1.0 - spec.wake_loss_fraction),
                    capex: capacity_kw * spec.capex_per_kw,
                    opex: capacity_kw * spec.opex_per_kw_year,
                })
            }
        };
        let pv = model.technologies.pv.as_ref().map(|spec| TechnologyEconomics {
            capacity_kw: spec.system_capacity_kw,
            annual_energy_kwh: spec.system_capacity_kw * HOURS_PER_YEAR * spec.capacity_factor,
            capex: spec.system_capacity_kw * spec.capex_per_kw,
            opex: spec.system_capacity_kw * spec.opex_per_kw_year,
        });
        let (battery_capex, battery_opex) = model
            .technologies
            .battery
            .as_ref()
            .map_or((0.0, 0.0), |b| {
                (
                    b.system_capacity_kwh * b.capex_per_kwh,
                    b.system_capacity_kw * b.opex_per_kw_year,
                )
            });

        let energy_kwh =
            wind.map_or(0.0, |w| w.annual_energy_kwh) + pv.map_or(0.0, |p| p.annual_energy_kwh);
        if !(energy_kwh > 0.0 && energy_kwh.is_finite()) {
            return Err(PlantError::SimulationFailure(
                "generation produces no electricity".to_string(),
            ));
        }
        let gen_capex = wind.map_or(0.0, |w| w.capex)
            + pv.map_or(0.0, |p| p.capex)
            + battery_capex
            + installation_capex;
        let gen_opex = wind.map_or(0.0, |w| w.opex) + pv.map_or(0.0, |p| p.opex) + battery_opex;
        let lcoe = (gen_capex * (1.0 - policy.electricity_itc) * factor + gen_opex
            - policy.electricity_ptc * energy_kwh)
            / energy_kwh;

        let el = &process.electrolyzer;
        let el_capacity_kw = el.rating * 1000.0;
        let el_energy_kwh = energy_kwh.min(el_capacity_kw * HOURS_PER_YEAR);
        let electrolyzer = TechnologyEconomics {
            capacity_kw: el_capacity_kw,
            annual_energy_kwh: el_energy_kwh,
            capex: el_capacity_kw * el.capex_per_kw,
            opex: el_capacity_kw * el.opex_per_kw_year,
        };
        let h2_kg_per_year = el_energy_kwh / el.efficiency_kwh_per_kg;
        if !(h2_kg_per_year > 0.0 && h2_kg_per_year.is_finite()) {
            return Err(PlantError::SimulationFailure(
                "electrolyzer produces no hydrogen".to_string(),
            ));
        }
        let lcoh = (lcoe * el_energy_kwh + electrolyzer.capex * factor + electrolyzer.opex
            - policy.h2_ptc * h2_kg_per_year)
            / h2_kg_per_year;
        if !(lcoe.is_finite() && lcoh.is_finite()) {
            return Err(PlantError::SimulationFailure(format!(
                "levelized costs are not finite (lcoe {lcoe}, lcoh {lcoh})"
            )));
        }

        let (nh3_kg_per_year, lcoa) = match &process.ammonia {
            None => (None, None),
            Some(a) => (
                Some(h2_kg_per_year / a.h2_kg_per_kg_nh3),
                Some(lcoh * a.h2_kg_per_kg_nh3 + a.conversion_cost_per_kg),
            ),
        };

        Ok(ScreeningReport {
            wind,
            pv,
            battery_capex,
            battery_opex,
            installation_capex,
            annualization_factor: factor,
            lcoe,
            electrolyzer,
            h2_kg_per_year,
            lcoh,
            nh3_kg_per_year,
            lcoa,
        })
    }
}

impl SimulationEngine for ScreeningEngine {
    fn name(&self) -> &str {
        "screening"
    }

    fn evaluate(
        &self,
        aggregate: &ConfigurationAggregate,
    ) -> Result<(ResultHandle, ConfigurationAggregate)> {
        let report = self.screen(aggregate)?;
        tracing::debug!(%report, "screening complete");
        Ok((report.to_results(), aggregate.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AggregateBuilder, RunOptions, SourceConfig, SourceKind};

    const PLANT: &str = r#"
plant:
  plant_life: 30
finance_parameters:
  discount_rate: 0.0
electrolyzer:
  rating: 100
  capex_per_kw: 1000
  opex_per_kw_year: 30
  efficiency_kwh_per_kg: 50
ammonia:
  h2_kg_per_kg_nh3: 0.2
  conversion_cost_per_kg: 0.3
plant_design:
  scenario1:
    electrolyzer_location: onshore
    transportation: colocated
policy_parameters:
  option1: {}
  option2:
    electricity_ptc: 0.01
"#;

    const SOLAR: &str = r#"
technologies:
  pv:
    system_capacity_kw: 100000
    capacity_factor: 0.25
    capex_per_kw: 1200
    opex_per_kw_year: 15
"#;

    fn aggregate(options: RunOptions) -> ConfigurationAggregate {
        AggregateBuilder::new(options)
            .source(SourceConfig::from_yaml_str(SourceKind::Generation, SOLAR).expect("gen"))
            .source(SourceConfig::from_yaml_str(SourceKind::Plant, PLANT).expect("plant"))
            .build()
            .expect("solar-only aggregate should build")
    }

    #[test]
    fn hand_computed_levelized_costs() {
        let report = ScreeningEngine
            .screen(&aggregate(RunOptions::default()))
            .expect("screening should succeed");

        // 100 MW * 8760 h * 0.25 = 219,000 MWh
        let energy = 100_000.0 * 8760.0 * 0.25;
        assert!((report.generation_energy_kwh() - energy).abs() < 1e-6);

        // zero discount rate over 30 years: straight-line
        let lcoe = (100_000.0 * 1200.0 / 30.0 + 100_000.0 * 15.0) / energy;
        assert!((report.lcoe - lcoe).abs() < 1e-12, "{} vs {lcoe}", report.lcoe);

        // electrolyzer matches generation capacity, so it takes every kWh
        let h2 = energy / 50.0;
        assert!((report.h2_kg_per_year - h2).abs() < 1e-6);
        let lcoh = (lcoe * energy + 100_000.0 * 1000.0 / 30.0 + 100_000.0 * 30.0) / h2;
        assert!((report.lcoh - lcoh).abs() < 1e-9);

        let lcoa = report.lcoa.expect("ammonia configured");
        assert!((lcoa - (lcoh * 0.2 + 0.3)).abs() < 1e-12);
    }

    #[test]
    fn production_credit_lowers_lcoe() {
        let base = ScreeningEngine
            .screen(&aggregate(RunOptions::default()))
            .expect("base");
        let credited = ScreeningEngine
            .screen(&aggregate(RunOptions {
                incentive_option: 2,
                ..RunOptions::default()
            }))
            .expect("credited");
        assert!((base.lcoe - credited.lcoe - 0.01).abs() < 1e-12);
    }

    #[test]
    fn evaluation_is_deterministic() {
        let agg = aggregate(RunOptions::default());
        let (a, _) = ScreeningEngine.evaluate(&agg).expect("first");
        let (b, _) = ScreeningEngine.evaluate(&agg).expect("second");
        assert_eq!(a, b);
        assert!(a.contains("lcoe") && a.contains("lcoh") && a.contains("lcoa"));
        assert!(!a.contains("capex.wind"));
    }

    #[test]
    fn zero_generation_fails() {
        let gen_yaml = SOLAR.replace("capacity_factor: 0.25", "capacity_factor: 0.0");
        let agg = AggregateBuilder::new(RunOptions::default())
            .source(SourceConfig::from_yaml_str(SourceKind::Generation, &gen_yaml).expect("gen"))
            .source(SourceConfig::from_yaml_str(SourceKind::Plant, PLANT).expect("plant"))
            .build()
            .expect("aggregate");
        let err = ScreeningEngine.evaluate(&agg).unwrap_err();
        assert!(matches!(err, PlantError::SimulationFailure(_)));
    }

    #[test]
    fn overflowing_costs_fail() {
        let gen_yaml = SOLAR
            .replace("system_capacity_kw: 100000", "system_capacity_kw: 1.0e300")
            .replace("capex_per_kw: 1200", "capex_per_kw: 1.0e300");
        let agg = AggregateBuilder::new(RunOptions::default())
            .source(SourceConfig::from_yaml_str(SourceKind::Generation, &gen_yaml).expect("gen"))
            .source(SourceConfig::from_yaml_str(SourceKind::Plant, PLANT).expect("plant"))
            .build()
            .expect("finite inputs pass validation");
        let err = ScreeningEngine.evaluate(&agg).unwrap_err();
        assert!(
            matches!(&err, PlantError::SimulationFailure(m) if m.contains("not finite")),
            "{err}"
        );
    }
}
