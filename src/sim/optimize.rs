//! Grid search over design variables declared in the plant config.
//!
//! ```yaml
//! opt_options:
//!   objective: lcoh
//!   design_variables:
//!     electrolyzer_rating:
//!       path: electrolyzer.rating
//!       lower: 600
//!       upper: 900
//!       steps: 4
//! ```
//!
//! `source` defaults to `plant`; `flag: false` holds a variable at its
//! configured value.

use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use serde::Deserialize;
use serde_yaml::Value;

use crate::config::{ConfigurationAggregate, SourceConfig, SourceKind};
use crate::error::{ConfigError, PlantError, Result};
use crate::results::ResultHandle;

use super::SimulationEngine;

/// Upper bound on grid points per search.
pub const MAX_CANDIDATES: usize = 10_000;

const DEFAULT_OBJECTIVE: &str = "lcoh";

#[derive(Debug, Deserialize)]
struct OptOptions {
    #[serde(default)]
    objective: Option<String>,
    #[serde(default)]
    design_variables: BTreeMap<String, RawVariable>,
}

#[derive(Debug, Deserialize)]
struct RawVariable {
    path: String,
    #[serde(default = "default_source")]
    source: SourceKind,
    lower: f64,
    upper: f64,
    #[serde(default = "default_steps")]
    steps: u32,
    #[serde(default = "default_flag")]
    flag: bool,
}

fn default_source() -> SourceKind {
    SourceKind::Plant
}

fn default_steps() -> u32 {
    5
}

fn default_flag() -> bool {
    true
}

/// One searched dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct DesignVariable {
    pub name: String,
    pub source: SourceKind,
    pub path: String,
    /// Grid points from `lower` to `upper`, inclusive.
    pub grid: Vec<f64>,
    /// Written back as an integer when the configured value is one.
    pub integer: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DesignSpace {
    pub objective: String,
    pub variables: Vec<DesignVariable>,
}

impl DesignSpace {
    /// Reads `opt_options` from the plant config. A plant config without
    /// `opt_options` yields an empty space with the default objective.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` for malformed variables or a grid larger than
    /// [`MAX_CANDIDATES`].
    pub fn from_aggregate(aggregate: &ConfigurationAggregate) -> Result<Self> {
        let Some(plant) = aggregate.source(SourceKind::Plant) else {
            return Err(PlantError::missing("plant config"));
        };
        let Some(opts) = plant.optional_section::<OptOptions>("opt_options")? else {
            return Ok(DesignSpace {
                objective: DEFAULT_OBJECTIVE.to_string(),
                variables: Vec::new(),
            });
        };

        let mut errors = Vec::new();
        let mut variables = Vec::new();
        for (name, raw) in opts.design_variables {
            if !raw.flag {
                continue;
            }
            let field = format!("plant.opt_options.design_variables.{name}");
            if !(raw.lower.is_finite() && raw.upper.is_finite()) || raw.lower > raw.upper {
                errors.push(ConfigError::new(&field, "needs finite lower <= upper"));
                continue;
            }
            if raw.steps == 0 {
                errors.push(ConfigError::new(format!("{field}.steps"), "must be > 0"));
                continue;
            }
            if raw.steps as usize > MAX_CANDIDATES {
                errors.push(ConfigError::new(
                    format!("{field}.steps"),
                    format!("grid has more than {MAX_CANDIDATES} points"),
                ));
                continue;
            }
            let current = aggregate.source(raw.source).and_then(|s| s.lookup(&raw.path));
            let integer = matches!(current, Some(Value::Number(n)) if n.is_i64() || n.is_u64());
            variables.push(DesignVariable {
                grid: grid(raw.lower, raw.upper, raw.steps, integer),
                name,
                source: raw.source,
                path: raw.path,
                integer,
            });
        }

        let space = DesignSpace {
            objective: opts.objective.unwrap_or_else(|| DEFAULT_OBJECTIVE.to_string()),
            variables,
        };
        if space.candidate_count() > MAX_CANDIDATES {
            errors.push(ConfigError::new(
                "plant.opt_options.design_variables",
                format!("grid has more than {MAX_CANDIDATES} points"),
            ));
        }
        if !errors.is_empty() {
            return Err(PlantError::InvalidConfig(errors));
        }
        Ok(space)
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn candidate_count(&self) -> usize {
        self.variables
            .iter()
            .map(|v| v.grid.len())
            .try_fold(1usize, usize::checked_mul)
            .unwrap_or(usize::MAX)
    }

    /// Every grid point, first variable varying slowest.
    pub fn candidates(&self) -> Vec<Vec<f64>> {
        let mut out = vec![Vec::with_capacity(self.variables.len())];
        for var in &self.variables {
            out = out
                .into_iter()
                .flat_map(|prefix| {
                    var.grid.iter().map(move |&x| {
                        let mut next = prefix.clone();
                        next.push(x);
                        next
                    })
                })
                .collect();
        }
        out
    }

    /// The aggregate with `point` written into the sources.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if a path cannot be written or the resulting design
    /// fails validation.
    pub fn apply(
        &self,
        aggregate: &ConfigurationAggregate,
        point: &[f64],
    ) -> Result<ConfigurationAggregate> {
        let mut changed: HashMap<SourceKind, SourceConfig> = HashMap::new();
        for (var, &x) in self.variables.iter().zip(point) {
            let base = match changed.remove(&var.source) {
                Some(s) => s,
                None => aggregate
                    .source(var.source)
                    .cloned()
                    .ok_or_else(|| PlantError::missing(format!("{} config", var.source)))?,
            };
            let value = if var.integer {
                Value::from(x.round() as i64)
            } else {
                Value::from(x)
            };
            changed.insert(var.source, base.with_value(&var.path, value)?);
        }
        aggregate.with_sources(changed.into_values())
    }
}

fn grid(lower: f64, upper: f64, steps: u32, integer: bool) -> Vec<f64> {
    let mut points: Vec<f64> = if steps == 1 {
        vec![lower]
    } else {
        let span = upper - lower;
        let last = f64::from(steps - 1);
        (0..steps).map(|i| lower + span * f64::from(i) / last).collect()
    };
    if integer {
        for p in &mut points {
            *p = p.round();
        }
        points.dedup();
    }
    points
}

/// Evaluates every grid point and keeps the one with the lowest objective.
/// Ties keep the earlier point. Candidates that fail validation or score a
/// non-finite objective are skipped; engine failures abort the search.
///
/// # Errors
///
/// `InvalidConfig` if the design space is malformed or no candidate
/// validates with a finite objective, `UnknownResultKey` if the engine does not report the
/// objective, and any engine error.
pub fn optimize<E: SimulationEngine + ?Sized>(
    engine: &E,
    aggregate: &ConfigurationAggregate,
) -> Result<(ResultHandle, ConfigurationAggregate)> {
    let space = DesignSpace::from_aggregate(aggregate)?;
    if space.is_empty() {
        tracing::info!("no design variables declared; evaluating the configured design");
        return engine.evaluate(aggregate);
    }

    let started = Instant::now();
    let total = space.candidate_count();
    tracing::info!(
        objective = %space.objective,
        variables = space.variables.len(),
        candidates = total,
        "starting grid search"
    );

    let mut best: Option<(f64, ResultHandle, ConfigurationAggregate)> = None;
    let mut evaluated = 0usize;
    for point in space.candidates() {
        let candidate = match space.apply(aggregate, &point) {
            Ok(c) => c,
            Err(PlantError::InvalidConfig(errors)) => {
                let error = PlantError::InvalidConfig(errors);
                tracing::warn!(?point, %error, "skipping candidate");
                continue;
            }
            Err(e) => return Err(e),
        };
        let (results, returned) = engine.evaluate(&candidate)?;
        evaluated += 1;
        let score = results.raw_scalar(&space.objective)?;
        tracing::debug!(?point, score, "candidate evaluated");
        if !score.is_finite() {
            tracing::warn!(?point, score, "skipping candidate with non-finite objective");
            continue;
        }
        if best.as_ref().is_none_or(|(s, _, _)| score < *s) {
            best = Some((score, results, returned));
        }
    }

    let Some((score, mut results, winner)) = best else {
        return Err(PlantError::invalid(
            "plant.opt_options.design_variables",
            "no candidate passes validation with a finite objective",
        ));
    };
    results.insert("optimization.evaluations", evaluated as f64, "1");
    tracing::info!(
        objective = %space.objective,
        score,
        evaluated,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "grid search complete"
    );
    Ok((results, winner))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AggregateBuilder, RunOptions};
    use crate::sim::ScreeningEngine;

    const GENERATION: &str = r#"
technologies:
  pv:
    system_capacity_kw: 200000
    capacity_factor: 0.25
    capex_per_kw: 1000
    opex_per_kw_year: 15
"#;

    fn plant(opt: &str) -> String {
        format!(
            r#"
plant:
  plant_life: 30
finance_parameters:
  discount_rate: 0.06
electrolyzer:
  rating: 100
  capex_per_kw: 1300
  opex_per_kw_year: 45
  efficiency_kwh_per_kg: 55
plant_design:
  scenario1:
    electrolyzer_location: onshore
    transportation: colocated
policy_parameters:
  option1: {{}}
{opt}"#
        )
    }

    fn aggregate(opt: &str) -> ConfigurationAggregate {
        AggregateBuilder::new(RunOptions::default())
            .source(SourceConfig::from_yaml_str(SourceKind::Generation, GENERATION).expect("gen"))
            .source(SourceConfig::from_yaml_str(SourceKind::Plant, &plant(opt)).expect("plant"))
            .build()
            .expect("aggregate")
    }

    const RATING_SEARCH: &str = r#"opt_options:
  objective: lcoh
  design_variables:
    electrolyzer_rating:
      path: electrolyzer.rating
      lower: 20
      upper: 200
      steps: 10
"#;

    #[test]
    fn grid_is_inclusive_and_rounded_for_integers() {
        assert_eq!(grid(0.0, 1.0, 3, false), vec![0.0, 0.5, 1.0]);
        assert_eq!(grid(1.0, 2.0, 5, true), vec![1.0, 2.0]);
        assert_eq!(grid(4.0, 9.0, 1, false), vec![4.0]);
    }

    #[test]
    fn cartesian_product_orders_first_variable_slowest() {
        let space = DesignSpace {
            objective: "lcoh".into(),
            variables: vec![
                DesignVariable {
                    name: "a".into(),
                    source: SourceKind::Plant,
                    path: "a".into(),
                    grid: vec![1.0, 2.0],
                    integer: false,
                },
                DesignVariable {
                    name: "b".into(),
                    source: SourceKind::Plant,
                    path: "b".into(),
                    grid: vec![10.0, 20.0, 30.0],
                    integer: false,
                },
            ],
        };
        assert_eq!(space.candidate_count(), 6);
        let c = space.candidates();
        assert_eq!(c[0], vec![1.0, 10.0]);
        assert_eq!(c[2], vec![1.0, 30.0]);
        assert_eq!(c[3], vec![2.0, 10.0]);
    }

    #[test]
    fn search_finds_no_worse_design_than_configured() {
        let agg = aggregate(RATING_SEARCH);
        let (base, _) = ScreeningEngine.evaluate(&agg).expect("baseline");
        let (best, winner) = optimize(&ScreeningEngine, &agg).expect("search");
        let base_lcoh = base.scalar("lcoh", "USD/kg").expect("lcoh");
        let best_lcoh = best.scalar("lcoh", "USD/kg").expect("lcoh");
        assert!(best_lcoh <= base_lcoh + 1e-12);
        assert_eq!(best.scalar("optimization.evaluations", "1").expect("count"), 10.0);
        // integer in the source stays integer
        let rating = winner
            .source(SourceKind::Plant)
            .and_then(|s| s.lookup("electrolyzer.rating"))
            .expect("rating");
        assert!(rating.is_i64() || rating.is_u64());
        assert_eq!(winner.model().process.electrolyzer.rating, rating.as_f64().expect("number"));
    }

    #[test]
    fn no_variables_is_a_single_evaluation() {
        let agg = aggregate("");
        let (a, returned) = optimize(&ScreeningEngine, &agg).expect("evaluate");
        let (b, _) = ScreeningEngine.evaluate(&agg).expect("evaluate");
        assert_eq!(a, b);
        assert_eq!(returned, agg);
    }

    #[test]
    fn disabled_variable_is_not_searched() {
        let agg = aggregate(&RATING_SEARCH.replace("steps: 10", "steps: 10\n      flag: false"));
        assert!(DesignSpace::from_aggregate(&agg).expect("space").is_empty());
    }

    #[test]
    fn oversized_grid_is_rejected() {
        let opt = r#"opt_options:
  design_variables:
    a: {path: electrolyzer.capex_per_kw, lower: 1000, upper: 2000, steps: 200}
    b: {path: electrolyzer.opex_per_kw_year, lower: 10, upper: 1000, steps: 200}
"#;
        let err = DesignSpace::from_aggregate(&aggregate(opt)).unwrap_err();
        assert!(err.to_string().contains("more than 10000"), "{err}");
    }

    #[test]
    fn huge_step_count_is_rejected_before_building_the_grid() {
        let agg = aggregate(&RATING_SEARCH.replace("steps: 10", "steps: 4294967295"));
        let err = DesignSpace::from_aggregate(&agg).unwrap_err();
        let PlantError::InvalidConfig(errors) = &err else {
            panic!("expected InvalidConfig, got {err}");
        };
        assert_eq!(
            errors[0].field,
            "plant.opt_options.design_variables.electrolyzer_rating.steps"
        );
        assert!(errors[0].message.contains("more than 10000"), "{err}");
    }

    /// Screening results, except the lowest electrolyzer rating scores NaN.
    struct NanAtLowerBound;

    impl SimulationEngine for NanAtLowerBound {
        fn name(&self) -> &str {
            "nan-at-lower-bound"
        }

        fn evaluate(
            &self,
            aggregate: &ConfigurationAggregate,
        ) -> Result<(ResultHandle, ConfigurationAggregate)> {
            let (mut results, returned) = ScreeningEngine.evaluate(aggregate)?;
            if aggregate.model().process.electrolyzer.rating == 20.0 {
                results.insert("lcoh", f64::NAN, "USD/kg");
            }
            Ok((results, returned))
        }
    }

    #[test]
    fn nan_objective_never_wins() {
        let agg = aggregate(RATING_SEARCH);
        let (best, winner) = optimize(&NanAtLowerBound, &agg).expect("search");
        assert!(best.scalar("lcoh", "USD/kg").expect("lcoh").is_finite());
        assert_ne!(winner.model().process.electrolyzer.rating, 20.0);
        assert_eq!(best.scalar("optimization.evaluations", "1").expect("count"), 10.0);
    }

    #[test]
    fn unknown_objective_fails() {
        let agg = aggregate(&RATING_SEARCH.replace("objective: lcoh", "objective: lcox"));
        let err = optimize(&ScreeningEngine, &agg).unwrap_err();
        assert!(matches!(err, PlantError::UnknownResultKey { .. }));
    }
}
