//! Offshore installation schedule: design phases plus install phases that
//! either start on their own or wait for another phase to reach a
//! completion fraction.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde_yaml::Value;

use super::source::{SourceConfig, as_number};
use crate::error::{ConfigError, PlantError, Result};

/// When an install phase may begin.
#[derive(Debug, Clone, PartialEq)]
pub enum PhaseStart {
    /// Independent start (date string or day offset, kept verbatim).
    Scheduled(String),
    /// Starts once `phase` is `fraction` complete.
    After { phase: String, fraction: f64 },
}

impl fmt::Display for PhaseStart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhaseStart::Scheduled(at) => write!(f, "starts {at}"),
            PhaseStart::After { phase, fraction } => {
                write!(f, "after {phase} is {:.0}% complete", fraction * 100.0)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstallPhase {
    pub name: String,
    pub start: PhaseStart,
}

/// Validated installation schedule plus the balance-of-plant cost the
/// screening engine charges per kW of offshore wind.
#[derive(Debug, Clone, PartialEq)]
pub struct InstallationSchedule {
    pub design_phases: Vec<String>,
    pub install_phases: Vec<InstallPhase>,
    pub installation_cost_per_kw: f64,
}

impl InstallationSchedule {
    /// Reads `design_phases`, `install_phases` and
    /// `plant.installation_cost_per_kw` from an installation config.
    ///
    /// # Errors
    ///
    /// `MissingRequiredConfig` when `install_phases` is absent and
    /// `InvalidConfig` for malformed entries, unknown dependencies,
    /// fractions outside [0, 1] or dependency cycles.
    pub fn from_source(source: &SourceConfig) -> Result<Self> {
        let design_phases = match source.get("design_phases") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Sequence(seq)) => seq
                .iter()
                .enumerate()
                .map(|(i, v)| {
                    v.as_str().map(str::to_string).ok_or_else(|| {
                        PlantError::invalid(format!("design_phases.{i}"), "must be a phase name")
                    })
                })
                .collect::<Result<Vec<_>>>()?,
            Some(_) => return Err(PlantError::invalid("design_phases", "must be a sequence")),
        };

        let phases = source
            .get("install_phases")
            .ok_or_else(|| PlantError::missing("installation.install_phases"))?
            .as_mapping()
            .ok_or_else(|| PlantError::invalid("install_phases", "must be a mapping"))?;

        let mut install_phases = Vec::with_capacity(phases.len());
        for (key, value) in phases {
            let name = key.as_str().unwrap_or_default().to_string();
            let start = parse_start(&name, value)?;
            install_phases.push(InstallPhase { name, start });
        }

        let installation_cost_per_kw = match source.lookup("plant.installation_cost_per_kw") {
            None => 0.0,
            Some(v) => as_number(v)
                .filter(|c| *c >= 0.0)
                .ok_or_else(|| {
                    PlantError::invalid("plant.installation_cost_per_kw", "must be a number >= 0")
                })?,
        };

        let schedule = Self {
            design_phases,
            install_phases,
            installation_cost_per_kw,
        };
        let errors = schedule.validate();
        if errors.is_empty() {
            Ok(schedule)
        } else {
            Err(PlantError::InvalidConfig(errors))
        }
    }

    /// Checks dependency targets, fractions and acyclicity.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let known: HashMap<&str, &InstallPhase> = self
            .install_phases
            .iter()
            .map(|p| (p.name.as_str(), p))
            .collect();

        for phase in &self.install_phases {
            if let PhaseStart::After { phase: dep, fraction } = &phase.start {
                let field = format!("install_phases.{}", phase.name);
                if dep == &phase.name {
                    errors.push(ConfigError::new(field.clone(), "cannot depend on itself"));
                } else if !known.contains_key(dep.as_str()) {
                    errors.push(ConfigError::new(
                        field.clone(),
                        format!("depends on unknown phase \"{dep}\""),
                    ));
                }
                if !(0.0..=1.0).contains(fraction) {
                    errors.push(ConfigError::new(
                        field,
                        "completion fraction must be in [0.0, 1.0]",
                    ));
                }
            }
        }

        if errors.is_empty() && self.start_order().is_none() {
            errors.push(ConfigError::new("install_phases", "dependency cycle"));
        }
        errors
    }

    /// Phases ordered so every dependency precedes its dependents; ties keep
    /// document order. `None` when the dependencies form a cycle.
    pub fn start_order(&self) -> Option<Vec<&InstallPhase>> {
        let index: BTreeMap<&str, usize> = self
            .install_phases
            .iter()
            .enumerate()
            .map(|(i, p)| (p.name.as_str(), i))
            .collect();
        let mut placed = vec![false; self.install_phases.len()];
        let mut order = Vec::with_capacity(self.install_phases.len());

        while order.len() < self.install_phases.len() {
            let next = self.install_phases.iter().enumerate().find(|(i, p)| {
                !placed[*i]
                    && match &p.start {
                        PhaseStart::Scheduled(_) => true,
                        PhaseStart::After { phase, .. } => {
                            index.get(phase.as_str()).is_some_and(|&d| placed[d])
                        }
                    }
            });
            let (i, phase) = next?;
            placed[i] = true;
            order.push(phase);
        }
        Some(order)
    }
}

fn parse_start(name: &str, value: &Value) -> Result<PhaseStart> {
    let field = format!("install_phases.{name}");
    match value {
        Value::Number(n) => Ok(PhaseStart::Scheduled(n.to_string())),
        Value::String(s) => Ok(PhaseStart::Scheduled(s.clone())),
        Value::Sequence(seq) => match seq.as_slice() {
            [Value::String(phase), fraction] => {
                let fraction = as_number(fraction).ok_or_else(|| {
                    PlantError::invalid(field.clone(), "completion fraction must be a number")
                })?;
                Ok(PhaseStart::After {
                    phase: phase.clone(),
                    fraction,
                })
            }
            _ => Err(PlantError::invalid(
                field,
                "dependency must be [phase_name, completion_fraction]",
            )),
        },
        _ => Err(PlantError::invalid(
            field,
            "must be a start date, a day offset or [phase_name, completion_fraction]",
        )),
    }
}
