//! Typed views over the sections engines read.
//!
//! Inputs stay untyped in [`SourceConfig`](super::SourceConfig); these structs
//! are deserialized out of them when the aggregate is built so that missing
//! or out-of-range fields surface before any engine runs. Unknown keys are
//! tolerated: the same files also feed consumers outside this crate.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// `plant` section of the plant config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantSection {
    /// Economic life (years, must be > 0).
    pub plant_life: u32,
    /// Year costs are expressed in.
    #[serde(default)]
    pub cost_year: Option<u16>,
    /// Technology cost baseline year.
    #[serde(default)]
    pub atb_year: Option<u16>,
}

impl PlantSection {
    pub(crate) fn validate(&self, errors: &mut Vec<ConfigError>) {
        if self.plant_life == 0 {
            errors.push(ConfigError::new("plant.plant_life", "must be > 0"));
        }
    }
}

/// `finance_parameters` section of the plant config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinanceParameters {
    /// Real discount rate (fraction per year).
    pub discount_rate: f64,
}

impl FinanceParameters {
    pub(crate) fn validate(&self, errors: &mut Vec<ConfigError>) {
        if !(0.0..1.0).contains(&self.discount_rate) {
            errors.push(ConfigError::new(
                "finance_parameters.discount_rate",
                "must be in [0.0, 1.0)",
            ));
        }
    }
}

/// `electrolyzer` section of the plant config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElectrolyzerSection {
    /// Stack rating (MW).
    pub rating: f64,
    /// Installed cost (USD/kW).
    pub capex_per_kw: f64,
    /// Fixed operating cost (USD/kW/yr).
    pub opex_per_kw_year: f64,
    /// Specific energy consumption (kWh/kg H2).
    pub efficiency_kwh_per_kg: f64,
}

impl ElectrolyzerSection {
    pub(crate) fn validate(&self, errors: &mut Vec<ConfigError>) {
        positive(errors, "electrolyzer.rating", self.rating);
        positive(errors, "electrolyzer.efficiency_kwh_per_kg", self.efficiency_kwh_per_kg);
        non_negative(errors, "electrolyzer.capex_per_kw", self.capex_per_kw);
        non_negative(errors, "electrolyzer.opex_per_kw_year", self.opex_per_kw_year);
    }
}

/// Optional `ammonia` section of the plant config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmmoniaSection {
    /// Hydrogen consumed per unit of ammonia (kg/kg).
    pub h2_kg_per_kg_nh3: f64,
    /// Synthesis cost on top of feedstock hydrogen (USD/kg NH3).
    pub conversion_cost_per_kg: f64,
}

impl AmmoniaSection {
    pub(crate) fn validate(&self, errors: &mut Vec<ConfigError>) {
        if !(self.h2_kg_per_kg_nh3 > 0.0 && self.h2_kg_per_kg_nh3 <= 1.0) {
            errors.push(ConfigError::new(
                "ammonia.h2_kg_per_kg_nh3",
                "must be in (0.0, 1.0]",
            ));
        }
        non_negative(errors, "ammonia.conversion_cost_per_kg", self.conversion_cost_per_kg);
    }
}

/// Where the wind plant sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindLocation {
    Offshore,
    Onshore,
    #[default]
    None,
}

/// One entry of `plant_design` (`scenario1`, `scenario2`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantDesign {
    /// `"onshore"`, `"platform"` or `"turbine"`.
    pub electrolyzer_location: String,
    /// Hydrogen or power export path (`"pipeline"`, `"hvdc"`, `"colocated"`, ...).
    pub transportation: String,
    #[serde(default)]
    pub h2_storage_location: Option<String>,
    #[serde(default)]
    pub wind_location: WindLocation,
    #[serde(default)]
    pub pv_location: Option<String>,
    #[serde(default)]
    pub battery_location: Option<String>,
}

/// One entry of `policy_parameters` (`option1`, `option2`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyOption {
    /// Investment tax credit on generation capex (fraction).
    pub electricity_itc: f64,
    /// Production tax credit on generated electricity (USD/kWh).
    pub electricity_ptc: f64,
    /// Production tax credit on hydrogen (USD/kg).
    pub h2_ptc: f64,
}

impl PolicyOption {
    pub(crate) fn validate(&self, prefix: &str, errors: &mut Vec<ConfigError>) {
        if !(0.0..=1.0).contains(&self.electricity_itc) {
            errors.push(ConfigError::new(
                format!("{prefix}.electricity_itc"),
                "must be in [0.0, 1.0]",
            ));
        }
        non_negative(errors, &format!("{prefix}.electricity_ptc"), self.electricity_ptc);
        non_negative(errors, &format!("{prefix}.h2_ptc"), self.h2_ptc);
    }
}

/// `technologies` section of the generation config.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Technologies {
    #[serde(default)]
    pub wind: Option<WindSpec>,
    #[serde(default)]
    pub pv: Option<PvSpec>,
    #[serde(default)]
    pub battery: Option<BatterySpec>,
}

impl Technologies {
    pub fn has_wind(&self) -> bool {
        self.wind.is_some()
    }

    pub(crate) fn validate(&self, errors: &mut Vec<ConfigError>) {
        if self.wind.is_none() && self.pv.is_none() {
            errors.push(ConfigError::new(
                "technologies",
                "at least one of wind or pv must be configured",
            ));
        }
        if let Some(w) = &self.wind {
            if w.num_turbines == 0 && w.system_capacity_kw.is_none() {
                errors.push(ConfigError::new("technologies.wind.num_turbines", "must be > 0"));
            }
            if let Some(kw) = w.system_capacity_kw {
                positive(errors, "technologies.wind.system_capacity_kw", kw);
            }
            capacity_factor(errors, "technologies.wind.capacity_factor", w.capacity_factor);
            if !(0.0..1.0).contains(&w.wake_loss_fraction) {
                errors.push(ConfigError::new(
                    "technologies.wind.wake_loss_fraction",
                    "must be in [0.0, 1.0)",
                ));
            }
            non_negative(errors, "technologies.wind.capex_per_kw", w.capex_per_kw);
            non_negative(errors, "technologies.wind.opex_per_kw_year", w.opex_per_kw_year);
        }
        if let Some(pv) = &self.pv {
            positive(errors, "technologies.pv.system_capacity_kw", pv.system_capacity_kw);
            capacity_factor(errors, "technologies.pv.capacity_factor", pv.capacity_factor);
            non_negative(errors, "technologies.pv.capex_per_kw", pv.capex_per_kw);
            non_negative(errors, "technologies.pv.opex_per_kw_year", pv.opex_per_kw_year);
        }
        if let Some(b) = &self.battery {
            for (field, value) in [
                ("technologies.battery.system_capacity_kw", b.system_capacity_kw),
                ("technologies.battery.system_capacity_kwh", b.system_capacity_kwh),
                ("technologies.battery.capex_per_kwh", b.capex_per_kwh),
                ("technologies.battery.opex_per_kw_year", b.opex_per_kw_year),
            ] {
                non_negative(errors, field, value);
            }
        }
    }
}

/// Wind farm economics. Capacity comes from `system_capacity_kw` when set,
/// otherwise from `num_turbines` times the turbine rating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindSpec {
    #[serde(default)]
    pub num_turbines: u32,
    #[serde(default)]
    pub system_capacity_kw: Option<f64>,
    /// Gross capacity factor before wake losses.
    pub capacity_factor: f64,
    #[serde(default)]
    pub wake_loss_fraction: f64,
    pub capex_per_kw: f64,
    pub opex_per_kw_year: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PvSpec {
    pub system_capacity_kw: f64,
    pub capacity_factor: f64,
    pub capex_per_kw: f64,
    pub opex_per_kw_year: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatterySpec {
    pub system_capacity_kw: f64,
    pub system_capacity_kwh: f64,
    pub capex_per_kwh: f64,
    pub opex_per_kw_year: f64,
}

/// Turbine config document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurbineSpec {
    #[serde(default)]
    pub name: Option<String>,
    /// Nameplate rating (MW).
    pub turbine_rating: f64,
    /// Rotor diameter (m).
    pub rotor_diameter: f64,
    /// Hub height (m).
    pub hub_height: f64,
}

impl TurbineSpec {
    pub(crate) fn validate(&self, errors: &mut Vec<ConfigError>) {
        for (field, value) in [
            ("turbine.turbine_rating", self.turbine_rating),
            ("turbine.rotor_diameter", self.rotor_diameter),
            ("turbine.hub_height", self.hub_height),
        ] {
            positive(errors, field, value);
        }
    }
}

/// Wake-model config document; only the model selection is read here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WakeModelSpec {
    #[serde(default)]
    pub name: Option<String>,
    pub wake: WakeSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WakeSection {
    pub model_strings: WakeModelStrings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WakeModelStrings {
    pub velocity_model: String,
    pub deflection_model: String,
    #[serde(default)]
    pub combination_model: Option<String>,
    #[serde(default)]
    pub turbulence_model: Option<String>,
}

/// Validated sections of the plant config.
#[derive(Debug, Clone, PartialEq)]
pub struct PlantProcess {
    pub plant: PlantSection,
    pub finance: FinanceParameters,
    pub electrolyzer: ElectrolyzerSection,
    pub ammonia: Option<AmmoniaSection>,
}

impl PlantProcess {
    pub(crate) fn validate(&self, errors: &mut Vec<ConfigError>) {
        self.plant.validate(errors);
        self.finance.validate(errors);
        self.electrolyzer.validate(errors);
        if let Some(a) = &self.ammonia {
            a.validate(errors);
        }
    }
}

// NaN fails every comparison, so both checks are written as negated
// positive conditions.
fn positive(errors: &mut Vec<ConfigError>, field: &str, value: f64) {
    if !(value > 0.0 && value.is_finite()) {
        errors.push(ConfigError::new(field, "must be finite and > 0"));
    }
}

fn non_negative(errors: &mut Vec<ConfigError>, field: &str, value: f64) {
    if !(value >= 0.0 && value.is_finite()) {
        errors.push(ConfigError::new(field, "must be finite and >= 0"));
    }
}

fn capacity_factor(errors: &mut Vec<ConfigError>, field: &str, value: f64) {
    if !(0.0..=1.0).contains(&value) {
        errors.push(ConfigError::new(field, "must be in [0.0, 1.0]"));
    }
}
