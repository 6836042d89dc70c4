//! Shared test fixtures for integration tests.
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use hybrid_plant_sim::config::InputPaths;

/// Generation config: 20 x 15 MW offshore wind plus a small PV array.
pub const GENERATION: &str = r#"
site:
  lat: 41.1
  lon: -70.9
technologies:
  wind:
    num_turbines: 20
    capacity_factor: 0.48
    wake_loss_fraction: 0.05
    capex_per_kw: 2600
    opex_per_kw_year: 90
  pv:
    system_capacity_kw: 20000
    capacity_factor: 0.2
    capex_per_kw: 1100
    opex_per_kw_year: 18
"#;

/// Plant config with an offshore (1) and an onshore (2) design, two
/// policy options and an electrolyzer rating search.
pub const PLANT: &str = r#"
plant:
  plant_life: 30
finance_parameters:
  discount_rate: 0.06
electrolyzer:
  rating: 300
  capex_per_kw: 1300
  opex_per_kw_year: 45
  efficiency_kwh_per_kg: 55
ammonia:
  h2_kg_per_kg_nh3: 0.1776
  conversion_cost_per_kg: 0.3
plant_design:
  scenario1:
    electrolyzer_location: onshore
    transportation: hvdc
    wind_location: offshore
  scenario2:
    electrolyzer_location: onshore
    transportation: colocated
    wind_location: onshore
policy_parameters:
  option1: {}
  option2:
    electricity_ptc: 0.025
    h2_ptc: 3.0
opt_options:
  objective: lcoh
  design_variables:
    electrolyzer_rating:
      path: electrolyzer.rating
      lower: 150
      upper: 350
      steps: 5
"#;

pub const TURBINE: &str = r#"
name: 15MW_reference
turbine_rating: 15
rotor_diameter: 240
hub_height: 150
"#;

pub const WAKE_MODEL: &str = r#"
wake:
  model_strings:
    velocity_model: gauss
    deflection_model: gauss
    combination_model: sosfs
    turbulence_model: crespo_hernandez
"#;

pub const INSTALLATION: &str = r#"
plant:
  installation_cost_per_kw: 400
design_phases: [ArraySystemDesign, MonopileDesign]
install_phases:
  MonopileInstallation: 0
  TurbineInstallation: !!python/tuple [MonopileInstallation, 0.5]
  ArrayCableInstallation: !!python/tuple [MonopileInstallation, 0.5]
"#;

/// Writes `contents` to `dir/name` and returns the path.
pub fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("fixture should be writable");
    path
}

/// Writes all five fixture configs into `dir`.
pub fn write_inputs(dir: &Path) -> InputPaths {
    InputPaths {
        generation: Some(write(dir, "generation.yaml", GENERATION)),
        plant: Some(write(dir, "plant.yaml", PLANT)),
        turbine: Some(write(dir, "turbine.yaml", TURBINE)),
        wake_model: Some(write(dir, "wake_model.yaml", WAKE_MODEL)),
        installation: Some(write(dir, "installation.yaml", INSTALLATION)),
    }
}

/// Path to a file in the bundled `scenarios/` directory.
pub fn scenario(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("scenarios").join(name)
}
