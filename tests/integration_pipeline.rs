//! End-to-end library tests: load, build, invoke, extract.

mod common;

use std::fs;

use hybrid_plant_sim::config::{
    AggregateBuilder, InputPaths, RunOptions, ScenarioManifest, SourceConfig, SourceKind,
};
use hybrid_plant_sim::io::export::{CSV_FILE, JSON_FILE};
use hybrid_plant_sim::sim::ScreeningEngine;
use hybrid_plant_sim::{PlantError, ResultHandle, invoke};

fn options(dir: &std::path::Path) -> RunOptions {
    RunOptions {
        output_dir: dir.join("output"),
        ..RunOptions::default()
    }
}

fn full_builder(inputs: &InputPaths, options: RunOptions) -> AggregateBuilder {
    inputs
        .load_into(AggregateBuilder::new(options))
        .expect("fixtures should load")
}

#[test]
fn loaded_keys_match_the_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let inputs = common::write_inputs(dir.path());
    let plant = SourceConfig::load(SourceKind::Plant, inputs.plant.as_deref().expect("plant path"))
        .expect("plant should load");
    let keys: Vec<&str> = plant.keys().collect();
    assert_eq!(
        keys,
        vec![
            "plant",
            "finance_parameters",
            "electrolyzer",
            "ammonia",
            "plant_design",
            "policy_parameters",
            "opt_options"
        ]
    );
}

#[test]
fn offshore_design_runs_end_to_end() {
    let dir = tempfile::tempdir().expect("tempdir");
    let inputs = common::write_inputs(dir.path());
    let aggregate = full_builder(&inputs, options(dir.path()))
        .build()
        .expect("aggregate should build");

    let (results, _) = invoke(&ScreeningEngine, &aggregate, true).expect("run should succeed");

    let lcoe = results.scalar("lcoe", "USD/(MW*h)").expect("lcoe");
    assert!(lcoe.is_finite() && lcoe > 0.0, "lcoe = {lcoe}");
    let lcoe_kwh = results.scalar("lcoe", "USD/kWh").expect("lcoe per kWh");
    assert!((lcoe_kwh * 1000.0 - lcoe).abs() < 1e-9);

    assert!(results.scalar("capex.installation", "USD").expect("offshore install") > 0.0);
    let lcoa = results.scalar("lcoa", "USD/kg").expect("lcoa");
    let lcoh = results.scalar("lcoh", "USD/kg").expect("lcoh");
    assert!((lcoa - (lcoh * 0.1776 + 0.3)).abs() < 1e-9);

    let out = dir.path().join("output");
    assert!(out.join(CSV_FILE).exists());
    let json = fs::read_to_string(out.join(JSON_FILE)).expect("json export");
    let reloaded: ResultHandle = serde_json::from_str(&json).expect("json should reload");
    assert_eq!(reloaded, results);
}

#[test]
fn onshore_design_needs_no_installation_config() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut inputs = common::write_inputs(dir.path());
    inputs.installation = None;
    let aggregate = full_builder(
        &inputs,
        RunOptions {
            plant_design_scenario: 2,
            ..options(dir.path())
        },
    )
    .build()
    .expect("onshore design should build");

    let (results, _) = invoke(&ScreeningEngine, &aggregate, true).expect("run");
    assert!(!results.contains("capex.installation"));
}

#[test]
fn missing_required_config_is_reported() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut inputs = common::write_inputs(dir.path());
    inputs.wake_model = None;
    let err = full_builder(&inputs, options(dir.path())).build().unwrap_err();
    assert!(
        matches!(&err, PlantError::MissingRequiredConfig { what } if what == "wake_model config"),
        "{err}"
    );
}

#[test]
fn non_finite_and_negative_inputs_are_invalid() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut inputs = common::write_inputs(dir.path());
    inputs.plant = Some(common::write(
        dir.path(),
        "nan_plant.yaml",
        &common::PLANT.replace("rating: 300", "rating: .nan"),
    ));
    inputs.generation = Some(common::write(
        dir.path(),
        "negative_generation.yaml",
        &common::GENERATION.replace(
            "num_turbines: 20",
            "num_turbines: 20\n    system_capacity_kw: -5000",
        ),
    ));

    let err = full_builder(&inputs, options(dir.path())).build().unwrap_err();
    let PlantError::InvalidConfig(errors) = &err else {
        panic!("expected InvalidConfig, got {err}");
    };
    let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
    assert!(fields.contains(&"electrolyzer.rating"), "{fields:?}");
    assert!(fields.contains(&"technologies.wind.system_capacity_kw"), "{fields:?}");
}

#[test]
fn incentives_lower_costs() {
    let dir = tempfile::tempdir().expect("tempdir");
    let inputs = common::write_inputs(dir.path());
    let run = |incentive_option: u32| {
        let aggregate = full_builder(
            &inputs,
            RunOptions {
                incentive_option,
                post_processing: false,
                ..options(dir.path())
            },
        )
        .build()
        .expect("aggregate");
        invoke(&ScreeningEngine, &aggregate, true).expect("run").0
    };
    let none = run(0);
    let first = run(1);
    let credited = run(2);
    assert_eq!(none, first, "option1 is empty");
    let lcoh = |r: &ResultHandle| r.scalar("lcoh", "USD/kg").expect("lcoh");
    assert!(lcoh(&credited) < lcoh(&first));
}

#[test]
fn unknown_key_and_bad_unit_fail() {
    let dir = tempfile::tempdir().expect("tempdir");
    let inputs = common::write_inputs(dir.path());
    let aggregate = full_builder(&inputs, options(dir.path())).build().expect("aggregate");
    let (results, _) = invoke(&ScreeningEngine, &aggregate, true).expect("run");

    assert!(matches!(
        results.extract("lcoe_typo", "USD/(MW*h)"),
        Err(PlantError::UnknownResultKey { .. })
    ));
    assert!(matches!(
        results.extract("lcoe", "kg"),
        Err(PlantError::UnitConversionError { .. })
    ));
}

#[test]
fn optimize_returns_the_winning_design() {
    let dir = tempfile::tempdir().expect("tempdir");
    let inputs = common::write_inputs(dir.path());
    let aggregate = full_builder(&inputs, options(dir.path())).build().expect("aggregate");

    let (configured, _) = invoke(&ScreeningEngine, &aggregate, true).expect("evaluate");
    let (best, winner) = invoke(&ScreeningEngine, &aggregate, false).expect("optimize");

    let lcoh = |r: &ResultHandle| r.scalar("lcoh", "USD/kg").expect("lcoh");
    assert!(lcoh(&best) <= lcoh(&configured));
    assert_eq!(best.scalar("optimization.evaluations", "1").expect("count"), 5.0);
    let rating = winner.model().process.electrolyzer.rating;
    assert!([150.0, 200.0, 250.0, 300.0, 350.0].contains(&rating), "rating = {rating}");

    // the winning plant config carries the chosen rating
    let in_source = winner
        .source(SourceKind::Plant)
        .and_then(|s| s.lookup("electrolyzer.rating"))
        .and_then(serde_yaml::Value::as_f64);
    assert_eq!(in_source, Some(rating));
}

#[test]
fn duplicate_install_phase_is_a_parse_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = common::write(
        dir.path(),
        "installation.yaml",
        "install_phases:
  ArrayCableInstallation: 0
  MonopileInstallation: 0
  ArrayCableInstallation: !!python/tuple [MonopileInstallation, 0.5]
",
    );
    let err = SourceConfig::load(SourceKind::Installation, &path).unwrap_err();
    assert!(matches!(err, PlantError::ConfigParseError { .. }), "{err}");
}

#[test]
fn manifest_drives_the_same_run() {
    let dir = tempfile::tempdir().expect("tempdir");
    common::write_inputs(dir.path());
    let manifest_path = common::write(
        dir.path(),
        "scenario.toml",
        r#"
[inputs]
generation = "generation.yaml"
plant = "plant.yaml"
turbine = "turbine.yaml"
wake_model = "wake_model.yaml"
installation = "installation.yaml"

[run]
output_dir = "out"
post_processing = false
"#,
    );
    let manifest = ScenarioManifest::from_toml_file(&manifest_path).expect("manifest");
    assert!(manifest.run_only);
    assert_eq!(manifest.run.output_dir, dir.path().join("out"));

    let aggregate = manifest.build_aggregate().expect("aggregate");
    let (results, _) = invoke(&ScreeningEngine, &aggregate, manifest.run_only).expect("run");
    assert!(results.scalar("lcoe", "USD/(MW*h)").expect("lcoe") > 0.0);
    assert!(dir.path().join("out").is_dir());
}
