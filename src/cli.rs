//! Command-line surface of the `hybrid-plant-sim` binary.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;

use crate::config::{EngineSpec, InputPaths, ScenarioManifest};
use crate::error::Result;

#[derive(Debug, Parser)]
#[command(name = "hybrid-plant-sim")]
#[command(about = "Techno-economic runs for hybrid renewable hydrogen and ammonia plants")]
pub struct Cli {
    /// TOML scenario manifest naming the YAML inputs and run options
    #[arg(short, long)]
    pub scenario: Option<PathBuf>,

    /// Generation-technology config (overrides the manifest)
    #[arg(long)]
    pub generation: Option<PathBuf>,

    /// Plant process and finance config
    #[arg(long)]
    pub plant: Option<PathBuf>,

    /// Turbine config
    #[arg(long)]
    pub turbine: Option<PathBuf>,

    /// Wake-model config
    #[arg(long)]
    pub wake_model: Option<PathBuf>,

    /// Offshore installation config
    #[arg(long)]
    pub installation: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Ask the engine to show plots
    #[arg(long)]
    pub show_plots: bool,

    /// Ask the engine to save plots
    #[arg(long)]
    pub save_plots: bool,

    /// Discounted (true) or straight-line (false) capital annualization
    #[arg(long)]
    pub use_financial_engine: Option<bool>,

    /// Export results.csv and results.json after the run
    #[arg(long)]
    pub post_processing: Option<bool>,

    /// Policy option index (0 disables incentives)
    #[arg(long)]
    pub incentive_option: Option<u32>,

    /// Plant design scenario index
    #[arg(long)]
    pub plant_design_scenario: Option<u32>,

    /// Summary detail (0 silences the summary)
    #[arg(long)]
    pub output_level: Option<u8>,

    /// Directory for exports and engine hand-off files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Search the declared design variables instead of evaluating once
    #[arg(long)]
    pub optimize: bool,

    /// External engine program (the built-in screening engine otherwise)
    #[arg(long)]
    pub engine: Option<PathBuf>,

    /// Extra argument for the external engine (repeatable)
    #[arg(long = "engine-arg", allow_hyphen_values = true)]
    pub engine_args: Vec<String>,

    /// Print a result converted to a unit, as KEY=UNIT (repeatable)
    #[arg(short = 'x', long = "extract")]
    pub extract: Vec<Extraction>,
}

impl Cli {
    /// Folds the manifest (if any) and the command-line overrides into one
    /// manifest.
    ///
    /// # Errors
    ///
    /// Manifest loading errors.
    pub fn to_manifest(&self) -> Result<ScenarioManifest> {
        let mut manifest = match &self.scenario {
            Some(path) => ScenarioManifest::from_toml_file(path)?,
            None => ScenarioManifest {
                run_only: true,
                inputs: InputPaths::default(),
                run: Default::default(),
                engine: None,
            },
        };

        let inputs = &mut manifest.inputs;
        for (slot, arg) in [
            (&mut inputs.generation, &self.generation),
            (&mut inputs.plant, &self.plant),
            (&mut inputs.turbine, &self.turbine),
            (&mut inputs.wake_model, &self.wake_model),
            (&mut inputs.installation, &self.installation),
        ] {
            if let Some(path) = arg {
                *slot = Some(path.clone());
            }
        }

        let run = &mut manifest.run;
        run.verbose |= self.verbose;
        run.show_plots |= self.show_plots;
        run.save_plots |= self.save_plots;
        if let Some(v) = self.use_financial_engine {
            run.use_financial_engine = v;
        }
        if let Some(v) = self.post_processing {
            run.post_processing = v;
        }
        if let Some(v) = self.incentive_option {
            run.incentive_option = v;
        }
        if let Some(v) = self.plant_design_scenario {
            run.plant_design_scenario = v;
        }
        if let Some(v) = self.output_level {
            run.output_level = v;
        }
        if let Some(dir) = &self.output_dir {
            run.output_dir = dir.clone();
        }

        if self.optimize {
            manifest.run_only = false;
        }
        if let Some(program) = &self.engine {
            manifest.engine = Some(EngineSpec {
                program: program.clone(),
                args: self.engine_args.clone(),
            });
        } else if let Some(engine) = manifest.engine.as_mut() {
            engine.args.extend(self.engine_args.iter().cloned());
        }
        Ok(manifest)
    }
}

/// A `KEY=UNIT` request from `--extract`.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub key: String,
    pub unit: String,
}

impl FromStr for Extraction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((key, unit)) if !key.trim().is_empty() && !unit.trim().is_empty() => {
                Ok(Extraction {
                    key: key.trim().to_string(),
                    unit: unit.trim().to_string(),
                })
            }
            _ => Err(format!("expected KEY=UNIT, got \"{s}\"")),
        }
    }
}

impl fmt::Display for Extraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.unit)
    }
}
