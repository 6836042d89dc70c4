//! Run options and the configuration aggregate handed to engines.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize};

use super::install::InstallationSchedule;
use super::sections::{
    PlantDesign, PlantProcess, PolicyOption, Technologies, TurbineSpec, WakeModelSpec,
    WindLocation,
};
use super::source::{SourceConfig, SourceKind};
use crate::error::{ConfigError, PlantError, Result};

/// Scalar run options recognized by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunOptions {
    /// Debug-level logging.
    pub verbose: bool,
    /// Passed through to engines that can display plots.
    pub show_plots: bool,
    /// Passed through to engines that can save plots.
    pub save_plots: bool,
    /// Annualize with a discounted capital recovery factor instead of
    /// straight-line depreciation.
    pub use_financial_engine: bool,
    /// Export results to the output directory after the run.
    pub post_processing: bool,
    /// 1-based index into `policy_parameters`; 0 disables incentives.
    pub incentive_option: u32,
    /// 1-based index into `plant_design`.
    pub plant_design_scenario: u32,
    /// Amount of detail in the printed summary.
    pub output_level: u8,
    /// Where exports and engine hand-off files are written.
    pub output_dir: PathBuf,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            verbose: false,
            show_plots: false,
            save_plots: false,
            use_financial_engine: true,
            post_processing: true,
            incentive_option: 1,
            plant_design_scenario: 1,
            output_level: 1,
            output_dir: PathBuf::from("output"),
        }
    }
}

/// Typed sections extracted from the sources, validated together.
#[derive(Debug, Clone, PartialEq)]
pub struct PlantModel {
    pub process: PlantProcess,
    pub design: PlantDesign,
    pub policy: PolicyOption,
    pub technologies: Technologies,
    pub turbine: Option<TurbineSpec>,
    pub wake: Option<WakeModelSpec>,
    pub installation: Option<InstallationSchedule>,
}

/// All source configs for one run plus the run options.
///
/// Only [`AggregateBuilder::build`] constructs one, so holding a value means
/// every required source parsed and validated.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigurationAggregate {
    sources: BTreeMap<SourceKind, SourceConfig>,
    options: RunOptions,
    model: PlantModel,
}

impl ConfigurationAggregate {
    pub fn builder(options: RunOptions) -> AggregateBuilder {
        AggregateBuilder::new(options)
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    pub fn model(&self) -> &PlantModel {
        &self.model
    }

    pub fn source(&self, kind: SourceKind) -> Option<&SourceConfig> {
        self.sources.get(&kind)
    }

    pub fn sources(&self) -> impl Iterator<Item = &SourceConfig> {
        self.sources.values()
    }

    pub fn output_dir(&self) -> &Path {
        &self.options.output_dir
    }

    /// Rebuilds the aggregate with one source swapped out.
    ///
    /// # Errors
    ///
    /// Any validation error the replacement introduces.
    pub fn with_source(&self, source: SourceConfig) -> Result<Self> {
        self.with_sources([source])
    }

    /// Like [`ConfigurationAggregate::with_source`] for several sources,
    /// validated once after all of them are swapped in.
    ///
    /// # Errors
    ///
    /// Any validation error the replacements introduce.
    pub fn with_sources(
        &self,
        replacements: impl IntoIterator<Item = SourceConfig>,
    ) -> Result<Self> {
        let mut sources = self.sources.clone();
        for source in replacements {
            sources.insert(source.kind(), source);
        }
        AggregateBuilder {
            sources,
            duplicates: Vec::new(),
            options: self.options.clone(),
        }
        .build()
    }
}

impl Serialize for ConfigurationAggregate {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.sources.len() + 1))?;
        map.serialize_entry("options", &self.options)?;
        for (kind, source) in &self.sources {
            map.serialize_entry(kind.as_str(), source)?;
        }
        map.end()
    }
}

/// Collects sources and options, then validates them in one pass.
#[derive(Debug, Clone)]
pub struct AggregateBuilder {
    sources: BTreeMap<SourceKind, SourceConfig>,
    duplicates: Vec<SourceKind>,
    options: RunOptions,
}

impl AggregateBuilder {
    pub fn new(options: RunOptions) -> Self {
        Self {
            sources: BTreeMap::new(),
            duplicates: Vec::new(),
            options,
        }
    }

    pub fn source(mut self, source: SourceConfig) -> Self {
        let kind = source.kind();
        if self.sources.insert(kind, source).is_some() {
            self.duplicates.push(kind);
        }
        self
    }

    /// Loads `path` as `kind` and adds it.
    ///
    /// # Errors
    ///
    /// Loader errors (`ConfigNotFound`, `ConfigParseError`).
    pub fn load(self, kind: SourceKind, path: &Path) -> Result<Self> {
        Ok(self.source(SourceConfig::load(kind, path)?))
    }

    /// Validates and freezes the aggregate.
    ///
    /// # Errors
    ///
    /// `MissingRequiredConfig` for an absent source or section,
    /// `InvalidConfig` for duplicate sources and out-of-range values.
    pub fn build(self) -> Result<ConfigurationAggregate> {
        if !self.duplicates.is_empty() {
            return Err(PlantError::InvalidConfig(
                self.duplicates
                    .iter()
                    .map(|k| ConfigError::new(k.as_str(), "supplied more than once"))
                    .collect(),
            ));
        }
        let opts = &self.options;
        if opts.plant_design_scenario == 0 {
            return Err(PlantError::invalid("plant_design_scenario", "must be >= 1"));
        }

        let generation = self.require(SourceKind::Generation)?;
        let plant = self.require(SourceKind::Plant)?;

        let technologies: Technologies = generation.section("technologies")?;
        let process = PlantProcess {
            plant: plant.section("plant")?,
            finance: plant.section("finance_parameters")?,
            electrolyzer: plant.section("electrolyzer")?,
            ammonia: plant.optional_section("ammonia")?,
        };

        let scenario_key = format!("plant_design.scenario{}", opts.plant_design_scenario);
        let design: PlantDesign = typed_at(plant, &scenario_key)?;

        let policy = if opts.incentive_option == 0 {
            PolicyOption::default()
        } else {
            typed_at(
                plant,
                &format!("policy_parameters.option{}", opts.incentive_option),
            )?
        };

        let (turbine, wake) = if technologies.has_wind() {
            let turbine: TurbineSpec = self.require(SourceKind::Turbine)?.to_typed()?;
            let wake: WakeModelSpec = self.require(SourceKind::WakeModel)?.to_typed()?;
            (Some(turbine), Some(wake))
        } else {
            (None, None)
        };

        let offshore_wind =
            technologies.has_wind() && design.wind_location == WindLocation::Offshore;
        let installation = if offshore_wind {
            Some(InstallationSchedule::from_source(
                self.require(SourceKind::Installation)?,
            )?)
        } else {
            None
        };

        let mut errors = Vec::new();
        process.validate(&mut errors);
        technologies.validate(&mut errors);
        if opts.incentive_option > 0 {
            policy.validate(
                &format!("policy_parameters.option{}", opts.incentive_option),
                &mut errors,
            );
        }
        if let Some(t) = &turbine {
            t.validate(&mut errors);
        }
        if design.wind_location != WindLocation::None && !technologies.has_wind() {
            errors.push(ConfigError::new(
                format!("{scenario_key}.wind_location"),
                "set but technologies.wind is not configured",
            ));
        }
        if !errors.is_empty() {
            return Err(PlantError::InvalidConfig(errors));
        }

        tracing::debug!(
            sources = self.sources.len(),
            scenario = opts.plant_design_scenario,
            incentive = opts.incentive_option,
            wind = ?design.wind_location,
            "configuration aggregate built"
        );

        Ok(ConfigurationAggregate {
            model: PlantModel {
                process,
                design,
                policy,
                technologies,
                turbine,
                wake,
                installation,
            },
            sources: self.sources,
            options: self.options,
        })
    }

    fn require(&self, kind: SourceKind) -> Result<&SourceConfig> {
        self.sources
            .get(&kind)
            .ok_or_else(|| PlantError::missing(format!("{kind} config")))
    }
}

fn typed_at<T: serde::de::DeserializeOwned>(source: &SourceConfig, path: &str) -> Result<T> {
    let value = source
        .lookup(path)
        .ok_or_else(|| PlantError::missing(format!("{}.{path}", source.kind())))?;
    serde_yaml::from_value(value.clone())
        .map_err(|e| PlantError::invalid(format!("{}.{path}", source.kind()), e.to_string()))
}
