//! YAML source configs: one untyped, order-preserving mapping per input file.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::error::{PlantError, Result};

/// Which input a [`SourceConfig`] was loaded as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Generation-technology plant config (site, technologies).
    Generation,
    /// Process and financial plant config (electrolyzer, finance, policy).
    Plant,
    /// Turbine specification.
    Turbine,
    /// Wake-model specification.
    WakeModel,
    /// Offshore installation vessels and phases.
    Installation,
}

impl SourceKind {
    pub const ALL: [SourceKind; 5] = [
        SourceKind::Generation,
        SourceKind::Plant,
        SourceKind::Turbine,
        SourceKind::WakeModel,
        SourceKind::Installation,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Generation => "generation",
            SourceKind::Plant => "plant",
            SourceKind::Turbine => "turbine",
            SourceKind::WakeModel => "wake_model",
            SourceKind::Installation => "installation",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parsed YAML document.
///
/// The loader enforces only what every consumer relies on: the root is a
/// mapping, keys are strings, and no mapping repeats a key. Everything else
/// is checked by the typed section views when the aggregate is built.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceConfig {
    kind: SourceKind,
    origin: String,
    root: Mapping,
}

impl SourceConfig {
    /// Reads and parses a YAML file.
    ///
    /// # Errors
    ///
    /// `ConfigNotFound` if the file cannot be read, `ConfigParseError` if the
    /// content is not a string-keyed YAML mapping.
    pub fn load(kind: SourceKind, path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| PlantError::ConfigNotFound {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(kind, path.display().to_string(), &content)?;
        tracing::debug!(
            kind = %kind,
            path = %path.display(),
            keys = config.root.len(),
            "loaded config"
        );
        Ok(config)
    }

    /// Parses YAML held in memory.
    ///
    /// # Errors
    ///
    /// `ConfigParseError` if the content is not a string-keyed YAML mapping.
    pub fn from_yaml_str(kind: SourceKind, yaml: &str) -> Result<Self> {
        Self::parse(kind, format!("<{kind}>"), yaml)
    }

    /// Wraps an already-built mapping, applying the same checks as parsing.
    ///
    /// # Errors
    ///
    /// `ConfigParseError` if any key is not a string.
    pub fn from_mapping(
        kind: SourceKind,
        origin: impl Into<String>,
        root: Mapping,
    ) -> Result<Self> {
        let origin = origin.into();
        let root = normalize_mapping(root, &origin, "")?;
        Ok(Self { kind, origin, root })
    }

    fn parse(kind: SourceKind, origin: String, yaml: &str) -> Result<Self> {
        let value: Value = serde_yaml::from_str(yaml).map_err(|e| PlantError::ConfigParseError {
            origin: origin.clone(),
            message: e.to_string(),
        })?;
        match normalize(value, &origin, "")? {
            Value::Mapping(root) => Ok(Self { kind, origin, root }),
            Value::Null => Err(PlantError::ConfigParseError {
                origin,
                message: "document is empty".to_string(),
            }),
            other => Err(PlantError::ConfigParseError {
                origin,
                message: format!("root must be a mapping, found {}", type_name(&other)),
            }),
        }
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    /// File path (or `<kind>` for in-memory configs) the config came from.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn mapping(&self) -> &Mapping {
        &self.root
    }

    /// Top-level keys in document order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.root.keys().filter_map(Value::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.root.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.root.get(key)
    }

    /// Looks up a dotted path such as `"plant_design.scenario9.wind_location"`.
    /// Numeric segments index into sequences.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut current = self.root.get(segments.next()?)?;
        for segment in segments {
            current = match current {
                Value::Mapping(m) => m.get(segment)?,
                Value::Sequence(seq) => seq.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Returns a copy with the value at `path` replaced (or inserted as a new
    /// leaf). Every parent segment must already be a mapping.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if a parent segment is missing or not a mapping.
    pub fn with_value(&self, path: &str, value: Value) -> Result<Self> {
        let mut root = self.root.clone();
        let segments: Vec<&str> = path.split('.').collect();
        let Some((leaf, parents)) = segments.split_last() else {
            return Err(PlantError::invalid(path, "empty path"));
        };
        let mut current = &mut root;
        for (i, segment) in parents.iter().enumerate() {
            let prefix = segments[..=i].join(".");
            current = current
                .get_mut(*segment)
                .and_then(Value::as_mapping_mut)
                .ok_or_else(|| PlantError::invalid(prefix, "is not a mapping"))?;
        }
        current.insert(Value::String((*leaf).to_string()), value);
        Ok(Self {
            kind: self.kind,
            origin: self.origin.clone(),
            root,
        })
    }

    /// Deserializes the top-level `key` into a typed section.
    ///
    /// # Errors
    ///
    /// `MissingRequiredConfig` if the key is absent, `InvalidConfig` if its
    /// shape does not match `T`.
    pub fn section<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        self.optional_section(key)?
            .ok_or_else(|| PlantError::missing(format!("{}.{key}", self.kind)))
    }

    /// Like [`SourceConfig::section`], but an absent key yields `None`.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if the key is present and its shape does not match `T`.
    pub fn optional_section<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.root.get(key) {
            None => Ok(None),
            Some(value) => serde_yaml::from_value(value.clone())
                .map(Some)
                .map_err(|e| PlantError::invalid(format!("{}.{key}", self.kind), e.to_string())),
        }
    }

    /// Deserializes the whole document into a typed view.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if the document shape does not match `T`.
    pub fn to_typed<T: DeserializeOwned>(&self) -> Result<T> {
        serde_yaml::from_value(Value::Mapping(self.root.clone()))
            .map_err(|e| PlantError::invalid(self.kind.as_str(), e.to_string()))
    }

    /// Serializes the mapping back to YAML.
    ///
    /// # Errors
    ///
    /// `ConfigParseError` if the mapping holds a value YAML cannot represent.
    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml::to_string(&self.root).map_err(|e| PlantError::ConfigParseError {
            origin: self.origin.clone(),
            message: e.to_string(),
        })
    }
}

impl Serialize for SourceConfig {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        self.root.serialize(serializer)
    }
}

/// Strips custom tags (`!!python/tuple` and friends) and rejects non-string keys.
fn normalize(value: Value, origin: &str, path: &str) -> Result<Value> {
    match value {
        Value::Tagged(tagged) => normalize(tagged.value, origin, path),
        Value::Sequence(seq) => seq
            .into_iter()
            .enumerate()
            .map(|(i, v)| normalize(v, origin, &join_path(path, &i.to_string())))
            .collect::<Result<Vec<_>>>()
            .map(Value::Sequence),
        Value::Mapping(map) => normalize_mapping(map, origin, path).map(Value::Mapping),
        other => Ok(other),
    }
}

fn normalize_mapping(map: Mapping, origin: &str, path: &str) -> Result<Mapping> {
    let mut out = Mapping::with_capacity(map.len());
    for (k, v) in map {
        let Value::String(key) = k else {
            return Err(PlantError::ConfigParseError {
                origin: origin.to_string(),
                message: format!(
                    "non-string key {} under \"{path}\"",
                    serde_yaml::to_string(&k).unwrap_or_default().trim()
                ),
            });
        };
        let child = normalize(v, origin, &join_path(path, &key))?;
        out.insert(Value::String(key), child);
    }
    Ok(out)
}

fn join_path(parent: &str, child: &str) -> String {
    if parent.is_empty() {
        child.to_string()
    } else {
        format!("{parent}.{child}")
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

/// Reads a YAML number (integer or float) as `f64`.
pub(crate) fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}
