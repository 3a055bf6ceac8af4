use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::error::{Error, Result};
use crate::server::InfoSource;
use crate::time::parse_time;

fn build<T: de::DeserializeOwned>(kind: &'static str, payload: Map<String, Value>) -> Result<T> {
    serde_json::from_value(Value::Object(payload)).map_err(|e| Error::construction(kind, e))
}

/// What a server advertises on its `capabilities` endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Capabilities {
    #[serde(rename = "outputFormats")]
    pub output_formats: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Capabilities {
    pub(crate) fn from_payload(payload: Map<String, Value>) -> Result<Self> {
        build("capabilities", payload)
    }

    pub fn supports(&self, format: &str) -> bool {
        self.output_formats.iter().any(|f| f == format)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "String")]
pub enum ParameterType {
    Double,
    Integer,
    String,
    IsoTime,
    Other(String),
}

impl From<String> for ParameterType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "double" => ParameterType::Double,
            "integer" => ParameterType::Integer,
            "string" => ParameterType::String,
            "isotime" => ParameterType::IsoTime,
            _ => ParameterType::Other(s),
        }
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterType::Double => f.write_str("double"),
            ParameterType::Integer => f.write_str("integer"),
            ParameterType::String => f.write_str("string"),
            ParameterType::IsoTime => f.write_str("isotime"),
            ParameterType::Other(s) => f.write_str(s),
        }
    }
}

// HAPI allows units as a string, null for dimensionless, or one entry per array element.
fn units<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
    match Value::deserialize(d)? {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s),
        Value::Array(items) => items
            .into_iter()
            .map(|v| match v {
                Value::String(s) => Ok(s),
                Value::Null => Ok(String::new()),
                other => Err(de::Error::custom(format!("invalid units entry {other}"))),
            })
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(|v| v.join(",")),
        other => Err(de::Error::custom(format!("invalid units {other}"))),
    }
}

/// One named channel of a dataset.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ParameterType,
    #[serde(deserialize_with = "units")]
    pub units: String,
    #[serde(default)]
    pub fill: Option<Value>,
    /// Array dimensions; absent for scalars.
    #[serde(default)]
    pub size: Option<Vec<usize>>,
    #[serde(default)]
    pub length: Option<usize>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Parameter {
    /// Number of CSV columns this parameter occupies.
    pub fn column_count(&self) -> usize {
        self.size
            .as_ref()
            .map_or(1, |dims| dims.iter().product::<usize>().max(1))
    }

    pub fn column_names(&self) -> Vec<String> {
        match self.column_count() {
            1 => vec![self.name.clone()],
            n => (0..n).map(|i| format!("{}[{}]", self.name, i)).collect(),
        }
    }

    pub fn is_time(&self) -> bool {
        self.kind == ParameterType::IsoTime
    }
}

fn parameter_map<'de, D: Deserializer<'de>>(
    d: D,
) -> std::result::Result<IndexMap<String, Parameter>, D::Error> {
    let list = Vec::<Parameter>::deserialize(d)?;
    let mut map = IndexMap::with_capacity(list.len());
    for p in list {
        if map.contains_key(&p.name) {
            return Err(de::Error::custom(format!("duplicate parameter `{}`", p.name)));
        }
        map.insert(p.name.clone(), p);
    }
    Ok(map)
}

/// Metadata returned by the `info` endpoint for one dataset.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DatasetInfo {
    #[serde(rename = "startDate")]
    pub start_date: String,
    #[serde(rename = "stopDate")]
    pub stop_date: String,
    /// Keyed by name, in the order the server listed them.
    #[serde(deserialize_with = "parameter_map")]
    pub parameters: IndexMap<String, Parameter>,
    #[serde(default)]
    pub cadence: Option<String>,
    #[serde(default, rename = "sampleStartDate")]
    pub sample_start_date: Option<String>,
    #[serde(default, rename = "sampleStopDate")]
    pub sample_stop_date: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DatasetInfo {
    pub(crate) fn from_payload(payload: Map<String, Value>) -> Result<Self> {
        build("dataset info", payload)
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.get(name)
    }

    pub fn parameter_names(&self) -> impl Iterator<Item = &str> {
        self.parameters.keys().map(String::as_str)
    }

    /// The leading `isotime` parameter every HAPI dataset starts with.
    pub fn time_parameter(&self) -> Option<&Parameter> {
        self.parameters.first().map(|(_, p)| p).filter(|p| p.is_time())
    }

    pub fn start(&self) -> Option<DateTime<Utc>> {
        parse_time(&self.start_date)
    }

    pub fn stop(&self) -> Option<DateTime<Utc>> {
        parse_time(&self.stop_date)
    }
}

#[derive(Deserialize)]
struct CatalogEntry {
    id: String,
    title: String,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// A catalog entry.
///
/// [`Dataset::description`] fetches the dataset's info on first use and keeps it.
#[derive(Clone)]
pub struct Dataset {
    pub id: String,
    pub title: String,
    pub extra: Map<String, Value>,
    description: OnceLock<Arc<DatasetInfo>>,
    source: InfoSource,
}

impl Dataset {
    pub(crate) fn from_entry(entry: Value, source: InfoSource) -> Result<Self> {
        let entry: CatalogEntry =
            serde_json::from_value(entry).map_err(|e| Error::construction("dataset", e))?;
        if entry.id.is_empty() {
            return Err(Error::construction(
                "dataset",
                de::Error::custom("empty dataset id"),
            ));
        }
        Ok(Self {
            id: entry.id,
            title: entry.title,
            extra: entry.extra,
            description: OnceLock::new(),
            source,
        })
    }

    pub fn description(&self) -> Result<Option<Arc<DatasetInfo>>> {
        if let Some(info) = self.description.get() {
            return Ok(Some(Arc::clone(info)));
        }
        let info = self.source.fetch(&self.id)?;
        if let Some(info) = &info {
            let _ = self.description.set(Arc::clone(info));
        }
        Ok(info)
    }

    /// The description if it has already been fetched.
    pub fn cached_description(&self) -> Option<&Arc<DatasetInfo>> {
        self.description.get()
    }
}

impl fmt::Debug for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dataset")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("extra", &self.extra)
            .field("described", &self.description.get().is_some())
            .finish()
    }
}

impl PartialEq for Dataset {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.title == other.title && self.extra == other.extra
    }
}

pub type Catalog = Vec<Dataset>;

pub(crate) fn catalog_from_payload(
    mut payload: Map<String, Value>,
    source: &InfoSource,
) -> Result<Catalog> {
    let entries = match payload.remove("catalog") {
        Some(Value::Array(entries)) => entries,
        _ => {
            return Err(Error::construction(
                "catalog",
                de::Error::custom("missing `catalog` array"),
            ));
        }
    };
    entries
        .into_iter()
        .map(|entry| Dataset::from_entry(entry, source.clone()))
        .collect()
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "outputFormats: [{}]", self.output_formats.join(", "))
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Parameter: {} ({})", self.name, self.kind)?;
        if !self.units.is_empty() {
            write!(f, " [{}]", self.units)?;
        }
        Ok(())
    }
}

impl fmt::Display for DatasetInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Dataset Description: {} to {}, {} parameter(s)",
            self.start_date,
            self.stop_date,
            self.parameters.len()
        )
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dataset: id {}, title {}", self.id, self.title)
    }
}
