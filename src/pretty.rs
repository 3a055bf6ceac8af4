//! Indented, multi-line rendering of model objects and raw JSON values.

use serde_json::{Map, Value};
use std::fmt::Write;

use crate::model::{Capabilities, Catalog, Dataset, DatasetInfo, Parameter};

const INDENT: &str = "  ";

/// Everything [`render`] knows how to print.
#[derive(Debug, Clone, Copy)]
pub enum Pretty<'a> {
    Capabilities(&'a Capabilities),
    Parameter(&'a Parameter),
    Info(&'a DatasetInfo),
    Dataset(&'a Dataset),
    Datasets(&'a [Dataset]),
    Value(&'a Value),
}

impl<'a> From<&'a Capabilities> for Pretty<'a> {
    fn from(v: &'a Capabilities) -> Self {
        Pretty::Capabilities(v)
    }
}

impl<'a> From<&'a Parameter> for Pretty<'a> {
    fn from(v: &'a Parameter) -> Self {
        Pretty::Parameter(v)
    }
}

impl<'a> From<&'a DatasetInfo> for Pretty<'a> {
    fn from(v: &'a DatasetInfo) -> Self {
        Pretty::Info(v)
    }
}

impl<'a> From<&'a Dataset> for Pretty<'a> {
    fn from(v: &'a Dataset) -> Self {
        Pretty::Dataset(v)
    }
}

impl<'a> From<&'a [Dataset]> for Pretty<'a> {
    fn from(v: &'a [Dataset]) -> Self {
        Pretty::Datasets(v)
    }
}

impl<'a> From<&'a Catalog> for Pretty<'a> {
    fn from(v: &'a Catalog) -> Self {
        Pretty::Datasets(v)
    }
}

impl<'a> From<&'a Value> for Pretty<'a> {
    fn from(v: &'a Value) -> Self {
        Pretty::Value(v)
    }
}

pub fn render<'a>(item: impl Into<Pretty<'a>>) -> String {
    let mut out = String::new();
    write_item(&mut out, item.into(), 0);
    out
}

fn line(out: &mut String, depth: usize, text: &str) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
    out.push_str(text);
    out.push('\n');
}

fn write_item(out: &mut String, item: Pretty<'_>, depth: usize) {
    match item {
        Pretty::Capabilities(c) => {
            line(out, depth, "Capabilities");
            line(out, depth + 1, &format!("outputFormats: {}", c.output_formats.join(", ")));
            write_fields(out, &c.extra, depth + 1);
        }
        Pretty::Parameter(p) => {
            line(out, depth, &format!("{} ({})", p.name, p.kind));
            if !p.units.is_empty() {
                line(out, depth + 1, &format!("units: {}", p.units));
            }
            if let Some(size) = &p.size {
                let dims: Vec<String> = size.iter().map(usize::to_string).collect();
                line(out, depth + 1, &format!("size: [{}]", dims.join(", ")));
            }
            if let Some(length) = p.length {
                line(out, depth + 1, &format!("length: {length}"));
            }
            if let Some(fill) = &p.fill {
                write_value(out, Some("fill"), fill, depth + 1);
            }
            if let Some(d) = &p.description {
                line(out, depth + 1, &format!("description: {d}"));
            }
            write_fields(out, &p.extra, depth + 1);
        }
        Pretty::Info(info) => {
            line(out, depth, "Dataset Description");
            line(out, depth + 1, &format!("startDate: {}", info.start_date));
            line(out, depth + 1, &format!("stopDate: {}", info.stop_date));
            let optional = [
                ("cadence", &info.cadence),
                ("sampleStartDate", &info.sample_start_date),
                ("sampleStopDate", &info.sample_stop_date),
                ("description", &info.description),
            ];
            for (key, value) in optional {
                if let Some(v) = value {
                    line(out, depth + 1, &format!("{key}: {v}"));
                }
            }
            write_fields(out, &info.extra, depth + 1);
            line(out, depth + 1, "parameters:");
            for p in info.parameters.values() {
                write_item(out, Pretty::Parameter(p), depth + 2);
            }
        }
        Pretty::Dataset(d) => {
            line(out, depth, &format!("{} : {}", d.id, d.title));
            write_fields(out, &d.extra, depth + 1);
            if let Some(info) = d.cached_description() {
                write_item(out, Pretty::Info(info), depth + 1);
            }
        }
        Pretty::Datasets(datasets) => {
            line(out, depth, &format!("Catalog ({} datasets)", datasets.len()));
            for d in datasets {
                write_item(out, Pretty::Dataset(d), depth + 1);
            }
        }
        Pretty::Value(v) => write_value(out, None, v, depth),
    }
}

fn write_fields(out: &mut String, fields: &Map<String, Value>, depth: usize) {
    for (k, v) in fields {
        write_value(out, Some(k.as_str()), v, depth);
    }
}

fn write_value(out: &mut String, key: Option<&str>, value: &Value, depth: usize) {
    let mut label = String::new();
    if let Some(k) = key {
        let _ = write!(label, "{k}:");
    }
    match value {
        Value::Object(map) => {
            line(out, depth, if label.is_empty() { "{}" } else { label.as_str() });
            write_fields(out, map, depth + 1);
        }
        Value::Array(items) if items.iter().all(is_scalar) => {
            let joined: Vec<String> = items.iter().map(scalar).collect();
            let text = format!("[{}]", joined.join(", "));
            line(out, depth, &join_label(&label, &text));
        }
        Value::Array(items) => {
            line(out, depth, if label.is_empty() { "[]" } else { label.as_str() });
            for item in items {
                write_value(out, Some("-"), item, depth + 1);
            }
        }
        scalar_value => line(out, depth, &join_label(&label, &scalar(scalar_value))),
    }
}

fn join_label(label: &str, text: &str) -> String {
    if label.is_empty() {
        text.to_string()
    } else {
        format!("{label} {text}")
    }
}

fn is_scalar(v: &Value) -> bool {
    !matches!(v, Value::Object(_) | Value::Array(_))
}

fn scalar(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
