//! Canonical shapes for metadata responses.
//!
//! The discovery endpoints have answered with both list-of-objects and
//! object-keyed-by-name layouts over time. Everything downstream works on the
//! types here, never on raw JSON.

use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSummary {
    pub name: String,
    pub title: Option<String>,
    pub versions: Vec<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DimensionSummary {
    pub name: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub levels: Option<DimensionLevels>,
}

/// Level information of a dimension, as sent.
#[derive(Debug, Clone, PartialEq)]
pub enum DimensionLevels {
    /// `levelsStored` of the list layout.
    Stored(Value),
    /// `hierarchyLevels` of the keyed layout.
    Hierarchy(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricSummary {
    pub name: String,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetDimensions {
    pub display_name: Option<String>,
    pub current_year: Option<Value>,
    pub dimensions: Vec<DimensionSummary>,
    pub metrics: Vec<MetricSummary>,
}

/// Deepest level a hierarchy node is reported at; deeper values are clamped.
pub const MAX_DEPTH: usize = 32;

/// One entry of a dimension hierarchy.
#[derive(Debug, Clone, PartialEq)]
pub struct HierarchyNode {
    pub name: String,
    pub level: usize,
    pub code: String,
    pub raw: Value,
}

fn str_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Accepts `{"datasets": [{"name": ..}, ..]}` or `{"datasets": {"<name>": {..}}}`.
///
/// `None` when the body has neither layout.
pub fn parse_datasets(body: &Value) -> Option<Vec<DatasetSummary>> {
    match body.get("datasets")? {
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(Value::as_object)
                .filter_map(|obj| {
                    let name = str_field(obj, "name")?;
                    Some(dataset_from(name, Some(obj)))
                })
                .collect(),
        ),
        Value::Object(map) => Some(
            map.iter()
                .map(|(name, info)| dataset_from(name.clone(), info.as_object()))
                .collect(),
        ),
        _ => None,
    }
}

fn dataset_from(name: String, info: Option<&Map<String, Value>>) -> DatasetSummary {
    let Some(info) = info else {
        return DatasetSummary {
            name,
            title: None,
            versions: Vec::new(),
            description: None,
        };
    };
    DatasetSummary {
        name,
        title: str_field(info, "title"),
        versions: info
            .get("versions")
            .and_then(Value::as_array)
            .map(|vs| {
                vs.iter()
                    .map(|v| match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default(),
        description: str_field(info, "description"),
    }
}

pub fn parse_dimensions(body: &Value) -> DatasetDimensions {
    let mut out = DatasetDimensions::default();

    if let Some(attrs) = body.get("attributes").and_then(Value::as_object) {
        out.display_name = str_field(attrs, "displayName");
        out.current_year = attrs.get("currentYear").cloned();
    }

    match body.get("dimensions") {
        Some(Value::Array(items)) => {
            out.dimensions = items
                .iter()
                .filter_map(Value::as_object)
                .filter_map(|d| {
                    Some(DimensionSummary {
                        name: str_field(d, "name")?,
                        title: str_field(d, "title"),
                        description: str_field(d, "description"),
                        levels: d.get("levelsStored").cloned().map(DimensionLevels::Stored),
                    })
                })
                .collect();
        }
        Some(Value::Object(map)) => {
            out.dimensions = map
                .iter()
                .map(|(name, info)| {
                    let info = info.as_object();
                    DimensionSummary {
                        name: name.clone(),
                        title: info.and_then(|i| str_field(i, "title")),
                        description: info.and_then(|i| str_field(i, "description")),
                        levels: info
                            .and_then(|i| i.get("hierarchyLevels").cloned())
                            .map(DimensionLevels::Hierarchy),
                    }
                })
                .collect();
        }
        _ => {}
    }

    match body.get("metrics") {
        Some(Value::Array(items)) => {
            out.metrics = items
                .iter()
                .filter_map(Value::as_object)
                .filter_map(|m| {
                    Some(MetricSummary {
                        name: str_field(m, "name")?,
                        title: str_field(m, "title"),
                    })
                })
                .collect();
        }
        Some(Value::Object(map)) => {
            out.metrics = map
                .iter()
                .map(|(name, info)| MetricSummary {
                    name: name.clone(),
                    title: info.as_object().and_then(|i| str_field(i, "title")),
                })
                .collect();
        }
        _ => {}
    }

    out
}

/// `None` when the body has no `hierarchy` list.
pub fn parse_hierarchy(body: &Value) -> Option<Vec<HierarchyNode>> {
    let items = body.get("hierarchy")?.as_array()?;
    Some(
        items
            .iter()
            .filter_map(|item| {
                let obj = item.as_object()?;
                Some(HierarchyNode {
                    name: str_field(obj, "name").unwrap_or_else(|| "Unknown".to_string()),
                    level: node_level(obj),
                    code: node_code(obj),
                    raw: item.clone(),
                })
            })
            .collect(),
    )
}

// `level` is zero-based; `level_name` is one-based and sometimes a string.
// A `level_name` of 0 has no parent level to sit under and is treated as a root.
fn node_level(obj: &Map<String, Value>) -> usize {
    let level = if let Some(level) = obj.get("level") {
        as_u64(level).unwrap_or(0)
    } else if let Some(level_name) = obj.get("level_name") {
        as_u64(level_name).map(|l| l.saturating_sub(1)).unwrap_or(0)
    } else {
        0
    };
    usize::try_from(level).unwrap_or(MAX_DEPTH).min(MAX_DEPTH)
}

fn as_u64(v: &Value) -> Option<u64> {
    match v {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn node_code(obj: &Map<String, Value>) -> String {
    ["display_id", "child", "id"]
        .iter()
        .filter_map(|k| obj.get(*k))
        .find(|v| !v.is_null() && v.as_str() != Some(""))
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .unwrap_or_default()
}

/// Text of the `# Description` section of a dataset description, joined
/// into one paragraph.
pub fn description_summary(text: &str) -> Option<String> {
    let mut lines = Vec::new();
    let mut in_description = false;
    for line in text.lines() {
        let line = line.trim();
        if line.starts_with("# Description") {
            in_description = true;
            continue;
        }
        if !in_description {
            continue;
        }
        if line.starts_with('#') {
            break;
        }
        if !line.is_empty() {
            lines.push(line);
        }
    }

    if lines.is_empty() {
        None
    } else {
        Some(lines.join(" "))
    }
}
