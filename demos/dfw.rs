//! Shared pieces of the Dallas-Fort Worth demo pulls.

use anyhow::Result;
use lightcast::Table;
use serde_json::Value;

// Dallas-Fort Worth 13-county region
const DFW_13_FIPS: [(&str, u32); 13] = [
    ("collin", 48085),
    ("dallas", 48113),
    ("denton", 48121),
    ("ellis", 48139),
    ("hunt", 48231),
    ("kaufman", 48257),
    ("rockwall", 48397),
    ("hood", 48221),
    ("johnson", 48251),
    ("parker", 48367),
    ("somervell", 48425),
    ("tarrant", 48439),
    ("wise", 48497),
];

/// County FIPS codes as the `Area` predicate expects them.
pub fn fips_predicate() -> Vec<String> {
    DFW_13_FIPS.iter().map(|(_, f)| f.to_string()).collect()
}

/// Keeps rows whose `Area` is a ZIP code, with the `ZIP` prefix removed.
pub fn zip_rows_only(table: &Table) -> Result<Table> {
    let keep: Vec<usize> = table
        .column("Area")
        .unwrap_or_default()
        .iter()
        .enumerate()
        .filter(|(_, v)| v.as_str().is_some_and(|s| s.contains("ZIP")))
        .map(|(i, _)| i)
        .collect();

    Table::from_columns(table.columns().iter().map(|c| {
        let values = keep
            .iter()
            .map(|&i| match (&c.values[i], c.name.as_str()) {
                (Value::String(s), "Area") => {
                    Value::String(s.strip_prefix("ZIP").unwrap_or(s).to_string())
                }
                (v, _) => v.clone(),
            })
            .collect();
        (c.name.clone(), values)
    }))
}
