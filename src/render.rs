//! Human-readable rendering of discovery results.

use std::io::{self, Write};
use termcolor::{Color, ColorSpec, WriteColor};

use crate::meta::{DatasetDimensions, DatasetSummary, DimensionLevels, HierarchyNode};

/// Versions listed before the rest are summarised as `(+N more)`.
const MAX_VERSIONS: usize = 5;
const WRAP_WIDTH: usize = 100;

fn heading() -> ColorSpec {
    let mut spec = ColorSpec::new();
    spec.set_bold(true).set_fg(Some(Color::Cyan));
    spec
}

fn bold() -> ColorSpec {
    let mut spec = ColorSpec::new();
    spec.set_bold(true);
    spec
}

fn styled<W: WriteColor + ?Sized>(out: &mut W, text: &str, spec: &ColorSpec) -> io::Result<()> {
    out.set_color(spec)?;
    write!(out, "{}", text)?;
    out.reset()
}

pub fn write_datasets<W: WriteColor + ?Sized>(
    out: &mut W,
    datasets: &[DatasetSummary],
    descriptions: bool,
) -> io::Result<()> {
    writeln!(out, "\n=== Available Datasets ===\n")?;

    for ds in datasets {
        styled(out, &ds.name, &heading())?;
        writeln!(out)?;

        if let Some(title) = &ds.title {
            writeln!(out, "  {}", title)?;
        }

        if !ds.versions.is_empty() {
            let shown = ds.versions.len().min(MAX_VERSIONS);
            let mut versions = ds.versions[..shown].join(", ");
            if ds.versions.len() > MAX_VERSIONS {
                versions.push_str(&format!(" ... (+{} more)", ds.versions.len() - MAX_VERSIONS));
            }
            writeln!(out, "  Versions: {}", versions)?;
        }

        if descriptions {
            if let Some(summary) = ds
                .description
                .as_deref()
                .and_then(crate::meta::description_summary)
            {
                writeln!(
                    out,
                    "{}",
                    wrap(&summary, WRAP_WIDTH, "  Description: ", "              ")
                )?;
            }
        }

        writeln!(out)?;
    }
    Ok(())
}

pub fn write_dimensions<W: WriteColor + ?Sized>(
    out: &mut W,
    dataset: &str,
    datarun: &str,
    dims: &DatasetDimensions,
) -> io::Result<()> {
    write!(out, "\n=== Dimensions for ")?;
    styled(out, dataset, &heading())?;
    writeln!(out, " ({}) ===\n", datarun)?;

    if dims.display_name.is_some() || dims.current_year.is_some() {
        if let Some(name) = &dims.display_name {
            writeln!(out, "Dataset: {}", name)?;
        }
        if let Some(year) = &dims.current_year {
            writeln!(out, "Current Year: {}", plain(year))?;
        }
        writeln!(out)?;
    }

    if !dims.dimensions.is_empty() {
        styled(out, "Dimensions:", &bold())?;
        writeln!(out)?;
        for dim in &dims.dimensions {
            writeln!(out, "  - {}", dim.name)?;
            if let Some(title) = &dim.title {
                writeln!(out, "    Title: {}", title)?;
            }
            if let Some(desc) = &dim.description {
                writeln!(out, "    Description: {}", desc)?;
            }
            match &dim.levels {
                Some(DimensionLevels::Stored(levels)) => {
                    writeln!(out, "    Levels: {}", plain(levels))?
                }
                Some(DimensionLevels::Hierarchy(levels)) => {
                    writeln!(out, "    Hierarchy levels: {}", plain(levels))?
                }
                None => {}
            }
        }
        writeln!(out)?;
    }

    if !dims.metrics.is_empty() {
        styled(out, "Available Metrics:", &bold())?;
        writeln!(out)?;
        for metric in &dims.metrics {
            match &metric.title {
                Some(title) => writeln!(out, "  - {}: {}", metric.name, title)?,
                None => writeln!(out, "  - {}", metric.name)?,
            }
        }
        writeln!(out)?;
    }
    Ok(())
}

/// Indented tree view. A `limit` of zero shows every node.
pub fn write_hierarchy<W: WriteColor + ?Sized>(
    out: &mut W,
    dataset: &str,
    dimension: &str,
    datarun: &str,
    nodes: &[HierarchyNode],
    limit: usize,
) -> io::Result<()> {
    write!(out, "\n=== Hierarchy for ")?;
    styled(out, dimension, &heading())?;
    writeln!(out, " in {} ({}) ===\n", dataset, datarun)?;

    for (shown, node) in nodes.iter().enumerate() {
        if limit > 0 && shown >= limit {
            writeln!(out, "\n... and {} more items", nodes.len() - shown)?;
            break;
        }

        let indent = "  ".repeat(node.level);
        if node.level == 0 {
            write!(out, "{}", indent)?;
            styled(out, &node.name, &bold())?;
            writeln!(out, " [{}]", node.code)?;
        } else {
            writeln!(out, "{}  {} [{}]", indent, node.name, node.code)?;
        }
    }
    writeln!(out)
}

fn plain(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Greedy word wrap; words longer than the line are left whole.
pub fn wrap(text: &str, width: usize, initial_indent: &str, subsequent_indent: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut current = initial_indent.to_string();
    let mut has_word = false;

    for word in text.split_whitespace() {
        let needed = if has_word { word.len() + 1 } else { word.len() };
        if has_word && current.chars().count() + needed > width {
            lines.push(std::mem::replace(&mut current, subsequent_indent.to_string()));
            has_word = false;
        }
        if has_word {
            current.push(' ');
        }
        current.push_str(word);
        has_word = true;
    }
    if has_word {
        lines.push(current);
    }
    lines.join("\n")
}
