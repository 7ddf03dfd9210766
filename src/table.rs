use anyhow::{Context, Result, bail};
use serde_json::{Map, Value};
use std::io::Write;

/// One column of a query result as the API returns it.
#[derive(Debug, Clone, serde::Deserialize)]
pub(crate) struct ResultColumn {
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) rows: Vec<Value>,
}

/// Body of a query response: `{"data": [{"name": ..., "rows": [...]}, ...]}`.
#[derive(Debug, serde::Deserialize)]
pub(crate) struct QueryResponse {
    pub(crate) data: Vec<ResultColumn>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
}

/// Column-ordered table of JSON scalars.
///
/// Rows are aligned by position: row `i` is the `i`-th value of every column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    rows: usize,
}

impl Table {
    /// Reshapes a query response body into a table keyed by column name.
    pub fn from_query_response(body: &Value) -> Result<Self> {
        let resp: QueryResponse = serde_json::from_value(body.clone())
            .context("query response is missing a `data` list of columns")?;
        Self::from_result_columns(resp.data)
    }

    pub(crate) fn from_result_columns(data: Vec<ResultColumn>) -> Result<Self> {
        Self::from_columns(data.into_iter().map(|c| (c.name, c.rows)))
    }

    /// Builds a table from `(name, values)` pairs, keeping their order.
    ///
    /// Every column must hold the same number of values.
    pub fn from_columns<I>(columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, Vec<Value>)>,
    {
        let mut table = Table::default();
        for (name, values) in columns {
            if table.columns.is_empty() {
                table.rows = values.len();
            } else if values.len() != table.rows {
                bail!(
                    "column `{}` has {} row(s) but `{}` has {}",
                    name,
                    values.len(),
                    table.columns[0].name,
                    table.rows
                );
            }

            // A repeated name replaces the earlier column in place.
            if let Some(existing) = table.columns.iter_mut().find(|c| c.name == name) {
                existing.values = values;
            } else {
                table.columns.push(Column { name, values });
            }
        }
        Ok(table)
    }

    /// Builds a table from a list of JSON objects.
    ///
    /// Columns are the union of keys in first-seen order; keys missing from a
    /// record become `null`.
    pub fn from_records(records: &[Value]) -> Result<Self> {
        let mut objects: Vec<&Map<String, Value>> = Vec::with_capacity(records.len());
        let mut names: Vec<&str> = Vec::new();
        for (i, rec) in records.iter().enumerate() {
            let Some(obj) = rec.as_object() else {
                bail!("record {} is not a JSON object", i);
            };
            for k in obj.keys() {
                if !names.contains(&k.as_str()) {
                    names.push(k.as_str());
                }
            }
            objects.push(obj);
        }

        let columns = names
            .iter()
            .map(|name| Column {
                name: (*name).to_string(),
                values: objects
                    .iter()
                    .map(|o| o.get(*name).cloned().unwrap_or(Value::Null))
                    .collect(),
            })
            .collect();

        Ok(Table {
            columns,
            rows: records.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    pub fn row(&self, index: usize) -> Option<Vec<&Value>> {
        if index >= self.rows {
            return None;
        }
        Some(self.columns.iter().map(|c| &c.values[index]).collect())
    }

    /// First `n` rows.
    pub fn head(&self, n: usize) -> Table {
        let rows = n.min(self.rows);
        Table {
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    name: c.name.clone(),
                    values: c.values[..rows].to_vec(),
                })
                .collect(),
            rows,
        }
    }

    /// Row-oriented JSON: one object per row.
    pub fn to_records(&self) -> Vec<Value> {
        (0..self.rows)
            .map(|i| {
                let mut obj = Map::new();
                for c in &self.columns {
                    obj.insert(c.name.clone(), c.values[i].clone());
                }
                Value::Object(obj)
            })
            .collect()
    }

    pub fn write_csv<W: Write>(&self, out: W) -> Result<()> {
        let mut w = csv::Writer::from_writer(out);
        w.write_record(self.columns.iter().map(|c| c.name.as_str()))?;
        for i in 0..self.rows {
            w.write_record(self.columns.iter().map(|c| csv_cell(&c.values[i])))?;
        }
        w.flush().context("failed to write CSV")?;
        Ok(())
    }

    pub fn to_csv_string(&self) -> Result<String> {
        let mut buf = Vec::new();
        self.write_csv(&mut buf)?;
        String::from_utf8(buf).context("CSV output is not valid UTF-8")
    }
}

fn csv_cell(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
