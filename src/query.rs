use anyhow::Result;
use serde_json::{Value, json};

use crate::client::{Client, ClientConfig};
use crate::table::Table;

/// Datarun used when the caller does not pick one.
pub const DEFAULT_DATARUN: &str = "2024.2";

/// Builds a Core LMI query document from column names and constraints.
///
/// ```
/// use serde_json::json;
///
/// let q = lightcast::build_query(
///     &["Jobs.2022"],
///     vec![json!({"dimensionName": "Area", "mapLevel": {"level": 4, "predicate": ["48113"]}})],
/// );
/// assert_eq!(q["metrics"][0]["name"], "Jobs.2022");
/// ```
pub fn build_query<S: AsRef<str>>(columns: &[S], constraints: Vec<Value>) -> Value {
    let metrics: Vec<Value> = columns
        .iter()
        .map(|c| json!({ "name": c.as_ref() }))
        .collect();
    json!({ "metrics": metrics, "constraints": constraints })
}

/// Convenience wrapper for the common "query a dataset into a table" flow.
#[derive(Debug)]
pub struct Lightcast {
    conn: Client,
}

impl Lightcast {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Result<Self> {
        Ok(Self {
            conn: Client::with_config(ClientConfig::new(username, password))?,
        })
    }

    pub fn from_client(conn: Client) -> Self {
        Self { conn }
    }

    pub fn client(&mut self) -> &mut Client {
        &mut self.conn
    }

    pub fn build_query<S: AsRef<str>>(&self, columns: &[S], constraints: Vec<Value>) -> Value {
        build_query(columns, constraints)
    }

    /// Runs `query` against `dataset` at `datarun` (default [`DEFAULT_DATARUN`]).
    pub fn query(&mut self, dataset: &str, query: &Value, datarun: Option<&str>) -> Result<Table> {
        self.conn
            .post_retrieve_table(dataset, query, datarun.unwrap_or(DEFAULT_DATARUN))
    }
}
