use anyhow::Result;
use lightcast::{Client, build_query};
use serde_json::json;

mod dfw;

fn main() -> Result<()> {
    // Example program that calls the library API.
    // Configure credentials via env vars or a `.lightcastrc` file.
    let mut client = Client::from_env()?;

    let query = build_query(
        &["Jobs.2022", "ResidenceJobs.2022"],
        vec![
            json!({"dimensionName": "Area", "mapLevel": {"level": 4, "predicate": dfw::fips_predicate()}}),
            json!({"dimensionName": "Occupation", "mapLevel": {"level": 5, "predicate": ["00-0000"]}}),
        ],
    );

    let table = client.post_retrieve_table("emsi.us.occupation", &query, "2025.3")?;
    let table = dfw::zip_rows_only(&table)?;
    print!("{}", table.to_csv_string()?);
    Ok(())
}
