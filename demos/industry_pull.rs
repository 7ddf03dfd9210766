use anyhow::Result;
use lightcast::{Client, build_query};
use serde_json::json;

mod dfw;

fn main() -> Result<()> {
    let mut client = Client::from_env()?;

    // Industry code "10" (level 2) by ZIP across the DFW counties.
    let query = build_query(
        &["Jobs.2013", "Jobs.2018", "Jobs.2023", "Jobs.2033"],
        vec![
            json!({"dimensionName": "Area", "mapLevel": {"level": 4, "predicate": dfw::fips_predicate()}}),
            json!({"dimensionName": "Industry", "mapLevel": {"level": 2, "predicate": ["10"]}}),
        ],
    );

    let table = client.post_retrieve_table("emsi.us.industry", &query, "2025.3")?;
    let table = dfw::zip_rows_only(&table)?;
    print!("{}", table.to_csv_string()?);
    Ok(())
}
