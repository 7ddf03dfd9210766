use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::Value;
use std::io::{IsTerminal, Read, Write};
use std::path::{Path, PathBuf};
use termcolor::{ColorChoice, StandardStream};

use lightcast::meta::{parse_datasets, parse_dimensions, parse_hierarchy};
use lightcast::render::{write_datasets, write_dimensions, write_hierarchy};
use lightcast::{Client, ClientConfig, Table};

const CLI_DATARUN: &str = "2025.3";

#[derive(Debug, Parser)]
#[command(
    name = "lightcast",
    version,
    about = "lightcast - Command-line interface for Lightcast API discovery and querying"
)]
pub struct Cli {
    /// Override RUST_LOG level (e.g., info, debug)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// When to color terminal output
    #[arg(long, value_enum, default_value_t = ColorMode::Auto, global = true)]
    pub color: ColorMode,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    Auto,
    Always,
    Never,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Discover available datasets, dimensions, and hierarchies
    #[command(subcommand)]
    Discover(Discover),
    /// Build and execute queries
    #[command(subcommand)]
    Query(Query),
}

#[derive(Debug, Subcommand)]
pub enum Discover {
    /// List all available datasets and their versions
    Datasets {
        /// Output as JSON
        #[arg(long)]
        json: bool,
        /// Include full dataset descriptions
        #[arg(short, long)]
        descriptions: bool,
    },
    /// Print the raw dataset definitions document
    Definitions,
    /// List available dimensions for a specific dataset
    Dimensions {
        #[command(flatten)]
        target: DatasetArgs,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// View the hierarchy of a specific dimension
    Hierarchy {
        #[command(flatten)]
        target: DatasetArgs,
        /// Dimension name (e.g., Area, Occupation)
        #[arg(long)]
        dimension: String,
        /// Output as JSON
        #[arg(long, conflicts_with = "csv")]
        json: bool,
        /// Output as CSV
        #[arg(long)]
        csv: bool,
        /// Limit number of items shown (0 shows everything)
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

#[derive(Debug, Args)]
pub struct DatasetArgs {
    /// Dataset name (e.g., emsi.us.occupation)
    #[arg(long)]
    dataset: String,
    /// Data version (e.g., 2025.3)
    #[arg(long)]
    datarun: String,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ExampleKind {
    Occupation,
    Industry,
}

#[derive(Debug, Subcommand)]
pub enum Query {
    /// Interactive query builder (coming soon)
    Build {
        /// Dataset name (e.g., emsi.us.occupation)
        #[arg(long)]
        dataset: String,
        /// Data version
        #[arg(long, default_value = CLI_DATARUN)]
        datarun: String,
    },
    /// Show example queries for common use cases
    Example {
        /// Example dataset type
        #[arg(long, value_enum, default_value_t = ExampleKind::Occupation)]
        dataset: ExampleKind,
    },
    /// Run a query document and print the result table
    Run {
        /// Dataset name (e.g., emsi.us.occupation)
        #[arg(long)]
        dataset: String,
        /// Data version
        #[arg(long, default_value = CLI_DATARUN)]
        datarun: String,
        /// JSON query file, or `-` for stdin
        #[arg(long)]
        query: PathBuf,
        /// Print the raw response instead of CSV
        #[arg(long)]
        json: bool,
        /// Space the call out according to the remaining quota
        #[arg(long)]
        smart_limit: bool,
    },
}

pub fn init_logging(level: Option<&str>) {
    // Explicit level wins, then RUST_LOG, then warn so dispatch diagnostics still show.
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if let Some(lvl) = level {
        builder.parse_filters(lvl);
    }
    builder.init();
}

pub fn run(cli: Cli) -> Result<()> {
    let color = match cli.color {
        ColorMode::Always => ColorChoice::Always,
        ColorMode::Never => ColorChoice::Never,
        ColorMode::Auto if std::io::stdout().is_terminal() => ColorChoice::Auto,
        ColorMode::Auto => ColorChoice::Never,
    };

    match cli.command {
        Command::Discover(cmd) => discover(cmd, color),
        Command::Query(cmd) => query(cmd),
    }
}

fn connect() -> Result<Client> {
    let cfg = ClientConfig::from_env().context("Error")?;
    let client = Client::with_config(cfg).context("Error connecting to API")?;
    Ok(client.with_progress(std::io::stderr().is_terminal()))
}

fn print_json(v: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(v)?);
    Ok(())
}

fn discover(cmd: Discover, color: ColorChoice) -> Result<()> {
    let mut conn = connect()?;
    let mut out = StandardStream::stdout(color);

    match cmd {
        Discover::Datasets { json, descriptions } => (|| -> Result<()> {
            let definitions = conn.get_meta_definitions()?;
            if json {
                return print_json(&definitions);
            }
            match parse_datasets(&definitions) {
                Some(datasets) => write_datasets(&mut out, &datasets, descriptions)?,
                None => {
                    println!("Raw API response:");
                    print_json(&definitions)?;
                }
            }
            Ok(())
        })()
        .context("Error fetching datasets"),

        Discover::Definitions => conn
            .get_meta_definitions()
            .and_then(|v| print_json(&v))
            .context("Error fetching definitions"),

        Discover::Dimensions { target, json } => (|| -> Result<()> {
            let info = conn.get_meta_dataset(&target.dataset, &target.datarun)?;
            if json {
                return print_json(&info);
            }
            let dims = parse_dimensions(&info);
            write_dimensions(&mut out, &target.dataset, &target.datarun, &dims)?;
            Ok(())
        })()
        .context("Error fetching dimensions"),

        Discover::Hierarchy {
            target,
            dimension,
            json,
            csv,
            limit,
        } => (|| -> Result<()> {
            if csv {
                let mut table =
                    conn.get_dimension_hierarchy_table(&target.dataset, &dimension, &target.datarun)?;
                if limit > 0 && table.len() > limit {
                    table = table.head(limit);
                    eprintln!("# Showing first {} items", limit);
                }
                return write_csv_stdout(&table);
            }

            let body =
                conn.get_meta_dataset_dimension(&target.dataset, &dimension, &target.datarun)?;
            if json {
                return print_json(&body);
            }
            match parse_hierarchy(&body) {
                Some(nodes) => write_hierarchy(
                    &mut out,
                    &target.dataset,
                    &dimension,
                    &target.datarun,
                    &nodes,
                    limit,
                )?,
                None => print_json(&body)?,
            }
            Ok(())
        })()
        .context("Error fetching hierarchy"),
    }
}

fn write_csv_stdout(table: &Table) -> Result<()> {
    let stdout = std::io::stdout();
    let mut lock = stdout.lock();
    table.write_csv(&mut lock)?;
    lock.flush()?;
    Ok(())
}

fn query(cmd: Query) -> Result<()> {
    match cmd {
        Query::Build { dataset, datarun } => {
            println!("\nInteractive query builder for {} ({})", dataset, datarun);
            println!("This feature is coming soon!");
            println!("\nFor now, you can use the discover commands to explore available data:");
            println!("  - lightcast discover dimensions --dataset <dataset> --datarun <version>");
            println!(
                "  - lightcast discover hierarchy --dataset <dataset> --dimension <dim> --datarun <version>"
            );
            Ok(())
        }
        Query::Example { dataset } => {
            match dataset {
                ExampleKind::Occupation => {
                    println!("\n=== Example Occupation Query ===\n");
                    println!("{}", OCCUPATION_EXAMPLE);
                }
                ExampleKind::Industry => {
                    println!("\n=== Example Industry Query ===\n");
                    println!("{}", INDUSTRY_EXAMPLE);
                }
            }
            Ok(())
        }
        Query::Run {
            dataset,
            datarun,
            query,
            json,
            smart_limit,
        } => {
            let doc = read_query(&query).context("Error reading query")?;
            let mut conn = connect()?;
            (|| -> Result<()> {
                let resp = conn.dispatch(&format!("{}/{}", dataset, datarun), Some(&doc), smart_limit)?;
                let body: Value = resp.json()?;
                if json {
                    return print_json(&body);
                }
                write_csv_stdout(&Table::from_query_response(&body)?)
            })()
            .context("Error running query")
        }
    }
}

fn read_query(path: &Path) -> Result<Value> {
    let text = if path.as_os_str() == "-" {
        let mut s = String::new();
        std::io::stdin().read_to_string(&mut s)?;
        s
    } else {
        std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?
    };
    let doc: Value = serde_json::from_str(&text).context("query is not valid JSON")?;
    if doc.get("metrics").is_none() {
        bail!("query document has no `metrics` list");
    }
    Ok(doc)
}

const OCCUPATION_EXAMPLE: &str = r#"use lightcast::{Lightcast, build_query};
use serde_json::json;

let mut lc = Lightcast::new("your_username", "your_password")?;

// Define columns to retrieve
let cols = ["Jobs.2022", "ResidenceJobs.2022", "MedianHourlyEarnings.2022"];

// Define constraints (e.g., for a specific area and occupation group)
let constraints = vec![
    json!({
        "dimensionName": "Area",
        "mapLevel": {"level": 4, "predicate": ["48113"]}  // Dallas County FIPS code
    }),
    json!({
        "dimensionName": "Occupation",
        "mapLevel": {"level": 2, "predicate": ["15-0000"]}  // Computer and Mathematical Occupations
    }),
];

let query = build_query(&cols, constraints);
let table = lc.query("emsi.us.occupation", &query, Some("2025.3"))?;
print!("{}", table.to_csv_string()?);
"#;

const INDUSTRY_EXAMPLE: &str = r#"use lightcast::{Lightcast, build_query};
use serde_json::json;

let mut lc = Lightcast::new("your_username", "your_password")?;

// Define columns to retrieve
let cols = ["Jobs.2023", "Jobs.2024", "Jobs.2033", "Location Quotient.2023"];

// Define constraints (e.g., for specific area and industry)
let constraints = vec![
    json!({
        "dimensionName": "Area",
        "mapLevel": {"level": 4, "predicate": ["48113", "48085", "48121"]}  // Multiple counties
    }),
    json!({
        "dimensionName": "Industry",
        "mapLevel": {"level": 2, "predicate": ["54"]}  // Professional, Scientific, and Technical Services
    }),
];

let query = build_query(&cols, constraints);
let table = lc.query("emsi.us.industry", &query, Some("2025.3"))?;
print!("{}", table.to_csv_string()?);
"#;
